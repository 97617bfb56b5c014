//! Diagnostic assertion helpers.

use smol_str::SmolStr;
use thrift_analyzer::{Issue, IssueCode, TypeKind, TypeKindMap, analyze};

/// Analyze a source string with no included types.
pub fn issues_for(source: &str) -> Vec<Issue> {
    analyze(source, &TypeKindMap::default())
}

/// Build an included-types map from `(name, kind)` pairs.
pub fn included(types: &[(&str, TypeKind)]) -> TypeKindMap {
    types
        .iter()
        .map(|(name, kind)| (SmolStr::new(name), *kind))
        .collect()
}

/// Codes of all issues, in reported order.
pub fn codes(issues: &[Issue]) -> Vec<IssueCode> {
    issues.iter().map(|i| i.code).collect()
}

/// Render issues one per line for assertion messages.
pub fn describe(issues: &[Issue]) -> String {
    issues
        .iter()
        .map(|i| {
            format!(
                "  {}:{}-{}:{} [{}] {}",
                i.start_line, i.start_col, i.end_line, i.end_col, i.code, i.message
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Assert a source produces no issues.
pub fn assert_no_issues(source: &str) {
    let issues = issues_for(source);
    assert!(
        issues.is_empty(),
        "Expected no issues, got {}:\n{}",
        issues.len(),
        describe(&issues)
    );
}

/// Assert a source produces exactly these codes, in order.
pub fn assert_codes(source: &str, expected: &[IssueCode]) {
    let issues = issues_for(source);
    assert_eq!(
        codes(&issues),
        expected,
        "Unexpected issues:\n{}",
        describe(&issues)
    );
}
