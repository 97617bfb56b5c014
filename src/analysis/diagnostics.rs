//! Issue types and the stable code taxonomy.

use std::fmt;
use std::sync::Arc;

use crate::base::Span;

// ============================================================================
// ISSUE TYPES
// ============================================================================

/// Severity level of an issue.
///
/// Only `Error` is produced today; the other levels are part of the
/// published contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    /// Convert to LSP severity number.
    pub fn to_lsp(&self) -> u32 {
        match self {
            Severity::Error => 1,
            Severity::Warning => 2,
            Severity::Info => 3,
            Severity::Hint => 4,
        }
    }
}

/// Issue codes.
///
/// The string forms (see [`IssueCode::as_str`]) are stable and intended for
/// filtering and snapshot tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IssueCode {
    // =========================================================================
    // Structural
    // =========================================================================
    /// A closing bracket with nothing open to close
    #[cfg_attr(feature = "serde", serde(rename = "syntax.unmatchedCloser"))]
    SyntaxUnmatchedCloser,
    /// A closing bracket that does not match the innermost opener
    #[cfg_attr(feature = "serde", serde(rename = "syntax.mismatched"))]
    SyntaxMismatched,
    /// An opener still open at end of file
    #[cfg_attr(feature = "serde", serde(rename = "syntax.unclosed"))]
    SyntaxUnclosed,

    // =========================================================================
    // Members and values
    // =========================================================================
    #[cfg_attr(feature = "serde", serde(rename = "enum.valueNotInteger"))]
    EnumValueNotInteger,
    #[cfg_attr(feature = "serde", serde(rename = "field.duplicateId"))]
    FieldDuplicateId,
    #[cfg_attr(feature = "serde", serde(rename = "type.unknown"))]
    TypeUnknown,
    #[cfg_attr(feature = "serde", serde(rename = "value.typeMismatch"))]
    ValueTypeMismatch,
    #[cfg_attr(feature = "serde", serde(rename = "typedef.unknownBase"))]
    TypedefUnknownBase,

    // =========================================================================
    // Services
    // =========================================================================
    #[cfg_attr(feature = "serde", serde(rename = "service.extends.unknown"))]
    ServiceExtendsUnknown,
    #[cfg_attr(feature = "serde", serde(rename = "service.extends.notService"))]
    ServiceExtendsNotService,
    #[cfg_attr(feature = "serde", serde(rename = "service.oneway.returnNotVoid"))]
    ServiceOnewayReturnNotVoid,
    #[cfg_attr(feature = "serde", serde(rename = "service.oneway.hasThrows"))]
    ServiceOnewayHasThrows,
    #[cfg_attr(feature = "serde", serde(rename = "service.throws.unknown"))]
    ServiceThrowsUnknown,
    #[cfg_attr(feature = "serde", serde(rename = "service.throws.notException"))]
    ServiceThrowsNotException,
}

impl IssueCode {
    /// Every code, in taxonomy order.
    pub const ALL: [IssueCode; 14] = [
        Self::SyntaxUnmatchedCloser,
        Self::SyntaxMismatched,
        Self::SyntaxUnclosed,
        Self::EnumValueNotInteger,
        Self::FieldDuplicateId,
        Self::TypeUnknown,
        Self::ValueTypeMismatch,
        Self::TypedefUnknownBase,
        Self::ServiceExtendsUnknown,
        Self::ServiceExtendsNotService,
        Self::ServiceOnewayReturnNotVoid,
        Self::ServiceOnewayHasThrows,
        Self::ServiceThrowsUnknown,
        Self::ServiceThrowsNotException,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SyntaxUnmatchedCloser => "syntax.unmatchedCloser",
            Self::SyntaxMismatched => "syntax.mismatched",
            Self::SyntaxUnclosed => "syntax.unclosed",
            Self::EnumValueNotInteger => "enum.valueNotInteger",
            Self::FieldDuplicateId => "field.duplicateId",
            Self::TypeUnknown => "type.unknown",
            Self::ValueTypeMismatch => "value.typeMismatch",
            Self::TypedefUnknownBase => "typedef.unknownBase",
            Self::ServiceExtendsUnknown => "service.extends.unknown",
            Self::ServiceExtendsNotService => "service.extends.notService",
            Self::ServiceOnewayReturnNotVoid => "service.oneway.returnNotVoid",
            Self::ServiceOnewayHasThrows => "service.oneway.hasThrows",
            Self::ServiceThrowsUnknown => "service.throws.unknown",
            Self::ServiceThrowsNotException => "service.throws.notException",
        }
    }

    /// Parse the stable string form.
    pub fn from_str_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == code)
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A problem found in a document, with a 0-indexed range.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Issue {
    /// The message shown to the user.
    pub message: Arc<str>,
    /// Start line (0-indexed).
    pub start_line: u32,
    /// Start column (0-indexed, UTF-16 units).
    pub start_col: u32,
    /// End line (0-indexed).
    pub end_line: u32,
    /// End column (0-indexed, UTF-16 units, exclusive).
    pub end_col: u32,
    /// Severity level.
    pub severity: Severity,
    /// Stable issue code.
    pub code: IssueCode,
}

impl Issue {
    /// Create a new error issue.
    pub fn error(
        code: IssueCode,
        message: impl Into<Arc<str>>,
        start_line: u32,
        start_col: u32,
        end_line: u32,
        end_col: u32,
    ) -> Self {
        Self {
            message: message.into(),
            start_line,
            start_col,
            end_line,
            end_col,
            severity: Severity::Error,
            code,
        }
    }

    /// The issue's stable code string.
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn span(&self) -> Span {
        Span::from_coords(self.start_line, self.start_col, self.end_line, self.end_col)
    }
}

// ============================================================================
// ISSUE COLLECTOR
// ============================================================================

/// Collects issues during one analysis pass.
#[derive(Clone, Debug, Default)]
pub struct IssueCollector {
    issues: Vec<Issue>,
}

impl IssueCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    /// Finish the pass: issues ordered by start position (stable for ties).
    pub fn finish(self) -> Vec<Issue> {
        let mut issues = self.issues;
        issues.sort_by_key(|i| (i.start_line, i.start_col));
        issues
    }
}
