//! End-to-end checks of `analyze` on whole documents.

use rstest::rstest;
use thrift_analyzer::{IssueCode, Severity, Span, TypeKind, analyze};

use crate::helpers::diagnostic_helpers::*;
use crate::helpers::source_fixtures::*;

#[test]
fn test_realistic_document_is_clean() {
    let types = included(&[("BaseService", TypeKind::Service)]);
    let issues = analyze(ITEM_SERVICE, &types);
    assert!(issues.is_empty(), "Unexpected issues:\n{}", describe(&issues));
}

#[test]
fn test_realistic_document_without_include_reports_extends() {
    assert_codes(ITEM_SERVICE, &[IssueCode::ServiceExtendsUnknown]);
}

#[test]
fn test_stray_closer_reports_exactly_one_bracket_issue() {
    let types = included(&[("BaseService", TypeKind::Service)]);
    let source = format!("{ITEM_SERVICE}}}\n");
    let issues = analyze(&source, &types);

    assert_eq!(issues.len(), 1, "{}", describe(&issues));
    assert_eq!(issues[0].code, IssueCode::SyntaxUnmatchedCloser);
    let last_line = ITEM_SERVICE.lines().count() as u32;
    assert_eq!(issues[0].span(), Span::on_line(last_line, 0, 1));
}

#[test]
fn test_broken_members_in_position_order() {
    let issues = issues_for(BROKEN_MEMBERS);
    assert_eq!(
        codes(&issues),
        vec![
            IssueCode::EnumValueNotInteger,
            IssueCode::FieldDuplicateId,
            IssueCode::TypeUnknown,
            IssueCode::ValueTypeMismatch,
            IssueCode::TypedefUnknownBase,
        ],
        "{}",
        describe(&issues)
    );
    let lines: Vec<u32> = issues.iter().map(|i| i.start_line).collect();
    assert_eq!(lines, vec![2, 7, 8, 9, 12]);
    assert!(issues.iter().all(|i| i.severity == Severity::Error));
}

#[test]
fn test_enum_value_not_integer_on_member_line() {
    let issues = issues_for("enum E {\n  A = 1,\n  B = two\n}\n");
    assert_eq!(codes(&issues), vec![IssueCode::EnumValueNotInteger]);
    assert_eq!(issues[0].start_line, 2);
    assert_eq!(issues[0].start_col, 2);
}

#[test]
fn test_duplicate_field_id_on_second_field() {
    let issues = issues_for("struct S {\n  1: string a,\n  1: string b\n}\n");
    assert_eq!(codes(&issues), vec![IssueCode::FieldDuplicateId]);
    assert_eq!(issues[0].start_line, 2);
}

#[test]
fn test_every_repeat_of_an_id_is_reported_once() {
    let source = "struct S {\n  1: string a\n  1: string b\n  2: i32 c\n  1: string d\n}\n";
    let issues = issues_for(source);
    assert_eq!(
        codes(&issues),
        vec![IssueCode::FieldDuplicateId, IssueCode::FieldDuplicateId]
    );
    assert_eq!(issues[0].start_line, 2);
    assert_eq!(issues[1].start_line, 4);
}

#[test]
fn test_field_ids_are_scoped_per_struct() {
    assert_no_issues("struct A {\n  1: string a\n}\nstruct B {\n  1: string b\n}\n");
}

#[rstest]
#[case("struct S {\n  1: list<Unknown> xs\n}\n", &[IssueCode::TypeUnknown])]
#[case("struct S {\n  1: list<list<string>> xs\n}\n", &[])]
#[case("struct S {\n  1: map<string, set<Missing>> xs\n}\n", &[IssueCode::TypeUnknown])]
#[case("struct S {\n  1: map<string, set<i64>> xs\n}\n", &[])]
fn test_container_recursion(#[case] source: &str, #[case] expected: &[IssueCode]) {
    assert_codes(source, expected);
}

#[rstest]
#[case("typedef Foo Bar\n", &[IssueCode::TypedefUnknownBase])]
#[case("struct Foo {}\ntypedef Foo Bar\n", &[])]
#[case("typedef list<i32> Ints\n", &[])]
fn test_typedef_bases(#[case] source: &str, #[case] expected: &[IssueCode]) {
    assert_codes(source, expected);
}

#[test]
fn test_oneway_with_return_type() {
    assert_codes(
        "service Svc { oneway string f() }\n",
        &[IssueCode::ServiceOnewayReturnNotVoid],
    );
}

#[test]
fn test_service_contract_rules() {
    let source = r#"struct Plain {}
exception Boom {}
service Svc {
  void a() throws (1: Boom b)
  void b() throws (1: Plain p)
  void c() throws (1: Ghost g)
  oneway void d() throws (1: Boom b)
}
"#;
    let issues = issues_for(source);
    assert_eq!(
        codes(&issues),
        vec![
            IssueCode::ServiceThrowsNotException,
            IssueCode::ServiceThrowsUnknown,
            IssueCode::ServiceOnewayHasThrows,
        ],
        "{}",
        describe(&issues)
    );
}

#[test]
fn test_extends_resolves_through_includes() {
    let source = "service Child extends Parent {}\n";
    assert_codes(source, &[IssueCode::ServiceExtendsUnknown]);

    let as_service = included(&[("Parent", TypeKind::Service)]);
    assert!(analyze(source, &as_service).is_empty());

    let as_struct = included(&[("Parent", TypeKind::Struct)]);
    let issues = analyze(source, &as_struct);
    assert_eq!(codes(&issues), vec![IssueCode::ServiceExtendsNotService]);
}

#[test]
fn test_local_declaration_shadows_included_kind() {
    let source = "service Parent {}\nservice Child extends Parent {}\n";
    let types = included(&[("Parent", TypeKind::Struct)]);
    assert!(analyze(source, &types).is_empty());
}

#[test]
fn test_brackets_inside_comments_and_strings_are_ignored() {
    assert_no_issues(
        "// {\n/* ( [ */\nconst string S = \"}\"\nstruct A {\n  1: string s = \"(\"\n}\n",
    );
}

#[test]
fn test_analysis_is_deterministic() {
    let types = included(&[("BaseService", TypeKind::Service)]);
    let source = format!("{BROKEN_MEMBERS}{ITEM_SERVICE}]\n");
    let first = analyze(&source, &types);
    let second = analyze(&source, &types);
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_issue_codes_serialize_to_stable_strings() {
    let issues = issues_for(BROKEN_MEMBERS);
    let strings: Vec<&str> = issues.iter().map(|i| i.code_str()).collect();
    assert_eq!(
        strings,
        vec![
            "enum.valueNotInteger",
            "field.duplicateId",
            "type.unknown",
            "value.typeMismatch",
            "typedef.unknownBase",
        ]
    );
}
