//! Text analysis for Thrift IDL documents.
//!
//! [`analyze`] is the single entry point. It is pure and deterministic: the
//! same text and included types always produce the same issues in the same
//! order, and no input makes it fail.
//!
//! ## Passes
//!
//! 1. Blank out comments ([`crate::syntax::strip_comments`]).
//! 2. Scan declarations and merge them over the included types.
//! 3. Validate `extends` clauses.
//! 4. Walk brackets and declaration bodies, checking each member
//!    (see `structure`).
//! 5. Check `typedef` bases and `const` definitions line by line.

mod diagnostics;
mod members;
mod structure;
mod values;

use std::ops::Range;
use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashSet;
use tracing::trace;

pub use diagnostics::{Issue, IssueCode, IssueCollector, Severity};
pub use values::{is_integer_literal, value_matches_type};

use crate::base::utf16_column;
use crate::syntax::{
    Declaration, SourceLines, TypeExpr, TypeKind, TypeKindMap, TypeResolver, scan_declarations,
    split_top_level, strip_comments,
};
use members::{parse_enum_member, parse_field, parse_method};
use structure::Segment;

static CONST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*const\s+").expect("const regex"));

/// Analyze one document against the types its includes provide.
///
/// Local declarations shadow included ones of the same name. Issues come
/// back ordered by start position.
pub fn analyze(text: &str, included_types: &TypeKindMap) -> Vec<Issue> {
    let source = strip_comments(text);
    let declarations = scan_declarations(source.code_lines());

    let mut types = included_types.clone();
    for decl in &declarations {
        types.insert(decl.name.clone(), decl.kind);
    }

    let mut analyzer = Analyzer {
        source: &source,
        resolver: TypeResolver::new(&types),
        issues: IssueCollector::new(),
    };

    analyzer.check_extends(&declarations);
    analyzer.check_structure(&declarations);
    analyzer.check_typedefs(&declarations);
    analyzer.check_consts();

    let issues = analyzer.issues.finish();
    trace!(
        "[ANALYZE] {} lines, {} declarations, {} issues",
        source.len(),
        declarations.len(),
        issues.len()
    );
    issues
}

/// State shared by the analysis passes over one document.
pub(crate) struct Analyzer<'a> {
    source: &'a SourceLines<'a>,
    resolver: TypeResolver<'a>,
    issues: IssueCollector,
}

impl Analyzer<'_> {
    /// Record an error between two `(line, byte)` positions.
    fn report(
        &mut self,
        code: IssueCode,
        message: impl Into<Arc<str>>,
        start: (usize, usize),
        end: (usize, usize),
    ) {
        let start_col = utf16_column(self.source.original(start.0), start.1);
        let end_col = utf16_column(self.source.original(end.0), end.1);
        self.issues.add(Issue::error(
            code,
            message,
            start.0 as u32,
            start_col,
            end.0 as u32,
            end_col,
        ));
    }

    fn report_in_segment(
        &mut self,
        code: IssueCode,
        message: impl Into<Arc<str>>,
        segment: &Segment,
        range: Range<usize>,
    ) {
        let start = segment.locate(range.start);
        let end = segment.locate(range.end);
        self.report(code, message, start, end);
    }

    /// Record an error covering the full lines a segment occupies.
    fn report_lines(&mut self, code: IssueCode, message: impl Into<Arc<str>>, segment: &Segment) {
        let text = segment.text();
        let first = text.len() - text.trim_start().len();
        let last = text.trim_end().len().saturating_sub(1);
        let (start_line, _) = segment.locate(first);
        let (end_line, _) = segment.locate(last);
        self.report_lines_between(code, message, start_line, end_line);
    }

    fn report_lines_between(
        &mut self,
        code: IssueCode,
        message: impl Into<Arc<str>>,
        start_line: usize,
        end_line: usize,
    ) {
        let start_code = self.source.code(start_line);
        let start_byte = start_code.len() - start_code.trim_start().len();
        let end_byte = self.source.code(end_line).trim_end().len();
        self.report(code, message, (start_line, start_byte), (end_line, end_byte));
    }

    fn check_extends(&mut self, declarations: &[Declaration]) {
        for extends in declarations.iter().filter_map(|d| d.extends.as_ref()) {
            let start = (extends.line, extends.column);
            let end = (extends.line, extends.column + extends.parent.len());
            match self.resolver.lookup(&extends.parent) {
                None => self.report(
                    IssueCode::ServiceExtendsUnknown,
                    format!("Unknown service '{}' in extends clause", extends.parent),
                    start,
                    end,
                ),
                Some(TypeKind::Service) => {}
                Some(kind) => self.report(
                    IssueCode::ServiceExtendsNotService,
                    format!("'{}' is a {kind}, not a service", extends.parent),
                    start,
                    end,
                ),
            }
        }
    }

    fn check_typedefs(&mut self, declarations: &[Declaration]) {
        for decl in declarations {
            let Some((base, range)) = &decl.base else {
                continue;
            };
            if !self.resolver.is_known(base) {
                self.report(
                    IssueCode::TypedefUnknownBase,
                    format!("Unknown base type '{base}' for typedef '{}'", decl.name),
                    (decl.line, range.start),
                    (decl.line, range.end),
                );
            }
        }
    }

    /// `const Type NAME = value` definitions, checked one line at a time.
    fn check_consts(&mut self) {
        let source = self.source;
        for line in 0..source.len() {
            let code = source.code(line);
            let Some(prefix) = CONST.find(code) else {
                continue;
            };
            let rest = &code[prefix.end()..];
            let Some(field) = parse_field(rest) else {
                continue;
            };
            let offset = prefix.end();

            let ty = TypeExpr::parse(field.type_text);
            if !self.resolver.is_known_expr(&ty) {
                self.report(
                    IssueCode::TypeUnknown,
                    format!("Unknown type '{}'", field.type_text),
                    (line, offset + field.type_range.start),
                    (line, offset + field.type_range.end),
                );
                continue;
            }

            let Some((value, _)) = field.default else {
                continue;
            };
            // Multi-line values are left alone
            if !is_complete(value) {
                continue;
            }
            if !value_matches_type(&ty, value) {
                self.report_lines_between(
                    IssueCode::ValueTypeMismatch,
                    format!(
                        "Value '{value}' does not match constant type '{}'",
                        field.type_text
                    ),
                    line,
                    line,
                );
            }
        }
    }

    fn check_field(&mut self, segment: &Segment, ids: &mut FxHashSet<i64>) {
        let text = segment.text();
        let Some(field) = parse_field(text) else {
            return;
        };

        if let Some((id, range)) = &field.id {
            if !ids.insert(*id) {
                self.report_in_segment(
                    IssueCode::FieldDuplicateId,
                    format!("Duplicate field id {id}"),
                    segment,
                    range.clone(),
                );
            }
        }

        let ty = TypeExpr::parse(field.type_text);
        if !self.resolver.is_known_expr(&ty) {
            self.report_in_segment(
                IssueCode::TypeUnknown,
                format!("Unknown type '{}'", field.type_text),
                segment,
                field.type_range.clone(),
            );
            return;
        }

        if let Some((value, _)) = field.default {
            if !value_matches_type(&ty, value) {
                self.report_lines(
                    IssueCode::ValueTypeMismatch,
                    format!(
                        "Default value '{value}' does not match field type '{}'",
                        field.type_text
                    ),
                    segment,
                );
            }
        }
    }

    fn check_enum_member(&mut self, segment: &Segment) {
        let text = segment.text();
        let Some(member) = parse_enum_member(text) else {
            return;
        };
        let Some(value) = member.value else {
            return;
        };
        let literal = &text[value.clone()];
        if !is_integer_literal(literal) {
            self.report_in_segment(
                IssueCode::EnumValueNotInteger,
                format!(
                    "Enum value '{}' must be an integer, found '{literal}'",
                    &text[member.name.clone()]
                ),
                segment,
                member.name.start..value.end,
            );
        }
    }

    fn check_method(&mut self, segment: &Segment) {
        let text = segment.text();
        let Some(method) = parse_method(text) else {
            return;
        };

        if method.oneway && method.return_type != "void" {
            self.report_in_segment(
                IssueCode::ServiceOnewayReturnNotVoid,
                format!(
                    "Oneway method '{}' must return void, not '{}'",
                    &text[method.name.clone()],
                    method.return_type
                ),
                segment,
                method.return_range.clone(),
            );
        } else if !self.resolver.is_known(method.return_type) {
            self.report_in_segment(
                IssueCode::TypeUnknown,
                format!("Unknown type '{}'", method.return_type),
                segment,
                method.return_range.clone(),
            );
        }

        self.check_parameter_list(segment, method.args.clone(), false);

        if let Some(throws) = &method.throws {
            if method.oneway {
                self.report_in_segment(
                    IssueCode::ServiceOnewayHasThrows,
                    format!(
                        "Oneway method '{}' cannot declare throws",
                        &text[method.name.clone()]
                    ),
                    segment,
                    throws.keyword.clone(),
                );
            }
            self.check_parameter_list(segment, throws.list.clone(), true);
        }
    }

    /// Argument or throws list: ids must be unique, types must resolve.
    fn check_parameter_list(&mut self, segment: &Segment, list: Range<usize>, throws: bool) {
        let text = segment.text();
        let mut ids = FxHashSet::default();

        for piece in split_top_level(&text[list.clone()], &[',', ';']) {
            let piece = list.start + piece.start..list.start + piece.end;
            let Some(field) = parse_field(&text[piece.clone()]) else {
                continue;
            };

            if let Some((id, range)) = &field.id {
                if !ids.insert(*id) {
                    self.report_in_segment(
                        IssueCode::FieldDuplicateId,
                        format!("Duplicate field id {id}"),
                        segment,
                        piece.start + range.start..piece.start + range.end,
                    );
                }
            }

            let type_range = piece.start + field.type_range.start..piece.start + field.type_range.end;
            if throws {
                self.check_thrown_type(segment, field.type_text, type_range);
            } else if !self.resolver.is_known(field.type_text) {
                self.report_in_segment(
                    IssueCode::TypeUnknown,
                    format!("Unknown type '{}'", field.type_text),
                    segment,
                    type_range,
                );
            }
        }
    }

    fn check_thrown_type(&mut self, segment: &Segment, type_text: &str, range: Range<usize>) {
        match self.resolver.lookup(type_text) {
            Some(TypeKind::Exception) => {}
            Some(kind) => self.report_in_segment(
                IssueCode::ServiceThrowsNotException,
                format!("'{type_text}' is a {kind}, not an exception"),
                segment,
                range,
            ),
            None if self.resolver.is_known(type_text) && !type_text.contains('.') => self
                .report_in_segment(
                    IssueCode::ServiceThrowsNotException,
                    format!("'{type_text}' is not an exception"),
                    segment,
                    range,
                ),
            None => self.report_in_segment(
                IssueCode::ServiceThrowsUnknown,
                format!("Unknown exception type '{type_text}'"),
                segment,
                range,
            ),
        }
    }
}

/// Check that brackets and quotes in a value close on the same line.
fn is_complete(value: &str) -> bool {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in value.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '[' | '{' | '(' => depth += 1,
            ']' | '}' | ')' => depth -= 1,
            _ => {}
        }
    }
    quote.is_none() && depth == 0
}
