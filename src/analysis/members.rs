//! Member signatures found inside declaration bodies.
//!
//! Each parser works on one member's text (a field, an enum value or a
//! service method) and returns byte ranges into that text. Nothing here
//! reports issues; see the checks in [`super`].

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::base::constants::REQUIREDNESS;
use crate::syntax::type_expr::{ident_at, keyword_at, scan_type_expr, skip_ws};

static FIELD_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([+-]?[0-9]+)\s*:").expect("field id regex"));

/// `[id:] [required|optional] Type [name] [= default]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSignature<'a> {
    pub id: Option<(i64, Range<usize>)>,
    pub type_text: &'a str,
    pub type_range: Range<usize>,
    pub name: Option<Range<usize>>,
    pub default: Option<(&'a str, Range<usize>)>,
}

/// `NAME [= VALUE]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    pub name: Range<usize>,
    pub value: Option<Range<usize>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrowsClause {
    /// The `throws` keyword itself
    pub keyword: Range<usize>,
    /// Text between the parentheses
    pub list: Range<usize>,
}

/// `[oneway] ReturnType name(args) [throws (...)]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature<'a> {
    pub oneway: bool,
    pub return_type: &'a str,
    pub return_range: Range<usize>,
    pub name: Range<usize>,
    /// Text between the argument parentheses
    pub args: Range<usize>,
    pub throws: Option<ThrowsClause>,
}

/// Parse a struct/union/exception field, or a method argument.
pub fn parse_field(text: &str) -> Option<FieldSignature<'_>> {
    let mut pos = 0;
    let mut id = None;

    if let Some(caps) = FIELD_ID.captures(text) {
        let number = caps.get(1)?;
        id = number.as_str().parse::<i64>().ok().map(|v| (v, number.range()));
        pos = caps.get(0)?.end();
    }

    pos = skip_ws(text, pos);
    for word in REQUIREDNESS {
        if let Some(len) = keyword_at(text, pos, word, false) {
            pos = skip_ws(text, pos + len);
            break;
        }
    }

    let type_end = scan_type_expr(text, pos);
    if type_end == pos {
        return None;
    }

    let name_start = skip_ws(text, type_end);
    let name = ident_at(text, name_start);
    let after_name = name.as_ref().map_or(name_start, |r| skip_ws(text, r.end));

    let default = text[after_name..].starts_with('=').then(|| {
        let start = skip_ws(text, after_name + 1);
        let end = value_end(text, start);
        (&text[start..end], start..end)
    });

    Some(FieldSignature {
        id,
        type_text: &text[pos..type_end],
        type_range: pos..type_end,
        name,
        default,
    })
}

/// Parse an enum member.
pub fn parse_enum_member(text: &str) -> Option<EnumMember> {
    let name = ident_at(text, skip_ws(text, 0))?;
    let after = skip_ws(text, name.end);
    let value = text[after..].starts_with('=').then(|| {
        let start = skip_ws(text, after + 1);
        start..value_end(text, start)
    });
    Some(EnumMember { name, value })
}

/// Parse a service method signature.
pub fn parse_method(text: &str) -> Option<MethodSignature<'_>> {
    let mut pos = skip_ws(text, 0);
    let oneway = match keyword_at(text, pos, "oneway", false) {
        Some(len) => {
            pos = skip_ws(text, pos + len);
            true
        }
        None => false,
    };

    let return_end = scan_type_expr(text, pos);
    if return_end == pos {
        return None;
    }

    let name = ident_at(text, skip_ws(text, return_end))?;
    let open = skip_ws(text, name.end);
    if !text[open..].starts_with('(') {
        return None;
    }
    let close = matching_paren(text, open)?;

    let after = skip_ws(text, close + 1);
    let throws = keyword_at(text, after, "throws", true).and_then(|len| {
        let keyword = after..after + len;
        let open = skip_ws(text, keyword.end);
        if !text[open..].starts_with('(') {
            return None;
        }
        let close = matching_paren(text, open)?;
        Some(ThrowsClause {
            keyword,
            list: open + 1..close,
        })
    });

    Some(MethodSignature {
        oneway,
        return_type: &text[pos..return_end],
        return_range: pos..return_end,
        name,
        args: open + 1..close,
        throws,
    })
}

/// End of a value expression: the next top-level `,`, `;` or annotation
/// `(`, with trailing whitespace trimmed.
fn value_end(text: &str, start: usize) -> usize {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut end = text.len();

    for (rel, c) in text[start..].char_indices() {
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
            '(' | ',' | ';' if depth == 0 => {
                end = start + rel;
                break;
            }
            '[' | '{' | '(' => depth += 1,
            ']' | '}' | ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }

    start + text[start..end].trim_end().len()
}

/// Byte index of the `)` matching the `(` at `open`.
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (rel, c) in text[open..].char_indices() {
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
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + rel);
                }
            }
            _ => {}
        }
    }
    None
}
