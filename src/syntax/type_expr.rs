//! Type expressions: scanning, splitting and resolution.
//!
//! Type text is whatever appears between a field's id/requiredness and its
//! name, e.g. `i32`, `shared.Point` or `map<string, list<Item>>`.

use std::ops::Range;

use super::declarations::{TypeKind, TypeKindMap};
use crate::base::constants;

/// Check if a character can start an identifier.
#[inline]
pub fn is_ident_start(c: char) -> bool {
    c == '_' || unicode_ident::is_xid_start(c)
}

/// Check if a character can continue an identifier.
#[inline]
pub fn is_ident_continue(c: char) -> bool {
    unicode_ident::is_xid_continue(c)
}

/// Byte index of the first non-whitespace char at or after `from`.
pub fn skip_ws(s: &str, from: usize) -> usize {
    s[from..]
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map(|(i, _)| from + i)
        .unwrap_or(s.len())
}

/// Byte range of the identifier starting exactly at `from`, if any.
pub fn ident_at(s: &str, from: usize) -> Option<Range<usize>> {
    let mut chars = s[from..].char_indices();
    let (_, first) = chars.next()?;
    if !is_ident_start(first) {
        return None;
    }
    let end = chars
        .find(|(_, c)| !is_ident_continue(*c))
        .map(|(i, _)| from + i)
        .unwrap_or(s.len());
    Some(from..end)
}

/// Check if `s` starts with `word` followed by whitespace (or `(` when
/// `paren_ok`), returning the byte length of the word.
pub fn keyword_at(s: &str, from: usize, word: &str, paren_ok: bool) -> Option<usize> {
    let rest = s.get(from..)?;
    let after = rest.strip_prefix(word)?;
    match after.chars().next() {
        Some(c) if c.is_whitespace() => Some(word.len()),
        Some('(') if paren_ok => Some(word.len()),
        _ => None,
    }
}

/// Scan a type expression starting at `start`.
///
/// The type runs until whitespace at bracket depth zero that is followed by
/// an identifier (the declared name), or until `=`, `,` or `;` at depth
/// zero. Returns the exclusive end of the trimmed type text.
pub fn scan_type_expr(s: &str, start: usize) -> usize {
    let mut depth = 0usize;
    let mut iter = s[start..].char_indices().peekable();

    while let Some((rel, c)) = iter.next() {
        let idx = start + rel;
        match c {
            '<' | '(' => depth += 1,
            '>' | ')' => depth = depth.saturating_sub(1),
            '=' | ',' | ';' if depth == 0 => return trim_end_at(s, start, idx),
            c if c.is_whitespace() && depth == 0 => {
                let next = skip_ws(s, idx);
                if s[next..].chars().next().is_some_and(is_ident_start) {
                    return idx;
                }
            }
            _ => {}
        }
    }

    trim_end_at(s, start, s.len())
}

fn trim_end_at(s: &str, start: usize, end: usize) -> usize {
    start + s[start..end].trim_end().len()
}

/// Split `s` on `separators` found at bracket depth zero, outside quotes.
///
/// Returns byte ranges of each piece (untrimmed). A trailing empty piece is
/// kept so callers can detect `a,` style lists.
pub fn split_top_level(s: &str, separators: &[char]) -> Vec<Range<usize>> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut piece_start = 0;

    for (idx, c) in s.char_indices() {
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
            '<' | '(' | '[' | '{' => depth += 1,
            '>' | ')' | ']' | '}' => depth = depth.saturating_sub(1),
            c if depth == 0 && separators.contains(&c) => {
                pieces.push(piece_start..idx);
                piece_start = idx + c.len_utf8();
            }
            _ => {}
        }
    }

    pieces.push(piece_start..s.len());
    pieces
}

/// Parsed shape of a type expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr<'a> {
    /// A primitive, declared or dotted name
    Named(&'a str),
    List(Box<TypeExpr<'a>>),
    Set(Box<TypeExpr<'a>>),
    Map(Box<TypeExpr<'a>>, Box<TypeExpr<'a>>),
    /// Anything that is not a well-formed type
    Invalid,
}

impl<'a> TypeExpr<'a> {
    /// Parse type text such as `map<string, list<i32>>`.
    pub fn parse(text: &'a str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return TypeExpr::Invalid;
        }

        let Some(open) = text.find('<') else {
            return if is_type_name(text) {
                TypeExpr::Named(text)
            } else {
                TypeExpr::Invalid
            };
        };

        if !text.ends_with('>') {
            return TypeExpr::Invalid;
        }

        let container = text[..open].trim();
        let inner = &text[open + 1..text.len() - 1];
        let args: Vec<TypeExpr<'a>> = split_top_level(inner, &[','])
            .into_iter()
            .map(|range| TypeExpr::parse(&inner[range]))
            .collect();

        match (container, args.as_slice()) {
            ("list", [elem]) => TypeExpr::List(Box::new(elem.clone())),
            ("set", [elem]) => TypeExpr::Set(Box::new(elem.clone())),
            ("map", [key, value]) => TypeExpr::Map(Box::new(key.clone()), Box::new(value.clone())),
            _ => TypeExpr::Invalid,
        }
    }
}

/// A bare or dotted identifier.
fn is_type_name(text: &str) -> bool {
    text.split('.').all(|segment| {
        let mut chars = segment.chars();
        chars.next().is_some_and(is_ident_start) && chars.all(is_ident_continue)
    })
}

/// Resolves type references against primitives and a [`TypeKindMap`].
#[derive(Debug, Clone, Copy)]
pub struct TypeResolver<'a> {
    types: &'a TypeKindMap,
}

impl<'a> TypeResolver<'a> {
    pub fn new(types: &'a TypeKindMap) -> Self {
        Self { types }
    }

    /// Check if type text names a known type.
    ///
    /// Known means primitive, declared (locally or by an include), a dotted
    /// `ns.Type` reference, or a container whose components are all known.
    pub fn is_known(&self, text: &str) -> bool {
        self.is_known_expr(&TypeExpr::parse(text))
    }

    pub fn is_known_expr(&self, expr: &TypeExpr<'_>) -> bool {
        match expr {
            TypeExpr::Named(name) => {
                constants::is_primitive(name)
                    || self.types.contains_key(*name)
                    || name.contains('.')
            }
            TypeExpr::List(elem) | TypeExpr::Set(elem) => self.is_known_expr(elem),
            TypeExpr::Map(key, value) => self.is_known_expr(key) && self.is_known_expr(value),
            TypeExpr::Invalid => false,
        }
    }

    /// Look up the declared kind of a name, falling back to the last segment
    /// of a dotted reference.
    pub fn lookup(&self, name: &str) -> Option<TypeKind> {
        if let Some(kind) = self.types.get(name) {
            return Some(*kind);
        }
        let (_, last) = name.rsplit_once('.')?;
        self.types.get(last).copied()
    }
}
