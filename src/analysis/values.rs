//! Literal shape checks for default and constant values.
//!
//! Only the outer shape is checked: container literals are not descended
//! into, and values for user-declared types are accepted as written.

use std::sync::LazyLock;

use regex::Regex;

use crate::base::constants;
use crate::syntax::TypeExpr;

static INTEGER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:0[xX][0-9a-fA-F]+|[0-9]+)$").expect("integer literal regex")
});

static FLOAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?$")
        .expect("float literal regex")
});

static QUOTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:"(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*')$"#).expect("quoted literal regex")
});

static UUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(?:"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}"|'[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}')$"#,
    )
    .expect("uuid literal regex")
});

/// A bare or dotted identifier, i.e. a reference to a constant or enum value.
static CONST_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*$").expect("const ref regex")
});

/// Check if `value` is an (optionally signed) integer literal.
pub fn is_integer_literal(value: &str) -> bool {
    INTEGER.is_match(value)
}

/// Check if a literal's shape fits the declared type.
pub fn value_matches_type(ty: &TypeExpr<'_>, value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }

    if value != "true" && value != "false" && CONST_REF.is_match(value) {
        return true;
    }

    match ty {
        TypeExpr::Named(name) => match *name {
            name if constants::is_integral(name) => is_integer_literal(value),
            "double" => is_integer_literal(value) || FLOAT.is_match(value),
            "bool" => value == "true" || value == "false",
            "string" | "binary" => QUOTED.is_match(value),
            "uuid" => UUID.is_match(value),
            _ => true,
        },
        TypeExpr::List(_) => is_wrapped(value, '[', ']'),
        TypeExpr::Set(_) => {
            is_wrapped(value, '[', ']')
                || (is_wrapped(value, '{', '}') && !has_top_level_colon(&value[1..value.len() - 1]))
        }
        TypeExpr::Map(_, _) => {
            is_wrapped(value, '{', '}') && {
                let inner = &value[1..value.len() - 1];
                inner.trim().is_empty() || has_top_level_colon(inner)
            }
        }
        TypeExpr::Invalid => true,
    }
}

fn is_wrapped(value: &str, open: char, close: char) -> bool {
    value.len() >= 2 && value.starts_with(open) && value.ends_with(close)
}

/// Check for a `:` outside nested brackets and quotes.
fn has_top_level_colon(inner: &str) -> bool {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in inner.chars() {
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
            ']' | '}' | ')' => depth = depth.saturating_sub(1),
            ':' if depth == 0 => return true,
            _ => {}
        }
    }
    false
}
