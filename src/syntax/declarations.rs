//! Declaration scan.
//!
//! A single pass over comment-free lines that records every named type
//! declaration (`typedef`, `struct`, `union`, `exception`, `enum`, `senum`,
//! `service`), service `extends` clauses and `include` statements. This is
//! the lightweight scan shared by the analyzer and the include collector; it
//! does not look inside declaration bodies.

use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::type_expr::{ident_at, scan_type_expr, skip_ws};

/// Header of a braced declaration: keyword, name and optional parent.
static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(struct|union|exception|enum|senum|service)\s+([A-Za-z_][A-Za-z0-9_]*)(?:\s+extends\s+([A-Za-z_][A-Za-z0-9_.]*))?",
    )
    .expect("declaration header regex")
});

static TYPEDEF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*typedef\s+").expect("typedef regex"));

static INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*include\s+(?:"([^"]*)"|'([^']*)')"#).expect("include regex")
});

/// The kind of a declared type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TypeKind {
    Typedef,
    Struct,
    Union,
    Exception,
    Enum,
    Senum,
    Service,
}

impl TypeKind {
    /// Map a declaration keyword to its kind.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "typedef" => Some(Self::Typedef),
            "struct" => Some(Self::Struct),
            "union" => Some(Self::Union),
            "exception" => Some(Self::Exception),
            "enum" => Some(Self::Enum),
            "senum" => Some(Self::Senum),
            "service" => Some(Self::Service),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Typedef => "typedef",
            Self::Struct => "struct",
            Self::Union => "union",
            Self::Exception => "exception",
            Self::Enum => "enum",
            Self::Senum => "senum",
            Self::Service => "service",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared name → kind.
pub type TypeKindMap = FxHashMap<SmolStr, TypeKind>;

/// A service `extends` clause, validated right after the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceExtends {
    pub line: usize,
    pub parent: SmolStr,
    /// Byte offset of the parent name within the line
    pub column: usize,
}

/// One declaration found by [`scan_declarations`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub kind: TypeKind,
    pub name: SmolStr,
    pub line: usize,
    /// Byte offset of the declaring keyword
    pub start: usize,
    /// Byte range of the declared name
    pub name_range: Range<usize>,
    /// Byte offset just past the header; a `{` at or after it opens the body
    pub header_end: usize,
    /// Base type text and byte range (typedefs only)
    pub base: Option<(String, Range<usize>)>,
    /// Parent service (services only)
    pub extends: Option<ServiceExtends>,
}

/// An `include "path"` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeStatement {
    pub path: String,
    pub line: usize,
}

/// Scan comment-free lines for declarations.
///
/// A line may hold several headers (`struct A { ... } struct B {`); one
/// counts when it starts the line or follows a `}`, `;` or `,` outside any
/// string literal.
pub fn scan_declarations<S: AsRef<str>>(lines: &[S]) -> Vec<Declaration> {
    let mut declarations = Vec::new();

    for (line_no, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        let before = declarations.len();

        for caps in HEADER.captures_iter(line) {
            let (Some(keyword), Some(name)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            if !starts_declaration(line, keyword.start()) {
                continue;
            }
            let Some(kind) = TypeKind::from_keyword(keyword.as_str()) else {
                continue;
            };
            let whole = caps.get(0).map_or(name.end(), |m| m.end());
            let extends = caps.get(3).map(|parent| ServiceExtends {
                line: line_no,
                parent: SmolStr::new(parent.as_str()),
                column: parent.start(),
            });
            declarations.push(Declaration {
                kind,
                name: SmolStr::new(name.as_str()),
                line: line_no,
                start: keyword.start(),
                name_range: name.range(),
                header_end: whole,
                base: None,
                extends: extends.filter(|_| kind == TypeKind::Service),
            });
        }
        if declarations.len() > before {
            continue;
        }

        if let Some(prefix) = TYPEDEF.find(line) {
            if let Some(declaration) = scan_typedef(line, line_no, prefix.end()) {
                declarations.push(declaration);
            }
        }
    }

    declarations
}

/// True when a keyword at `at` begins a declaration rather than sitting
/// inside a member or a string.
fn starts_declaration(line: &str, at: usize) -> bool {
    let prefix = &line[..at];
    match prefix.trim_end().chars().last() {
        None => true,
        Some('}' | ';' | ',') => !inside_string(prefix),
        Some(_) => false,
    }
}

fn inside_string(prefix: &str) -> bool {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in prefix.chars() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None => {}
        }
    }
    quote.is_some()
}

fn scan_typedef(line: &str, line_no: usize, base_start: usize) -> Option<Declaration> {
    let base_end = scan_type_expr(line, base_start);
    if base_end == base_start {
        return None;
    }
    let name_range = ident_at(line, skip_ws(line, base_end))?;
    Some(Declaration {
        kind: TypeKind::Typedef,
        name: SmolStr::new(&line[name_range.clone()]),
        line: line_no,
        start: line.len() - line.trim_start().len(),
        header_end: name_range.end,
        name_range,
        base: Some((line[base_start..base_end].to_string(), base_start..base_end)),
        extends: None,
    })
}

/// Build the name → kind map for a set of declarations.
///
/// Later declarations of the same name overwrite earlier ones.
pub fn declared_types(declarations: &[Declaration]) -> TypeKindMap {
    declarations
        .iter()
        .map(|decl| (decl.name.clone(), decl.kind))
        .collect()
}

/// Scan comment-free lines for `include` statements.
pub fn scan_includes<S: AsRef<str>>(lines: &[S]) -> Vec<IncludeStatement> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(line_no, line)| {
            let caps = INCLUDE.captures(line.as_ref())?;
            let path = caps.get(1).or_else(|| caps.get(2))?;
            Some(IncludeStatement {
                path: path.as_str().to_string(),
                line: line_no,
            })
        })
        .collect()
}
