//! Lightweight scanning for Thrift sources.
//!
//! Nothing here builds a syntax tree. The analyzer works on comment-free
//! lines and a handful of small scanners:
//! - [`strip_comments`] - Logos-based comment/string aware line stripper
//! - [`scan_declarations`] / [`scan_includes`] - declaration and include scan
//! - [`TypeExpr`] / [`TypeResolver`] - type expression parsing and resolution

pub mod declarations;
pub mod lexer;
pub mod type_expr;

pub use declarations::{
    Declaration, IncludeStatement, ServiceExtends, TypeKind, TypeKindMap, declared_types,
    scan_declarations, scan_includes,
};
pub use lexer::{SourceLines, strip_comments};
pub use type_expr::{TypeExpr, TypeResolver, scan_type_expr, split_top_level};
