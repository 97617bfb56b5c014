//! Foundation types for the Thrift analyzer.
//!
//! This module provides fundamental types used throughout the engine:
//! - [`Position`], [`Span`] - Line/column positions (0-indexed)
//! - [`utf16_column`] - byte offset to editor column conversion
//! - Language constants (file extensions, primitive and integral types)
//!
//! This module has NO dependencies on other analyzer modules.

pub mod constants;
mod position;

pub use position::{Position, Span, utf16_column};
