//! Position tracking for diagnostics
//!
//! Stores source locations (line/column) for issues reported to the editor.

/// A span representing a range in source code (0-indexed for LSP compatibility)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

/// A position in source code (0-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Create a span from line/column coordinates
    pub fn from_coords(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start: Position::new(start_line, start_col),
            end: Position::new(end_line, end_col),
        }
    }

    /// Create a span covering `[start_col, end_col)` on a single line
    pub fn on_line(line: u32, start_col: u32, end_col: u32) -> Self {
        Self::from_coords(line, start_col, line, end_col)
    }
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Convert a byte offset within `line` into a UTF-16 column.
///
/// Offsets that fall inside a multi-byte character count up to that
/// character's start. Offsets past the end clamp to the line length.
pub fn utf16_column(line: &str, byte_offset: usize) -> u32 {
    line.char_indices()
        .take_while(|(idx, _)| *idx < byte_offset)
        .map(|(_, c)| c.len_utf16() as u32)
        .sum()
}
