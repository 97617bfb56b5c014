//! Streaming bracket and block pass.
//!
//! Walks every character of the comment-free text once, outside string
//! literals, keeping two stacks:
//! - open brackets (`{`, `(`, `[`, `<`) for balance checking,
//! - block frames for the bodies of declarations.
//!
//! Each member-owning frame accumulates the text of the member currently
//! being read. A member ends at a `,` or `;` at the frame's own depth, at
//! a line end at that depth, or at the frame's closing `}`; it is then
//! handed to the member checks. In a service body, a line end followed by
//! a line starting with `throws` keeps the method open.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use super::Analyzer;
use super::diagnostics::IssueCode;
use crate::syntax::type_expr::keyword_at;
use crate::syntax::{Declaration, SourceLines, TypeKind};

/// What a `{ ... }` body contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BlockKind {
    Struct,
    Union,
    Exception,
    Enum,
    Service,
    /// Literal braces, `senum` bodies and anything unrecognized
    Other,
}

impl BlockKind {
    fn from_declaration(kind: TypeKind) -> Self {
        match kind {
            TypeKind::Struct => Self::Struct,
            TypeKind::Union => Self::Union,
            TypeKind::Exception => Self::Exception,
            TypeKind::Enum => Self::Enum,
            TypeKind::Service => Self::Service,
            TypeKind::Senum | TypeKind::Typedef => Self::Other,
        }
    }

    fn owns_members(self) -> bool {
        self != Self::Other
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenBracket {
    ch: char,
    line: usize,
    byte: usize,
    opens_block: bool,
}

#[derive(Debug, Clone, Copy)]
struct PendingBlock {
    kind: BlockKind,
    line: usize,
    start: usize,
    header_end: usize,
}

#[derive(Debug, Clone, Copy)]
struct Piece {
    offset: usize,
    line: usize,
    byte: usize,
}

/// Text of one member, possibly spanning lines, with a map back to source.
#[derive(Debug, Clone, Default)]
pub(super) struct Segment {
    text: String,
    pieces: Vec<Piece>,
}

impl Segment {
    fn push(&mut self, line: usize, byte: usize, ch: char) {
        match self.pieces.last() {
            Some(piece) if piece.line == line && piece.byte + (self.text.len() - piece.offset) == byte => {}
            Some(_) => {
                self.text.push(' ');
                self.pieces.push(Piece {
                    offset: self.text.len(),
                    line,
                    byte,
                });
            }
            None => self.pieces.push(Piece {
                offset: 0,
                line,
                byte,
            }),
        }
        self.text.push(ch);
    }

    pub(super) fn text(&self) -> &str {
        &self.text
    }

    /// Map an offset into [`Segment::text`] back to `(line, byte)`.
    pub(super) fn locate(&self, offset: usize) -> (usize, usize) {
        let index = self
            .pieces
            .partition_point(|p| p.offset <= offset)
            .saturating_sub(1);
        match self.pieces.get(index) {
            Some(piece) => (piece.line, piece.byte + offset.saturating_sub(piece.offset)),
            None => (0, 0),
        }
    }

    fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[derive(Debug)]
struct BlockFrame {
    kind: BlockKind,
    /// Bracket-stack depth just inside this frame's `{`
    level: usize,
    ids: FxHashSet<i64>,
    segment: Segment,
}

#[derive(Debug, Default)]
struct Walk {
    stack: Vec<OpenBracket>,
    frames: Vec<BlockFrame>,
    pending: Option<PendingBlock>,
    /// Headers later on the current line, last one first
    upcoming: Vec<PendingBlock>,
}

impl Walk {
    fn owner_index(&self) -> Option<usize> {
        self.frames.iter().rposition(|f| f.kind.owns_members())
    }

    /// True when the walk sits directly inside a member-owning frame.
    fn at_member_level(&self) -> bool {
        self.owner_index()
            .is_some_and(|i| self.frames[i].level == self.stack.len())
    }

    fn append(&mut self, line: usize, byte: usize, ch: char) {
        if let Some(i) = self.owner_index() {
            self.frames[i].segment.push(line, byte, ch);
        }
    }
}

fn closer_for(opener: char) -> char {
    match opener {
        '{' => '}',
        '(' => ')',
        '[' => ']',
        _ => '>',
    }
}

fn opener_for(closer: char) -> char {
    match closer {
        '}' => '{',
        ')' => '(',
        _ => '[',
    }
}

/// True when a service method on `line` carries its `throws` clause on the
/// next non-blank line.
fn throws_continues(walk: &Walk, source: &SourceLines<'_>, line: usize) -> bool {
    let in_service = walk
        .owner_index()
        .is_some_and(|i| walk.frames[i].kind == BlockKind::Service);
    if !in_service {
        return false;
    }
    (line + 1..source.len())
        .map(|next| source.code(next).trim_start())
        .find(|code| !code.is_empty())
        .is_some_and(|code| keyword_at(code, 0, "throws", true).is_some())
}

impl Analyzer<'_> {
    pub(super) fn check_structure(&mut self, declarations: &[Declaration]) {
        let mut headers: FxHashMap<usize, Vec<PendingBlock>> = FxHashMap::default();
        for d in declarations.iter().filter(|d| d.kind != TypeKind::Typedef) {
            headers.entry(d.line).or_default().push(PendingBlock {
                kind: BlockKind::from_declaration(d.kind),
                line: d.line,
                start: d.start,
                header_end: d.header_end,
            });
        }

        let source = self.source;
        let mut walk = Walk::default();

        for line in 0..source.len() {
            let code = source.code(line);

            if let Some(on_line) = headers.get(&line) {
                walk.upcoming = on_line.iter().rev().copied().collect();
            } else if walk.pending.is_some_and(|p| p.line < line) {
                let trimmed = code.trim_start();
                if !trimmed.is_empty() && !trimmed.starts_with('{') {
                    walk.pending = None;
                }
            }

            let mut quote: Option<char> = None;
            let mut escaped = false;

            for (byte, ch) in code.char_indices() {
                if walk.upcoming.last().is_some_and(|h| h.start <= byte) {
                    walk.pending = walk.upcoming.pop();
                }
                if let Some(q) = quote {
                    walk.append(line, byte, ch);
                    if escaped {
                        escaped = false;
                    } else if ch == '\\' {
                        escaped = true;
                    } else if ch == q {
                        quote = None;
                    }
                    continue;
                }

                match ch {
                    '"' | '\'' => {
                        quote = Some(ch);
                        walk.append(line, byte, ch);
                    }
                    '{' => self.open_brace(&mut walk, line, byte),
                    '(' | '[' | '<' => {
                        walk.append(line, byte, ch);
                        walk.stack.push(OpenBracket {
                            ch,
                            line,
                            byte,
                            opens_block: false,
                        });
                    }
                    '>' => {
                        walk.append(line, byte, ch);
                        if walk.stack.last().is_some_and(|b| b.ch == '<') {
                            walk.stack.pop();
                        }
                    }
                    '}' | ')' | ']' => self.close_bracket(&mut walk, line, byte, ch),
                    ',' | ';' if walk.at_member_level() => {
                        self.finish_member(&mut walk);
                    }
                    _ => walk.append(line, byte, ch),
                }
            }

            if walk.at_member_level() && !throws_continues(&walk, source, line) {
                self.finish_member(&mut walk);
            }
        }

        // Bodies left open at end of file still get their last member checked
        while let Some(mut frame) = walk.frames.pop() {
            if frame.kind.owns_members() {
                self.check_segment(frame.kind, &frame.segment, &mut frame.ids);
            }
        }

        for bracket in walk.stack.iter().filter(|b| b.ch != '<') {
            let expected = closer_for(bracket.ch);
            self.report(
                IssueCode::SyntaxUnclosed,
                format!("Unclosed '{}': expected a matching '{expected}'", bracket.ch),
                (bracket.line, bracket.byte),
                (bracket.line, bracket.byte + 1),
            );
        }
    }

    fn open_brace(&mut self, walk: &mut Walk, line: usize, byte: usize) {
        let kind = match walk.pending {
            Some(pending) if pending.line < line || byte >= pending.header_end => {
                walk.pending = None;
                pending.kind
            }
            _ => BlockKind::Other,
        };

        if !kind.owns_members() {
            walk.append(line, byte, '{');
        }

        walk.stack.push(OpenBracket {
            ch: '{',
            line,
            byte,
            opens_block: true,
        });
        trace!("[STRUCTURE] open {kind:?} block at {line}:{byte}");
        walk.frames.push(BlockFrame {
            kind,
            level: walk.stack.len(),
            ids: FxHashSet::default(),
            segment: Segment::default(),
        });
    }

    fn close_bracket(&mut self, walk: &mut Walk, line: usize, byte: usize, ch: char) {
        let opener = opener_for(ch);

        while walk.stack.last().is_some_and(|b| b.ch == '<') {
            walk.stack.pop();
        }

        let Some(top) = walk.stack.last().copied() else {
            self.report_unmatched(line, byte, ch);
            walk.append(line, byte, ch);
            return;
        };

        let target = if top.ch == opener {
            walk.stack.len() - 1
        } else if let Some(index) = walk.stack.iter().rposition(|b| b.ch == opener) {
            self.report(
                IssueCode::SyntaxMismatched,
                format!(
                    "Mismatched '{ch}': expected '{}' to close '{}' opened at line {}",
                    closer_for(top.ch),
                    top.ch,
                    top.line + 1
                ),
                (line, byte),
                (line, byte + 1),
            );
            index
        } else {
            self.report_unmatched(line, byte, ch);
            walk.append(line, byte, ch);
            return;
        };

        let mut closed_member_frame = false;
        while walk.stack.len() > target {
            let Some(bracket) = walk.stack.pop() else {
                break;
            };
            if !bracket.opens_block {
                continue;
            }
            if let Some(mut frame) = walk.frames.pop() {
                if frame.kind.owns_members() {
                    self.check_segment(frame.kind, &frame.segment, &mut frame.ids);
                    closed_member_frame = walk.stack.len() == target;
                }
            }
        }

        if !closed_member_frame {
            walk.append(line, byte, ch);
        }
        if ch == '}' {
            walk.pending = None;
        }
    }

    fn report_unmatched(&mut self, line: usize, byte: usize, ch: char) {
        self.report(
            IssueCode::SyntaxUnmatchedCloser,
            format!("Unmatched '{ch}': no open '{}' to close", opener_for(ch)),
            (line, byte),
            (line, byte + 1),
        );
    }

    fn finish_member(&mut self, walk: &mut Walk) {
        let Some(index) = walk.owner_index() else {
            return;
        };
        let frame = &mut walk.frames[index];
        let segment = std::mem::take(&mut frame.segment);
        self.check_segment(frame.kind, &segment, &mut frame.ids);
    }

    fn check_segment(&mut self, kind: BlockKind, segment: &Segment, ids: &mut FxHashSet<i64>) {
        if segment.is_blank() {
            return;
        }
        match kind {
            BlockKind::Struct | BlockKind::Union | BlockKind::Exception => {
                self.check_field(segment, ids)
            }
            BlockKind::Enum => self.check_enum_member(segment),
            BlockKind::Service => self.check_method(segment),
            BlockKind::Other => {}
        }
    }
}
