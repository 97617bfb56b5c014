//! Comment stripping for line-oriented analysis.
//!
//! Each line is tokenized with Logos into comments, quoted strings and plain
//! text. Comment bytes are replaced by spaces so byte offsets in the stripped
//! line still address the original line. Block-comment state carries across
//! lines; string literals never do.

use logos::Logos;

/// Logos token enum for a single line of source
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum LineToken {
    #[regex(r"//[^\n]*", allow_greedy = true)]
    #[regex(r"#[^\n]*", allow_greedy = true)]
    LineComment,

    #[token("/*")]
    BlockCommentStart,

    #[regex(r#""([^"\\\n]|\\.)*"?"#, allow_greedy = true)]
    DoubleQuoted,

    #[regex(r"'([^'\\\n]|\\.)*'?", allow_greedy = true)]
    SingleQuoted,

    #[regex(r#"[^/#"'\n]+"#)]
    Text,

    #[token("/")]
    Slash,
}

/// Source text split into lines, with a comment-free copy of each line.
#[derive(Debug, Clone)]
pub struct SourceLines<'a> {
    original: Vec<&'a str>,
    code: Vec<String>,
}

impl<'a> SourceLines<'a> {
    /// Number of lines (a trailing newline yields a final empty line).
    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// The line as written, without its line terminator.
    pub fn original(&self, line: usize) -> &'a str {
        self.original.get(line).copied().unwrap_or("")
    }

    /// The line with comments blanked out.
    pub fn code(&self, line: usize) -> &str {
        self.code.get(line).map(String::as_str).unwrap_or("")
    }

    /// All comment-free lines.
    pub fn code_lines(&self) -> &[String] {
        &self.code
    }
}

/// Split `text` into lines and blank out comments.
///
/// `//`, `#` and `/* ... */` are comments unless they appear inside a single-
/// or double-quoted string literal (backslash escapes honoured).
pub fn strip_comments(text: &str) -> SourceLines<'_> {
    let mut in_block = false;
    let mut original = Vec::new();
    let mut code = Vec::new();

    for raw in text.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        code.push(strip_line(line, &mut in_block));
        original.push(line);
    }

    SourceLines { original, code }
}

fn strip_line(line: &str, in_block: &mut bool) -> String {
    let mut out = String::with_capacity(line.len());
    let mut pos = 0;

    while pos < line.len() {
        if *in_block {
            match line[pos..].find("*/") {
                Some(rel) => {
                    blank(&mut out, rel + 2);
                    pos += rel + 2;
                    *in_block = false;
                }
                None => {
                    blank(&mut out, line.len() - pos);
                    pos = line.len();
                }
            }
            continue;
        }

        let rest = &line[pos..];
        let mut lexer = LineToken::lexer(rest);
        let mut next_pos = line.len();

        while let Some(token) = lexer.next() {
            let span = lexer.span();
            match token {
                Ok(LineToken::LineComment) => {
                    blank(&mut out, rest.len() - span.start);
                    break;
                }
                Ok(LineToken::BlockCommentStart) => {
                    blank(&mut out, span.len());
                    *in_block = true;
                    next_pos = pos + span.end;
                    break;
                }
                _ => out.push_str(lexer.slice()),
            }
        }

        pos = next_pos;
    }

    out
}

fn blank(out: &mut String, len: usize) {
    out.extend(std::iter::repeat_n(' ', len));
}
