//! Quote-aware text scanning
//!
//! The compiler and the expression evaluator never tokenize; they split raw
//! text on delimiters. Every helper here skips over string literals (single or
//! double quoted, with backslash escapes) and nested `()`, `[]`, `{}` groups,
//! so a delimiter inside `"a+b"` or `[1, 2]` is never a split point.

/* ===================== Scanner ===================== */

/// Walks a string and reports which byte offsets sit at the top level
/// (outside quotes and outside any bracket group).
struct TopLevel<'a> {
    chars: std::str::CharIndices<'a>,
    quote: Option<char>,
    escaped: bool,
    depth: usize,
}

impl<'a> TopLevel<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.char_indices(),
            quote: None,
            escaped: false,
            depth: 0,
        }
    }
}

impl<'a> Iterator for TopLevel<'a> {
    /// (byte offset, char, is top level)
    type Item = (usize, char, bool);

    fn next(&mut self) -> Option<Self::Item> {
        let (idx, c) = self.chars.next()?;

        if let Some(q) = self.quote {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == q {
                self.quote = None;
            }
            return Some((idx, c, false));
        }

        match c {
            '"' | '\'' => {
                self.quote = Some(c);
                Some((idx, c, false))
            }
            '(' | '[' | '{' => {
                let top = self.depth == 0;
                self.depth += 1;
                Some((idx, c, top))
            }
            ')' | ']' | '}' => {
                self.depth = self.depth.saturating_sub(1);
                Some((idx, c, self.depth == 0))
            }
            _ => Some((idx, c, self.depth == 0)),
        }
    }
}

/* ===================== Public API ===================== */

/// Byte offset of the first top-level occurrence of `pat`.
pub fn find_top_level(text: &str, pat: &str) -> Option<usize> {
    if pat.is_empty() {
        return None;
    }
    TopLevel::new(text)
        .find(|&(idx, _, top)| top && text[idx..].starts_with(pat))
        .map(|(idx, _, _)| idx)
}

/// Split on every top-level occurrence of `delim`.
///
/// Always returns at least one piece; pieces are not trimmed.
pub fn split_top_level(text: &str, delim: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, c, top) in TopLevel::new(text) {
        if top && c == delim {
            pieces.push(&text[start..idx]);
            start = idx + c.len_utf8();
        }
    }
    pieces.push(&text[start..]);
    pieces
}

/// Byte offset of the first top-level `=` that is a plain assignment, i.e. not
/// part of `==`, `!=`, `<=`, `>=` or `+=`.
pub fn find_assignment(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    TopLevel::new(text)
        .find(|&(idx, c, top)| {
            if !top || c != '=' {
                return false;
            }
            let prev = idx.checked_sub(1).map(|i| bytes[i]);
            let next = bytes.get(idx + 1).copied();
            !matches!(prev, Some(b'=' | b'!' | b'<' | b'>' | b'+')) && next != Some(b'=')
        })
        .map(|(idx, _, _)| idx)
}

/// Byte offset of the bracket that closes the one opening at `open`.
pub fn matching_close(text: &str, open: usize) -> Option<usize> {
    let inner = text.get(open..)?;
    let mut scan = TopLevel::new(inner);
    // The opening bracket itself moves the scanner to depth 1.
    scan.next()?;
    scan.find(|&(_, c, top)| top && matches!(c, ')' | ']' | '}'))
        .map(|(idx, _, _)| open + idx)
}

/// True if `text` is wrapped in a single bracket pair, e.g. `(a + b)` but not
/// `(a) + (b)`.
pub fn is_wrapped(text: &str, open: char, close: char) -> bool {
    text.starts_with(open)
        && text.ends_with(close)
        && matching_close(text, 0) == Some(text.len() - close.len_utf8())
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Width of the leading whitespace of a line. Tabs count as one column.
pub fn indentation(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ' || *c == '\t').count()
}
