//! Line scanner.
//!
//! The lexer splits input into logical lines for the block parser using
//! `memchr` (SIMD on supported platforms) to find line endings. A
//! [`LineCursor`] then walks one line column by column so container
//! prefixes (`>` markers, list item indentation) can be consumed without
//! touching the underlying text.
//!
//! Tabs are never rewritten. A tab advances the column to the next multiple
//! of [`TAB_STOP`], and a tab that is only partly consumed by a prefix is
//! remembered so the leftover columns can be restored as spaces.

use crate::span::Span;
use memchr::memchr2;

/// Tab stop width in columns.
pub const TAB_STOP: usize = 4;

/// Indentation (in columns) at which a line becomes indented code.
pub const CODE_INDENT: usize = 4;

/// A single logical line from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// The line text without its line ending.
    pub text: &'a str,
    /// Byte span of `text` in the original input.
    pub span: Span,
    /// One-based line number.
    pub number: u32,
}

impl<'a> Line<'a> {
    /// Check if this line contains only spaces and tabs.
    #[inline(always)]
    pub fn is_blank(&self) -> bool {
        self.text.bytes().all(|b| b == b' ' || b == b'\t')
    }
}

/// Splits input into [`Line`]s.
///
/// `\n`, `\r\n` and a lone `\r` all end a line. A trailing line ending does
/// not produce an extra empty line.
pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    offset: usize,
    line_number: u32,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    #[inline]
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            offset: 0,
            line_number: 0,
        }
    }

    /// Current byte offset.
    #[inline(always)]
    pub fn offset(&self) -> u32 {
        self.offset as u32
    }

    /// Whether all input has been consumed.
    #[inline(always)]
    pub fn is_eof(&self) -> bool {
        self.offset >= self.bytes.len()
    }

    /// Consume and return the next line.
    #[inline]
    pub fn next_line(&mut self) -> Option<Line<'a>> {
        if self.offset >= self.bytes.len() {
            return None;
        }

        let start = self.offset;
        let (text_end, next) = match memchr2(b'\n', b'\r', &self.bytes[start..]) {
            Some(pos) => {
                let end = start + pos;
                if self.bytes[end] == b'\r' && self.bytes.get(end + 1) == Some(&b'\n') {
                    (end, end + 2)
                } else {
                    (end, end + 1)
                }
            }
            None => (self.bytes.len(), self.bytes.len()),
        };

        self.offset = next;
        self.line_number += 1;

        Some(Line {
            // Line endings are ASCII, so both ends sit on char boundaries.
            text: &self.input[start..text_end],
            span: Span::from_range(start, text_end),
            number: self.line_number,
        })
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Line<'a>> {
        self.next_line()
    }
}

/// Coarse classification of a line at the cursor's current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    /// Only whitespace remains.
    Blank,
    /// Four or more columns of indentation beyond the current container.
    IndentedCode,
    /// An ATX heading opener (`#` to `######`) of `marker_len` bytes.
    AtxHeading { level: u8, marker_len: usize },
    /// A run of `=` (level 1) or `-` (level 2) and nothing else.
    SetextUnderline(u8),
    /// Anything else.
    Text,
}

/// A piece of a line handed to a leaf block.
///
/// `pad` counts the columns of a partially consumed tab that must be
/// restored as spaces in front of `text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSegment<'a> {
    pub pad: usize,
    pub text: &'a str,
    pub span: Span,
}

/// Saved cursor position, used to back out of a speculative match.
#[derive(Debug, Clone, Copy)]
pub struct CursorState {
    offset: usize,
    column: usize,
    partially_consumed_tab: bool,
}

/// Column-aware cursor over one line.
#[derive(Debug, Clone)]
pub struct LineCursor<'a> {
    line: Line<'a>,
    bytes: &'a [u8],
    offset: usize,
    column: usize,
    partially_consumed_tab: bool,
    next_nonspace: usize,
    next_nonspace_column: usize,
    indent: usize,
    blank: bool,
}

impl<'a> LineCursor<'a> {
    pub fn new(line: Line<'a>) -> Self {
        let mut cursor = Self {
            line,
            bytes: line.text.as_bytes(),
            offset: 0,
            column: 0,
            partially_consumed_tab: false,
            next_nonspace: 0,
            next_nonspace_column: 0,
            indent: 0,
            blank: false,
        };
        cursor.find_next_nonspace();
        cursor
    }

    #[inline]
    pub fn line(&self) -> &Line<'a> {
        &self.line
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn column(&self) -> usize {
        self.column
    }

    /// Columns of whitespace between the cursor and the next non-space byte.
    #[inline]
    pub fn indent(&self) -> usize {
        self.indent
    }

    #[inline]
    pub fn is_indented(&self) -> bool {
        self.indent >= CODE_INDENT
    }

    /// Whether nothing but whitespace follows the cursor.
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.blank
    }

    #[inline]
    pub fn next_nonspace(&self) -> usize {
        self.next_nonspace
    }

    /// Byte at the cursor.
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.bytes.get(self.offset).copied()
    }

    /// First non-space byte at or after the cursor.
    #[inline]
    pub fn peek_nonspace(&self) -> Option<u8> {
        self.bytes.get(self.next_nonspace).copied()
    }

    /// Text from the cursor to the end of the line.
    #[inline]
    pub fn rest(&self) -> &'a str {
        &self.line.text[self.offset..]
    }

    /// Text from the first non-space byte to the end of the line.
    #[inline]
    pub fn rest_from_nonspace(&self) -> &'a str {
        &self.line.text[self.next_nonspace..]
    }

    /// Absolute byte offset in the input of a position within this line.
    #[inline]
    pub fn source_offset(&self, pos: usize) -> u32 {
        self.line.span.start + pos as u32
    }

    pub fn save(&self) -> CursorState {
        CursorState {
            offset: self.offset,
            column: self.column,
            partially_consumed_tab: self.partially_consumed_tab,
        }
    }

    pub fn restore(&mut self, state: CursorState) {
        self.offset = state.offset;
        self.column = state.column;
        self.partially_consumed_tab = state.partially_consumed_tab;
        self.find_next_nonspace();
    }

    /// Recompute `next_nonspace`, `indent` and `blank` from the cursor.
    pub fn find_next_nonspace(&mut self) {
        let mut i = self.offset;
        let mut cols = self.column;
        while let Some(&b) = self.bytes.get(i) {
            match b {
                b' ' => {
                    i += 1;
                    cols += 1;
                }
                b'\t' => {
                    i += 1;
                    cols += TAB_STOP - (cols % TAB_STOP);
                }
                _ => break,
            }
        }
        self.blank = i >= self.bytes.len();
        self.next_nonspace = i;
        self.next_nonspace_column = cols;
        self.indent = cols - self.column;
    }

    /// Advance by `count` bytes, or by `count` columns when `columns` is set.
    ///
    /// Counting columns may stop in the middle of a tab; the remainder is
    /// tracked and surfaces as `pad` in [`LineCursor::take_rest`].
    pub fn advance_offset(&mut self, mut count: usize, columns: bool) {
        while count > 0 {
            let Some(&b) = self.bytes.get(self.offset) else {
                break;
            };
            if b == b'\t' {
                let chars_to_tab = TAB_STOP - (self.column % TAB_STOP);
                if columns {
                    self.partially_consumed_tab = chars_to_tab > count;
                    let advance = chars_to_tab.min(count);
                    self.column += advance;
                    if !self.partially_consumed_tab {
                        self.offset += 1;
                    }
                    count -= advance;
                } else {
                    self.partially_consumed_tab = false;
                    self.column += chars_to_tab;
                    self.offset += 1;
                    count -= 1;
                }
            } else {
                self.partially_consumed_tab = false;
                self.offset += utf8_len(b);
                self.column += 1;
                count -= 1;
            }
        }
        self.find_next_nonspace();
    }

    /// Move the cursor to the next non-space byte.
    pub fn advance_next_nonspace(&mut self) {
        self.offset = self.next_nonspace;
        self.column = self.next_nonspace_column;
        self.partially_consumed_tab = false;
        self.find_next_nonspace();
    }

    /// Move the cursor to the end of the line.
    pub fn advance_to_end(&mut self) {
        let remaining = self.bytes.len() - self.offset;
        self.advance_offset(remaining, false);
    }

    /// The rest of the line as a segment for a leaf block, then move the
    /// cursor to the end of the line.
    pub fn take_rest(&mut self) -> LineSegment<'a> {
        let mut pad = 0;
        if self.partially_consumed_tab {
            self.offset += 1;
            pad = TAB_STOP - (self.column % TAB_STOP);
            self.partially_consumed_tab = false;
        }
        let start = self.offset;
        let segment = LineSegment {
            pad,
            text: &self.line.text[start..],
            span: Span::new(self.source_offset(start), self.line.span.end),
        };
        self.offset = self.bytes.len();
        self.find_next_nonspace();
        segment
    }

    /// Classify what follows the cursor.
    pub fn classify(&self) -> LineClass {
        if self.blank {
            LineClass::Blank
        } else if self.is_indented() {
            LineClass::IndentedCode
        } else {
            let rest = self.rest_from_nonspace();
            if let Some((level, marker_len)) = atx_heading_level(rest) {
                LineClass::AtxHeading { level, marker_len }
            } else if let Some(level) = setext_underline_level(rest) {
                LineClass::SetextUnderline(level)
            } else {
                LineClass::Text
            }
        }
    }
}

#[inline]
fn utf8_len(first: u8) -> usize {
    match first {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        _ => 4,
    }
}

#[inline]
pub(crate) fn is_space_or_tab(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Heading level and marker length if `text` opens an ATX heading.
pub(crate) fn atx_heading_level(text: &str) -> Option<(u8, usize)> {
    let bytes = text.as_bytes();
    let level = bytes.iter().take_while(|&&b| b == b'#').count();
    if level == 0 || level > 6 {
        return None;
    }
    match bytes.get(level) {
        None => Some((level as u8, level)),
        Some(&b) if is_space_or_tab(b) => Some((level as u8, level)),
        _ => None,
    }
}

/// Heading level if `text` is a setext underline (`===` or `---`).
pub(crate) fn setext_underline_level(text: &str) -> Option<u8> {
    let trimmed = text.trim_end_matches([' ', '\t']);
    let first = trimmed.bytes().next()?;
    if first != b'=' && first != b'-' {
        return None;
    }
    if !trimmed.bytes().all(|b| b == first) {
        return None;
    }
    Some(if first == b'=' { 1 } else { 2 })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(input: &str) -> Vec<&str> {
        Lexer::new(input).map(|l| l.text).collect()
    }

    #[test]
    fn splits_all_line_endings() {
        assert_eq!(lines("a\nb\r\nc\rd"), vec!["a", "b", "c", "d"]);
        assert_eq!(lines("a\n\nb\n"), vec!["a", "", "b"]);
        assert!(lines("").is_empty());
    }

    #[test]
    fn line_spans_and_numbers() {
        let mut lexer = Lexer::new("one\r\ntwo");
        let first = lexer.next_line().unwrap();
        let second = lexer.next_line().unwrap();
        assert_eq!(first.span, Span::new(0, 3));
        assert_eq!(second.span, Span::new(5, 8));
        assert_eq!(second.number, 2);
        assert!(lexer.is_eof());
    }

    #[test]
    fn tabs_expand_to_next_stop() {
        let line = Lexer::new(" \tfoo").next_line().unwrap();
        let cursor = LineCursor::new(line);
        assert_eq!(cursor.indent(), 4);
        assert_eq!(cursor.classify(), LineClass::IndentedCode);
    }

    #[test]
    fn partially_consumed_tab_pads_remainder() {
        let line = Lexer::new(">\t\tfoo").next_line().unwrap();
        let mut cursor = LineCursor::new(line);
        cursor.advance_next_nonspace();
        cursor.advance_offset(1, false);
        // One column of the first tab belongs to the `>` prefix.
        cursor.advance_offset(1, true);
        assert_eq!(cursor.indent(), 6);
        cursor.advance_offset(4, true);
        let segment = cursor.take_rest();
        assert_eq!(segment.pad, 2);
        assert_eq!(segment.text, "foo");
    }

    #[test]
    fn save_and_restore() {
        let line = Lexer::new("  - item").next_line().unwrap();
        let mut cursor = LineCursor::new(line);
        let state = cursor.save();
        cursor.advance_next_nonspace();
        cursor.advance_offset(2, true);
        assert_eq!(cursor.rest(), "item");
        cursor.restore(state);
        assert_eq!(cursor.rest(), "  - item");
        assert_eq!(cursor.indent(), 2);
    }

    #[test]
    fn classifies_headings() {
        let classify = |s: &'static str| LineCursor::new(Lexer::new(s).next_line().unwrap()).classify();
        assert_eq!(
            classify("## Title"),
            LineClass::AtxHeading {
                level: 2,
                marker_len: 2
            }
        );
        assert_eq!(classify("#hashtag"), LineClass::Text);
        assert_eq!(classify("  ===  "), LineClass::SetextUnderline(1));
        assert_eq!(classify("--- -"), LineClass::Text);
        assert_eq!(classify("   "), LineClass::Blank);
    }
}
