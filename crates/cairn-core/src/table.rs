//! Pipe table rows.
//!
//! The block parser decides *when* a table starts and ends; this module
//! only knows how a single line splits into cells and how a delimiter row
//! fixes column alignment.

use std::borrow::Cow;

use memchr::memchr;

use crate::ast::{Content, InlineSpan, RaggedRows, TableCell, TableRow};
use crate::events::Alignment;
use crate::lexer::LineSegment;
use crate::span::Span;

/// Empty cells one table may gain from padding short rows. A row that
/// would go past this ends the table.
pub(crate) const MAX_PADDED_CELLS: usize = 1 << 16;

/// Byte ranges of the cells of a row, relative to the row text.
fn cell_ranges(text: &str) -> Vec<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut start = 0;
    let mut end = bytes.len();
    while start < end && matches!(bytes[start], b' ' | b'\t') {
        start += 1;
    }
    while end > start && matches!(bytes[end - 1], b' ' | b'\t') {
        end -= 1;
    }
    if start < end && bytes[start] == b'|' {
        start += 1;
    }
    if end > start && bytes[end - 1] == b'|' && !is_escaped(bytes, end - 1) {
        end -= 1;
    }

    let mut ranges = Vec::new();
    let mut cell_start = start;
    let mut i = start;
    while i < end {
        match bytes[i] {
            b'\\' => i += 2,
            b'|' => {
                ranges.push(trim_range(bytes, cell_start, i));
                cell_start = i + 1;
                i += 1;
            }
            _ => i += 1,
        }
    }
    ranges.push(trim_range(bytes, cell_start, end.max(cell_start)));
    ranges
}

fn is_escaped(bytes: &[u8], pos: usize) -> bool {
    let backslashes = bytes[..pos].iter().rev().take_while(|&&b| b == b'\\').count();
    backslashes % 2 == 1
}

fn trim_range(bytes: &[u8], mut start: usize, mut end: usize) -> (usize, usize) {
    end = end.min(bytes.len());
    while start < end && matches!(bytes[start], b' ' | b'\t') {
        start += 1;
    }
    while end > start && matches!(bytes[end - 1], b' ' | b'\t') {
        end -= 1;
    }
    (start, end)
}

/// Whether a line contains a `|` at all.
#[inline]
pub(crate) fn has_pipe(text: &str) -> bool {
    memchr(b'|', text.as_bytes()).is_some()
}

/// Number of cells a row would split into.
pub(crate) fn cell_count(text: &str) -> usize {
    cell_ranges(text).len()
}

/// Parse a delimiter row (`| :-- | --: |`) into column alignments.
pub(crate) fn parse_delimiter_row(text: &str) -> Option<Vec<Alignment>> {
    let bytes = text.as_bytes();
    let ranges = cell_ranges(text);
    let mut alignments = Vec::with_capacity(ranges.len());
    for (start, end) in ranges {
        let cell = &bytes[start..end];
        let left = cell.first() == Some(&b':');
        let right = cell.len() > 1 && cell.last() == Some(&b':');
        let dashes = &cell[left as usize..cell.len() - right as usize];
        if dashes.is_empty() || !dashes.iter().all(|&b| b == b'-') {
            return None;
        }
        alignments.push(match (left, right) {
            (true, true) => Alignment::Center,
            (true, false) => Alignment::Left,
            (false, true) => Alignment::Right,
            (false, false) => Alignment::None,
        });
    }
    Some(alignments)
}

/// Split a line into cells. `\|` inside a cell stands for a literal pipe.
pub(crate) fn split_row<'a>(segment: &LineSegment<'a>) -> Vec<TableCell<'a>> {
    let text = segment.text;
    cell_ranges(text)
        .into_iter()
        .map(|(start, end)| {
            let raw = &text[start..end];
            let content = if raw.contains("\\|") {
                Cow::Owned(raw.replace("\\|", "|"))
            } else {
                Cow::Borrowed(raw)
            };
            let span = Span::new(
                segment.span.start + start as u32,
                segment.span.start + end as u32,
            );
            TableCell {
                content: Content::Raw(InlineSpan {
                    text: content,
                    span,
                }),
                span,
            }
        })
        .collect()
}

fn empty_cell(at: u32) -> TableCell<'static> {
    let span = Span::new(at, at);
    TableCell {
        content: Content::Raw(InlineSpan {
            text: Cow::Borrowed(""),
            span,
        }),
        span,
    }
}

/// Build a body row, applying the ragged-row policy.
///
/// Returns `None` when the policy ends the table at this row.
pub(crate) fn body_row<'a>(
    segment: &LineSegment<'a>,
    columns: usize,
    policy: RaggedRows,
) -> Option<TableRow<'a>> {
    let mut cells = split_row(segment);
    if cells.len() != columns {
        match policy {
            RaggedRows::Normalize => {
                cells.truncate(columns);
                while cells.len() < columns {
                    cells.push(empty_cell(segment.span.end));
                }
            }
            RaggedRows::Preserve => {}
            RaggedRows::EndTable => return None,
        }
    }
    Some(TableRow {
        cells,
        header: false,
        span: segment.span,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(text: &str) -> LineSegment<'_> {
        LineSegment {
            pad: 0,
            text,
            span: Span::from_range(0, text.len()),
        }
    }

    fn cell_texts(row: &[TableCell]) -> Vec<String> {
        row.iter()
            .map(|c| match &c.content {
                Content::Raw(raw) => raw.text.to_string(),
                Content::Resolved(_) => unreachable!(),
            })
            .collect()
    }

    #[test]
    fn splits_with_and_without_outer_pipes() {
        assert_eq!(cell_texts(&split_row(&segment("| a | b |"))), vec!["a", "b"]);
        assert_eq!(cell_texts(&split_row(&segment("a | b"))), vec!["a", "b"]);
        assert_eq!(cell_texts(&split_row(&segment("| a |  |"))), vec!["a", ""]);
    }

    #[test]
    fn escaped_pipe_stays_in_cell() {
        let row = split_row(&segment("| a \\| b | c |"));
        assert_eq!(cell_texts(&row), vec!["a | b", "c"]);
    }

    #[test]
    fn delimiter_alignment() {
        assert_eq!(
            parse_delimiter_row("| --- | :-- | --: | :-: |"),
            Some(vec![
                Alignment::None,
                Alignment::Left,
                Alignment::Right,
                Alignment::Center
            ])
        );
        assert_eq!(parse_delimiter_row("|-|"), Some(vec![Alignment::None]));
        assert_eq!(parse_delimiter_row("| -- | x |"), None);
        assert_eq!(parse_delimiter_row("| : |"), None);
    }

    #[test]
    fn ragged_policies() {
        let short = segment("| x |");
        let row = body_row(&short, 2, RaggedRows::Normalize).unwrap();
        assert_eq!(cell_texts(&row.cells), vec!["x", ""]);

        let long = segment("| x | y | z |");
        let row = body_row(&long, 2, RaggedRows::Normalize).unwrap();
        assert_eq!(cell_texts(&row.cells), vec!["x", "y"]);

        let row = body_row(&long, 2, RaggedRows::Preserve).unwrap();
        assert_eq!(row.cells.len(), 3);

        assert!(body_row(&short, 2, RaggedRows::EndTable).is_none());
        assert_eq!(cell_count("| a | b |"), 2);
    }
}
