//! Block structure pass.
//!
//! Lines are fed one at a time through an explicit stack of open blocks.
//! For every line the parser
//!
//! 1. walks the stack from the bottom, letting each open block consume its
//!    continuation prefix (`>`, item indentation, footnote indentation) and
//!    stops at the first block that does not continue;
//! 2. tries to open new blocks at the current position, in CommonMark
//!    precedence order;
//! 3. hands the rest of the line to the innermost block, or continues a
//!    paragraph lazily.
//!
//! Closing a block pops it off the stack and appends the finished node to
//! its parent, so the tree is built without recursion. Footnote and link
//! reference definitions never become tree nodes; they go straight into
//! the [`ReferenceTable`].

use std::borrow::Cow;

use tracing::trace;

use crate::ast::{
    Block, BlockQuote, CodeBlock, Content, CowStr, Extension, Heading, HtmlBlock, InlineSpan,
    List, ListItem, ListKind, Paragraph, RaggedRows, Table, TableRow,
};
use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::events::{Alignment, CodeBlockKind};
use crate::lexer::{Lexer, Line, LineClass, LineCursor, LineSegment, CODE_INDENT};
use crate::parser::Options;
use crate::refs::{normalize_label, FootnoteDefinition, LinkDefinition, ReferenceTable};
use crate::scan::{self, is_space_or_tab};
use crate::span::Span;
use crate::table;

/// Marker data shared by a list and its items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ListData {
    ordered: bool,
    /// Bullet character or ordered delimiter.
    marker: u8,
    start: u64,
    /// Columns of indentation before the marker.
    marker_offset: usize,
    /// Columns from the marker to the item content.
    padding: usize,
}

impl ListData {
    fn same_list(&self, other: &ListData) -> bool {
        self.ordered == other.ordered && self.marker == other.marker
    }
}

enum FrameKind<'a> {
    Document,
    BlockQuote,
    List {
        data: ListData,
        items: Vec<ListItem<'a>>,
        loose: bool,
    },
    Item {
        data: ListData,
    },
    Footnote {
        label: CowStr<'a>,
    },
    Paragraph {
        lines: Vec<LineSegment<'a>>,
    },
    Heading {
        level: u8,
        lines: Vec<LineSegment<'a>>,
    },
    ThematicBreak,
    FencedCode {
        fence_char: u8,
        fence_len: usize,
        fence_offset: usize,
        info: CowStr<'a>,
        lines: Vec<LineSegment<'a>>,
    },
    IndentedCode {
        lines: Vec<LineSegment<'a>>,
        last_content_line: u32,
    },
    Html {
        kind: u8,
        lines: Vec<LineSegment<'a>>,
    },
    Table {
        alignments: Vec<Alignment>,
        rows: Vec<TableRow<'a>>,
        /// Empty cells added to short rows so far.
        padded: usize,
    },
}

impl<'a> FrameKind<'a> {
    fn name(&self) -> &'static str {
        match self {
            FrameKind::Document => "document",
            FrameKind::BlockQuote => "block_quote",
            FrameKind::List { .. } => "list",
            FrameKind::Item { .. } => "item",
            FrameKind::Footnote { .. } => "footnote_definition",
            FrameKind::Paragraph { .. } => "paragraph",
            FrameKind::Heading { .. } => "heading",
            FrameKind::ThematicBreak => "thematic_break",
            FrameKind::FencedCode { .. } => "fenced_code",
            FrameKind::IndentedCode { .. } => "indented_code",
            FrameKind::Html { .. } => "html_block",
            FrameKind::Table { .. } => "table",
        }
    }

    /// Containers count toward the nesting limit.
    fn is_nesting(&self) -> bool {
        matches!(
            self,
            FrameKind::BlockQuote | FrameKind::Item { .. } | FrameKind::Footnote { .. }
        )
    }

    fn accepts_lines(&self) -> bool {
        matches!(
            self,
            FrameKind::Paragraph { .. }
                | FrameKind::FencedCode { .. }
                | FrameKind::IndentedCode { .. }
                | FrameKind::Html { .. }
                | FrameKind::Table { .. }
        )
    }

    /// Leaves whose lines are still open to new block starts.
    fn takes_text_lines(&self) -> bool {
        matches!(self, FrameKind::Paragraph { .. } | FrameKind::Table { .. })
    }

    fn can_contain(&self, child: &FrameKind<'a>) -> bool {
        let child_is_item = matches!(child, FrameKind::Item { .. });
        match self {
            FrameKind::Document
            | FrameKind::BlockQuote
            | FrameKind::Item { .. }
            | FrameKind::Footnote { .. } => !child_is_item,
            FrameKind::List { .. } => child_is_item,
            _ => false,
        }
    }
}

struct Frame<'a> {
    kind: FrameKind<'a>,
    children: Vec<Block<'a>>,
    start: u32,
    start_line: u32,
    /// End offset of the line the frame opened on.
    first_line_end: u32,
    last_child_end_line: Option<u32>,
    /// A blank line separates two of the children.
    blank_gap: bool,
}

impl<'a> Frame<'a> {
    fn new(kind: FrameKind<'a>, start: u32, start_line: u32, first_line_end: u32) -> Self {
        Self {
            kind,
            children: Vec::new(),
            start,
            start_line,
            first_line_end,
            last_child_end_line: None,
            blank_gap: false,
        }
    }
}

enum Continuation {
    Matched,
    Unmatched,
    /// The line was fully consumed (closing code fence).
    Finished,
}

enum Start {
    None,
    Container,
    Leaf,
}

/// Result of the block pass.
pub(crate) struct BlockOutput<'a> {
    pub blocks: Vec<Block<'a>>,
    pub refs: ReferenceTable<'a>,
    pub diagnostics: Diagnostics,
}

pub(crate) struct BlockParser<'a, 'o> {
    input: &'a str,
    options: &'o Options,
    stack: Vec<Frame<'a>>,
    refs: ReferenceTable<'a>,
    diagnostics: Diagnostics,
    /// Open nesting containers.
    depth: usize,
    line_number: u32,
    line_end: u32,
    prev_line_end: u32,
    /// Index of the deepest block that continued on this line.
    matched: usize,
    all_closed: bool,
    /// A block start swallowed the rest of the line.
    line_consumed: bool,
    limit_noted_line: u32,
}

impl<'a, 'o> BlockParser<'a, 'o> {
    pub(crate) fn new(input: &'a str, options: &'o Options) -> Self {
        Self {
            input,
            options,
            stack: vec![Frame::new(FrameKind::Document, 0, 0, 0)],
            refs: ReferenceTable::new(),
            diagnostics: Diagnostics::new(),
            depth: 0,
            line_number: 0,
            line_end: 0,
            prev_line_end: 0,
            matched: 0,
            all_closed: true,
            line_consumed: false,
            limit_noted_line: 0,
        }
    }

    pub(crate) fn run(mut self) -> BlockOutput<'a> {
        for line in Lexer::new(self.input) {
            self.process_line(line);
        }
        while self.stack.len() > 1 {
            self.close_top(true);
        }
        let blocks = self
            .stack
            .pop()
            .map(|frame| frame.children)
            .unwrap_or_default();
        BlockOutput {
            blocks,
            refs: self.refs,
            diagnostics: self.diagnostics,
        }
    }

    fn process_line(&mut self, line: Line<'a>) {
        self.line_number = line.number;
        self.prev_line_end = self.line_end;
        self.line_end = line.span.end;
        self.line_consumed = false;
        let mut cursor = LineCursor::new(line);

        let mut matched = 0;
        for index in 1..self.stack.len() {
            match self.continue_frame(index, &mut cursor) {
                Continuation::Matched => matched = index,
                Continuation::Unmatched => break,
                Continuation::Finished => return,
            }
        }
        self.matched = matched;
        self.all_closed = matched + 1 == self.stack.len();

        let mut container = matched;
        let mut matched_leaf = {
            let kind = &self.stack[container].kind;
            kind.accepts_lines() && !kind.takes_text_lines()
        };
        while !matched_leaf {
            if !cursor.is_indented() && !cursor.peek_nonspace().is_some_and(maybe_special) {
                cursor.advance_next_nonspace();
                break;
            }
            match self.try_block_starts(&mut cursor, container) {
                Start::Container => container = self.stack.len() - 1,
                Start::Leaf => matched_leaf = true,
                Start::None => {
                    cursor.advance_next_nonspace();
                    break;
                }
            }
        }

        if self.line_consumed {
            return;
        }

        if !self.all_closed && !cursor.is_blank() && self.tip_is_paragraph() {
            trace!(line = self.line_number, "lazy continuation");
            self.add_line(&mut cursor);
            return;
        }

        self.close_unmatched();
        let accepts_lines = self
            .stack
            .last()
            .is_some_and(|top| top.kind.accepts_lines());
        if accepts_lines {
            self.add_line(&mut cursor);
        } else if !cursor.is_blank() {
            let start = cursor.source_offset(cursor.next_nonspace());
            self.add_child(FrameKind::Paragraph { lines: Vec::new() }, start);
            cursor.advance_next_nonspace();
            self.add_line(&mut cursor);
        }
    }

    fn continue_frame(&mut self, index: usize, cursor: &mut LineCursor<'a>) -> Continuation {
        let has_child = index + 1 < self.stack.len() || !self.stack[index].children.is_empty();
        match &self.stack[index].kind {
            FrameKind::Document | FrameKind::List { .. } => Continuation::Matched,
            FrameKind::BlockQuote => {
                if !cursor.is_indented() && cursor.peek_nonspace() == Some(b'>') {
                    cursor.advance_next_nonspace();
                    cursor.advance_offset(1, false);
                    if cursor.peek().is_some_and(is_space_or_tab) {
                        cursor.advance_offset(1, true);
                    }
                    Continuation::Matched
                } else {
                    Continuation::Unmatched
                }
            }
            FrameKind::Item { data } => {
                let width = data.marker_offset + data.padding;
                if cursor.is_blank() {
                    if !has_child {
                        return Continuation::Unmatched;
                    }
                    cursor.advance_next_nonspace();
                    Continuation::Matched
                } else if cursor.indent() >= width {
                    cursor.advance_offset(width, true);
                    Continuation::Matched
                } else {
                    Continuation::Unmatched
                }
            }
            FrameKind::Footnote { .. } => {
                if cursor.is_blank() {
                    cursor.advance_next_nonspace();
                    Continuation::Matched
                } else if cursor.indent() >= CODE_INDENT {
                    cursor.advance_offset(CODE_INDENT, true);
                    Continuation::Matched
                } else {
                    Continuation::Unmatched
                }
            }
            FrameKind::Paragraph { .. } => {
                if cursor.is_blank() {
                    Continuation::Unmatched
                } else {
                    Continuation::Matched
                }
            }
            FrameKind::Heading { .. } | FrameKind::ThematicBreak => Continuation::Unmatched,
            FrameKind::FencedCode {
                fence_char,
                fence_len,
                fence_offset,
                ..
            } => {
                let (fence_char, fence_len, fence_offset) = (*fence_char, *fence_len, *fence_offset);
                if cursor.indent() <= 3
                    && cursor.peek_nonspace() == Some(fence_char)
                    && scan::is_closing_fence(cursor.rest_from_nonspace(), fence_char, fence_len)
                {
                    self.close_top(true);
                    return Continuation::Finished;
                }
                let mut remaining = fence_offset;
                while remaining > 0 && cursor.peek().is_some_and(is_space_or_tab) {
                    cursor.advance_offset(1, true);
                    remaining -= 1;
                }
                Continuation::Matched
            }
            FrameKind::IndentedCode { .. } => {
                if cursor.indent() >= CODE_INDENT {
                    cursor.advance_offset(CODE_INDENT, true);
                    Continuation::Matched
                } else if cursor.is_blank() {
                    cursor.advance_next_nonspace();
                    Continuation::Matched
                } else {
                    Continuation::Unmatched
                }
            }
            FrameKind::Html { kind, .. } => {
                if cursor.is_blank() && *kind >= 6 {
                    Continuation::Unmatched
                } else {
                    Continuation::Matched
                }
            }
            FrameKind::Table {
                alignments, padded, ..
            } => {
                if cursor.is_blank() {
                    return Continuation::Unmatched;
                }
                let (columns, padded) = (alignments.len(), *padded);
                let span = Span::new(cursor.source_offset(cursor.next_nonspace()), self.line_end);
                match self.options.ragged_rows {
                    RaggedRows::EndTable => {
                        let found = table::cell_count(cursor.rest_from_nonspace());
                        if found != columns {
                            self.diagnostics
                                .push(Diagnostic::ragged_row(columns, found, span));
                            return Continuation::Unmatched;
                        }
                    }
                    RaggedRows::Normalize => {
                        let found = table::cell_count(cursor.rest_from_nonspace());
                        if padded + columns.saturating_sub(found) > table::MAX_PADDED_CELLS {
                            self.diagnostics.push(Diagnostic::table_padding_limit(
                                table::MAX_PADDED_CELLS,
                                span,
                            ));
                            return Continuation::Unmatched;
                        }
                    }
                    RaggedRows::Preserve => {}
                }
                Continuation::Matched
            }
        }
    }

    fn try_block_starts(&mut self, cursor: &mut LineCursor<'a>, container: usize) -> Start {
        let indented = cursor.is_indented();
        let container_is_paragraph =
            matches!(self.stack[container].kind, FrameKind::Paragraph { .. });
        let start = cursor.source_offset(cursor.next_nonspace());
        let rest = cursor.rest_from_nonspace();
        let first = cursor.peek_nonspace();
        let class = cursor.classify();

        if !indented {
            if first == Some(b'>') {
                if self.at_nesting_limit(start) {
                    return Start::None;
                }
                cursor.advance_next_nonspace();
                cursor.advance_offset(1, false);
                if cursor.peek().is_some_and(is_space_or_tab) {
                    cursor.advance_offset(1, true);
                }
                self.close_unmatched();
                self.add_child(FrameKind::BlockQuote, start);
                return Start::Container;
            }

            if let LineClass::AtxHeading { level, marker_len } = class {
                cursor.advance_next_nonspace();
                cursor.advance_offset(marker_len, false);
                self.close_unmatched();
                let segment = atx_content(cursor.take_rest());
                self.add_child(
                    FrameKind::Heading {
                        level,
                        lines: vec![segment],
                    },
                    start,
                );
                return Start::Leaf;
            }

            if let Some((fence_char, fence_len)) = scan::scan_code_fence(rest) {
                let fence_offset = cursor.indent();
                cursor.advance_next_nonspace();
                cursor.advance_offset(fence_len, false);
                self.close_unmatched();
                let info = cursor.take_rest().text.trim_matches([' ', '\t']);
                self.add_child(
                    FrameKind::FencedCode {
                        fence_char,
                        fence_len,
                        fence_offset,
                        info: scan::unescape(Cow::Borrowed(info)),
                        lines: Vec::new(),
                    },
                    start,
                );
                self.line_consumed = true;
                return Start::Leaf;
            }

            if first == Some(b'<') {
                if let Some(kind) = scan::html_block_start(rest) {
                    let lazy = !self.all_closed && !cursor.is_blank() && self.tip_is_paragraph();
                    if kind < 7 || (!container_is_paragraph && !lazy) {
                        self.close_unmatched();
                        let at = cursor.source_offset(cursor.offset());
                        self.add_child(
                            FrameKind::Html {
                                kind,
                                lines: Vec::new(),
                            },
                            at,
                        );
                        return Start::Leaf;
                    }
                }
            }

            if container_is_paragraph
                && self.options.has_extension(Extension::Tables)
                && self.try_table(cursor, container)
            {
                return Start::Leaf;
            }

            if container_is_paragraph {
                if let LineClass::SetextUnderline(level) = class {
                    if self.try_setext(cursor, container, level) {
                        return Start::Leaf;
                    }
                }
            }

            if scan::is_thematic_break(rest) {
                self.close_unmatched();
                self.add_child(FrameKind::ThematicBreak, start);
                cursor.advance_to_end();
                return Start::Leaf;
            }
        }

        if !indented || matches!(self.stack[container].kind, FrameKind::List { .. }) {
            let saved = cursor.save();
            if let Some(data) = parse_list_marker(cursor, container_is_paragraph) {
                if self.at_nesting_limit(start) {
                    cursor.restore(saved);
                    return Start::None;
                }
                self.close_unmatched();
                let continues_list = matches!(
                    self.stack.last().map(|top| &top.kind),
                    Some(FrameKind::List { data: existing, .. }) if existing.same_list(&data)
                );
                if !continues_list {
                    self.add_child(
                        FrameKind::List {
                            data,
                            items: Vec::new(),
                            loose: false,
                        },
                        start,
                    );
                }
                self.add_child(FrameKind::Item { data }, start);
                return Start::Container;
            }
        }

        if indented && !cursor.is_blank() && !self.tip_takes_text_lines() {
            cursor.advance_offset(CODE_INDENT, true);
            self.close_unmatched();
            let at = cursor.source_offset(cursor.offset());
            self.add_child(
                FrameKind::IndentedCode {
                    lines: Vec::new(),
                    last_content_line: self.line_number,
                },
                at,
            );
            return Start::Leaf;
        }

        if !indented && first == Some(b'[') && self.options.has_extension(Extension::Footnotes) {
            if let Some((label, consumed)) = scan_footnote_definition(rest) {
                if self.at_nesting_limit(start) {
                    return Start::None;
                }
                cursor.advance_next_nonspace();
                cursor.advance_offset(consumed, false);
                cursor.advance_next_nonspace();
                self.close_unmatched();
                self.add_child(
                    FrameKind::Footnote {
                        label: Cow::Borrowed(label),
                    },
                    start,
                );
                return Start::Container;
            }
        }

        Start::None
    }

    /// Turn the last line of the open paragraph into a table header when
    /// the current line is a matching delimiter row.
    fn try_table(&mut self, cursor: &mut LineCursor<'a>, container: usize) -> bool {
        let delimiter = cursor.rest_from_nonspace();
        let Some(alignments) = table::parse_delimiter_row(delimiter) else {
            return false;
        };
        if container + 1 != self.stack.len() {
            return false;
        }
        let header = match &self.stack[container].kind {
            FrameKind::Paragraph { lines } => match lines.last() {
                Some(line) => *line,
                None => return false,
            },
            _ => return false,
        };
        if !table::has_pipe(header.text) && !table::has_pipe(delimiter) {
            return false;
        }
        let columns = table::cell_count(header.text);
        if columns != alignments.len() {
            let span = Span::new(cursor.source_offset(cursor.next_nonspace()), self.line_end);
            self.diagnostics.push(Diagnostic::malformed_delimiter_row(
                columns,
                alignments.len(),
                span,
            ));
            return false;
        }

        let Some(mut frame) = self.stack.pop() else {
            return false;
        };
        let mut lines = match &mut frame.kind {
            FrameKind::Paragraph { lines } => std::mem::take(lines),
            _ => Vec::new(),
        };
        self.extract_link_definitions(&mut lines);
        let Some(header) = lines.pop() else {
            // The header line was part of a link reference definition.
            frame.kind = FrameKind::Paragraph { lines };
            self.stack.push(frame);
            return false;
        };

        if let Some(block) = paragraph_block(self.input, &lines) {
            let end_line = self.line_number.saturating_sub(2);
            self.append_block(block, frame.start_line, end_line);
        }

        trace!(line = self.line_number, columns, "table");
        let header_row = TableRow {
            cells: table::split_row(&header),
            header: true,
            span: header.span,
        };
        self.stack.push(Frame::new(
            FrameKind::Table {
                alignments,
                rows: vec![header_row],
                padded: 0,
            },
            header.span.start,
            self.line_number.saturating_sub(1),
            header.span.end,
        ));
        cursor.advance_to_end();
        self.line_consumed = true;
        true
    }

    fn try_setext(&mut self, cursor: &mut LineCursor<'a>, container: usize, level: u8) -> bool {
        self.close_unmatched();
        let mut lines = match self.stack.get_mut(container).map(|f| &mut f.kind) {
            Some(FrameKind::Paragraph { lines }) => std::mem::take(lines),
            _ => return false,
        };
        self.extract_link_definitions(&mut lines);
        let Some(frame) = self.stack.get_mut(container) else {
            return false;
        };
        if lines.is_empty() {
            frame.kind = FrameKind::Paragraph { lines };
            return false;
        }
        frame.kind = FrameKind::Heading { level, lines };
        cursor.advance_to_end();
        self.line_consumed = true;
        true
    }

    fn at_nesting_limit(&mut self, at: u32) -> bool {
        let limit = self.options.max_nesting_depth;
        if self.depth < limit {
            return false;
        }
        if self.limit_noted_line != self.line_number {
            self.limit_noted_line = self.line_number;
            self.diagnostics
                .push(Diagnostic::nesting_limit(limit, Span::new(at, self.line_end)));
        }
        true
    }

    fn tip_is_paragraph(&self) -> bool {
        matches!(
            self.stack.last().map(|f| &f.kind),
            Some(FrameKind::Paragraph { .. })
        )
    }

    fn tip_takes_text_lines(&self) -> bool {
        self.stack
            .last()
            .is_some_and(|f| f.kind.takes_text_lines())
    }

    fn close_unmatched(&mut self) {
        if self.all_closed {
            return;
        }
        while self.stack.len() > self.matched + 1 {
            self.close_top(false);
        }
        self.all_closed = true;
    }

    fn add_child(&mut self, kind: FrameKind<'a>, start: u32) {
        while self.stack.len() > 1 && !self.stack.last().is_some_and(|top| top.kind.can_contain(&kind)) {
            self.close_top(false);
        }
        trace!(line = self.line_number, kind = kind.name(), "open");
        if kind.is_nesting() {
            self.depth += 1;
        }
        self.stack
            .push(Frame::new(kind, start, self.line_number, self.line_end));
    }

    fn add_line(&mut self, cursor: &mut LineCursor<'a>) {
        let segment = cursor.take_rest();
        let line_number = self.line_number;
        let policy = self.options.ragged_rows;
        let Some(top) = self.stack.last_mut() else {
            return;
        };
        let mut html_done = false;
        let mut ragged = None;
        match &mut top.kind {
            FrameKind::Paragraph { lines } | FrameKind::FencedCode { lines, .. } => {
                lines.push(segment)
            }
            FrameKind::IndentedCode {
                lines,
                last_content_line,
            } => {
                if !segment.text.bytes().all(is_space_or_tab) {
                    *last_content_line = line_number;
                }
                lines.push(segment);
            }
            FrameKind::Html { kind, lines } => {
                html_done = *kind <= 5 && scan::html_block_ends(*kind, segment.text);
                lines.push(segment);
            }
            FrameKind::Table {
                alignments,
                rows,
                padded,
            } => {
                let columns = alignments.len();
                let found = table::cell_count(segment.text);
                if found != columns {
                    ragged = Some((columns, found));
                }
                if policy == RaggedRows::Normalize {
                    *padded += columns.saturating_sub(found);
                }
                if let Some(row) = table::body_row(&segment, columns, policy) {
                    rows.push(row);
                }
            }
            _ => {}
        }
        if let Some((expected, found)) = ragged {
            self.diagnostics
                .push(Diagnostic::ragged_row(expected, found, segment.span));
        }
        if html_done {
            self.close_top(true);
        }
    }

    /// Close the innermost open block. `through_current` when the current
    /// line is the block's last line.
    fn close_top(&mut self, through_current: bool) {
        if self.stack.len() <= 1 {
            return;
        }
        let Some(frame) = self.stack.pop() else {
            return;
        };
        if frame.kind.is_nesting() {
            self.depth -= 1;
        }
        let (end_line, end) = if through_current {
            (self.line_number, self.line_end)
        } else {
            (self.line_number.saturating_sub(1), self.prev_line_end)
        };
        trace!(line = end_line, kind = frame.kind.name(), "close");
        self.finish(frame, end_line, end);
    }

    fn finish(&mut self, frame: Frame<'a>, end_line: u32, end: u32) {
        let Frame {
            kind,
            children,
            start,
            start_line,
            first_line_end,
            last_child_end_line,
            blank_gap,
        } = frame;
        let span = Span::new(start, end.max(start));

        match kind {
            FrameKind::Document => {}
            FrameKind::BlockQuote => {
                let block = Block::BlockQuote(BlockQuote {
                    blocks: children,
                    span,
                });
                self.append_block(block, start_line, end_line);
            }
            FrameKind::List { data, items, loose } => {
                let end = items.last().map_or(first_line_end, |item| item.span.end);
                let list = List {
                    kind: if data.ordered {
                        ListKind::Ordered
                    } else {
                        ListKind::Unordered
                    },
                    start: data.ordered.then_some(data.start),
                    tight: !(loose || blank_gap),
                    marker: data.marker,
                    items,
                    span: Span::new(start, end.max(start)),
                };
                let end_line = last_child_end_line.unwrap_or(start_line);
                self.append_block(Block::List(list), start_line, end_line);
            }
            FrameKind::Item { .. } => {
                let mut blocks = children;
                let task = self.detect_task(&mut blocks);
                let end = blocks.last().map_or(first_line_end, |b| b.span().end);
                let item = ListItem {
                    blocks,
                    task,
                    span: Span::new(start, end.max(start)),
                };
                let end_line = last_child_end_line.unwrap_or(start_line);
                self.append_item(item, start_line, end_line, blank_gap);
            }
            FrameKind::Footnote { label } => {
                let definition = FootnoteDefinition {
                    label: label.clone(),
                    blocks: children,
                    span,
                };
                if !self.refs.define_footnote(definition) {
                    self.diagnostics
                        .push(Diagnostic::duplicate_footnote(&label, span));
                }
            }
            FrameKind::Paragraph { mut lines } => {
                self.extract_link_definitions(&mut lines);
                if let Some(block) = paragraph_block(self.input, &lines) {
                    self.append_block(block, start_line, end_line);
                }
            }
            FrameKind::Heading { level, lines } => {
                let text = trim_cow(join_lines(self.input, &lines));
                let content_span = content_span(&lines, span);
                let block = Block::Heading(Heading {
                    level,
                    content: Content::Raw(InlineSpan {
                        text,
                        span: content_span,
                    }),
                    span,
                });
                self.append_block(block, start_line, end_line);
            }
            FrameKind::ThematicBreak => {
                self.append_block(Block::ThematicBreak(span), start_line, end_line);
            }
            FrameKind::FencedCode { info, lines, .. } => {
                let block = Block::CodeBlock(CodeBlock {
                    kind: CodeBlockKind::Fenced(info),
                    content: join_code_lines(self.input, &lines),
                    span,
                });
                self.append_block(block, start_line, end_line);
            }
            FrameKind::IndentedCode {
                mut lines,
                last_content_line,
            } => {
                while lines
                    .last()
                    .is_some_and(|l| l.text.bytes().all(is_space_or_tab))
                {
                    lines.pop();
                }
                let end = lines.last().map_or(start, |l| l.span.end);
                let block = Block::CodeBlock(CodeBlock {
                    kind: CodeBlockKind::Indented,
                    content: join_code_lines(self.input, &lines),
                    span: Span::new(start, end),
                });
                self.append_block(block, start_line, last_content_line);
            }
            FrameKind::Html { lines, .. } => {
                let block = Block::HtmlBlock(HtmlBlock {
                    content: join_code_lines(self.input, &lines),
                    span,
                });
                self.append_block(block, start_line, end_line);
            }
            FrameKind::Table {
                alignments, rows, ..
            } => {
                let end = rows.last().map_or(end, |row| row.span.end);
                let block = Block::Table(Table {
                    alignments,
                    rows,
                    span: Span::new(start, end.max(start)),
                });
                self.append_block(block, start_line, end_line);
            }
        }
    }

    fn append_block(&mut self, block: Block<'a>, start_line: u32, end_line: u32) {
        let Some(parent) = self.stack.last_mut() else {
            return;
        };
        if let Some(prev_end) = parent.last_child_end_line {
            if start_line > prev_end + 1 {
                parent.blank_gap = true;
            }
        }
        parent.last_child_end_line = Some(end_line);
        parent.children.push(block);
    }

    fn append_item(&mut self, item: ListItem<'a>, start_line: u32, end_line: u32, inner_gap: bool) {
        let Some(Frame {
            kind: FrameKind::List { items, loose, .. },
            last_child_end_line,
            blank_gap,
            ..
        }) = self.stack.last_mut()
        else {
            return;
        };
        if let Some(prev_end) = *last_child_end_line {
            if start_line > prev_end + 1 {
                *blank_gap = true;
            }
        }
        *last_child_end_line = Some(end_line);
        if inner_gap {
            *loose = true;
        }
        items.push(item);
    }

    /// Strip `[ ]` / `[x]` from the first paragraph of a list item.
    fn detect_task(&self, blocks: &mut [Block<'a>]) -> Option<bool> {
        if !self.options.has_extension(Extension::TaskLists) {
            return None;
        }
        let Some(Block::Paragraph(paragraph)) = blocks.first_mut() else {
            return None;
        };
        let Content::Raw(raw) = &mut paragraph.content else {
            return None;
        };
        let bytes = raw.text.as_bytes();
        if bytes.len() < 4 || bytes[0] != b'[' || bytes[2] != b']' {
            return None;
        }
        let checked = match bytes[1] {
            b' ' => false,
            b'x' | b'X' => true,
            _ => return None,
        };
        let text_start = 3 + bytes[3..]
            .iter()
            .take_while(|&&b| matches!(b, b' ' | b'\t' | b'\n'))
            .count();
        if text_start == 3 || text_start >= bytes.len() {
            return None;
        }
        raw.text = scan::slice_cow(&raw.text, text_start, bytes.len());
        raw.span.start += text_start as u32;
        Some(checked)
    }

    /// Consume link reference definitions from the start of a paragraph.
    fn extract_link_definitions(&mut self, lines: &mut Vec<LineSegment<'a>>) {
        if !lines.first().is_some_and(|l| l.text.starts_with('[')) {
            return;
        }
        let text = join_lines(self.input, lines);
        let bytes = text.as_bytes();
        let mut pos = 0;
        let mut consumed = 0;
        while bytes.get(pos) == Some(&b'[') {
            let Some((label, dest, title, next)) = parse_link_definition(&text, pos) else {
                break;
            };
            let first_line = consumed;
            consumed += bytes[pos..next].iter().filter(|&&b| b == b'\n').count();
            if next >= bytes.len() {
                consumed += 1;
            }
            let last_line = consumed.saturating_sub(1).clamp(first_line, lines.len() - 1);
            let span = Span::new(lines[first_line].span.start, lines[last_line].span.end);
            let shown = label.clone();
            let definition = LinkDefinition {
                label,
                dest,
                title,
                span,
            };
            if !self.refs.define(definition) {
                self.diagnostics.push(Diagnostic::duplicate_link(&shown, span));
            }
            pos = next;
        }
        lines.drain(..consumed.min(lines.len()));
    }
}

fn maybe_special(b: u8) -> bool {
    matches!(
        b,
        b'#' | b'`'
            | b'~'
            | b'*'
            | b'+'
            | b'_'
            | b'='
            | b'<'
            | b'>'
            | b'-'
            | b'|'
            | b':'
            | b'['
            | b'0'..=b'9'
    )
}

fn parse_list_marker(cursor: &mut LineCursor<'_>, interrupts_paragraph: bool) -> Option<ListData> {
    if cursor.is_indented() {
        return None;
    }
    let rest = cursor.rest_from_nonspace().as_bytes();
    let marker_offset = cursor.indent();
    let (ordered, marker, start, marker_len) = match *rest.first()? {
        b @ (b'*' | b'+' | b'-') => (false, b, 0, 1),
        b'0'..=b'9' => {
            let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
            if digits > 9 {
                return None;
            }
            let delimiter = *rest.get(digits)?;
            if delimiter != b'.' && delimiter != b')' {
                return None;
            }
            let start = rest[..digits]
                .iter()
                .fold(0u64, |n, &d| n * 10 + u64::from(d - b'0'));
            if interrupts_paragraph && start != 1 {
                return None;
            }
            (true, delimiter, start, digits + 1)
        }
        _ => return None,
    };
    if !matches!(rest.get(marker_len), None | Some(b' ' | b'\t')) {
        return None;
    }
    if interrupts_paragraph && rest[marker_len..].iter().all(|&b| is_space_or_tab(b)) {
        return None;
    }

    cursor.advance_next_nonspace();
    cursor.advance_offset(marker_len, true);
    let spaces_start = cursor.save();
    let start_column = cursor.column();
    loop {
        cursor.advance_offset(1, true);
        let more = cursor.column() - start_column < 5 && cursor.peek().is_some_and(is_space_or_tab);
        if !more {
            break;
        }
    }
    let blank_item = cursor.peek().is_none();
    let spaces_after = cursor.column() - start_column;
    let padding = if !(1..5).contains(&spaces_after) || blank_item {
        cursor.restore(spaces_start);
        if cursor.peek().is_some_and(is_space_or_tab) {
            cursor.advance_offset(1, true);
        }
        marker_len + 1
    } else {
        marker_len + spaces_after
    };

    Some(ListData {
        ordered,
        marker,
        start,
        marker_offset,
        padding,
    })
}

/// `[^label]:` at the start of `rest`; returns the label and the bytes
/// consumed including the colon.
fn scan_footnote_definition(rest: &str) -> Option<(&str, usize)> {
    let bytes = rest.as_bytes();
    if !rest.starts_with("[^") {
        return None;
    }
    let len = bytes[2..]
        .iter()
        .take_while(|&&b| !matches!(b, b']' | b'[' | b' ' | b'\t'))
        .count();
    let close = 2 + len;
    if len == 0 || len > 999 || bytes.get(close) != Some(&b']') || bytes.get(close + 1) != Some(&b':')
    {
        return None;
    }
    Some((&rest[2..close], close + 2))
}

/// Drop the optional closing `#` sequence of an ATX heading.
fn atx_content(segment: LineSegment<'_>) -> LineSegment<'_> {
    let text = segment.text.trim_end_matches([' ', '\t']);
    let without_hashes = text.trim_end_matches('#');
    let text = if without_hashes.len() == text.len() {
        text
    } else if without_hashes.is_empty() {
        ""
    } else if without_hashes.ends_with([' ', '\t']) {
        without_hashes
    } else {
        text
    };
    let leading = text.len() - text.trim_start_matches([' ', '\t']).len();
    let text = text[leading..].trim_end_matches([' ', '\t']);
    let start = segment.span.start + leading as u32;
    LineSegment {
        pad: 0,
        text,
        span: Span::new(start, start + text.len() as u32),
    }
}

fn line_end(bytes: &[u8], pos: usize) -> Option<usize> {
    let pos = scan::skip_spaces(bytes, pos);
    match bytes.get(pos) {
        None => Some(pos),
        Some(b'\n') => Some(pos + 1),
        _ => None,
    }
}

type ParsedDefinition<'a> = (CowStr<'a>, CowStr<'a>, Option<CowStr<'a>>, usize);

/// `[label]: destination "title"` at `pos`, ending at a line end.
fn parse_link_definition<'a>(text: &CowStr<'a>, pos: usize) -> Option<ParsedDefinition<'a>> {
    let bytes = text.as_bytes();
    let label_end = scan::scan_link_label(bytes, pos)?;
    if bytes.get(label_end) != Some(&b':') {
        return None;
    }
    let label = scan::slice_cow(text, pos + 1, label_end - 1);
    if normalize_label(&label).is_empty() {
        return None;
    }

    let dest_start = scan::skip_spnl(bytes, label_end + 1);
    let dest = scan::scan_link_destination(bytes, dest_start, false)?;
    let before_title = dest.next;

    let mut title = None;
    let mut next = None;
    let title_start = scan::skip_spnl(bytes, before_title);
    if title_start != before_title {
        if let Some((start, end, after)) = scan::scan_link_title(bytes, title_start) {
            if let Some(line_next) = line_end(bytes, after) {
                title = Some(scan::unescape(scan::slice_cow(text, start, end)));
                next = Some(line_next);
            }
        }
    }
    let next = match next {
        Some(next) => next,
        None => line_end(bytes, before_title)?,
    };

    let dest = scan::unescape(scan::slice_cow(text, dest.start, dest.end));
    Some((label, dest, title, next))
}

fn contiguous(input: &str, lines: &[LineSegment<'_>]) -> bool {
    lines.iter().all(|l| l.pad == 0)
        && lines.windows(2).all(|pair| {
            pair[0].span.end + 1 == pair[1].span.start
                && input.as_bytes().get(pair[0].span.end as usize) == Some(&b'\n')
        })
}

/// Join lines with `\n`, borrowing from the input when they are adjacent.
fn join_lines<'a>(input: &'a str, lines: &[LineSegment<'a>]) -> CowStr<'a> {
    let (Some(first), Some(last)) = (lines.first(), lines.last()) else {
        return Cow::Borrowed("");
    };
    if contiguous(input, lines) {
        return Cow::Borrowed(&input[first.span.start as usize..last.span.end as usize]);
    }
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.extend(std::iter::repeat(' ').take(line.pad));
        out.push_str(line.text);
    }
    Cow::Owned(out)
}

/// Join lines with a `\n` after each one.
fn join_code_lines<'a>(input: &'a str, lines: &[LineSegment<'a>]) -> CowStr<'a> {
    let (Some(first), Some(last)) = (lines.first(), lines.last()) else {
        return Cow::Borrowed("");
    };
    let after = last.span.end as usize;
    if contiguous(input, lines) && input.as_bytes().get(after) == Some(&b'\n') {
        return Cow::Borrowed(&input[first.span.start as usize..after + 1]);
    }
    let mut out = String::new();
    for line in lines {
        out.extend(std::iter::repeat(' ').take(line.pad));
        out.push_str(line.text);
        out.push('\n');
    }
    Cow::Owned(out)
}

fn trim_cow(text: CowStr<'_>) -> CowStr<'_> {
    match text {
        Cow::Borrowed(s) => Cow::Borrowed(s.trim_matches([' ', '\t'])),
        Cow::Owned(s) => {
            let trimmed = s.trim_matches([' ', '\t']);
            if trimmed.len() == s.len() {
                Cow::Owned(s)
            } else {
                Cow::Owned(trimmed.to_owned())
            }
        }
    }
}

fn content_span(lines: &[LineSegment<'_>], fallback: Span) -> Span {
    match (lines.first(), lines.last()) {
        (Some(first), Some(last)) => Span::new(first.span.start, last.span.end),
        _ => fallback,
    }
}

fn paragraph_block<'a>(input: &'a str, lines: &[LineSegment<'a>]) -> Option<Block<'a>> {
    if lines.is_empty() {
        return None;
    }
    let span = content_span(lines, Span::default());
    let text = match join_lines(input, lines) {
        Cow::Borrowed(s) => Cow::Borrowed(s.trim_end_matches([' ', '\t'])),
        Cow::Owned(mut s) => {
            let len = s.trim_end_matches([' ', '\t']).len();
            s.truncate(len);
            Cow::Owned(s)
        }
    };
    Some(Block::Paragraph(Paragraph {
        content: Content::Raw(InlineSpan { text, span }),
        span,
    }))
}
