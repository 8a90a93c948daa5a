//! Canonical Markdown output.
//!
//! [`to_markdown`] turns an event stream back into Markdown text that
//! parses to the same events. The output is normalized, not a copy of the
//! source:
//!
//! - ATX headings, setext only when the heading spans several lines
//! - backtick fences (tildes when the info string has a backtick), `___`
//!   rules, `>` quotes and pipe tables with an alignment row
//! - list markers alternate between `-`/`*` and `.`/`)` for adjacent lists
//! - inline links keep their form; reference definitions are appended
//! - Markdown punctuation in text is backslash-escaped
//!
//! An indented code block directly after a list gets a wider marker on the
//! last item so its first line falls short of the item's content column.

use std::collections::HashSet;
use std::mem;

use crate::events::{Alignment, CodeBlockKind, Event, LinkType, Tag, TagEnd};
use crate::lexer::CODE_INDENT;
use crate::refs::normalize_label;

/// Write `events` as Markdown.
///
/// ```rust
/// use cairn_core::{to_markdown, Parser, Profile};
///
/// let doc = Parser::new(Profile::Gfm).parse("Title\n=====\n\n* one\n* two\n");
/// assert_eq!(to_markdown(doc), "# Title\n\n- one\n- two\n");
/// ```
pub fn to_markdown<'a, I>(events: I) -> String
where
    I: IntoIterator<Item = Event<'a>>,
{
    let events: Vec<Event<'a>> = events.into_iter().collect();
    let mut writer = Writer::new();
    let mut i = 0;
    while i < events.len() {
        i = writer.event(&events, i);
    }
    writer.finish()
}

/// Open block containers, outermost first.
enum Container {
    Quote {
        started: bool,
    },
    List {
        ordered: bool,
        next: u64,
        marker: u8,
        tight: bool,
        /// Content column the last item needs so a following indented
        /// code block is not read as part of it.
        last_width: Option<usize>,
    },
    Item {
        marker: String,
        pending: bool,
        tight: bool,
    },
    Footnote {
        marker: String,
        pending: bool,
    },
}

/// What counts as the start of a line for escaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Lead {
    #[default]
    None,
    /// Block markers and leading whitespace need escaping.
    Line,
    /// Right after an emphasis opener: only leading whitespace does.
    Delim,
}

struct LastList {
    depth: usize,
    ordered: bool,
    marker: u8,
}

struct PendingLink {
    link_type: LinkType,
    dest: String,
    title: String,
    id: String,
}

#[derive(Default)]
struct Writer {
    out: String,
    containers: Vec<Container>,
    at_line_start: bool,
    blank_before: bool,
    inline_open: bool,
    /// Inline content in a tight item, with no paragraph events around it.
    implicit: bool,
    lead: Lead,
    pending_ws: String,
    after_shortcut: bool,
    in_cell: bool,
    setext: Option<u8>,
    delims: Vec<&'static str>,
    links: Vec<PendingLink>,
    last_list: Option<LastList>,
    definitions: Vec<(String, String, String)>,
    defined: HashSet<String>,
}

impl Writer {
    fn new() -> Self {
        Self {
            at_line_start: true,
            ..Self::default()
        }
    }

    fn event(&mut self, events: &[Event<'_>], i: usize) -> usize {
        match &events[i] {
            Event::Start(tag) => return self.start(tag, events, i),
            Event::End(end) => self.end(*end),
            Event::Text(text) => {
                self.ensure_inline();
                self.text(text);
            }
            Event::Code(code) => {
                self.ensure_inline();
                self.code(code);
            }
            Event::InlineHtml(html) => {
                self.ensure_inline();
                self.put_raw(html);
            }
            Event::Html(html) => self.emit(html),
            Event::FootnoteReference(label) => {
                self.ensure_inline();
                self.escape_bang();
                self.put_raw(&format!("[^{}]", label));
            }
            Event::SoftBreak => {
                self.ensure_inline();
                self.line_break(false);
            }
            Event::HardBreak => {
                self.ensure_inline();
                self.line_break(true);
            }
            Event::Rule => {
                self.begin_block();
                self.emit("___");
                self.end_line();
                self.blank_before = true;
            }
            Event::TaskListMarker(checked) => {
                self.ensure_inline();
                self.put(if *checked { "[x] " } else { "[ ] " });
            }
        }
        i + 1
    }

    fn start(&mut self, tag: &Tag<'_>, events: &[Event<'_>], i: usize) -> usize {
        match tag {
            Tag::Paragraph => {
                self.begin_block();
                self.inline_open = true;
                self.lead = Lead::Line;
            }
            Tag::Heading { level } => {
                self.begin_block();
                let spans_lines = events[i + 1..]
                    .iter()
                    .take_while(|e| !matches!(e, Event::End(TagEnd::Heading(_))))
                    .any(|e| matches!(e, Event::SoftBreak | Event::HardBreak));
                if spans_lines && *level <= 2 {
                    self.setext = Some(*level);
                } else {
                    let hashes = "#".repeat(usize::from(*level));
                    self.emit(&hashes);
                    if !matches!(events.get(i + 1), Some(Event::End(_))) {
                        self.emit(" ");
                    }
                }
                self.inline_open = true;
                self.lead = Lead::Line;
            }
            Tag::BlockQuote => {
                self.begin_block();
                self.containers.push(Container::Quote { started: false });
            }
            Tag::CodeBlock(kind) => return self.code_block(kind, events, i),
            Tag::HtmlBlock => self.begin_block(),
            Tag::List { start, tight } => {
                let previous = self.last_list.take();
                self.begin_block();
                let ordered = start.is_some();
                let depth = self.containers.len();
                let default = if ordered { b'.' } else { b'-' };
                let marker = match previous {
                    Some(prev) if prev.depth == depth && prev.ordered == ordered => {
                        alternate_marker(prev.marker)
                    }
                    _ => default,
                };
                self.containers.push(Container::List {
                    ordered,
                    next: start.unwrap_or(1),
                    marker,
                    tight: *tight,
                    last_width: code_after_list(events, i),
                });
            }
            Tag::Item => {
                self.begin_block();
                let (mut marker, tight, last_width) = match self.containers.last_mut() {
                    Some(Container::List {
                        ordered: true,
                        next,
                        marker,
                        tight,
                        last_width,
                    }) => {
                        let text = format!("{}{} ", next, *marker as char);
                        if *next < 999_999_999 {
                            *next += 1;
                        }
                        (text, *tight, *last_width)
                    }
                    Some(Container::List {
                        marker,
                        tight,
                        last_width,
                        ..
                    }) => (format!("{} ", *marker as char), *tight, *last_width),
                    _ => ("- ".to_string(), false, None),
                };
                if let Some(width) = last_width {
                    let end = skip_container(events, i);
                    let last = matches!(events.get(end), Some(Event::End(TagEnd::List(_))));
                    let opens_paragraph_like = !matches!(
                        events.get(i + 1),
                        Some(Event::End(_) | Event::Start(Tag::CodeBlock(CodeBlockKind::Indented)))
                    );
                    if last && opens_paragraph_like {
                        marker = widen_marker(&marker, width);
                    }
                }
                self.containers.push(Container::Item {
                    marker,
                    pending: true,
                    tight,
                });
            }
            Tag::FootnoteDefinition(label) => {
                self.begin_block();
                self.containers.push(Container::Footnote {
                    marker: format!("[^{}]: ", label),
                    pending: true,
                });
            }
            Tag::Table(alignments) => return self.table(alignments, events, i),
            Tag::TableHead | Tag::TableRow | Tag::TableCell => {}
            Tag::Emphasis | Tag::Strong | Tag::Strikethrough => {
                self.ensure_inline();
                self.open_delim(tag);
            }
            Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            } => {
                self.ensure_inline();
                return self.link(false, *link_type, dest_url, title, id, events, i);
            }
            Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            } => {
                self.ensure_inline();
                return self.link(true, *link_type, dest_url, title, id, events, i);
            }
        }
        i + 1
    }

    fn end(&mut self, end: TagEnd) {
        match end {
            TagEnd::Paragraph => self.finish_inline(),
            TagEnd::Heading(_) => {
                self.break_ws();
                self.end_line();
                if let Some(level) = self.setext.take() {
                    self.emit(if level == 1 { "===" } else { "---" });
                    self.end_line();
                }
                self.inline_open = false;
                self.blank_before = true;
            }
            TagEnd::BlockQuote => {
                self.close_implicit();
                if let Some(Container::Quote { started: false }) = self.containers.last() {
                    self.newline();
                }
                self.containers.pop();
                self.blank_before = true;
            }
            TagEnd::List(_) => {
                self.close_implicit();
                if let Some(Container::List {
                    ordered, marker, ..
                }) = self.containers.pop()
                {
                    self.last_list = Some(LastList {
                        depth: self.containers.len(),
                        ordered,
                        marker,
                    });
                }
                self.blank_before = true;
            }
            TagEnd::Item | TagEnd::FootnoteDefinition => {
                self.close_implicit();
                if let Some(Container::Item { pending: true, .. } | Container::Footnote { pending: true, .. }) =
                    self.containers.last()
                {
                    self.newline();
                }
                self.containers.pop();
                self.blank_before = true;
            }
            TagEnd::HtmlBlock | TagEnd::CodeBlock => {
                self.end_line();
                self.blank_before = true;
            }
            TagEnd::Table | TagEnd::TableHead | TagEnd::TableRow | TagEnd::TableCell => {}
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.break_ws();
                if let Some(delim) = self.delims.pop() {
                    self.put(delim);
                }
            }
            TagEnd::Link | TagEnd::Image => self.close_link(),
        }
    }

    fn finish(mut self) -> String {
        self.close_implicit();
        self.end_line();
        if !self.definitions.is_empty() {
            if !self.out.is_empty() {
                self.out.push('\n');
            }
            for (label, dest, title) in mem::take(&mut self.definitions) {
                self.out.push('[');
                self.out.push_str(&label);
                self.out.push_str("]: ");
                push_destination(&mut self.out, &dest);
                push_title(&mut self.out, &title);
                self.out.push('\n');
            }
        }
        self.out
    }

    // ===== Lines and containers =====

    fn write_prefix(&mut self, blank: bool) {
        let start = self.out.len();
        for container in &mut self.containers {
            match container {
                Container::Quote { started } => {
                    *started = true;
                    self.out.push_str("> ");
                }
                Container::List { .. } => {}
                Container::Item {
                    marker, pending, ..
                } => {
                    if mem::take(pending) {
                        self.out.push_str(marker);
                    } else {
                        self.out.extend(std::iter::repeat(' ').take(marker.len()));
                    }
                }
                Container::Footnote { marker, pending } => {
                    if mem::take(pending) {
                        self.out.push_str(marker);
                    } else {
                        self.out.push_str("    ");
                    }
                }
            }
        }
        if blank {
            let kept = self.out[start..].trim_end_matches(' ').len();
            self.out.truncate(start + kept);
        }
    }

    /// Write text that may span lines, prefixing each line.
    fn emit(&mut self, text: &str) {
        for (n, line) in text.split('\n').enumerate() {
            if n > 0 {
                self.newline();
            }
            if !line.is_empty() {
                if self.at_line_start {
                    self.write_prefix(false);
                    self.at_line_start = false;
                }
                self.out.push_str(line);
            }
        }
    }

    fn newline(&mut self) {
        if self.at_line_start {
            self.write_prefix(true);
        }
        self.out.push('\n');
        self.at_line_start = true;
    }

    fn end_line(&mut self) {
        if !self.at_line_start {
            self.newline();
        }
    }

    fn tight(&self) -> bool {
        matches!(
            self.containers.last(),
            Some(Container::Item { tight: true, .. } | Container::List { tight: true, .. })
        )
    }

    fn begin_block(&mut self) {
        self.close_implicit();
        self.last_list = None;
        self.end_line();
        if mem::take(&mut self.blank_before) && !self.tight() {
            self.newline();
        }
    }

    // ===== Inline content =====

    fn ensure_inline(&mut self) {
        if !self.inline_open {
            self.begin_block();
            self.inline_open = true;
            self.implicit = true;
            self.lead = Lead::Line;
        }
    }

    fn close_implicit(&mut self) {
        if mem::take(&mut self.implicit) {
            self.finish_inline();
        }
    }

    fn finish_inline(&mut self) {
        self.break_ws();
        self.end_line();
        self.inline_open = false;
        self.blank_before = true;
    }

    fn flush_ws(&mut self) {
        if !self.pending_ws.is_empty() {
            let ws = mem::take(&mut self.pending_ws);
            self.emit(&ws);
        }
    }

    /// Trailing whitespace before a line end is written as entities so the
    /// parser does not strip it.
    fn break_ws(&mut self) {
        if self.pending_ws.is_empty() {
            return;
        }
        let ws = mem::take(&mut self.pending_ws);
        let mut entities = String::with_capacity(ws.len() * 5);
        for c in ws.chars() {
            entities.push_str(whitespace_entity(c));
        }
        self.emit(&entities);
    }

    fn put(&mut self, text: &str) {
        self.flush_ws();
        self.emit(text);
        self.lead = Lead::None;
        self.after_shortcut = false;
    }

    /// Like `put`, but pipes inside table cells are escaped.
    fn put_raw(&mut self, text: &str) {
        if self.in_cell && text.contains('|') {
            self.put(&text.replace('|', "\\|"));
        } else {
            self.put(text);
        }
    }

    fn text(&mut self, text: &str) {
        let mut escaped = String::with_capacity(text.len() + 8);
        let mut rest = text;
        if self.lead != Lead::None {
            let ws_end = rest
                .find(|c: char| c != ' ' && c != '\t')
                .unwrap_or(rest.len());
            for c in rest[..ws_end].chars() {
                escaped.push_str(whitespace_entity(c));
            }
            rest = &rest[ws_end..];
            if rest.is_empty() {
                if !escaped.is_empty() {
                    self.put(&escaped);
                }
                return;
            }
            if self.lead == Lead::Line && ws_end == 0 {
                rest = escape_block_start(rest, &mut escaped);
            }
        } else if self.after_shortcut && rest.starts_with(['(', ':']) {
            escaped.push('\\');
        }

        for c in rest.chars() {
            match c {
                '\n' => escaped.push_str("&#10;"),
                '\r' => escaped.push_str("&#13;"),
                '\\' | '*' | '_' | '[' | ']' | '<' | '>' | '`' | '~' | '|' | '#' | '&' => {
                    escaped.push('\\');
                    escaped.push(c);
                }
                _ => escaped.push(c),
            }
        }

        let kept = escaped.trim_end_matches([' ', '\t']).len();
        let trailing = escaped.split_off(kept);
        if !escaped.is_empty() {
            self.put(&escaped);
        }
        self.pending_ws.push_str(&trailing);
    }

    /// Escape a literal `!` written just before link brackets so the two do
    /// not read back as an image.
    fn escape_bang(&mut self) {
        if self.pending_ws.is_empty() && !self.at_line_start && self.out.ends_with('!') {
            let at = self.out.len() - 1;
            self.out.insert(at, '\\');
        }
    }

    fn code(&mut self, code: &str) {
        let fence = "`".repeat(longest_run(code, '`') + 1);
        let pad = code.starts_with('`')
            || code.ends_with('`')
            || (code.starts_with(' ') && code.ends_with(' ') && !code.trim_start_matches(' ').is_empty());
        let space = if pad { " " } else { "" };
        self.put_raw(&format!("{fence}{space}{code}{space}{fence}"));
    }

    fn line_break(&mut self, hard: bool) {
        self.break_ws();
        if hard {
            self.emit("\\");
        }
        self.newline();
        self.lead = Lead::Line;
    }

    fn open_delim(&mut self, tag: &Tag<'_>) {
        self.flush_ws();
        let after_star = self.out.ends_with('*');
        // A star run right after an opener merges with it and still reads
        // back as emphasis around strong.
        let after_opener = after_star && self.lead == Lead::Delim;
        let delim = match tag {
            Tag::Emphasis if after_star => "_",
            Tag::Emphasis => "*",
            Tag::Strong if after_opener => "**",
            Tag::Strong if after_star => "__",
            Tag::Strong => "**",
            _ => "~~",
        };
        self.put(delim);
        self.delims.push(delim);
        self.lead = Lead::Delim;
    }

    #[allow(clippy::too_many_arguments)]
    fn link(
        &mut self,
        image: bool,
        link_type: LinkType,
        dest: &str,
        title: &str,
        id: &str,
        events: &[Event<'_>],
        i: usize,
    ) -> usize {
        match link_type {
            LinkType::Autolink | LinkType::Email => {
                self.put_raw(&format!("<{}>", dest));
                skip_container(events, i)
            }
            // The link text of these forms is the label itself.
            LinkType::Shortcut | LinkType::Collapsed => {
                if !image {
                    self.escape_bang();
                }
                let tail = if link_type == LinkType::Collapsed { "[]" } else { "" };
                let bang = if image { "!" } else { "" };
                self.put_raw(&format!("{bang}[{id}]{tail}"));
                self.define(id, dest, title);
                self.after_shortcut = link_type == LinkType::Shortcut;
                skip_container(events, i)
            }
            LinkType::Inline | LinkType::Reference => {
                if !image {
                    self.escape_bang();
                }
                self.put(if image { "![" } else { "[" });
                self.links.push(PendingLink {
                    link_type,
                    dest: dest.to_string(),
                    title: title.to_string(),
                    id: id.to_string(),
                });
                i + 1
            }
        }
    }

    fn close_link(&mut self) {
        let Some(link) = self.links.pop() else {
            return;
        };
        self.flush_ws();
        let mut tail = String::from("]");
        if link.link_type == LinkType::Reference {
            tail.push('[');
            tail.push_str(&link.id);
            tail.push(']');
            self.define(&link.id, &link.dest, &link.title);
        } else {
            tail.push('(');
            push_destination(&mut tail, &link.dest);
            push_title(&mut tail, &link.title);
            tail.push(')');
        }
        self.put_raw(&tail);
    }

    fn define(&mut self, label: &str, dest: &str, title: &str) {
        if label.is_empty() || !self.defined.insert(normalize_label(label)) {
            return;
        }
        self.definitions
            .push((label.to_string(), dest.to_string(), title.to_string()));
    }

    // ===== Leaf blocks =====

    fn code_block(&mut self, kind: &CodeBlockKind<'_>, events: &[Event<'_>], i: usize) -> usize {
        self.begin_block();
        let mut content = String::new();
        let mut j = i + 1;
        while let Some(event) = events.get(j) {
            j += 1;
            match event {
                Event::Text(text) => content.push_str(text),
                Event::End(TagEnd::CodeBlock) => break,
                _ => {}
            }
        }

        match kind {
            CodeBlockKind::Fenced(info) => {
                let fence_char = if info.contains('`') { '~' } else { '`' };
                let fence: String = std::iter::repeat(fence_char)
                    .take((longest_run(&content, fence_char) + 1).max(3))
                    .collect();
                let mut opening = fence.clone();
                for c in info.chars() {
                    if matches!(c, '\\' | '&') {
                        opening.push('\\');
                    }
                    opening.push(c);
                }
                self.emit(&opening);
                self.newline();
                self.emit(&content);
                self.end_line();
                self.emit(&fence);
                self.end_line();
            }
            CodeBlockKind::Indented => {
                // Text after a footnote label never starts a code block.
                if let Some(Container::Footnote { pending: true, .. }) = self.containers.last() {
                    self.newline();
                }
                for line in content.lines() {
                    if !line.is_empty() {
                        self.emit("    ");
                        self.emit(line);
                    }
                    self.newline();
                }
            }
        }
        self.blank_before = true;
        j
    }

    fn table(&mut self, alignments: &[Alignment], events: &[Event<'_>], i: usize) -> usize {
        self.begin_block();
        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut cell_start = None;
        let mut j = i + 1;
        while let Some(event) = events.get(j) {
            j += 1;
            match event {
                Event::End(TagEnd::Table) => break,
                Event::Start(Tag::TableHead | Tag::TableRow) => rows.push(Vec::new()),
                Event::Start(Tag::TableCell) => cell_start = Some(j),
                Event::End(TagEnd::TableCell) => {
                    if let Some(start) = cell_start.take() {
                        let cell = self.render_cell(&events[start..j - 1]);
                        if let Some(row) = rows.last_mut() {
                            row.push(cell);
                        }
                    }
                }
                _ => {}
            }
        }

        for (n, row) in rows.iter().enumerate() {
            self.emit(&pipe_row(row.iter().map(String::as_str)));
            self.end_line();
            if n == 0 {
                let delimiter = pipe_row(alignments.iter().map(|a| match a {
                    Alignment::None => "---",
                    Alignment::Left => ":--",
                    Alignment::Right => "--:",
                    Alignment::Center => ":-:",
                }));
                self.emit(&delimiter);
                self.end_line();
            }
        }
        self.blank_before = true;
        j
    }

    fn render_cell(&mut self, events: &[Event<'_>]) -> String {
        let saved = mem::take(&mut self.out);
        let saved_line_start = mem::replace(&mut self.at_line_start, false);
        self.in_cell = true;
        self.inline_open = true;
        self.lead = Lead::Delim;
        let mut k = 0;
        while k < events.len() {
            k = self.event(events, k);
        }
        self.break_ws();
        self.in_cell = false;
        self.inline_open = false;
        self.at_line_start = saved_line_start;
        mem::replace(&mut self.out, saved)
    }
}

fn alternate_marker(marker: u8) -> u8 {
    match marker {
        b'-' => b'*',
        b'*' => b'-',
        b'.' => b')',
        _ => b'.',
    }
}

/// Content column the last item of the list at `i` must reach when an
/// indented code block follows the list.
fn code_after_list(events: &[Event<'_>], i: usize) -> Option<usize> {
    let after = skip_container(events, i);
    if !matches!(
        events.get(after),
        Some(Event::Start(Tag::CodeBlock(CodeBlockKind::Indented)))
    ) {
        return None;
    }
    let first_line = events[after + 1..]
        .iter()
        .take_while(|e| !matches!(e, Event::End(_)))
        .filter_map(|e| match e {
            Event::Text(text) => Some(text.as_ref()),
            _ => None,
        })
        .flat_map(str::lines)
        .find(|line| !line.trim().is_empty())?;
    let mut column = CODE_INDENT;
    for c in first_line.chars() {
        match c {
            ' ' => column += 1,
            '\t' => column += 4 - column % 4,
            _ => break,
        }
    }
    Some(column + 1)
}

/// Pad an item marker toward `width` columns: up to four spaces after the
/// marker, then up to three before it.
fn widen_marker(marker: &str, width: usize) -> String {
    let bare = marker.trim_end_matches(' ');
    let after = width.saturating_sub(bare.len()).clamp(1, 4);
    let before = width.saturating_sub(bare.len() + after).min(3);
    format!("{}{}{}", " ".repeat(before), bare, " ".repeat(after))
}

fn whitespace_entity(c: char) -> &'static str {
    if c == '\t' {
        "&#9;"
    } else {
        "&#32;"
    }
}

/// Escape what would read as a block marker at the start of a line.
fn escape_block_start<'t>(text: &'t str, escaped: &mut String) -> &'t str {
    let bytes = text.as_bytes();
    match bytes.first() {
        Some(&b @ (b'-' | b'+' | b'=')) => {
            escaped.push('\\');
            escaped.push(b as char);
            &text[1..]
        }
        Some(b'0'..=b'9') => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            match bytes.get(digits) {
                Some(&delim @ (b'.' | b')')) if digits <= 9 => {
                    escaped.push_str(&text[..digits]);
                    escaped.push('\\');
                    escaped.push(delim as char);
                    &text[digits + 1..]
                }
                _ => text,
            }
        }
        _ => text,
    }
}

fn longest_run(text: &str, ch: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == ch {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn push_destination(out: &mut String, dest: &str) {
    let angle = dest.is_empty() || dest.chars().any(|c| c == ' ' || c.is_ascii_control());
    if angle {
        out.push('<');
    }
    for c in dest.chars() {
        let special = if angle {
            matches!(c, '<' | '>' | '\\' | '&')
        } else {
            matches!(c, '(' | ')' | '<' | '\\' | '&')
        };
        if special {
            out.push('\\');
        }
        out.push(c);
    }
    if angle {
        out.push('>');
    }
}

fn push_title(out: &mut String, title: &str) {
    if title.is_empty() {
        return;
    }
    out.push_str(" \"");
    for c in title.chars() {
        if matches!(c, '"' | '\\' | '&') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}

fn pipe_row<'s>(cells: impl Iterator<Item = &'s str>) -> String {
    let mut line = String::from("|");
    for cell in cells {
        line.push(' ');
        line.push_str(cell);
        line.push_str(" |");
    }
    line
}

/// Index just past the `End` matching the `Start` at `i`.
fn skip_container(events: &[Event<'_>], i: usize) -> usize {
    let mut depth = 0usize;
    for (j, event) in events.iter().enumerate().skip(i) {
        match event {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return j + 1;
                }
            }
            _ => {}
        }
    }
    events.len()
}
