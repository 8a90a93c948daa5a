//! Inline parser and resolution pass.
//!
//! Leaf text is scanned left to right into a flat token list. Runs of `*`,
//! `_` and `~` become delimiter tokens and `[` / `![` open brackets; both
//! are matched afterwards against explicit stacks using the CommonMark
//! delimiter algorithm. Matching never moves tokens around, it only records
//! on each delimiter token which tags it opens or closes, so flattening the
//! token list yields the final event sequence in one pass.
//!
//! [`resolve`] drives the parser over a whole document: the block tree,
//! then every referenced footnote body (including footnotes first
//! referenced from another footnote), then the remaining unreferenced
//! definitions.

use std::borrow::Cow;
use std::collections::HashSet;
use std::slice;

use memchr::memchr;
use tracing::debug;

use crate::ast::{Block, Content, CowStr, InlineSpan};
use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::events::{Event, LinkType, Tag, TagEnd};
use crate::refs::ReferenceTable;
use crate::scan::{self, is_ascii_punctuation};

/// Switches for a single inline parse.
#[derive(Debug, Clone, Copy)]
pub(crate) struct InlineOptions {
    pub strikethrough: bool,
    pub footnotes: bool,
    /// Count footnote references toward emission order.
    pub record_references: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Emphasis {
    Emphasis,
    Strong,
    Strikethrough,
}

impl Emphasis {
    fn start(self) -> Event<'static> {
        Event::Start(match self {
            Emphasis::Emphasis => Tag::Emphasis,
            Emphasis::Strong => Tag::Strong,
            Emphasis::Strikethrough => Tag::Strikethrough,
        })
    }

    fn end(self) -> Event<'static> {
        Event::End(match self {
            Emphasis::Emphasis => TagEnd::Emphasis,
            Emphasis::Strong => TagEnd::Strong,
            Emphasis::Strikethrough => TagEnd::Strikethrough,
        })
    }
}

enum Token<'a> {
    /// Byte range of the leaf text.
    Text(usize, usize),
    Literal(CowStr<'a>),
    Event(Event<'a>),
    Delim {
        start: usize,
        len: usize,
        close_used: usize,
        open_used: usize,
        /// Tags closed here, innermost first.
        closes: Vec<Emphasis>,
        /// Tags opened here, innermost first.
        opens: Vec<Emphasis>,
    },
}

#[derive(Debug, Clone, Copy)]
struct Delimiter {
    token: usize,
    ch: u8,
    orig_len: usize,
    remaining: usize,
    can_open: bool,
    can_close: bool,
    removed: bool,
}

#[derive(Debug, Clone, Copy)]
struct Bracket {
    token: usize,
    image: bool,
    /// Another bracket was opened inside this one.
    bracket_after: bool,
    /// Delimiter stack height when the bracket was pushed.
    delim_bottom: usize,
    /// Start of the bracket text, after `[`.
    label_start: usize,
}

struct LinkMatch<'a> {
    link_type: LinkType,
    dest: CowStr<'a>,
    title: CowStr<'a>,
    id: CowStr<'a>,
    next: usize,
}

/// Parse the inline content of one leaf block.
pub(crate) fn parse_inlines<'a>(
    raw: &InlineSpan<'a>,
    refs: &mut ReferenceTable<'a>,
    options: InlineOptions,
) -> Vec<Event<'a>> {
    if raw.text.is_empty() {
        return Vec::new();
    }
    let source = match &raw.text {
        Cow::Borrowed(s) => Some(*s),
        Cow::Owned(_) => None,
    };
    InlineParser::new(&raw.text, source, refs, options).run()
}

struct InlineParser<'t, 'r, 'a> {
    text: &'t str,
    bytes: &'t [u8],
    /// Set when `text` borrows from the input, so slices can too.
    source: Option<&'a str>,
    refs: &'r mut ReferenceTable<'a>,
    options: InlineOptions,
    tokens: Vec<Token<'a>>,
    delims: Vec<Delimiter>,
    brackets: Vec<Bracket>,
    /// Link openers below this height are inactive: a link formed after
    /// them, and links do not nest.
    link_openers_below: usize,
    pos: usize,
    text_start: usize,
    /// Backtick run lengths known to have no closer further on.
    unmatched_backticks: HashSet<usize>,
    missing_closers: scan::MissingClosers,
}

impl<'t, 'r, 'a> InlineParser<'t, 'r, 'a> {
    fn new(
        text: &'t str,
        source: Option<&'a str>,
        refs: &'r mut ReferenceTable<'a>,
        options: InlineOptions,
    ) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            source,
            refs,
            options,
            tokens: Vec::with_capacity(8),
            delims: Vec::new(),
            brackets: Vec::new(),
            link_openers_below: 0,
            pos: 0,
            text_start: 0,
            unmatched_backticks: HashSet::new(),
            missing_closers: scan::MissingClosers::default(),
        }
    }

    fn run(mut self) -> Vec<Event<'a>> {
        while self.pos < self.bytes.len() {
            self.pos = self.next_special();
            let Some(&b) = self.bytes.get(self.pos) else {
                break;
            };
            match b {
                b'\n' => self.newline(),
                b'\\' => self.backslash(),
                b'`' => self.code_span(),
                b'*' | b'_' => self.delimiter_run(b),
                b'~' if self.options.strikethrough => self.delimiter_run(b),
                b'[' => self.open_bracket(false, 1),
                b'!' if self.bytes.get(self.pos + 1) == Some(&b'[') => self.open_bracket(true, 2),
                b']' => self.close_bracket(),
                b'<' => self.angle(),
                b'&' => self.entity(),
                _ => self.pos += 1,
            }
        }
        self.flush(self.bytes.len());
        self.process_emphasis(0);
        self.flatten()
    }

    fn next_special(&self) -> usize {
        self.bytes[self.pos..]
            .iter()
            .position(|&b| {
                matches!(
                    b,
                    b'\n' | b'\\' | b'`' | b'*' | b'_' | b'~' | b'[' | b']' | b'!' | b'<' | b'&'
                )
            })
            .map_or(self.bytes.len(), |offset| self.pos + offset)
    }

    fn slice(&self, start: usize, end: usize) -> CowStr<'a> {
        match self.source {
            Some(source) => Cow::Borrowed(&source[start..end]),
            None => Cow::Owned(self.text[start..end].to_owned()),
        }
    }

    /// Push pending plain text up to `end`.
    fn flush(&mut self, end: usize) {
        if self.text_start < end {
            self.tokens.push(Token::Text(self.text_start, end));
        }
        self.text_start = end;
    }

    fn skip_to(&mut self, pos: usize) {
        self.pos = pos;
        self.text_start = pos;
    }

    fn newline(&mut self) {
        let pos = self.pos;
        let mut text_end = pos;
        while text_end > self.text_start && self.bytes[text_end - 1] == b' ' {
            text_end -= 1;
        }
        let hard = pos - text_end >= 2;
        self.flush(text_end);
        self.tokens.push(Token::Event(if hard {
            Event::HardBreak
        } else {
            Event::SoftBreak
        }));
        self.skip_to(scan::skip_spaces(self.bytes, pos + 1));
    }

    fn backslash(&mut self) {
        let pos = self.pos;
        match self.bytes.get(pos + 1) {
            Some(b'\n') => {
                self.flush(pos);
                self.tokens.push(Token::Event(Event::HardBreak));
                self.skip_to(scan::skip_spaces(self.bytes, pos + 2));
            }
            Some(&b) if is_ascii_punctuation(b) => {
                self.flush(pos);
                self.tokens.push(Token::Text(pos + 1, pos + 2));
                self.skip_to(pos + 2);
            }
            _ => self.pos += 1,
        }
    }

    fn code_span(&mut self) {
        let start = self.pos;
        let ticks = scan::run_length(self.bytes, start, b'`');
        let content_start = start + ticks;
        if self.unmatched_backticks.contains(&ticks) {
            self.pos = content_start;
            return;
        }

        let mut search = content_start;
        let close = loop {
            let Some(offset) = memchr(b'`', &self.bytes[search..]) else {
                break None;
            };
            let run_start = search + offset;
            let run = scan::run_length(self.bytes, run_start, b'`');
            if run == ticks {
                break Some(run_start);
            }
            search = run_start + run;
        };
        let Some(close) = close else {
            self.unmatched_backticks.insert(ticks);
            self.pos = content_start;
            return;
        };

        self.flush(start);
        let raw = &self.text[content_start..close];
        let mut content = if raw.contains('\n') {
            Cow::Owned(raw.replace('\n', " "))
        } else {
            self.slice(content_start, close)
        };
        let bytes = content.as_bytes();
        if bytes.len() >= 2
            && bytes[0] == b' '
            && bytes[bytes.len() - 1] == b' '
            && !bytes.iter().all(|&b| b == b' ')
        {
            content = scan::slice_cow(&content, 1, bytes.len() - 1);
        }
        self.tokens.push(Token::Event(Event::Code(content)));
        self.skip_to(close + ticks);
    }

    fn delimiter_run(&mut self, ch: u8) {
        let start = self.pos;
        let len = scan::run_length(self.bytes, start, ch);
        let end = start + len;

        let before = self.text[..start].chars().next_back().unwrap_or('\n');
        let after = self.text[end..].chars().next().unwrap_or('\n');
        let (before_space, after_space) = (before.is_whitespace(), after.is_whitespace());
        let (before_punct, after_punct) = (is_punctuation(before), is_punctuation(after));
        let left_flanking = !after_space && (!after_punct || before_space || before_punct);
        let right_flanking = !before_space && (!before_punct || after_space || after_punct);

        let (mut can_open, mut can_close) = if ch == b'_' {
            (
                left_flanking && (!right_flanking || before_punct),
                right_flanking && (!left_flanking || after_punct),
            )
        } else {
            (left_flanking, right_flanking)
        };
        if ch == b'~' && len > 2 {
            can_open = false;
            can_close = false;
        }

        self.flush(start);
        let token = self.tokens.len();
        self.tokens.push(Token::Delim {
            start,
            len,
            close_used: 0,
            open_used: 0,
            closes: Vec::new(),
            opens: Vec::new(),
        });
        if can_open || can_close {
            self.delims.push(Delimiter {
                token,
                ch,
                orig_len: len,
                remaining: len,
                can_open,
                can_close,
                removed: false,
            });
        }
        self.skip_to(end);
    }

    fn open_bracket(&mut self, image: bool, len: usize) {
        let start = self.pos;
        self.flush(start);
        let token = self.tokens.len();
        self.tokens.push(Token::Text(start, start + len));
        if let Some(previous) = self.brackets.last_mut() {
            previous.bracket_after = true;
        }
        self.link_openers_below = self.link_openers_below.min(self.brackets.len());
        self.brackets.push(Bracket {
            token,
            image,
            bracket_after: false,
            delim_bottom: self.delims.len(),
            label_start: start + len,
        });
        self.skip_to(start + len);
    }

    fn close_bracket(&mut self) {
        let pos = self.pos;
        let Some(bracket) = self.brackets.last().copied() else {
            self.pos += 1;
            return;
        };
        self.flush(pos);
        self.skip_to(pos + 1);
        let inactive = !bracket.image && self.brackets.len() <= self.link_openers_below;
        if inactive {
            self.brackets.pop();
            self.tokens.push(Token::Text(pos, pos + 1));
            return;
        }

        let text = self.text;
        let label = &text[bracket.label_start..pos];
        if !bracket.image && self.options.footnotes {
            if let Some(index) = label
                .strip_prefix('^')
                .and_then(|name| self.refs.resolve_footnote(name))
            {
                let definition_label = self
                    .refs
                    .footnote(index)
                    .map_or(Cow::Borrowed(""), |def| def.label.clone());
                if self.options.record_references {
                    self.refs.mark_referenced(index);
                }
                self.tokens.truncate(bracket.token + 1);
                self.tokens[bracket.token] =
                    Token::Event(Event::FootnoteReference(definition_label));
                self.delims.truncate(bracket.delim_bottom);
                self.brackets.pop();
                return;
            }
        }

        let Some(link) = self.match_link(pos + 1, bracket) else {
            self.brackets.pop();
            self.tokens.push(Token::Text(pos, pos + 1));
            return;
        };

        let (start, end) = if bracket.image {
            (
                Tag::Image {
                    link_type: link.link_type,
                    dest_url: link.dest,
                    title: link.title,
                    id: link.id,
                },
                TagEnd::Image,
            )
        } else {
            (
                Tag::Link {
                    link_type: link.link_type,
                    dest_url: link.dest,
                    title: link.title,
                    id: link.id,
                },
                TagEnd::Link,
            )
        };
        self.tokens[bracket.token] = Token::Event(Event::Start(start));
        self.process_emphasis(bracket.delim_bottom);
        self.tokens.push(Token::Event(Event::End(end)));
        self.brackets.pop();
        if !bracket.image {
            self.link_openers_below = self.brackets.len();
        }
        self.skip_to(link.next);
    }

    fn match_link(&self, after: usize, bracket: Bracket) -> Option<LinkMatch<'a>> {
        if self.bytes.get(after) == Some(&b'(') {
            if let Some(link) = self.inline_link(after + 1) {
                return Some(link);
            }
        }

        let ((label_start, label_end), next, link_type) =
            match scan::scan_link_label(self.bytes, after) {
                Some(end) if end - after > 2 => ((after + 1, end - 1), end, LinkType::Reference),
                Some(end) if !bracket.bracket_after => {
                    ((bracket.label_start, after - 1), end, LinkType::Collapsed)
                }
                None if !bracket.bracket_after => {
                    ((bracket.label_start, after - 1), after, LinkType::Shortcut)
                }
                _ => return None,
            };
        if label_end - label_start > 999 {
            return None;
        }
        let definition = self.refs.resolve(&self.text[label_start..label_end])?;
        Some(LinkMatch {
            link_type,
            dest: definition.dest.clone(),
            title: definition.title.clone().unwrap_or(Cow::Borrowed("")),
            id: self.slice(label_start, label_end),
            next,
        })
    }

    /// `(destination "title")` starting just after the `(`.
    fn inline_link(&self, start: usize) -> Option<LinkMatch<'a>> {
        let bytes = self.bytes;
        let dest = scan::scan_link_destination(bytes, scan::skip_spnl(bytes, start), true)?;
        let mut pos = dest.next;
        let mut title = None;
        let title_start = scan::skip_spnl(bytes, pos);
        if title_start > pos {
            pos = title_start;
            if let Some((title_start, title_end, after)) = scan::scan_link_title(bytes, title_start) {
                title = Some(scan::unescape(self.slice(title_start, title_end)));
                pos = after;
            }
        }
        pos = scan::skip_spnl(bytes, pos);
        if bytes.get(pos) != Some(&b')') {
            return None;
        }
        Some(LinkMatch {
            link_type: LinkType::Inline,
            dest: scan::unescape(self.slice(dest.start, dest.end)),
            title: title.unwrap_or(Cow::Borrowed("")),
            id: Cow::Borrowed(""),
            next: pos + 1,
        })
    }

    fn angle(&mut self) {
        let start = self.pos;
        if let Some((end, email)) = scan::scan_autolink(self.bytes, start) {
            self.flush(start);
            let dest = self.slice(start + 1, end - 1);
            let link_type = if email {
                LinkType::Email
            } else {
                LinkType::Autolink
            };
            self.tokens.push(Token::Event(Event::Start(Tag::Link {
                link_type,
                dest_url: dest.clone(),
                title: Cow::Borrowed(""),
                id: Cow::Borrowed(""),
            })));
            self.tokens.push(Token::Event(Event::Text(dest)));
            self.tokens.push(Token::Event(Event::End(TagEnd::Link)));
            self.skip_to(end);
        } else if let Some(end) =
            scan::scan_inline_html(self.bytes, start, &mut self.missing_closers)
        {
            self.flush(start);
            let html = self.slice(start, end);
            self.tokens.push(Token::Event(Event::InlineHtml(html)));
            self.skip_to(end);
        } else {
            self.pos += 1;
        }
    }

    fn entity(&mut self) {
        let start = self.pos;
        match scan::decode_entity(self.text, start) {
            Some((decoded, end)) => {
                self.flush(start);
                self.tokens.push(Token::Literal(Cow::Owned(decoded)));
                self.skip_to(end);
            }
            None => self.pos += 1,
        }
    }

    /// Match delimiters above `bottom` and drop them from the stack.
    fn process_emphasis(&mut self, bottom: usize) {
        let mut openers_bottom = [bottom; 13];
        let mut closer = bottom;
        while closer < self.delims.len() {
            let current = self.delims[closer];
            if current.removed || !current.can_close {
                closer += 1;
                continue;
            }
            let slot = opener_slot(&current);
            let mut opener = closer;
            let mut found = None;
            while opener > openers_bottom[slot] {
                opener -= 1;
                let candidate = &self.delims[opener];
                if !candidate.removed
                    && candidate.ch == current.ch
                    && candidate.can_open
                    && delimiters_pair(candidate, &current)
                {
                    found = Some(opener);
                    break;
                }
            }

            let Some(opener) = found else {
                openers_bottom[slot] = closer;
                if !current.can_open {
                    self.delims[closer].removed = true;
                }
                closer += 1;
                continue;
            };

            let open_remaining = self.delims[opener].remaining;
            let (used, kind) = if current.ch == b'~' {
                (open_remaining, Emphasis::Strikethrough)
            } else if open_remaining >= 2 && current.remaining >= 2 {
                (2, Emphasis::Strong)
            } else {
                (1, Emphasis::Emphasis)
            };
            self.delims[opener].remaining -= used;
            self.delims[closer].remaining -= used;
            let (open_token, close_token) = (self.delims[opener].token, current.token);
            if let Token::Delim { open_used, opens, .. } = &mut self.tokens[open_token] {
                *open_used += used;
                opens.push(kind);
            }
            if let Token::Delim {
                close_used, closes, ..
            } = &mut self.tokens[close_token]
            {
                *close_used += used;
                closes.push(kind);
            }
            for between in &mut self.delims[opener + 1..closer] {
                between.removed = true;
            }
            if self.delims[opener].remaining == 0 {
                self.delims[opener].removed = true;
            }
            if self.delims[closer].remaining == 0 {
                self.delims[closer].removed = true;
                closer += 1;
            }
        }
        self.delims.truncate(bottom);
    }

    fn flatten(mut self) -> Vec<Event<'a>> {
        let tokens = std::mem::take(&mut self.tokens);
        let mut events = Vec::with_capacity(tokens.len());
        let mut run = TextRun::Empty;
        for token in tokens {
            match token {
                Token::Text(start, end) => run.push_range(self.text, start, end),
                Token::Literal(text) => run.push_str(self.text, &text),
                Token::Event(event) => {
                    run.flush(&self, &mut events);
                    events.push(event);
                }
                Token::Delim {
                    start,
                    len,
                    close_used,
                    open_used,
                    closes,
                    opens,
                } => {
                    if !closes.is_empty() {
                        run.flush(&self, &mut events);
                        events.extend(closes.iter().map(|kind| kind.end()));
                    }
                    run.push_range(self.text, start + close_used, start + len - open_used);
                    if !opens.is_empty() {
                        run.flush(&self, &mut events);
                        events.extend(opens.iter().rev().map(|kind| kind.start()));
                    }
                }
            }
        }
        run.flush(&self, &mut events);
        events
    }
}

/// Adjacent plain text, merged before it becomes a `Text` event.
enum TextRun {
    Empty,
    Range(usize, usize),
    Owned(String),
}

impl TextRun {
    fn push_range(&mut self, text: &str, start: usize, end: usize) {
        if start >= end {
            return;
        }
        *self = match std::mem::replace(self, TextRun::Empty) {
            TextRun::Empty => TextRun::Range(start, end),
            TextRun::Range(a, b) if b == start => TextRun::Range(a, end),
            TextRun::Range(a, b) => TextRun::Owned([&text[a..b], &text[start..end]].concat()),
            TextRun::Owned(mut owned) => {
                owned.push_str(&text[start..end]);
                TextRun::Owned(owned)
            }
        };
    }

    fn push_str(&mut self, text: &str, piece: &str) {
        *self = match std::mem::replace(self, TextRun::Empty) {
            TextRun::Empty => TextRun::Owned(piece.to_owned()),
            TextRun::Range(a, b) => TextRun::Owned([&text[a..b], piece].concat()),
            TextRun::Owned(mut owned) => {
                owned.push_str(piece);
                TextRun::Owned(owned)
            }
        };
    }

    fn flush<'a>(&mut self, parser: &InlineParser<'_, '_, 'a>, events: &mut Vec<Event<'a>>) {
        match std::mem::replace(self, TextRun::Empty) {
            TextRun::Empty => {}
            TextRun::Range(start, end) => events.push(Event::Text(parser.slice(start, end))),
            TextRun::Owned(owned) => {
                if !owned.is_empty() {
                    events.push(Event::Text(Cow::Owned(owned)));
                }
            }
        }
    }
}

fn opener_slot(closer: &Delimiter) -> usize {
    match closer.ch {
        b'~' => 12,
        ch => {
            let base = if ch == b'*' { 0 } else { 6 };
            base + if closer.can_open { 3 } else { 0 } + closer.orig_len % 3
        }
    }
}

/// Whether an opener and closer of the same character may pair up.
fn delimiters_pair(opener: &Delimiter, closer: &Delimiter) -> bool {
    if closer.ch == b'~' {
        return opener.orig_len == closer.orig_len;
    }
    let odd_match = (closer.can_open || opener.can_close)
        && closer.orig_len % 3 != 0
        && (opener.orig_len + closer.orig_len) % 3 == 0;
    !odd_match
}

fn is_punctuation(c: char) -> bool {
    if c.is_ascii() {
        c.is_ascii_punctuation()
    } else {
        !c.is_alphanumeric() && !c.is_whitespace() && !c.is_control()
    }
}

// =============================================================================
// Resolution pass
// =============================================================================

fn resolve_content<'a>(
    content: &mut Content<'a>,
    refs: &mut ReferenceTable<'a>,
    options: InlineOptions,
) {
    if let Content::Raw(raw) = content {
        let events = parse_inlines(raw, refs, options);
        *content = Content::Resolved(events);
    }
}

/// Resolve every leaf under `blocks`, depth first, without recursion.
fn resolve_blocks<'a>(
    blocks: &mut [Block<'a>],
    refs: &mut ReferenceTable<'a>,
    options: InlineOptions,
) -> usize {
    let mut resolved = 0;
    let mut stack: Vec<slice::IterMut<'_, Block<'a>>> = vec![blocks.iter_mut()];
    while let Some(iter) = stack.last_mut() {
        let Some(block) = iter.next() else {
            stack.pop();
            continue;
        };
        match block {
            Block::Paragraph(paragraph) => {
                resolve_content(&mut paragraph.content, refs, options);
                resolved += 1;
            }
            Block::Heading(heading) => {
                resolve_content(&mut heading.content, refs, options);
                resolved += 1;
            }
            Block::BlockQuote(quote) => stack.push(quote.blocks.iter_mut()),
            Block::List(list) => {
                for item in list.items.iter_mut().rev() {
                    stack.push(item.blocks.iter_mut());
                }
            }
            Block::Table(table) => {
                for cell in table.rows.iter_mut().flat_map(|row| row.cells.iter_mut()) {
                    resolve_content(&mut cell.content, refs, options);
                    resolved += 1;
                }
            }
            Block::CodeBlock(_) | Block::HtmlBlock(_) | Block::ThematicBreak(_) => {}
        }
    }
    resolved
}

/// Resolve the inline content of a document and of its footnotes.
///
/// Footnote bodies are visited in first-reference order through a work
/// list, so a body referenced from another body is still resolved exactly
/// once and reference cycles terminate.
pub(crate) fn resolve<'a>(
    blocks: &mut [Block<'a>],
    refs: &mut ReferenceTable<'a>,
    strikethrough: bool,
    footnotes: bool,
    diagnostics: &mut Diagnostics,
) {
    let options = InlineOptions {
        strikethrough,
        footnotes,
        record_references: true,
    };
    let mut leaves = resolve_blocks(blocks, refs, options);

    let mut next = 0;
    while let Some(index) = refs.referenced_at(next) {
        let mut body = refs.take_footnote_blocks(index);
        leaves += resolve_blocks(&mut body, refs, options);
        refs.restore_footnote_blocks(index, body);
        next += 1;
    }

    let unreferenced: Vec<usize> = (0..refs.footnote_count())
        .filter(|&index| refs.reference_count(index) == 0)
        .collect();
    let quiet = InlineOptions {
        record_references: false,
        ..options
    };
    for &index in &unreferenced {
        if let Some(def) = refs.footnote(index) {
            diagnostics.push(Diagnostic::unreferenced_footnote(&def.label, def.span));
        }
        let mut body = refs.take_footnote_blocks(index);
        leaves += resolve_blocks(&mut body, refs, quiet);
        refs.restore_footnote_blocks(index, body);
    }

    debug!(
        leaves,
        referenced = next,
        unreferenced = unreferenced.len(),
        "inline resolution done"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refs::{FootnoteDefinition, LinkDefinition};
    use crate::span::Span;

    const GFM: InlineOptions = InlineOptions {
        strikethrough: true,
        footnotes: true,
        record_references: true,
    };

    fn inline_with<'a>(text: &'a str, refs: &mut ReferenceTable<'a>) -> Vec<Event<'a>> {
        let raw = InlineSpan {
            text: Cow::Borrowed(text),
            span: Span::from_range(0, text.len()),
        };
        parse_inlines(&raw, refs, GFM)
    }

    fn inline(text: &str) -> Vec<Event<'_>> {
        inline_with(text, &mut ReferenceTable::new())
    }

    fn text(s: &str) -> Event<'_> {
        Event::Text(Cow::Borrowed(s))
    }

    // =========================================================================
    // Emphasis
    // =========================================================================

    #[test]
    fn plain_text_is_one_borrowed_event() {
        let events = inline("just text");
        assert_eq!(events, vec![text("just text")]);
        assert!(matches!(&events[0], Event::Text(Cow::Borrowed(_))));
    }

    #[test]
    fn emphasis_and_strong() {
        assert_eq!(
            inline("*a* **b**"),
            vec![
                Event::Start(Tag::Emphasis),
                text("a"),
                Event::End(TagEnd::Emphasis),
                text(" "),
                Event::Start(Tag::Strong),
                text("b"),
                Event::End(TagEnd::Strong),
            ]
        );
    }

    #[test]
    fn triple_delimiters_nest_strong_inside_emphasis() {
        assert_eq!(
            inline("***x***"),
            vec![
                Event::Start(Tag::Emphasis),
                Event::Start(Tag::Strong),
                text("x"),
                Event::End(TagEnd::Strong),
                Event::End(TagEnd::Emphasis),
            ]
        );
    }

    #[test]
    fn mismatched_characters_do_not_pair() {
        assert_eq!(
            inline("*a _b* c_"),
            vec![
                Event::Start(Tag::Emphasis),
                text("a _b"),
                Event::End(TagEnd::Emphasis),
                text(" c_"),
            ]
        );
    }

    #[test]
    fn leftover_opener_stays_literal() {
        assert_eq!(
            inline("**a*"),
            vec![
                text("*"),
                Event::Start(Tag::Emphasis),
                text("a"),
                Event::End(TagEnd::Emphasis),
            ]
        );
    }

    #[test]
    fn intraword_underscore_is_literal() {
        assert_eq!(inline("snake_case_name"), vec![text("snake_case_name")]);
    }

    #[test]
    fn strikethrough_needs_equal_runs() {
        assert_eq!(
            inline("~~gone~~"),
            vec![
                Event::Start(Tag::Strikethrough),
                text("gone"),
                Event::End(TagEnd::Strikethrough),
            ]
        );
        assert_eq!(inline("~~a~"), vec![text("~~a~")]);
    }

    // =========================================================================
    // Code, escapes, breaks
    // =========================================================================

    #[test]
    fn code_span_strips_one_space() {
        assert_eq!(
            inline("`` `x` ``"),
            vec![Event::Code(Cow::Borrowed("`x`"))]
        );
        assert_eq!(inline("`a\nb`"), vec![Event::Code("a b".into())]);
    }

    #[test]
    fn unmatched_backticks_are_literal() {
        assert_eq!(inline("``a`"), vec![text("``a`")]);
    }

    #[test]
    fn escapes_and_entities() {
        assert_eq!(inline("\\*a\\*"), vec![Event::Text("*a*".into())]);
        assert_eq!(inline("&amp; &#35;"), vec![Event::Text("& #".into())]);
        assert_eq!(inline("&bogus;"), vec![text("&bogus;")]);
    }

    #[test]
    fn soft_and_hard_breaks() {
        assert_eq!(
            inline("a\nb  \nc\\\nd"),
            vec![
                text("a"),
                Event::SoftBreak,
                text("b"),
                Event::HardBreak,
                text("c"),
                Event::HardBreak,
                text("d"),
            ]
        );
    }

    // =========================================================================
    // Links
    // =========================================================================

    #[test]
    fn inline_link_with_title() {
        let events = inline("[a *b*](/u \"t\")");
        assert_eq!(
            events[0],
            Event::Start(Tag::Link {
                link_type: LinkType::Inline,
                dest_url: "/u".into(),
                title: "t".into(),
                id: "".into(),
            })
        );
        assert_eq!(events[2], Event::Start(Tag::Emphasis));
        assert_eq!(events.last(), Some(&Event::End(TagEnd::Link)));
    }

    #[test]
    fn reference_forms_resolve() {
        let mut refs = ReferenceTable::new();
        refs.define(LinkDefinition {
            label: "Foo".into(),
            dest: "/foo".into(),
            title: None,
            span: Span::default(),
        });
        for (input, kind) in [
            ("[x][foo]", LinkType::Reference),
            ("[foo][]", LinkType::Collapsed),
            ("[FOO]", LinkType::Shortcut),
        ] {
            let events = inline_with(input, &mut refs);
            assert!(
                matches!(&events[0], Event::Start(Tag::Link { link_type, dest_url, .. })
                    if *link_type == kind && dest_url == "/foo"),
                "{input}: {events:?}"
            );
        }
        assert_eq!(inline_with("[nope]", &mut refs), vec![text("[nope]")]);
    }

    #[test]
    fn links_do_not_nest() {
        let events = inline("[a [b](/in) c](/out)");
        let starts = events
            .iter()
            .filter(|e| matches!(e, Event::Start(Tag::Link { .. })))
            .count();
        assert_eq!(starts, 1);
        assert_eq!(events[0], text("[a "));
    }

    #[test]
    fn brackets_opened_after_a_link_stay_active() {
        let events = inline("[a [b](/in) c] [d](/out)");
        let dests: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                Event::Start(Tag::Link { dest_url, .. }) => Some(dest_url.as_ref()),
                _ => None,
            })
            .collect();
        assert_eq!(dests, vec!["/in", "/out"]);
    }

    #[test]
    fn repeated_unclosed_openers_before_links() {
        let input = "[[a](b)".repeat(20_000);
        let events = inline(&input);
        let links = events
            .iter()
            .filter(|e| matches!(e, Event::Start(Tag::Link { .. })))
            .count();
        assert_eq!(links, 20_000);
    }

    #[test]
    fn autolink_and_inline_html() {
        let events = inline("<https://x.y> <b>");
        assert!(matches!(
            &events[0],
            Event::Start(Tag::Link { link_type: LinkType::Autolink, dest_url, .. }) if dest_url == "https://x.y"
        ));
        assert_eq!(events.last(), Some(&Event::InlineHtml("<b>".into())));
    }

    #[test]
    fn unclosed_html_openers_stay_text() {
        let input = "<!-- <? <a ".repeat(5_000);
        let events = inline(&input);
        assert!(events.iter().all(|e| matches!(e, Event::Text(_))));
        assert_eq!(
            inline("<? a <!-- b -->"),
            vec![text("<? a "), Event::InlineHtml("<!-- b -->".into())]
        );
    }

    #[test]
    fn footnote_reference_marks_table() {
        let mut refs = ReferenceTable::new();
        refs.define_footnote(FootnoteDefinition {
            label: "Note".into(),
            blocks: Vec::new(),
            span: Span::default(),
        });
        let events = inline_with("a[^note] b[^missing]", &mut refs);
        assert_eq!(events[1], Event::FootnoteReference("Note".into()));
        assert_eq!(events[2], text(" b[^missing]"));
        assert_eq!(refs.reference_count(0), 1);
    }
}
