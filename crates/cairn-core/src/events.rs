//! Event stream.
//!
//! A parsed [`Document`] is consumed into a flat, ordered sequence of
//! [`Event`]s: `Start`/`End` pairs for every block and inline container
//! and leaf events for everything else. Referenced footnote definitions
//! follow the document body in first-reference order.
//!
//! ```rust
//! use cairn_core::{Event, Parser, Profile, Tag};
//!
//! let doc = Parser::new(Profile::Gfm).parse("*hi*");
//! let events: Vec<Event> = doc.into_events().collect();
//! assert_eq!(events[1], Event::Start(Tag::Emphasis));
//! ```

use std::collections::VecDeque;
use std::vec;

use crate::ast::{Block, Content, CowStr, Document, ListItem, TableCell, TableRow};
use crate::refs::FootnoteDefinition;

/// Column alignment in a table, fixed by the delimiter row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Alignment {
    /// `---`
    #[default]
    None,
    /// `:--`
    Left,
    /// `:-:`
    Center,
    /// `--:`
    Right,
}

/// How a code block was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeBlockKind<'a> {
    Indented,
    /// Fenced with backticks or tildes; carries the info string.
    Fenced(CowStr<'a>),
}

/// How a link or image destination was supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    /// `[text](dest)`
    Inline,
    /// `[text][label]`
    Reference,
    /// `[text][]`
    Collapsed,
    /// `[text]`
    Shortcut,
    /// `<scheme:dest>`
    Autolink,
    /// `<user@host>`
    Email,
}

/// Opening half of a container event.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag<'a> {
    Paragraph,
    Heading {
        level: u8,
    },
    BlockQuote,
    CodeBlock(CodeBlockKind<'a>),
    HtmlBlock,
    /// A list. `start` is set for ordered lists.
    List {
        start: Option<u64>,
        tight: bool,
    },
    Item,
    FootnoteDefinition(CowStr<'a>),
    Table(Vec<Alignment>),
    /// Header row of a table; contains cells directly.
    TableHead,
    TableRow,
    TableCell,
    Emphasis,
    Strong,
    Strikethrough,
    Link {
        link_type: LinkType,
        dest_url: CowStr<'a>,
        title: CowStr<'a>,
        /// Reference label for reference links, empty otherwise.
        id: CowStr<'a>,
    },
    Image {
        link_type: LinkType,
        dest_url: CowStr<'a>,
        title: CowStr<'a>,
        id: CowStr<'a>,
    },
}

impl<'a> Tag<'a> {
    /// The matching closing tag.
    pub fn to_end(&self) -> TagEnd {
        match self {
            Tag::Paragraph => TagEnd::Paragraph,
            Tag::Heading { level } => TagEnd::Heading(*level),
            Tag::BlockQuote => TagEnd::BlockQuote,
            Tag::CodeBlock(_) => TagEnd::CodeBlock,
            Tag::HtmlBlock => TagEnd::HtmlBlock,
            Tag::List { start, .. } => TagEnd::List(start.is_some()),
            Tag::Item => TagEnd::Item,
            Tag::FootnoteDefinition(_) => TagEnd::FootnoteDefinition,
            Tag::Table(_) => TagEnd::Table,
            Tag::TableHead => TagEnd::TableHead,
            Tag::TableRow => TagEnd::TableRow,
            Tag::TableCell => TagEnd::TableCell,
            Tag::Emphasis => TagEnd::Emphasis,
            Tag::Strong => TagEnd::Strong,
            Tag::Strikethrough => TagEnd::Strikethrough,
            Tag::Link { .. } => TagEnd::Link,
            Tag::Image { .. } => TagEnd::Image,
        }
    }
}

/// Closing half of a container event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagEnd {
    Paragraph,
    Heading(u8),
    BlockQuote,
    CodeBlock,
    HtmlBlock,
    /// `true` for ordered lists.
    List(bool),
    Item,
    FootnoteDefinition,
    Table,
    TableHead,
    TableRow,
    TableCell,
    Emphasis,
    Strong,
    Strikethrough,
    Link,
    Image,
}

/// A single parse event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event<'a> {
    Start(Tag<'a>),
    End(TagEnd),
    Text(CowStr<'a>),
    /// Inline code span content.
    Code(CowStr<'a>),
    /// Contents of an HTML block.
    Html(CowStr<'a>),
    /// Raw inline HTML.
    InlineHtml(CowStr<'a>),
    /// Reference to a defined footnote, by its definition label.
    FootnoteReference(CowStr<'a>),
    SoftBreak,
    HardBreak,
    /// Thematic break.
    Rule,
    /// `[ ]` or `[x]` at the start of a list item.
    TaskListMarker(bool),
}

enum Frame<'a> {
    Blocks {
        iter: vec::IntoIter<Block<'a>>,
        end: Option<TagEnd>,
        tight: bool,
    },
    Items {
        iter: vec::IntoIter<ListItem<'a>>,
        end: TagEnd,
        tight: bool,
    },
    Rows {
        iter: vec::IntoIter<TableRow<'a>>,
    },
    Cells {
        iter: vec::IntoIter<TableCell<'a>>,
        end: TagEnd,
    },
    Inline {
        iter: vec::IntoIter<Event<'a>>,
        end: Option<TagEnd>,
    },
}

/// Lazy iterator over the events of a [`Document`].
///
/// Created by [`Document::into_events`]. Walks the tree with an explicit
/// stack, so nesting depth never touches the call stack.
pub struct Events<'a> {
    stack: Vec<Frame<'a>>,
    pending: VecDeque<Event<'a>>,
    footnotes: vec::IntoIter<FootnoteDefinition<'a>>,
    task_marker: Option<bool>,
}

impl<'a> Events<'a> {
    pub(crate) fn new(document: Document<'a>) -> Self {
        let Document {
            blocks,
            refs,
            footnote_policy,
            ..
        } = document;
        let footnotes = refs.into_emission_order(footnote_policy);
        Self {
            stack: vec![Frame::Blocks {
                iter: blocks.into_iter(),
                end: None,
                tight: false,
            }],
            pending: VecDeque::new(),
            footnotes: footnotes.into_iter(),
            task_marker: None,
        }
    }

    fn open_block(&mut self, block: Block<'a>, tight: bool) {
        match block {
            Block::Paragraph(p) => {
                let end = if tight {
                    None
                } else {
                    self.pending.push_back(Event::Start(Tag::Paragraph));
                    Some(TagEnd::Paragraph)
                };
                if let Some(checked) = self.task_marker.take() {
                    self.pending.push_back(Event::TaskListMarker(checked));
                }
                self.push_content(p.content, end);
            }
            Block::Heading(h) => {
                self.pending
                    .push_back(Event::Start(Tag::Heading { level: h.level }));
                self.push_content(h.content, Some(TagEnd::Heading(h.level)));
            }
            Block::BlockQuote(q) => {
                self.pending.push_back(Event::Start(Tag::BlockQuote));
                self.stack.push(Frame::Blocks {
                    iter: q.blocks.into_iter(),
                    end: Some(TagEnd::BlockQuote),
                    tight: false,
                });
            }
            Block::List(list) => {
                let tag = Tag::List {
                    start: list.start,
                    tight: list.tight,
                };
                let end = tag.to_end();
                self.pending.push_back(Event::Start(tag));
                self.stack.push(Frame::Items {
                    iter: list.items.into_iter(),
                    end,
                    tight: list.tight,
                });
            }
            Block::CodeBlock(code) => {
                self.pending
                    .push_back(Event::Start(Tag::CodeBlock(code.kind)));
                if !code.content.is_empty() {
                    self.pending.push_back(Event::Text(code.content));
                }
                self.pending.push_back(Event::End(TagEnd::CodeBlock));
            }
            Block::HtmlBlock(html) => {
                self.pending.push_back(Event::Start(Tag::HtmlBlock));
                self.pending.push_back(Event::Html(html.content));
                self.pending.push_back(Event::End(TagEnd::HtmlBlock));
            }
            Block::Table(table) => {
                self.pending
                    .push_back(Event::Start(Tag::Table(table.alignments)));
                self.stack.push(Frame::Rows {
                    iter: table.rows.into_iter(),
                });
            }
            Block::ThematicBreak(_) => self.pending.push_back(Event::Rule),
        }
    }

    fn push_content(&mut self, content: Content<'a>, end: Option<TagEnd>) {
        let events = match content {
            Content::Resolved(events) => events,
            Content::Raw(raw) if raw.text.is_empty() => Vec::new(),
            Content::Raw(raw) => vec![Event::Text(raw.text)],
        };
        self.stack.push(Frame::Inline {
            iter: events.into_iter(),
            end,
        });
    }
}

impl<'a> Iterator for Events<'a> {
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Event<'a>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }

            let Some(frame) = self.stack.last_mut() else {
                let footnote = self.footnotes.next()?;
                self.pending
                    .push_back(Event::Start(Tag::FootnoteDefinition(footnote.label)));
                self.stack.push(Frame::Blocks {
                    iter: footnote.blocks.into_iter(),
                    end: Some(TagEnd::FootnoteDefinition),
                    tight: false,
                });
                continue;
            };

            match frame {
                Frame::Blocks { iter, end, tight } => match iter.next() {
                    Some(block) => {
                        let tight = *tight;
                        self.open_block(block, tight);
                    }
                    None => {
                        let end = *end;
                        self.stack.pop();
                        if let Some(end) = end {
                            return Some(Event::End(end));
                        }
                    }
                },
                Frame::Items { iter, end, tight } => match iter.next() {
                    Some(item) => {
                        let tight = *tight;
                        self.pending.push_back(Event::Start(Tag::Item));
                        match (item.task, tight) {
                            (Some(checked), true) => {
                                self.pending.push_back(Event::TaskListMarker(checked))
                            }
                            (task, _) => self.task_marker = task,
                        }
                        self.stack.push(Frame::Blocks {
                            iter: item.blocks.into_iter(),
                            end: Some(TagEnd::Item),
                            tight,
                        });
                    }
                    None => {
                        let end = *end;
                        self.stack.pop();
                        return Some(Event::End(end));
                    }
                },
                Frame::Rows { iter } => match iter.next() {
                    Some(row) => {
                        let (start, end) = if row.header {
                            (Tag::TableHead, TagEnd::TableHead)
                        } else {
                            (Tag::TableRow, TagEnd::TableRow)
                        };
                        self.pending.push_back(Event::Start(start));
                        self.stack.push(Frame::Cells {
                            iter: row.cells.into_iter(),
                            end,
                        });
                    }
                    None => {
                        self.stack.pop();
                        return Some(Event::End(TagEnd::Table));
                    }
                },
                Frame::Cells { iter, end } => match iter.next() {
                    Some(cell) => {
                        self.pending.push_back(Event::Start(Tag::TableCell));
                        self.push_content(cell.content, Some(TagEnd::TableCell));
                    }
                    None => {
                        let end = *end;
                        self.stack.pop();
                        return Some(Event::End(end));
                    }
                },
                Frame::Inline { iter, end } => match iter.next() {
                    Some(event) => return Some(event),
                    None => {
                        let end = *end;
                        self.stack.pop();
                        if let Some(end) = end {
                            return Some(Event::End(end));
                        }
                    }
                },
            }
        }
    }
}

impl<'a> IntoIterator for Document<'a> {
    type Item = Event<'a>;
    type IntoIter = Events<'a>;

    fn into_iter(self) -> Events<'a> {
        Events::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Parser, Profile};

    fn events(input: &str) -> Vec<Event<'_>> {
        Parser::new(Profile::Gfm).parse(input).into_events().collect()
    }

    #[test]
    fn starts_and_ends_balance() {
        let evs = events("> - a\n>   - b\n\n| x |\n| - |\n| y |\n\n[^n]\n\n[^n]: note\n");
        let mut depth = 0i32;
        for ev in &evs {
            match ev {
                Event::Start(_) => depth += 1,
                Event::End(_) => depth -= 1,
                _ => {}
            }
            assert!(depth >= 0);
        }
        assert_eq!(depth, 0);
    }

    #[test]
    fn tight_list_omits_paragraphs() {
        let evs = events("- a\n- b\n");
        assert!(!evs.contains(&Event::Start(Tag::Paragraph)));
        assert_eq!(
            evs[0],
            Event::Start(Tag::List {
                start: None,
                tight: true
            })
        );
    }

    #[test]
    fn loose_task_marker_sits_inside_paragraph() {
        let evs = events("- [x] done\n\n- [ ] todo\n");
        assert_eq!(evs[1], Event::Start(Tag::Item));
        assert_eq!(evs[2], Event::Start(Tag::Paragraph));
        assert_eq!(evs[3], Event::TaskListMarker(true));
        assert_eq!(evs[4], Event::Text("done".into()));
    }

    #[test]
    fn table_head_holds_cells() {
        let evs = events("| a |\n| - |\n| b |\n");
        assert_eq!(evs[1], Event::Start(Tag::TableHead));
        assert_eq!(evs[2], Event::Start(Tag::TableCell));
        assert_eq!(evs[5], Event::End(TagEnd::TableHead));
        assert_eq!(evs[6], Event::Start(Tag::TableRow));
    }

    #[test]
    fn empty_code_block_has_no_text() {
        let evs = events("```\n```\n");
        assert_eq!(
            evs,
            vec![
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced("".into()))),
                Event::End(TagEnd::CodeBlock),
            ]
        );
    }
}
