//! Block tree produced by the parser.
//!
//! The tree is deliberately shallow on the inline side: leaf blocks hold
//! [`Content`], which starts out as the raw text span collected by the
//! block parser and is replaced in place by a flat, resolved [`Event`]
//! sequence during inline resolution.
//!
//! - **Zero-copy**: text borrows from the input through `Cow<'a, str>`
//!   whenever it is a contiguous slice of it
//! - **Span-tracked**: every block records the bytes it came from

use crate::events::{Alignment, CodeBlockKind, Event, Events};
use crate::refs::ReferenceTable;
use crate::span::Span;

/// Borrowed or owned string type for zero-copy parsing.
pub type CowStr<'a> = std::borrow::Cow<'a, str>;

/// Dialect preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Profile {
    /// CommonMark plus tables, footnotes, strikethrough and task lists.
    #[default]
    Gfm,
    /// CommonMark core only.
    CommonMark,
}

impl Profile {
    /// Extensions switched on by this profile.
    pub fn extensions(self) -> &'static [Extension] {
        match self {
            Profile::Gfm => &[
                Extension::Tables,
                Extension::Footnotes,
                Extension::Strikethrough,
                Extension::TaskLists,
            ],
            Profile::CommonMark => &[],
        }
    }
}

/// Syntax extensions on top of CommonMark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Extension {
    /// Pipe tables.
    Tables,
    /// `[^label]` references and `[^label]:` definitions.
    Footnotes,
    /// `~text~` and `~~text~~`.
    Strikethrough,
    /// `[ ]` / `[x]` at the start of list items.
    TaskLists,
}

/// What happens to footnote definitions nobody references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum UnreferencedFootnotes {
    /// Keep them in the reference table but leave them out of the events.
    #[default]
    Drop,
    /// Emit them after the referenced ones, in definition order.
    Append,
}

/// How table rows with the wrong number of cells are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum RaggedRows {
    /// Pad short rows with empty cells and drop extra cells.
    #[default]
    Normalize,
    /// Keep rows exactly as written.
    Preserve,
    /// A mismatched row ends the table and starts a paragraph.
    EndTable,
}

/// A parsed document.
///
/// Owns the block tree and the reference table. Consume it with
/// [`Document::into_events`] (or a `for` loop) to get the event stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Document<'a> {
    /// Top-level blocks in document order.
    pub blocks: Vec<Block<'a>>,
    /// Link reference and footnote definitions.
    pub refs: ReferenceTable<'a>,
    /// Policy applied to unreferenced footnotes when emitting events.
    pub footnote_policy: UnreferencedFootnotes,
    /// Source span covering the entire input.
    pub span: Span,
}

impl<'a> Document<'a> {
    /// Consume the document into its event stream.
    pub fn into_events(self) -> Events<'a> {
        Events::new(self)
    }
}

/// Block-level nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Block<'a> {
    Paragraph(Paragraph<'a>),
    Heading(Heading<'a>),
    BlockQuote(BlockQuote<'a>),
    List(List<'a>),
    CodeBlock(CodeBlock<'a>),
    HtmlBlock(HtmlBlock<'a>),
    Table(Table<'a>),
    ThematicBreak(Span),
}

impl<'a> Block<'a> {
    /// Source span of the block.
    pub fn span(&self) -> Span {
        match self {
            Block::Paragraph(b) => b.span,
            Block::Heading(b) => b.span,
            Block::BlockQuote(b) => b.span,
            Block::List(b) => b.span,
            Block::CodeBlock(b) => b.span,
            Block::HtmlBlock(b) => b.span,
            Block::Table(b) => b.span,
            Block::ThematicBreak(span) => *span,
        }
    }
}

/// Raw inline text attached to a leaf block before resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineSpan<'a> {
    pub text: CowStr<'a>,
    pub span: Span,
}

/// Inline content of a leaf block.
#[derive(Debug, Clone, PartialEq)]
pub enum Content<'a> {
    /// Not yet run through the inline parser.
    Raw(InlineSpan<'a>),
    /// Resolved inline events.
    Resolved(Vec<Event<'a>>),
}

impl<'a> Content<'a> {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Content::Resolved(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph<'a> {
    pub content: Content<'a>,
    pub span: Span,
}

/// ATX or setext heading.
#[derive(Debug, Clone, PartialEq)]
pub struct Heading<'a> {
    /// Heading level (1-6).
    pub level: u8,
    pub content: Content<'a>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockQuote<'a> {
    pub blocks: Vec<Block<'a>>,
    pub span: Span,
}

/// List ordering style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// `1.` or `1)` markers.
    Ordered,
    /// `-`, `+` or `*` markers.
    Unordered,
}

#[derive(Debug, Clone, PartialEq)]
pub struct List<'a> {
    pub kind: ListKind,
    /// Starting number for ordered lists.
    pub start: Option<u64>,
    /// No blank line between items or between blocks inside an item.
    pub tight: bool,
    /// Bullet character, or the delimiter (`.` / `)`) of an ordered list.
    pub marker: u8,
    pub items: Vec<ListItem<'a>>,
    pub span: Span,
}

/// A single list item.
#[derive(Debug, Clone, PartialEq)]
pub struct ListItem<'a> {
    pub blocks: Vec<Block<'a>>,
    /// Checkbox state when the item starts with a task marker.
    pub task: Option<bool>,
    pub span: Span,
}

/// Indented or fenced code.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeBlock<'a> {
    pub kind: CodeBlockKind<'a>,
    /// Literal content, one `\n` after every line.
    pub content: CowStr<'a>,
    pub span: Span,
}

/// Raw HTML block content, passed through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlBlock<'a> {
    pub content: CowStr<'a>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table<'a> {
    /// One entry per column.
    pub alignments: Vec<Alignment>,
    /// Header row first.
    pub rows: Vec<TableRow<'a>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow<'a> {
    pub cells: Vec<TableCell<'a>>,
    pub header: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableCell<'a> {
    pub content: Content<'a>,
    pub span: Span,
}
