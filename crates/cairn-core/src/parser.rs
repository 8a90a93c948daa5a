//! Parser entry point.
//!
//! A parse runs two passes over state owned by the call: the block pass
//! builds the tree and the per-document reference table, then the inline
//! pass resolves leaf text against that table. A [`Parser`] only holds
//! options, so one instance can parse any number of documents.

use tracing::debug;

use crate::ast::{Document, Extension, Profile, RaggedRows, UnreferencedFootnotes};
use crate::block::{BlockOutput, BlockParser};
use crate::diagnostic::Diagnostics;
use crate::inline;
use crate::span::Span;

/// Default cap on nested block quotes, list items and footnote bodies.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 100;

/// Parser configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct Options {
    pub profile: Profile,
    /// Enabled extensions. Starts as the profile's set.
    pub extensions: Vec<Extension>,
    /// Containers nested deeper than this are not opened; their markers
    /// stay literal text.
    pub max_nesting_depth: usize,
    pub ragged_rows: RaggedRows,
    pub unreferenced_footnotes: UnreferencedFootnotes,
}

impl Options {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            extensions: profile.extensions().to_vec(),
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            ragged_rows: RaggedRows::default(),
            unreferenced_footnotes: UnreferencedFootnotes::default(),
        }
    }

    #[inline]
    pub fn has_extension(&self, extension: Extension) -> bool {
        self.extensions.contains(&extension)
    }

    fn set_extension(&mut self, extension: Extension, enabled: bool) {
        let present = self.has_extension(extension);
        if enabled && !present {
            self.extensions.push(extension);
        } else if !enabled && present {
            self.extensions.retain(|&e| e != extension);
        }
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new(Profile::default())
    }
}

/// A document together with the soft anomalies found while parsing it.
#[derive(Debug)]
pub struct ParseResult<'a> {
    pub document: Document<'a>,
    /// Sorted by source position.
    pub diagnostics: Diagnostics,
}

impl<'a> ParseResult<'a> {
    /// Whether nothing was worth reporting.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Markdown parser with a fixed set of options.
///
/// ```rust
/// use cairn_core::{Extension, Parser, Profile};
///
/// let parser = Parser::new(Profile::Gfm).with_extension(Extension::Strikethrough, false);
/// let doc = parser.parse("~~kept~~\n");
/// assert_eq!(doc.blocks.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Parser {
    options: Options,
}

impl Parser {
    /// Create a parser for `profile` with default limits and policies.
    #[inline]
    pub fn new(profile: Profile) -> Self {
        Self {
            options: Options::new(profile),
        }
    }

    pub fn with_options(options: Options) -> Self {
        Self { options }
    }

    /// Switch a single extension on or off.
    pub fn with_extension(mut self, extension: Extension, enabled: bool) -> Self {
        self.options.set_extension(extension, enabled);
        self
    }

    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.options.max_nesting_depth = depth;
        self
    }

    pub fn with_ragged_rows(mut self, policy: RaggedRows) -> Self {
        self.options.ragged_rows = policy;
        self
    }

    pub fn with_unreferenced_footnotes(mut self, policy: UnreferencedFootnotes) -> Self {
        self.options.unreferenced_footnotes = policy;
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn has_extension(&self, extension: Extension) -> bool {
        self.options.has_extension(extension)
    }

    /// Parse `input` into a document. Never fails.
    #[inline]
    pub fn parse<'a>(&self, input: &'a str) -> Document<'a> {
        self.run(input).document
    }

    /// Parse `input`, keeping the diagnostics.
    pub fn parse_with_diagnostics<'a>(&self, input: &'a str) -> ParseResult<'a> {
        self.run(input)
    }

    fn run<'a>(&self, input: &'a str) -> ParseResult<'a> {
        debug!(bytes = input.len(), profile = ?self.options.profile, "parse");

        let BlockOutput {
            mut blocks,
            mut refs,
            mut diagnostics,
        } = BlockParser::new(input, &self.options).run();
        debug!(
            blocks = blocks.len(),
            links = refs.link_count(),
            footnotes = refs.footnote_count(),
            "block pass done"
        );

        inline::resolve(
            &mut blocks,
            &mut refs,
            self.has_extension(Extension::Strikethrough),
            self.has_extension(Extension::Footnotes),
            &mut diagnostics,
        );
        diagnostics.sort();

        ParseResult {
            document: Document {
                blocks,
                refs,
                footnote_policy: self.options.unreferenced_footnotes,
                span: Span::from_range(0, input.len()),
            },
            diagnostics,
        }
    }
}
