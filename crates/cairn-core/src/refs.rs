//! Per-document reference and footnote table.
//!
//! Populated by the block parser as definitions close, consulted by the
//! inline parser. Labels are matched after [`normalize_label`]; the first
//! definition of a label wins.
//!
//! Footnote references only ever look labels up. Footnote bodies are block
//! trees stored here, so references between footnotes (including cycles)
//! never cause one body to be parsed or emitted twice.

use std::collections::HashMap;

use crate::ast::{Block, CowStr, UnreferencedFootnotes};
use crate::span::Span;

/// Target of a link reference definition.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkDefinition<'a> {
    /// Label as written, without brackets.
    pub label: CowStr<'a>,
    pub dest: CowStr<'a>,
    pub title: Option<CowStr<'a>>,
    pub span: Span,
}

/// A footnote body.
#[derive(Debug, Clone, PartialEq)]
pub struct FootnoteDefinition<'a> {
    /// Label as written, without `[^` and `]`.
    pub label: CowStr<'a>,
    pub blocks: Vec<Block<'a>>,
    pub span: Span,
}

/// Case-fold and collapse whitespace so equivalent labels compare equal.
///
/// Folding goes through lowercase then uppercase, which maps `ẞ` and `ss`
/// to the same key.
///
/// ```rust
/// use cairn_core::refs::normalize_label;
///
/// assert_eq!(normalize_label("  Foo \n bar "), normalize_label("FOO BAR"));
/// ```
pub fn normalize_label(label: &str) -> String {
    let mut collapsed = String::with_capacity(label.len());
    for word in label.split([' ', '\t', '\n', '\r']).filter(|w| !w.is_empty()) {
        if !collapsed.is_empty() {
            collapsed.push(' ');
        }
        collapsed.push_str(word);
    }
    collapsed.to_lowercase().to_uppercase()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceTable<'a> {
    links: HashMap<String, LinkDefinition<'a>>,
    footnotes: Vec<FootnoteDefinition<'a>>,
    footnote_index: HashMap<String, usize>,
    /// Reference count per footnote, parallel to `footnotes`.
    reference_counts: Vec<usize>,
    /// Footnote indices in order of first reference.
    reference_order: Vec<usize>,
}

impl<'a> ReferenceTable<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a link definition unless its normalized label is taken.
    ///
    /// Returns `false` when an earlier definition already owns the label.
    pub fn define(&mut self, definition: LinkDefinition<'a>) -> bool {
        let key = normalize_label(&definition.label);
        if key.is_empty() || self.links.contains_key(&key) {
            return false;
        }
        self.links.insert(key, definition);
        true
    }

    /// Look up a link definition by label.
    pub fn resolve(&self, label: &str) -> Option<&LinkDefinition<'a>> {
        self.links.get(&normalize_label(label))
    }

    /// Insert a footnote definition unless its normalized label is taken.
    pub fn define_footnote(&mut self, definition: FootnoteDefinition<'a>) -> bool {
        let key = normalize_label(&definition.label);
        if key.is_empty() || self.footnote_index.contains_key(&key) {
            return false;
        }
        self.footnote_index.insert(key, self.footnotes.len());
        self.footnotes.push(definition);
        self.reference_counts.push(0);
        true
    }

    /// Index of the footnote defined under `label`.
    pub fn resolve_footnote(&self, label: &str) -> Option<usize> {
        self.footnote_index.get(&normalize_label(label)).copied()
    }

    pub fn footnote(&self, index: usize) -> Option<&FootnoteDefinition<'a>> {
        self.footnotes.get(index)
    }

    /// Record a reference to footnote `index`.
    ///
    /// The first reference fixes the footnote's position in the emitted
    /// footnote section.
    pub fn mark_referenced(&mut self, index: usize) {
        let Some(count) = self.reference_counts.get_mut(index) else {
            return;
        };
        if *count == 0 {
            self.reference_order.push(index);
        }
        *count += 1;
    }

    /// How many times footnote `index` has been referenced.
    pub fn reference_count(&self, index: usize) -> usize {
        self.reference_counts.get(index).copied().unwrap_or(0)
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn footnote_count(&self) -> usize {
        self.footnotes.len()
    }

    /// Link definitions, in no particular order.
    pub fn links(&self) -> impl Iterator<Item = &LinkDefinition<'a>> {
        self.links.values()
    }

    /// Footnotes in definition order.
    pub fn footnotes(&self) -> impl Iterator<Item = &FootnoteDefinition<'a>> {
        self.footnotes.iter()
    }

    /// Referenced footnotes in first-reference order.
    pub fn referenced_footnotes(&self) -> impl Iterator<Item = &FootnoteDefinition<'a>> {
        self.reference_order.iter().map(|&i| &self.footnotes[i])
    }

    /// Footnotes never referenced, in definition order.
    pub fn unreferenced_footnotes(&self) -> impl Iterator<Item = &FootnoteDefinition<'a>> {
        self.footnotes
            .iter()
            .zip(&self.reference_counts)
            .filter(|(_, &count)| count == 0)
            .map(|(def, _)| def)
    }

    /// Index of the `n`th footnote in first-reference order. The order may
    /// grow while footnote bodies are being resolved.
    pub(crate) fn referenced_at(&self, n: usize) -> Option<usize> {
        self.reference_order.get(n).copied()
    }

    pub(crate) fn take_footnote_blocks(&mut self, index: usize) -> Vec<Block<'a>> {
        self.footnotes
            .get_mut(index)
            .map(|def| std::mem::take(&mut def.blocks))
            .unwrap_or_default()
    }

    pub(crate) fn restore_footnote_blocks(&mut self, index: usize, blocks: Vec<Block<'a>>) {
        if let Some(def) = self.footnotes.get_mut(index) {
            def.blocks = blocks;
        }
    }

    /// Consume the table into the footnotes to emit, in emission order.
    pub fn into_emission_order(self, policy: UnreferencedFootnotes) -> Vec<FootnoteDefinition<'a>> {
        let mut slots: Vec<Option<FootnoteDefinition<'a>>> =
            self.footnotes.into_iter().map(Some).collect();
        let mut ordered = Vec::with_capacity(slots.len());
        for &i in &self.reference_order {
            if let Some(def) = slots[i].take() {
                ordered.push(def);
            }
        }
        if policy == UnreferencedFootnotes::Append {
            ordered.extend(slots.into_iter().flatten());
        }
        ordered
    }
}
