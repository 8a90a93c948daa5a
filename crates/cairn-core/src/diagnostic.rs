use crate::span::Span;
use std::fmt;

/// Categories of soft anomalies.
///
/// None of these change how the input is parsed; they explain why some
/// text ended up literal or why a definition was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A link reference label was defined more than once.
    DuplicateLinkDefinition,
    /// A footnote label was defined more than once.
    DuplicateFootnoteDefinition,
    /// A delimiter row whose cell count differs from the header row.
    MalformedDelimiterRow,
    /// A table row with a different cell count than the header row.
    RaggedTableRow,
    /// Container markers past the nesting limit were kept as text.
    NestingLimit,
    /// A footnote definition nothing refers to.
    UnreferencedFootnote,
    /// A table stopped at a short row once it had padded too many cells.
    TablePaddingLimit,
}

impl DiagnosticKind {
    /// Short kebab-case name, stable across releases.
    pub fn name(self) -> &'static str {
        match self {
            DiagnosticKind::DuplicateLinkDefinition => "duplicate-link-definition",
            DiagnosticKind::DuplicateFootnoteDefinition => "duplicate-footnote-definition",
            DiagnosticKind::MalformedDelimiterRow => "malformed-delimiter-row",
            DiagnosticKind::RaggedTableRow => "ragged-table-row",
            DiagnosticKind::NestingLimit => "nesting-limit",
            DiagnosticKind::UnreferencedFootnote => "unreferenced-footnote",
            DiagnosticKind::TablePaddingLimit => "table-padding-limit",
        }
    }
}

/// A soft anomaly found while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Human-readable description
    pub message: String,
    /// Source location the finding refers to
    pub span: Option<Span>,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            message: message.into(),
            span,
            kind,
        }
    }

    pub fn duplicate_link(label: &str, span: Span) -> Self {
        Self::new(
            DiagnosticKind::DuplicateLinkDefinition,
            format!("link reference [{}] already defined; later definition ignored", label),
            Some(span),
        )
    }

    pub fn duplicate_footnote(label: &str, span: Span) -> Self {
        Self::new(
            DiagnosticKind::DuplicateFootnoteDefinition,
            format!("footnote [^{}] already defined; later definition ignored", label),
            Some(span),
        )
    }

    pub fn malformed_delimiter_row(header: usize, delimiter: usize, span: Span) -> Self {
        Self::new(
            DiagnosticKind::MalformedDelimiterRow,
            format!(
                "delimiter row has {} cells but header has {}; not a table",
                delimiter, header
            ),
            Some(span),
        )
    }

    pub fn ragged_row(expected: usize, found: usize, span: Span) -> Self {
        Self::new(
            DiagnosticKind::RaggedTableRow,
            format!("table row has {} cells, expected {}", found, expected),
            Some(span),
        )
    }

    pub fn nesting_limit(limit: usize, span: Span) -> Self {
        Self::new(
            DiagnosticKind::NestingLimit,
            format!("nesting limit of {} reached; markers kept as text", limit),
            Some(span),
        )
    }

    pub fn table_padding_limit(limit: usize, span: Span) -> Self {
        Self::new(
            DiagnosticKind::TablePaddingLimit,
            format!("table already padded {} empty cells; row ends the table", limit),
            Some(span),
        )
    }

    pub fn unreferenced_footnote(label: &str, span: Span) -> Self {
        Self::new(
            DiagnosticKind::UnreferencedFootnote,
            format!("footnote [^{}] is never referenced", label),
            Some(span),
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(span) = self.span {
            write!(f, " at bytes {}..{}", span.start, span.end)?;
        }
        Ok(())
    }
}

/// Diagnostics collected during one parse, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::trace!(kind = diagnostic.kind.name(), "{}", diagnostic.message);
        self.items.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Number of diagnostics of one kind.
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.items.iter().filter(|d| d.kind == kind).count()
    }

    /// Order by source position; diagnostics without a span go last.
    pub(crate) fn sort(&mut self) {
        self.items
            .sort_by_key(|d| d.span.map_or((u32::MAX, u32::MAX), |s| (s.start, s.end)));
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'d> IntoIterator for &'d Diagnostics {
    type Item = &'d Diagnostic;
    type IntoIter = std::slice::Iter<'d, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_span() {
        let d = Diagnostic::duplicate_link("a", Span::new(10, 20));
        assert_eq!(
            d.to_string(),
            "link reference [a] already defined; later definition ignored at bytes 10..20"
        );
    }

    #[test]
    fn sorted_by_position() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::unreferenced_footnote("x", Span::new(40, 50)));
        diags.push(Diagnostic::new(DiagnosticKind::NestingLimit, "no span", None));
        diags.push(Diagnostic::ragged_row(2, 1, Span::new(5, 9)));
        diags.sort();
        let kinds: Vec<_> = diags.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DiagnosticKind::RaggedTableRow,
                DiagnosticKind::UnreferencedFootnote,
                DiagnosticKind::NestingLimit,
            ]
        );
        assert_eq!(diags.count(DiagnosticKind::NestingLimit), 1);
    }
}
