//! cairn CLI - parse, inspect and reformat Markdown documents
//!
//! Usage:
//!   cairn [OPTIONS] <COMMAND> <FILE>
//!
//! Commands:
//!   events  Print the event stream
//!   fmt     Rewrite as canonical Markdown
//!   stats   Count blocks by kind
//!   check   Report diagnostics

mod cli;
mod config;
mod error;

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process::ExitCode;

use cairn_core::{
    to_markdown, Alignment, Block, CodeBlockKind, Diagnostic, Document, Event, LinkType, Options,
    Parser, Tag, TagEnd,
};
use clap::Parser as _;
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::error::CliError;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Diagnostics(count)) => {
            debug!(count, "check found diagnostics");
            ExitCode::from(1)
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let options = config.options(cli.commonmark);
    debug!(?options, "parser options");

    let input = read_input(cli.command.file())?;
    let parser = Parser::with_options(options);
    let mut stdout = io::stdout().lock();

    match &cli.command {
        Command::Events { json, .. } => cmd_events(&parser, &input, *json, &mut stdout),
        Command::Fmt { .. } => cmd_fmt(&parser, &input, &mut stdout),
        Command::Stats { json, .. } => cmd_stats(&parser, &input, *json, &mut stdout),
        Command::Check { file, json } => cmd_check(&parser, &input, file, *json, &mut stdout),
    }
}

fn read_input(path: &Path) -> Result<String, CliError> {
    let read_error = |source| CliError::Read {
        path: path.to_path_buf(),
        source,
    };
    if path == Path::new("-") {
        let mut input = String::new();
        io::stdin().read_to_string(&mut input).map_err(read_error)?;
        Ok(input)
    } else {
        fs::read_to_string(path).map_err(read_error)
    }
}

// =============================================================================
// Events Command
// =============================================================================

fn cmd_events(parser: &Parser, input: &str, json: bool, out: &mut impl Write) -> Result<(), CliError> {
    let events: Vec<Event> = parser.parse(input).into_events().collect();
    if json {
        let mirror: Vec<JsonEvent> = events.iter().map(JsonEvent::from).collect();
        serde_json::to_writer_pretty(&mut *out, &mirror)?;
        writeln!(out)?;
        return Ok(());
    }

    let mut depth = 0usize;
    for event in &events {
        if let Event::End(_) = event {
            depth = depth.saturating_sub(1);
        }
        writeln!(out, "{:indent$}{:?}", "", event, indent = depth * 2)?;
        if let Event::Start(_) = event {
            depth += 1;
        }
    }
    Ok(())
}

// =============================================================================
// Fmt Command
// =============================================================================

fn cmd_fmt(parser: &Parser, input: &str, out: &mut impl Write) -> Result<(), CliError> {
    let markdown = to_markdown(parser.parse(input));
    out.write_all(markdown.as_bytes())?;
    Ok(())
}

// =============================================================================
// Stats Command
// =============================================================================

fn cmd_stats(parser: &Parser, input: &str, json: bool, out: &mut impl Write) -> Result<(), CliError> {
    let result = parser.parse_with_diagnostics(input);
    let stats = DocumentStats::from_document(&result.document, input, result.diagnostics.len());

    if json {
        let report = StatsReport {
            options: parser.options(),
            stats: &stats,
        };
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "Document Statistics")?;
    writeln!(out, "-------------------")?;
    writeln!(out, "Profile:          {:?}", parser.options().profile)?;
    writeln!(out)?;
    writeln!(out, "Blocks:")?;
    writeln!(out, "  Total:          {}", stats.blocks)?;
    writeln!(out, "  Headings:       {}", stats.headings)?;
    writeln!(out, "  Paragraphs:     {}", stats.paragraphs)?;
    writeln!(out, "  Block quotes:   {}", stats.block_quotes)?;
    writeln!(out, "  Lists:          {}", stats.lists)?;
    writeln!(out, "  List items:     {}", stats.items)?;
    writeln!(out, "  Code blocks:    {}", stats.code_blocks)?;
    writeln!(out, "  HTML blocks:    {}", stats.html_blocks)?;
    writeln!(out, "  Tables:         {}", stats.tables)?;
    writeln!(out, "  Rules:          {}", stats.thematic_breaks)?;
    writeln!(out)?;
    writeln!(out, "References:")?;
    writeln!(out, "  Links:          {}", stats.link_definitions)?;
    writeln!(out, "  Footnotes:      {}", stats.footnotes)?;
    writeln!(out)?;
    writeln!(out, "Size:")?;
    writeln!(out, "  Bytes:          {}", stats.bytes)?;
    writeln!(out, "  Lines:          {}", stats.lines)?;
    writeln!(out)?;
    writeln!(out, "Diagnostics:      {}", stats.diagnostics)?;
    Ok(())
}

#[derive(Serialize)]
struct StatsReport<'a> {
    options: &'a Options,
    stats: &'a DocumentStats,
}

#[derive(Debug, Default, Serialize)]
struct DocumentStats {
    blocks: usize,
    headings: usize,
    paragraphs: usize,
    block_quotes: usize,
    lists: usize,
    items: usize,
    code_blocks: usize,
    html_blocks: usize,
    tables: usize,
    thematic_breaks: usize,
    link_definitions: usize,
    footnotes: usize,
    bytes: usize,
    lines: usize,
    diagnostics: usize,
}

impl DocumentStats {
    fn from_document(doc: &Document, input: &str, diagnostics: usize) -> Self {
        let mut stats = Self {
            link_definitions: doc.refs.link_count(),
            footnotes: doc.refs.footnote_count(),
            bytes: input.len(),
            lines: input.lines().count(),
            diagnostics,
            ..Self::default()
        };
        stats.count_blocks(&doc.blocks);
        for footnote in doc.refs.footnotes() {
            stats.count_blocks(&footnote.blocks);
        }
        stats
    }

    fn count_blocks(&mut self, blocks: &[Block]) {
        for block in blocks {
            self.blocks += 1;
            match block {
                Block::Heading(_) => self.headings += 1,
                Block::Paragraph(_) => self.paragraphs += 1,
                Block::BlockQuote(q) => {
                    self.block_quotes += 1;
                    self.count_blocks(&q.blocks);
                }
                Block::List(l) => {
                    self.lists += 1;
                    self.items += l.items.len();
                    for item in &l.items {
                        self.count_blocks(&item.blocks);
                    }
                }
                Block::CodeBlock(_) => self.code_blocks += 1,
                Block::HtmlBlock(_) => self.html_blocks += 1,
                Block::Table(_) => self.tables += 1,
                Block::ThematicBreak(_) => self.thematic_breaks += 1,
            }
        }
    }
}

// =============================================================================
// Check Command
// =============================================================================

fn cmd_check(
    parser: &Parser,
    input: &str,
    file: &Path,
    json: bool,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let result = parser.parse_with_diagnostics(input);
    let count = result.diagnostics.len();

    if json {
        let report: Vec<JsonDiagnostic> = result
            .diagnostics
            .iter()
            .map(|d| JsonDiagnostic::new(d, input))
            .collect();
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
    } else {
        for diagnostic in &result.diagnostics {
            let line = diagnostic.span.map_or(0, |span| line_of(input, span.start));
            writeln!(
                out,
                "{}:{}: {}: {}",
                file.display(),
                line,
                diagnostic.kind.name(),
                diagnostic.message
            )?;
        }
        if count == 0 {
            writeln!(out, "{}: no diagnostics", file.display())?;
        }
    }

    if count == 0 {
        Ok(())
    } else {
        Err(CliError::Diagnostics(count))
    }
}

/// 1-based line number of a byte offset.
fn line_of(input: &str, offset: u32) -> usize {
    let end = (offset as usize).min(input.len());
    input.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    kind: &'static str,
    message: &'a str,
    line: Option<usize>,
    start: Option<u32>,
    end: Option<u32>,
}

impl<'a> JsonDiagnostic<'a> {
    fn new(diagnostic: &'a Diagnostic, input: &str) -> Self {
        Self {
            kind: diagnostic.kind.name(),
            message: &diagnostic.message,
            line: diagnostic.span.map(|span| line_of(input, span.start)),
            start: diagnostic.span.map(|span| span.start),
            end: diagnostic.span.map(|span| span.end),
        }
    }
}

// =============================================================================
// JSON Event Output
// =============================================================================

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum JsonEvent<'a> {
    Start { tag: JsonTag<'a> },
    End { tag: &'static str },
    Text { content: &'a str },
    Code { content: &'a str },
    Html { content: &'a str },
    InlineHtml { content: &'a str },
    FootnoteReference { label: &'a str },
    SoftBreak,
    HardBreak,
    Rule,
    TaskListMarker { checked: bool },
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum JsonTag<'a> {
    Paragraph,
    Heading {
        level: u8,
    },
    BlockQuote,
    CodeBlock {
        fenced: bool,
        info: &'a str,
    },
    HtmlBlock,
    List {
        start: Option<u64>,
        tight: bool,
    },
    Item,
    FootnoteDefinition {
        label: &'a str,
    },
    Table {
        alignments: &'a [Alignment],
    },
    TableHead,
    TableRow,
    TableCell,
    Emphasis,
    Strong,
    Strikethrough,
    Link {
        link_type: &'static str,
        dest: &'a str,
        title: &'a str,
        id: &'a str,
    },
    Image {
        link_type: &'static str,
        dest: &'a str,
        title: &'a str,
        id: &'a str,
    },
}

impl<'a> From<&'a Event<'a>> for JsonEvent<'a> {
    fn from(event: &'a Event<'a>) -> Self {
        match event {
            Event::Start(tag) => JsonEvent::Start {
                tag: JsonTag::from(tag),
            },
            Event::End(end) => JsonEvent::End {
                tag: tag_end_name(*end),
            },
            Event::Text(t) => JsonEvent::Text { content: t },
            Event::Code(c) => JsonEvent::Code { content: c },
            Event::Html(h) => JsonEvent::Html { content: h },
            Event::InlineHtml(h) => JsonEvent::InlineHtml { content: h },
            Event::FootnoteReference(label) => JsonEvent::FootnoteReference { label },
            Event::SoftBreak => JsonEvent::SoftBreak,
            Event::HardBreak => JsonEvent::HardBreak,
            Event::Rule => JsonEvent::Rule,
            Event::TaskListMarker(checked) => JsonEvent::TaskListMarker { checked: *checked },
        }
    }
}

impl<'a> From<&'a Tag<'a>> for JsonTag<'a> {
    fn from(tag: &'a Tag<'a>) -> Self {
        match tag {
            Tag::Paragraph => JsonTag::Paragraph,
            Tag::Heading { level } => JsonTag::Heading { level: *level },
            Tag::BlockQuote => JsonTag::BlockQuote,
            Tag::CodeBlock(CodeBlockKind::Indented) => JsonTag::CodeBlock {
                fenced: false,
                info: "",
            },
            Tag::CodeBlock(CodeBlockKind::Fenced(info)) => JsonTag::CodeBlock { fenced: true, info },
            Tag::HtmlBlock => JsonTag::HtmlBlock,
            Tag::List { start, tight } => JsonTag::List {
                start: *start,
                tight: *tight,
            },
            Tag::Item => JsonTag::Item,
            Tag::FootnoteDefinition(label) => JsonTag::FootnoteDefinition { label },
            Tag::Table(alignments) => JsonTag::Table { alignments },
            Tag::TableHead => JsonTag::TableHead,
            Tag::TableRow => JsonTag::TableRow,
            Tag::TableCell => JsonTag::TableCell,
            Tag::Emphasis => JsonTag::Emphasis,
            Tag::Strong => JsonTag::Strong,
            Tag::Strikethrough => JsonTag::Strikethrough,
            Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            } => JsonTag::Link {
                link_type: link_type_name(*link_type),
                dest: dest_url,
                title,
                id,
            },
            Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            } => JsonTag::Image {
                link_type: link_type_name(*link_type),
                dest: dest_url,
                title,
                id,
            },
        }
    }
}

fn link_type_name(link_type: LinkType) -> &'static str {
    match link_type {
        LinkType::Inline => "inline",
        LinkType::Reference => "reference",
        LinkType::Collapsed => "collapsed",
        LinkType::Shortcut => "shortcut",
        LinkType::Autolink => "autolink",
        LinkType::Email => "email",
    }
}

fn tag_end_name(end: TagEnd) -> &'static str {
    match end {
        TagEnd::Paragraph => "paragraph",
        TagEnd::Heading(_) => "heading",
        TagEnd::BlockQuote => "block_quote",
        TagEnd::CodeBlock => "code_block",
        TagEnd::HtmlBlock => "html_block",
        TagEnd::List(_) => "list",
        TagEnd::Item => "item",
        TagEnd::FootnoteDefinition => "footnote_definition",
        TagEnd::Table => "table",
        TagEnd::TableHead => "table_head",
        TagEnd::TableRow => "table_row",
        TagEnd::TableCell => "table_cell",
        TagEnd::Emphasis => "emphasis",
        TagEnd::Strong => "strong",
        TagEnd::Strikethrough => "strikethrough",
        TagEnd::Link => "link",
        TagEnd::Image => "image",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_numbers_are_one_based() {
        let input = "a\nb\nc";
        assert_eq!(line_of(input, 0), 1);
        assert_eq!(line_of(input, 2), 2);
        assert_eq!(line_of(input, 4), 3);
        assert_eq!(line_of(input, 99), 3);
    }

    #[test]
    fn stats_walk_nested_blocks() {
        let input = "# t\n\n> - a\n>   - b\n\n```\nx\n```\n\n[^n]: note\n";
        let doc = Parser::default().parse(input);
        let stats = DocumentStats::from_document(&doc, input, 0);
        assert_eq!(stats.headings, 1);
        assert_eq!(stats.block_quotes, 1);
        assert_eq!(stats.lists, 2);
        assert_eq!(stats.items, 2);
        assert_eq!(stats.code_blocks, 1);
        assert_eq!(stats.footnotes, 1);
        // a, b and the footnote body
        assert_eq!(stats.paragraphs, 3);
    }

    #[test]
    fn json_events_are_tagged() {
        let events: Vec<Event> = Parser::default().parse("*a*").into_events().collect();
        let mirror: Vec<JsonEvent> = events.iter().map(JsonEvent::from).collect();
        let value = serde_json::to_value(&mirror).unwrap();
        assert_eq!(value[0]["type"], "start");
        assert_eq!(value[0]["tag"]["kind"], "paragraph");
        assert_eq!(value[1]["tag"]["kind"], "emphasis");
        assert_eq!(value[2]["content"], "a");
        assert_eq!(value[3]["tag"], "emphasis");
    }
}
