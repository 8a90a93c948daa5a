//! # Cairn Core
//!
//! A streaming CommonMark parser with the GFM extensions.
//!
//! Input is parsed into a block tree in one pass over its lines, link
//! references and footnotes are collected into a per-document table, and
//! inline content is resolved against that table in a second pass. The
//! resulting [`Document`] is consumed as a flat stream of [`Event`]s.
//!
//! Parsing never fails: every input produces a document. Anomalies worth
//! reporting are collected as [`Diagnostics`] on request.
//!
//! ## Quick Start
//!
//! ```rust
//! use cairn_core::{Event, Parser, Profile, Tag};
//!
//! let input = "# Hello World\n\nThis is a **paragraph**.";
//! let parser = Parser::new(Profile::Gfm);
//! let doc = parser.parse(input);
//! println!("Parsed {} blocks", doc.blocks.len());
//!
//! let events: Vec<Event> = doc.into_events().collect();
//! assert_eq!(events[0], Event::Start(Tag::Heading { level: 1 }));
//! ```
//!
//! ## Diagnostics
//!
//! ```rust
//! use cairn_core::{DiagnosticKind, Parser, Profile};
//!
//! let input = "[a]: /one\n[a]: /two\n\n[a]\n";
//! let result = Parser::new(Profile::Gfm).parse_with_diagnostics(input);
//!
//! // The first definition wins, the second one is reported.
//! assert_eq!(result.diagnostics.count(DiagnosticKind::DuplicateLinkDefinition), 1);
//! ```
//!
//! ## Profiles
//!
//! - `Profile::Gfm` - CommonMark plus tables, footnotes, strikethrough and task lists
//! - `Profile::CommonMark` - CommonMark core only

pub mod ast;
mod block;
pub mod diagnostic;
pub mod events;
mod inline;
pub mod lexer;
pub mod parser;
pub mod refs;
mod scan;
pub mod span;
mod table;
pub mod writer;

pub use ast::{Block, Content, Document, Extension, Profile, RaggedRows, UnreferencedFootnotes};
pub use diagnostic::{Diagnostic, DiagnosticKind, Diagnostics};
pub use events::{Alignment, CodeBlockKind, Event, Events, LinkType, Tag, TagEnd};
pub use parser::{Options, ParseResult, Parser};
pub use span::Span;
pub use writer::to_markdown;
