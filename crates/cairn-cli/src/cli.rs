use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// cairn - Markdown parser and inspector
#[derive(Parser, Debug)]
#[command(name = "cairn")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults to ./cairn.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Parse CommonMark only, without the GFM extensions
    #[arg(long, global = true)]
    pub commonmark: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the event stream
    Events {
        /// Input file, `-` for stdin
        file: PathBuf,

        /// Output JSON instead of one event per line
        #[arg(short, long)]
        json: bool,
    },

    /// Rewrite a document as canonical Markdown
    Fmt {
        /// Input file, `-` for stdin
        file: PathBuf,
    },

    /// Count blocks by kind
    Stats {
        /// Input file, `-` for stdin
        file: PathBuf,

        #[arg(short, long)]
        json: bool,
    },

    /// Report diagnostics; exits with status 1 when there are any
    Check {
        /// Input file, `-` for stdin
        file: PathBuf,

        #[arg(short, long)]
        json: bool,
    },
}

impl Command {
    pub fn file(&self) -> &PathBuf {
        match self {
            Command::Events { file, .. }
            | Command::Fmt { file }
            | Command::Stats { file, .. }
            | Command::Check { file, .. } => file,
        }
    }
}
