//! `cairn.toml` loading.
//!
//! ```toml
//! [parser]
//! profile = "gfm"
//! extensions = ["tables", "footnotes"]
//! max-nesting-depth = 64
//! ragged-rows = "end-table"
//! unreferenced-footnotes = "append"
//! ```
//!
//! Every key is optional. Command-line flags win over the file.

use std::fs;
use std::path::{Path, PathBuf};

use cairn_core::{Extension, Options, Profile, RaggedRows, UnreferencedFootnotes};
use serde::Deserialize;
use tracing::debug;

use crate::error::CliError;

pub const DEFAULT_CONFIG: &str = "cairn.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub parser: ParserConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ParserConfig {
    pub profile: Option<Profile>,
    /// Replaces the profile's extension set when present.
    pub extensions: Option<Vec<Extension>>,
    pub max_nesting_depth: Option<usize>,
    pub ragged_rows: Option<RaggedRows>,
    pub unreferenced_footnotes: Option<UnreferencedFootnotes>,
}

impl Config {
    /// Load `path`, or `./cairn.toml` if no path was given and it exists.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG);
                if !default.is_file() {
                    return Ok(Self::default());
                }
                default
            }
        };
        debug!(path = %path.display(), "loading config");
        let text = fs::read_to_string(&path).map_err(|source| CliError::Read {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| CliError::Config { path, source })
    }

    /// Parser options from the file, with `--commonmark` applied on top.
    pub fn options(&self, commonmark: bool) -> Options {
        let parser = &self.parser;
        let profile = if commonmark {
            Profile::CommonMark
        } else {
            parser.profile.unwrap_or_default()
        };
        let mut options = Options::new(profile);
        if let Some(extensions) = &parser.extensions {
            if !commonmark {
                options.extensions = extensions.clone();
            }
        }
        if let Some(depth) = parser.max_nesting_depth {
            options.max_nesting_depth = depth;
        }
        if let Some(policy) = parser.ragged_rows {
            options.ragged_rows = policy;
        }
        if let Some(policy) = parser.unreferenced_footnotes {
            options.unreferenced_footnotes = policy;
        }
        options
    }
}
