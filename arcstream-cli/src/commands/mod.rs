//! Command implementations for the arcstream CLI.

pub mod cat;
pub mod convert;
pub mod create;
pub mod extract;
pub mod list;

pub use cat::cmd_cat;
pub use convert::cmd_convert;
pub use create::cmd_create;
pub use extract::cmd_extract;
pub use list::cmd_list;

use crate::utils::GlobFilter;
use arcstream_archive::source::{ReadOptions, read};
use arcstream_archive::{FilterReader, codec_chain};
use arcstream_core::Reader;
use clap::{Args, ValueEnum};
use std::path::Path;

/// Result type of the commands.
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Number of archive levels to open; `all` lifts the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level(pub Option<usize>);

/// Parse `all`, `-1` or a number.
pub fn parse_level(value: &str) -> Result<Level, String> {
    match value {
        "all" | "-1" => Ok(Level(None)),
        _ => value
            .parse()
            .map(|n| Level(Some(n)))
            .map_err(|_| format!("expected a number or `all`, got {value:?}")),
    }
}

/// Source selection shared by the reading commands.
#[derive(Debug, Args)]
pub struct SourceArgs {
    /// File, directory or path inside an archive (`backup.tgz/etc/`)
    pub url: String,

    /// Archive levels to open below the path (number or `all`)
    #[arg(short = 'u', long = "uncompress", default_value = "0", value_parser = parse_level)]
    pub uncompress: Level,

    /// Directory levels to descend below the path
    #[arg(short = 'd', long = "depth")]
    pub depth: Option<usize>,

    /// Include only entries matching pattern (glob syntax: *.txt, src/**/*)
    #[arg(short = 'I', long)]
    pub include: Vec<String>,

    /// Exclude entries matching pattern (glob syntax)
    #[arg(short = 'X', long)]
    pub exclude: Vec<String>,
}

impl SourceArgs {
    /// The path actually read: an archive file named without a trailing
    /// slash is read for its content.
    pub fn resolved_url(&self) -> String {
        let url = &self.url;
        if !url.ends_with('/') && !codec_chain(url).is_empty() && Path::new(url).is_file() {
            format!("{url}/")
        } else {
            url.clone()
        }
    }

    /// Open the source with its filters applied.
    pub fn open(&self) -> CliResult<Box<dyn Reader>> {
        let options = ReadOptions::default()
            .with_uncompression(self.uncompress.0)
            .with_directory_depth(self.depth);
        let url = self.resolved_url();
        log::debug!("reading {url:?} with {options:?}");
        let reader = read(&url, &options)?;

        let filter = GlobFilter::new(&self.include, &self.exclude)?;
        if filter.is_empty() {
            Ok(reader)
        } else {
            Ok(Box::new(FilterReader::new(filter, reader)))
        }
    }
}

/// Compression level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum CompressionLevel {
    /// Store without compression
    Store,
    /// Fast compression
    Fast,
    /// Normal compression (default)
    #[default]
    Normal,
    /// Best compression
    Best,
}

impl CompressionLevel {
    /// Numeric level (0-9) handed to the encoders.
    pub fn level(self) -> u32 {
        match self {
            Self::Store => 0,
            Self::Fast => 1,
            Self::Normal => 6,
            Self::Best => 9,
        }
    }
}
