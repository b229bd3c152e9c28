//! Convert command implementation.

use super::create::{OutputFormat, write_archive};
use super::{CliResult, CompressionLevel, SourceArgs};
use std::path::Path;

pub fn cmd_convert(
    source: &SourceArgs,
    output: &Path,
    format: Option<OutputFormat>,
    compression: CompressionLevel,
    progress: bool,
) -> CliResult<()> {
    let mut reader = source.open()?;
    let count = write_archive(reader.as_mut(), output, format, compression, progress)?;
    log::info!("converted {count} file(s) into {}", output.display());
    Ok(())
}
