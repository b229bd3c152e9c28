//! Cat command implementation.

use super::{CliResult, SourceArgs};
use arcstream_archive::source::to_output;
use arcstream_core::DEFAULT_BUFFER_SIZE;

pub fn cmd_cat(source: &SourceArgs, headers: bool) -> CliResult<()> {
    let mut reader = source.open()?;
    let mut output = to_output(headers);
    reader.extract(&mut output, true, DEFAULT_BUFFER_SIZE)?;
    Ok(())
}
