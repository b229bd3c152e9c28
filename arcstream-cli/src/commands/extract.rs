//! Extract command implementation.

use super::{CliResult, SourceArgs};
use crate::utils::create_spinner;
use arcstream_archive::source::to_files;
use arcstream_core::{DEFAULT_BUFFER_SIZE, Reader, Result, Writer};
use indicatif::ProgressBar;
use std::path::Path;

fn copy_entries(
    reader: &mut dyn Reader,
    writer: &mut dyn Writer,
    progress: &ProgressBar,
) -> Result<u64> {
    let mut count = 0;
    while reader.next()? {
        let name = reader.filename();
        progress.set_message(name.clone());
        writer.new_file(&name, &reader.stat(), &reader.mime())?;
        reader.send_data(writer, DEFAULT_BUFFER_SIZE)?;
        progress.inc(1);
        count += 1;
    }
    Ok(count)
}

/// Copy every entry of `reader` into `writer`, reporting each one on
/// `progress`. Both ends are closed; the first error wins.
pub fn copy_with_progress(
    reader: &mut dyn Reader,
    writer: &mut dyn Writer,
    progress: &ProgressBar,
) -> Result<u64> {
    let outcome = copy_entries(reader, writer, progress);
    let closed = reader.close();
    let writer_closed = writer.close();
    let count = outcome?;
    closed?;
    writer_closed?;
    Ok(count)
}

pub fn cmd_extract(source: &SourceArgs, output: &Path, progress: bool) -> CliResult<()> {
    let mut reader = source.open()?;
    let mut writer = to_files(output);
    let pb = create_spinner(progress)?;

    let count = copy_with_progress(reader.as_mut(), &mut writer, &pb)?;
    pb.finish_with_message(format!("extracted to {}", output.display()));
    log::info!("extracted {count} file(s) to {}", output.display());
    Ok(())
}
