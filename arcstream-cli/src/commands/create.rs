//! Create command implementation.

use super::extract::copy_with_progress;
use super::{CliResult, CompressionLevel};
use crate::utils::create_spinner;
use arcstream_archive::MultiReader;
use arcstream_archive::source::{ReadOptions, read, to_archive_with_level, to_files};
use arcstream_core::Reader;
use clap::ValueEnum;
use std::path::{Path, PathBuf};

/// Output archive format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// TAR archive
    Tar,
    /// ZIP archive
    Zip,
    /// GZIP compressed file
    Gz,
    /// Bzip2 compressed file
    Bz2,
    /// Unix ar archive
    Ar,
    /// TAR archive inside GZIP
    Tgz,
    /// TAR archive inside Bzip2
    Tbz,
}

impl OutputFormat {
    /// Extension naming the format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Tar => "tar",
            Self::Zip => "zip",
            Self::Gz => "gz",
            Self::Bz2 => "bz2",
            Self::Ar => "ar",
            Self::Tgz => "tgz",
            Self::Tbz => "tbz",
        }
    }
}

/// Read every input under its own file name.
pub fn build_source(inputs: &[PathBuf]) -> CliResult<MultiReader> {
    let mut multi = MultiReader::new();
    for input in inputs {
        let mut options = ReadOptions::default();
        if let Some(name) = input.file_name() {
            options = options.with_symbolic(name.to_string_lossy());
        }
        multi.add_source(read(&input.to_string_lossy(), &options)?);
    }
    Ok(multi)
}

/// Write the entries of `reader` into the archive file `archive`.
pub fn write_archive(
    reader: &mut dyn Reader,
    archive: &Path,
    format: Option<OutputFormat>,
    compression: CompressionLevel,
    progress: bool,
) -> CliResult<u64> {
    let name = archive
        .file_name()
        .ok_or("archive path has no file name")?
        .to_string_lossy()
        .into_owned();
    let dir = match archive.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut writer = to_archive_with_level(
        &name,
        Box::new(to_files(dir)),
        format.map(OutputFormat::extension),
        Some(compression.level()),
    )?;
    let pb = create_spinner(progress)?;
    let count = copy_with_progress(reader, writer.as_mut(), &pb)?;
    pb.finish_with_message(format!("wrote {}", archive.display()));
    Ok(count)
}

pub fn cmd_create(
    archive: &Path,
    inputs: &[PathBuf],
    format: Option<OutputFormat>,
    compression: CompressionLevel,
    progress: bool,
) -> CliResult<()> {
    if inputs.is_empty() {
        return Err("no input files".into());
    }
    let mut source = build_source(inputs)?;
    let count = write_archive(&mut source, archive, format, compression, progress)?;
    log::info!("added {count} file(s) to {}", archive.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::list::collect_entries;
    use std::fs;

    #[test]
    fn test_create_then_list() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir_all(docs.join("sub")).unwrap();
        fs::write(docs.join("a.txt"), b"alpha").unwrap();
        fs::write(docs.join("sub/b.txt"), b"beta").unwrap();
        let single = dir.path().join("single.txt");
        fs::write(&single, b"single").unwrap();

        let archive = dir.path().join("out.tar.gz");
        cmd_create(&archive, &[docs, single], None, CompressionLevel::Best, false).unwrap();

        let url = format!("{}/", archive.display());
        let mut reader = read(&url, &ReadOptions::default()).unwrap();
        let names: Vec<String> = collect_entries(reader.as_mut())
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["docs/a.txt", "docs/sub/b.txt", "single.txt"]);
    }

    #[test]
    fn test_explicit_format() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("note.txt");
        fs::write(&input, b"note").unwrap();

        let archive = dir.path().join("bundle.bin");
        cmd_create(&archive, &[input], Some(OutputFormat::Zip), CompressionLevel::Store, false)
            .unwrap();
        let data = fs::read(&archive).unwrap();
        assert_eq!(&data[..4], b"PK\x03\x04");
    }

    #[test]
    fn test_no_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("empty.tar");
        assert!(cmd_create(&archive, &[], None, CompressionLevel::Normal, false).is_err());
    }
}
