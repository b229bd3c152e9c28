//! Entry points building reader and writer pipelines.
//!
//! [`read`] resolves a virtual path such as `backup.tar.gz/docs/` to a
//! reader: directories are walked, plain files read as one entry, and paths
//! reaching into an archive open the archive and keep only the requested
//! subtree. [`to_archive`] builds the writer side, stacking the encoders a
//! compound name like `site.tar.gz` calls for.

use crate::ar::ArWriter;
use crate::bzip2::Bzip2Writer;
use crate::codec::ArchiveKind;
use crate::concat::ConcatReader;
use crate::directory::DirectoryReader;
use crate::file::FileReader;
use crate::files::FilesWriter;
use crate::filter::FilterReader;
use crate::gzip::GzipWriter;
use crate::memory::{MemoryReader, MemoryWriter};
use crate::multi::{MultiReader, MultiWriter};
use crate::output::OutputWriter;
use crate::predicate::{self, Predicate};
use crate::rename::{AddBaseName, ChangeBaseName};
use crate::tar::TarWriter;
use crate::uncompress::UncompressReader;
use crate::zip::ZipWriter;
use arcstream_core::error::{ArcError, Result};
use arcstream_core::{Reader, Stat, Writer, path};
use log::debug;
use std::io;
use std::path::{Path, PathBuf};

pub use crate::codec::{codec_chain, is_known_extension};

/// How [`read`] resolves a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// Name the result is exposed under. Defaults to the last path segment
    /// for single entries and to nothing for directories.
    pub symbolic: Option<String>,
    /// Archive levels opened below the requested path (`None` = all).
    pub uncompression: Option<usize>,
    /// Directory levels kept below the requested path (`None` = all).
    pub directory_depth: Option<usize>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            symbolic: None,
            uncompression: Some(0),
            directory_depth: None,
        }
    }
}

impl ReadOptions {
    /// Expose the result under `name`.
    pub fn with_symbolic(mut self, name: impl Into<String>) -> Self {
        self.symbolic = Some(name.into());
        self
    }

    /// Open archives up to `level` levels deep (`None` for no limit).
    pub fn with_uncompression(mut self, level: Option<usize>) -> Self {
        self.uncompression = level;
        self
    }

    /// Keep entries at most `depth` directories below the requested path.
    pub fn with_directory_depth(mut self, depth: Option<usize>) -> Self {
        self.directory_depth = depth;
        self
    }

    /// Archives nested deeper than the kept directories cannot contribute
    /// entries, so the uncompression level never exceeds the depth.
    fn uncompression_level(&self) -> Option<usize> {
        match (self.uncompression, self.directory_depth) {
            (Some(level), Some(depth)) => Some(level.min(depth)),
            (level, _) => level,
        }
    }

    /// Symbolic name of a single entry: the given one or the last segment of
    /// the path.
    fn entry_symbolic(&self, url: &str) -> String {
        match &self.symbolic {
            Some(name) => name.clone(),
            None => path::basename(url).to_string(),
        }
    }
}

/// Read the file, directory or archive content named by `url`.
///
/// * An empty `url` or a directory yields every file below it.
/// * An existing file yields one entry, named after its last segment.
/// * Otherwise the longest prefix naming an archive file is opened and the
///   rest of `url` is looked up inside it (`site.tgz/docs/` or
///   `site.tgz/docs/index.html`). A trailing `/` after an archive lists its
///   content.
///
/// Failing lookups report [`ArcError::NotFound`].
pub fn read(url: &str, options: &ReadOptions) -> Result<Box<dyn Reader>> {
    let std_url = path::normalize(url);
    let physical = if url.is_empty() { Path::new(".") } else { Path::new(url) };

    if physical.is_dir() {
        debug!("reading directory {}", physical.display());
        let walker = DirectoryReader::new(physical).with_max_depth(options.directory_depth);
        let reader = UncompressReader::new(Box::new(walker), options.uncompression_level());
        let mut result: Box<dyn Reader> = Box::new(reader);
        if let Some(depth) = options.directory_depth {
            result = Box::new(FilterReader::new(predicate::max_depth(depth), result));
        }
        if let Some(symbolic) = options.symbolic.as_deref().filter(|s| !s.is_empty()) {
            result = Box::new(AddBaseName::new(symbolic, result));
        }
        return Ok(result);
    }

    if physical.is_file() && !url.ends_with('/') {
        let name = options.entry_symbolic(&std_url);
        return Ok(Box::new(FileReader::new(physical).with_symbolic(&name)));
    }

    let archive = archive_prefix(&std_url, |prefix| Path::new(prefix).is_dir());
    if !Path::new(archive).is_file() {
        return Err(ArcError::not_found(url));
    }
    debug!("reading {:?} inside {:?}", std_url, archive);
    let file = FileReader::new(archive);
    open_inside(Box::new(file), &std_url, options)
}

/// Like [`read`], looking `url` up among the entries of `source` instead of
/// the filesystem.
///
/// The first prefix of `url` carrying an archive extension selects the
/// entry holding the archive.
pub fn read_source(
    source: Box<dyn Reader>,
    url: &str,
    options: &ReadOptions,
) -> Result<Box<dyn Reader>> {
    let std_url = path::normalize(url);
    let archive = archive_prefix(&std_url, |_| false).to_string();
    let selected = FilterReader::new(predicate::select(&archive), source);
    open_inside(Box::new(selected), &std_url, options)
}

/// First `/`-delimited prefix of `url` ending with an archive extension and
/// not rejected by `is_dir`, or the whole of `url`.
fn archive_prefix(url: &str, is_dir: impl Fn(&str) -> bool) -> &str {
    let trimmed = url.trim_end_matches('/');
    let ends = trimmed
        .match_indices('/')
        .map(|(pos, _)| pos)
        .filter(|&pos| pos > 0)
        .chain(std::iter::once(trimmed.len()));
    for end in ends {
        let prefix = &trimmed[..end];
        let known = path::extension(prefix).is_some_and(is_known_extension);
        if known && !is_dir(prefix) {
            return prefix;
        }
    }
    trimmed
}

/// Walk `source` down to `url` and rename the found subtree after the
/// symbolic name.
fn open_inside(
    source: Box<dyn Reader>,
    url: &str,
    options: &ReadOptions,
) -> Result<Box<dyn Reader>> {
    let mut reader = UncompressReader::new(source, options.uncompression_level());
    let is_dir = reader.set_base_dir(url)?;

    let symbolic = match (&options.symbolic, is_dir) {
        (Some(name), _) => path::normalize(name),
        (None, true) => String::new(),
        (None, false) => options.entry_symbolic(url),
    };

    let mut result: Box<dyn Reader> = Box::new(ChangeBaseName::new(url, "", Box::new(reader)));
    if let Some(depth) = options.directory_depth {
        result = Box::new(FilterReader::new(predicate::max_depth(depth), result));
    }
    if !symbolic.is_empty() {
        result = Box::new(AddBaseName::new(&symbolic, result));
    }
    Ok(result)
}

/// Read `data` as a single entry named `name`.
pub fn read_memory(data: impl Into<Vec<u8>>, name: &str) -> MemoryReader {
    MemoryReader::new(data, name)
}

/// Read the entries of every source in turn.
pub fn read_multi(sources: impl IntoIterator<Item = Box<dyn Reader>>) -> MultiReader {
    let mut multi = MultiReader::new();
    for source in sources {
        multi.add_source(source);
    }
    multi
}

/// Read all entries of `source` as one entry named `filename`.
pub fn read_concat(source: Box<dyn Reader>, filename: &str, stat: Stat) -> Result<ConcatReader> {
    ConcatReader::new(source, filename, stat)
}

/// Keep the entries of `source` accepted by `predicate`.
pub fn filter<P: Predicate>(predicate: P, source: Box<dyn Reader>) -> FilterReader<P> {
    FilterReader::new(predicate, source)
}

/// Archive formats named by `kind` (`tar.gz`, `tgz`, `zip`, ...), innermost
/// layer first.
fn parse_kind(kind: &str) -> Result<Vec<ArchiveKind>> {
    let mut chain = Vec::new();
    for extension in kind.trim_start_matches('.').rsplit('.') {
        match ArchiveKind::for_extension(extension) {
            Some(kinds) => chain.extend_from_slice(kinds),
            None => return Err(ArcError::unsupported(format!("archive type {kind:?}"))),
        }
    }
    Ok(chain)
}

/// Write an archive named `filename` into `inner`.
///
/// The format comes from `kind`, or from the extensions of `filename` when
/// `kind` is `None`. Compound formats stack writers: `backup.tar.gz` gives a
/// tar writer over a gzip writer over `inner`. Unknown formats are
/// [`ArcError::Unsupported`].
pub fn to_archive(
    filename: &str,
    inner: Box<dyn Writer>,
    kind: Option<&str>,
) -> Result<Box<dyn Writer>> {
    to_archive_with_level(filename, inner, kind, None)
}

/// [`to_archive`] with an explicit compression level (0-9) for every layer.
pub fn to_archive_with_level(
    filename: &str,
    inner: Box<dyn Writer>,
    kind: Option<&str>,
    level: Option<u32>,
) -> Result<Box<dyn Writer>> {
    let chain = match kind {
        Some(kind) => parse_kind(kind)?,
        None => codec_chain(filename),
    };
    if chain.is_empty() {
        return Err(ArcError::unsupported(format!(
            "no archive format for {filename:?}"
        )));
    }

    let mut name = filename.to_string();
    let mut writer = inner;
    for (i, kind) in chain.iter().enumerate() {
        writer = archive_layer(*kind, &name, writer, level)?;
        name = inner_name(&name, chain.get(i + 1).copied());
    }
    Ok(writer)
}

/// Name the next layer announces to the layer holding it.
fn inner_name(name: &str, next: Option<ArchiveKind>) -> String {
    let stem = path::strip_extension(name);
    match next {
        Some(ArchiveKind::Tar) if !stem.ends_with(".tar") => format!("{stem}.tar"),
        _ => stem.to_string(),
    }
}

fn archive_layer(
    kind: ArchiveKind,
    name: &str,
    inner: Box<dyn Writer>,
    level: Option<u32>,
) -> Result<Box<dyn Writer>> {
    macro_rules! layer {
        ($writer:ty) => {{
            let mut writer = <$writer>::new(name, inner)?;
            if let Some(level) = level {
                writer = writer.with_level(level);
            }
            Box::new(writer) as Box<dyn Writer>
        }};
    }
    Ok(match kind {
        ArchiveKind::Tar => layer!(TarWriter<Box<dyn Writer>>),
        ArchiveKind::Zip => layer!(ZipWriter<Box<dyn Writer>>),
        ArchiveKind::Gzip => layer!(GzipWriter<Box<dyn Writer>>),
        ArchiveKind::Bzip2 => layer!(Bzip2Writer<Box<dyn Writer>>),
        ArchiveKind::Ar => layer!(ArWriter<Box<dyn Writer>>),
    })
}

/// Write entries as files below `base`.
pub fn to_files(base: impl Into<PathBuf>) -> FilesWriter {
    FilesWriter::new(base)
}

/// Write entries into a memory buffer.
pub fn to_memory() -> MemoryWriter {
    MemoryWriter::new()
}

/// Write every entry to both `a` and `b`.
pub fn to_multi<A: Writer, B: Writer>(a: A, b: B) -> MultiWriter<A, B> {
    MultiWriter::new(a, b)
}

/// Stream entry data to standard output.
pub fn to_output(headers: bool) -> OutputWriter<io::Stdout> {
    OutputWriter::new(io::stdout()).with_headers(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_prefix() {
        assert_eq!(archive_prefix("a/b.tar/c/d.txt", |_| false), "a/b.tar");
        assert_eq!(archive_prefix("b.tgz/", |_| false), "b.tgz");
        assert_eq!(archive_prefix("dir.zip/x.zip/y", |p| p == "dir.zip"), "dir.zip/x.zip");
        assert_eq!(archive_prefix("plain/path.txt", |_| false), "plain/path.txt");
        assert_eq!(archive_prefix("", |_| false), "");
        assert_eq!(archive_prefix("/srv/b.tar/c", |_| false), "/srv/b.tar");
    }

    #[test]
    fn test_archive_prefix_multibyte() {
        assert_eq!(archive_prefix("été.tar/x.txt", |_| false), "été.tar");
        assert_eq!(archive_prefix("données/日本.zip/ü", |_| false), "données/日本.zip");
        assert_eq!(archive_prefix("é", |_| false), "é");
    }

    #[test]
    fn test_multibyte_virtual_paths() {
        let mut tar = TarWriter::new("", MemoryWriter::new()).unwrap();
        tar.new_file("x.txt", &Stat::new(), "").unwrap();
        tar.write_data(b"X").unwrap();
        tar.close().unwrap();
        let bytes = tar.into_inner().into_inner();

        let source = read_memory(bytes, "été.tar");
        let mut reader =
            read_source(Box::new(source), "été.tar/x.txt", &ReadOptions::default()).unwrap();
        assert!(reader.next().unwrap());
        assert_eq!(reader.filename(), "x.txt");
        assert_eq!(reader.read_data(None).unwrap().unwrap(), b"X");

        let missing = read("été-absent.tar/x.txt", &ReadOptions::default());
        assert!(matches!(missing, Err(ArcError::NotFound { .. })));
    }

    #[test]
    fn test_uncompression_clamped_by_depth() {
        let options = ReadOptions::default()
            .with_uncompression(Some(3))
            .with_directory_depth(Some(1));
        assert_eq!(options.uncompression_level(), Some(1));
        let options = options.with_uncompression(None);
        assert_eq!(options.uncompression_level(), None);
    }

    #[test]
    fn test_parse_kind() {
        use ArchiveKind::*;
        assert_eq!(parse_kind("tar.gz").unwrap(), vec![Gzip, Tar]);
        assert_eq!(parse_kind(".tbz").unwrap(), vec![Bzip2, Tar]);
        assert!(matches!(parse_kind("rar"), Err(ArcError::Unsupported { .. })));
    }

    #[test]
    fn test_inner_names() {
        assert_eq!(inner_name("site.tar.gz", Some(ArchiveKind::Tar)), "site.tar");
        assert_eq!(inner_name("site.tgz", Some(ArchiveKind::Tar)), "site.tar");
        assert_eq!(inner_name("notes.txt.gz", None), "notes.txt");
    }

    #[test]
    fn test_compound_writer_chain() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer =
            to_archive("site.tar.gz", Box::new(to_files(dir.path())), None).unwrap();
        writer
            .new_file("index.html", &Stat::new().with_mtime(1), "text/html")
            .unwrap();
        writer.write_data(b"<html/>").unwrap();
        writer.close().unwrap();

        let archive = dir.path().join("site.tar.gz");
        let url = format!("{}/", archive.display());
        let mut reader = read(&url, &ReadOptions::default()).unwrap();
        assert!(reader.next().unwrap());
        assert_eq!(reader.filename(), "index.html");
        assert_eq!(reader.read_data(None).unwrap().unwrap(), b"<html/>");
        assert!(!reader.next().unwrap());
    }

    #[test]
    fn test_unknown_archive_kind() {
        let result = to_archive("notes.txt", Box::new(to_memory()), None);
        assert!(matches!(result, Err(ArcError::Unsupported { .. })));
        let result = to_archive("x.bin", Box::new(to_memory()), Some("7z"));
        assert!(matches!(result, Err(ArcError::Unsupported { .. })));
    }

    #[test]
    fn test_read_source_inside_archive() {
        let mut tar = TarWriter::new("", MemoryWriter::new()).unwrap();
        for (name, data) in [("docs/a.txt", "A"), ("docs/sub/b.txt", "B"), ("c.txt", "C")] {
            tar.new_file(name, &Stat::new(), "").unwrap();
            tar.write_data(data.as_bytes()).unwrap();
        }
        tar.close().unwrap();
        let bytes = tar.into_inner().into_inner();

        let source = read_multi([
            Box::new(read_memory("x", "other.txt")) as Box<dyn Reader>,
            Box::new(read_memory(bytes.clone(), "pkg/site.tar")),
        ]);
        let mut reader =
            read_source(Box::new(source), "pkg/site.tar/docs/", &ReadOptions::default()).unwrap();
        assert_eq!(reader.file_list().unwrap(), vec!["a.txt", "sub/b.txt"]);

        let source = read_memory(bytes, "site.tar");
        let mut reader = read_source(
            Box::new(source),
            "site.tar/docs/sub/b.txt",
            &ReadOptions::default(),
        )
        .unwrap();
        assert!(reader.next().unwrap());
        assert_eq!(reader.filename(), "b.txt");
        assert_eq!(reader.read_data(None).unwrap().unwrap(), b"B");
        assert!(!reader.next().unwrap());
    }
}
