//! Recursive directory reader.

use crate::file::FileReader;
use arcstream_core::error::Result;
use arcstream_core::path;
use arcstream_core::{Reader, Stat};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Yields every regular file below a directory.
///
/// Entries are named by their path relative to the root, prefixed by an
/// optional symbolic name. Each file is served by a [`FileReader`].
pub struct DirectoryReader {
    root: PathBuf,
    symbolic: String,
    max_depth: Option<usize>,
    walker: Option<walkdir::IntoIter>,
    current: Option<FileReader>,
}

impl DirectoryReader {
    /// Walk `root` without a depth limit.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            symbolic: String::new(),
            max_depth: None,
            walker: None,
            current: None,
        }
    }

    /// Prefix every entry name with `name`.
    pub fn with_symbolic(mut self, name: &str) -> Self {
        self.symbolic = path::normalize(name);
        self
    }

    /// Descend at most `depth` directories below the root (0 = root files only).
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// The directory being walked.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn walker(&self) -> walkdir::IntoIter {
        let mut walk = WalkDir::new(&self.root).min_depth(1).sort_by_file_name();
        if let Some(depth) = self.max_depth {
            walk = walk.max_depth(depth + 1);
        }
        walk.into_iter()
    }
}

impl Reader for DirectoryReader {
    fn next(&mut self) -> Result<bool> {
        if self.walker.is_none() {
            self.walker = Some(self.walker());
        }
        self.current = None;

        let Some(walker) = self.walker.as_mut() else {
            return Ok(false);
        };
        for entry in walker.by_ref() {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .into_owned();
            let name = path::join(&self.symbolic, &path::normalize(&relative));

            let mut reader = FileReader::new(entry.path()).with_symbolic(&name);
            if reader.next()? {
                self.current = Some(reader);
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn filename(&self) -> String {
        self.current
            .as_ref()
            .map(|r| r.filename())
            .unwrap_or_default()
    }

    fn stat(&self) -> Stat {
        self.current.as_ref().map(|r| r.stat()).unwrap_or_default()
    }

    fn data_filename(&self) -> Option<PathBuf> {
        self.current.as_ref().and_then(|r| r.data_filename())
    }

    fn read_data(&mut self, length: Option<usize>) -> Result<Option<Vec<u8>>> {
        match self.current.as_mut() {
            Some(reader) => reader.read_data(length),
            None => Ok(None),
        }
    }

    fn skip(&mut self, length: u64) -> Result<u64> {
        match self.current.as_mut() {
            Some(reader) => reader.skip(length),
            None => Ok(0),
        }
    }

    fn close(&mut self) -> Result<()> {
        self.walker = None;
        self.current = None;
        Ok(())
    }
}
