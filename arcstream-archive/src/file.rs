//! Reader over a single physical file.

use arcstream_core::error::Result;
use arcstream_core::path;
use arcstream_core::{Reader, Stat};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Exposes one file of the filesystem as a single entry.
///
/// The file is opened by the first [`Reader::next`] and released by the
/// second one or by [`Reader::close`].
pub struct FileReader {
    path: PathBuf,
    symbolic: String,
    file: Option<File>,
    stat: Stat,
    consumed: bool,
}

impl FileReader {
    /// Read `path`, naming the entry after the normalized path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let symbolic = path::normalize(&path.to_string_lossy());
        Self {
            path,
            symbolic,
            file: None,
            stat: Stat::default(),
            consumed: false,
        }
    }

    /// Use `name` as the entry name instead of the path.
    pub fn with_symbolic(mut self, name: &str) -> Self {
        self.symbolic = path::normalize(name);
        self
    }

    /// The physical path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Reader for FileReader {
    fn next(&mut self) -> Result<bool> {
        if self.consumed {
            self.file = None;
            return Ok(false);
        }
        let file = File::open(&self.path)?;
        self.stat = Stat::from_metadata(&file.metadata()?);
        self.file = Some(file);
        self.consumed = true;
        Ok(true)
    }

    fn filename(&self) -> String {
        if self.file.is_some() {
            self.symbolic.clone()
        } else {
            String::new()
        }
    }

    fn stat(&self) -> Stat {
        if self.file.is_some() {
            self.stat
        } else {
            Stat::default()
        }
    }

    fn data_filename(&self) -> Option<PathBuf> {
        self.file.as_ref().map(|_| self.path.clone())
    }

    fn read_data(&mut self, length: Option<usize>) -> Result<Option<Vec<u8>>> {
        let Some(file) = self.file.as_mut() else {
            return Ok(None);
        };
        let mut data = Vec::new();
        match length {
            Some(n) => {
                file.by_ref().take(n as u64).read_to_end(&mut data)?;
            }
            None => {
                file.read_to_end(&mut data)?;
            }
        }
        if data.is_empty() && length != Some(0) {
            return Ok(None);
        }
        Ok(Some(data))
    }

    fn skip(&mut self, length: u64) -> Result<u64> {
        let size = self.stat.size.unwrap_or(0);
        let Some(file) = self.file.as_mut() else {
            return Ok(0);
        };
        let pos = file.stream_position()?;
        let n = length.min(size.saturating_sub(pos));
        file.seek(SeekFrom::Current(n as i64))?;
        Ok(n)
    }

    fn close(&mut self) -> Result<()> {
        self.file = None;
        self.consumed = false;
        Ok(())
    }
}
