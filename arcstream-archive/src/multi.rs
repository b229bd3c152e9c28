//! Fan-in of readers and fan-out of writers.

use arcstream_core::error::Result;
use arcstream_core::{Reader, Stat, Writer};
use std::path::{Path, PathBuf};

/// Union of several readers, visited in the order they were added.
///
/// A source is closed as soon as it runs out of entries.
#[derive(Default)]
pub struct MultiReader {
    sources: Vec<Box<dyn Reader>>,
    index: usize,
}

impl MultiReader {
    /// Create an empty union.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source.
    pub fn add_source(&mut self, source: Box<dyn Reader>) {
        self.sources.push(source);
    }

    /// Append a source, builder style.
    pub fn with_source(mut self, source: Box<dyn Reader>) -> Self {
        self.add_source(source);
        self
    }

    /// Number of sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether no source was added.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    fn current(&self) -> Option<&dyn Reader> {
        self.sources.get(self.index).map(|s| s.as_ref())
    }
}

impl Reader for MultiReader {
    fn next(&mut self) -> Result<bool> {
        while let Some(source) = self.sources.get_mut(self.index) {
            if source.next()? {
                return Ok(true);
            }
            source.close()?;
            self.index += 1;
        }
        Ok(false)
    }

    fn filename(&self) -> String {
        self.current().map(|s| s.filename()).unwrap_or_default()
    }

    fn stat(&self) -> Stat {
        self.current().map(|s| s.stat()).unwrap_or_default()
    }

    fn mime(&self) -> String {
        match self.current() {
            Some(source) => source.mime(),
            None => arcstream_core::mime::DEFAULT_MIME.to_string(),
        }
    }

    fn data_filename(&self) -> Option<PathBuf> {
        self.current()?.data_filename()
    }

    fn read_data(&mut self, length: Option<usize>) -> Result<Option<Vec<u8>>> {
        match self.sources.get_mut(self.index) {
            Some(source) => source.read_data(length),
            None => Ok(None),
        }
    }

    fn skip(&mut self, length: u64) -> Result<u64> {
        match self.sources.get_mut(self.index) {
            Some(source) => source.skip(length),
            None => Ok(0),
        }
    }

    fn close(&mut self) -> Result<()> {
        let mut outcome = Ok(());
        for source in self.sources.iter_mut().take(self.index + 1) {
            let closed = source.close();
            if outcome.is_ok() {
                outcome = closed;
            }
        }
        self.index = 0;
        outcome
    }
}

/// Duplicates every call to two writers.
///
/// Both writers always receive the call; the first error is reported.
pub struct MultiWriter<A, B> {
    a: A,
    b: B,
}

impl<A: Writer, B: Writer> MultiWriter<A, B> {
    /// Write to `a` and `b`.
    pub fn new(a: A, b: B) -> Self {
        Self { a, b }
    }

    /// Both writers.
    pub fn get_ref(&self) -> (&A, &B) {
        (&self.a, &self.b)
    }

    /// Give back both writers.
    pub fn into_inner(self) -> (A, B) {
        (self.a, self.b)
    }
}

impl<A: Writer, B: Writer> Writer for MultiWriter<A, B> {
    fn new_file(&mut self, filename: &str, stat: &Stat, mime: &str) -> Result<()> {
        let a = self.a.new_file(filename, stat, mime);
        let b = self.b.new_file(filename, stat, mime);
        a.and(b)
    }

    fn write_data(&mut self, data: &[u8]) -> Result<()> {
        let a = self.a.write_data(data);
        let b = self.b.write_data(data);
        a.and(b)
    }

    fn write_file(&mut self, path: &Path) -> Result<()> {
        let a = self.a.write_file(path);
        let b = self.b.write_file(path);
        a.and(b)
    }

    fn close(&mut self) -> Result<()> {
        let a = self.a.close();
        let b = self.b.close();
        a.and(b)
    }
}
