//! Reader keeping only the entries a predicate accepts.

use crate::predicate::Predicate;
use arcstream_core::error::Result;
use arcstream_core::{Reader, Stat};
use std::path::PathBuf;

/// Skips entries of `source` for which the predicate does not hold.
pub struct FilterReader<P> {
    predicate: P,
    source: Box<dyn Reader>,
}

impl<P: Predicate> FilterReader<P> {
    /// Keep the entries of `source` accepted by `predicate`.
    pub fn new(predicate: P, source: Box<dyn Reader>) -> Self {
        Self { predicate, source }
    }

    /// The predicate.
    pub fn predicate(&self) -> &P {
        &self.predicate
    }
}

impl<P: Predicate> Reader for FilterReader<P> {
    fn next(&mut self) -> Result<bool> {
        while self.source.next()? {
            if self.predicate.is_true(&*self.source) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn filename(&self) -> String {
        self.source.filename()
    }

    fn stat(&self) -> Stat {
        self.source.stat()
    }

    fn mime(&self) -> String {
        self.source.mime()
    }

    fn data_filename(&self) -> Option<PathBuf> {
        self.source.data_filename()
    }

    fn read_data(&mut self, length: Option<usize>) -> Result<Option<Vec<u8>>> {
        self.source.read_data(length)
    }

    fn skip(&mut self, length: u64) -> Result<u64> {
        self.source.skip(length)
    }

    fn close(&mut self) -> Result<()> {
        self.source.close()
    }

    fn into_source(self: Box<Self>) -> Option<Box<dyn Reader>> {
        Some(self.source)
    }
}
