//! Reader fusing every entry of a source into one.

use arcstream_core::error::Result;
use arcstream_core::{Reader, Stat, mime};

/// Exposes the concatenated data of all entries of a source as a single
/// entry.
///
/// Chunk boundaries of [`Reader::read_data`] need not match the boundaries
/// of the underlying entries.
pub struct ConcatReader {
    source: Box<dyn Reader>,
    filename: String,
    stat: Stat,
    mime: Option<String>,
    opened: bool,
}

impl ConcatReader {
    /// Fuse the entries of `source` into one entry named `filename`.
    ///
    /// `source` is walked once to compute the total size, then rewound. The
    /// size stays unknown when one of the entries does not report it.
    pub fn new(mut source: Box<dyn Reader>, filename: &str, stat: Stat) -> Result<Self> {
        let mut total = Some(0u64);
        while source.next()? {
            total = total.zip(source.stat().size).map(|(a, b)| a + b);
        }
        source.close()?;
        Ok(Self {
            source,
            filename: arcstream_core::path::normalize(filename),
            stat: Stat { size: total, ..stat },
            mime: None,
            opened: false,
        })
    }

    /// Override the extension based MIME type.
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

impl Reader for ConcatReader {
    fn next(&mut self) -> Result<bool> {
        if self.opened {
            return Ok(false);
        }
        self.opened = self.source.next()?;
        Ok(self.opened)
    }

    fn filename(&self) -> String {
        self.filename.clone()
    }

    fn stat(&self) -> Stat {
        self.stat
    }

    fn mime(&self) -> String {
        match &self.mime {
            Some(mime) => mime.clone(),
            None => mime::from_filename(&self.filename).to_string(),
        }
    }

    fn read_data(&mut self, length: Option<usize>) -> Result<Option<Vec<u8>>> {
        if !self.opened || length == Some(0) {
            return Ok(None);
        }
        let mut result = Vec::new();
        while length.is_none_or(|n| result.len() < n) {
            let wanted = length.map(|n| n - result.len());
            match self.source.read_data(wanted)? {
                Some(data) => result.extend_from_slice(&data),
                None => {
                    if !self.source.next()? {
                        break;
                    }
                }
            }
        }
        Ok((!result.is_empty()).then_some(result))
    }

    fn skip(&mut self, length: u64) -> Result<u64> {
        if !self.opened {
            return Ok(0);
        }
        let mut skipped = 0;
        while skipped < length {
            let n = self.source.skip(length - skipped)?;
            if n == 0 && !self.source.next()? {
                break;
            }
            skipped += n;
        }
        Ok(skipped)
    }

    fn close(&mut self) -> Result<()> {
        self.opened = false;
        self.source.close()
    }
}
