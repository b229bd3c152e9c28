//! Shared machinery of the archive writers.
//!
//! Archive headers record the size of the entry they precede, so an
//! [`ArchiveWriter`] accumulates each entry in a [`MemoryWriter`] and hands
//! the complete entry to its [`ArchiveEncoder`] when the next one starts or
//! the archive is closed. A physical file passed through
//! [`Writer::write_file`] is handed over by path instead, which lets
//! encoders stream it.

use crate::memory::MemoryWriter;
use arcstream_core::error::{ArcError, Result};
use arcstream_core::{Stat, Writer};
use std::fs;
use std::path::{Path, PathBuf};

/// Serializes complete entries into an archive format.
pub trait ArchiveEncoder {
    /// MIME type of the produced archive.
    fn mime(&self) -> &'static str;

    /// Maximum number of entries the format holds, `None` when unbounded.
    fn max_entries(&self) -> Option<usize> {
        None
    }

    /// Set the compression level (0-9). Ignored by uncompressed formats.
    fn set_level(&mut self, _level: u32) {}

    /// Emit whatever precedes the first entry.
    fn begin(&mut self, _out: &mut dyn Writer) -> Result<()> {
        Ok(())
    }

    /// Emit one entry. `stat.size` equals `data.len()`.
    fn append(&mut self, out: &mut dyn Writer, name: &str, stat: &Stat, data: &[u8])
    -> Result<()>;

    /// Emit one entry whose content is the physical file `path`.
    fn append_file(
        &mut self,
        out: &mut dyn Writer,
        name: &str,
        stat: &Stat,
        path: &Path,
    ) -> Result<()> {
        let data = fs::read(path)?;
        let stat = stat.with_size(data.len() as u64);
        self.append(out, name, &stat, &data)
    }

    /// Emit the trailer. `entries` is the number of entries appended.
    fn finish(&mut self, out: &mut dyn Writer, entries: usize) -> Result<()>;
}

struct PendingEntry {
    name: String,
    stat: Stat,
    file: Option<PathBuf>,
}

/// A [`Writer`] producing an archive into another writer.
pub struct ArchiveWriter<E, W> {
    encoder: E,
    inner: W,
    buffer: MemoryWriter,
    current: Option<PendingEntry>,
    begun: bool,
    entries: usize,
    auto_close: bool,
    closed: bool,
}

impl<E: ArchiveEncoder + Default, W: Writer> ArchiveWriter<E, W> {
    /// Create an archive named `filename` inside `inner`.
    ///
    /// `inner` receives a `new_file` call for the archive unless `filename`
    /// is empty.
    pub fn new(filename: &str, inner: W) -> Result<Self> {
        Self::with_encoder(E::default(), filename, inner)
    }
}

impl<E: ArchiveEncoder, W: Writer> ArchiveWriter<E, W> {
    /// Create an archive named `filename` inside `inner` with an explicit
    /// encoder.
    pub fn with_encoder(encoder: E, filename: &str, mut inner: W) -> Result<Self> {
        if !filename.is_empty() {
            inner.new_file(filename, &Stat::new(), encoder.mime())?;
        }
        Ok(Self {
            encoder,
            inner,
            buffer: MemoryWriter::new(),
            current: None,
            begun: false,
            entries: 0,
            auto_close: true,
            closed: false,
        })
    }

    /// Set the compression level (0-9).
    pub fn with_level(mut self, level: u32) -> Self {
        self.encoder.set_level(level.min(9));
        self
    }

    /// Whether closing the archive also closes the inner writer (default on).
    pub fn with_auto_close(mut self, auto_close: bool) -> Self {
        self.auto_close = auto_close;
        self
    }

    /// The encoder.
    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Mutable access to the encoder.
    pub fn encoder_mut(&mut self) -> &mut E {
        &mut self.encoder
    }

    /// The inner writer.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Give back the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }

    fn begin(&mut self) -> Result<()> {
        if !self.begun {
            self.begun = true;
            self.encoder.begin(&mut self.inner)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let Some(entry) = self.current.take() else {
            return Ok(());
        };
        let result = match &entry.file {
            Some(path) => self
                .encoder
                .append_file(&mut self.inner, &entry.name, &entry.stat, path),
            None => {
                let stat = entry.stat.with_size(self.buffer.data().len() as u64);
                self.encoder
                    .append(&mut self.inner, &entry.name, &stat, self.buffer.data())
            }
        };
        self.buffer.clear();
        result
    }

    fn current_mut(&mut self) -> Result<&mut PendingEntry> {
        self.current
            .as_mut()
            .ok_or_else(|| ArcError::usage("data written before new_file"))
    }

    fn materialize(&mut self) -> Result<()> {
        if let Some(path) = self.current_mut()?.file.take() {
            self.buffer.write_file(&path)?;
        }
        Ok(())
    }
}

impl<E: ArchiveEncoder, W: Writer> Writer for ArchiveWriter<E, W> {
    fn new_file(&mut self, filename: &str, stat: &Stat, _mime: &str) -> Result<()> {
        if self.closed {
            return Err(ArcError::usage("new_file on a closed archive"));
        }
        self.flush()?;
        if let Some(max) = self.encoder.max_entries() {
            if self.entries >= max {
                return Err(ArcError::unsupported(format!(
                    "{} archives hold at most {} file(s)",
                    self.encoder.mime(),
                    max
                )));
            }
        }
        self.begin()?;
        self.entries += 1;
        self.current = Some(PendingEntry {
            name: filename.to_string(),
            stat: *stat,
            file: None,
        });
        Ok(())
    }

    fn write_data(&mut self, data: &[u8]) -> Result<()> {
        self.materialize()?;
        self.buffer.write_data(data)
    }

    fn write_file(&mut self, path: &Path) -> Result<()> {
        let untouched = self.buffer.is_empty();
        let entry = self.current_mut()?;
        if untouched && entry.file.is_none() {
            entry.file = Some(path.to_path_buf());
            return Ok(());
        }
        self.materialize()?;
        self.buffer.write_file(path)
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.flush()?;
        self.begin()?;
        self.encoder.finish(&mut self.inner, self.entries)?;
        if self.auto_close {
            self.inner.close()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    /// Encodes entries as `name=data;` and counts lifecycle calls.
    #[derive(Default)]
    struct Listing {
        begins: usize,
        streamed: usize,
    }

    impl ArchiveEncoder for Listing {
        fn mime(&self) -> &'static str {
            "text/x-listing"
        }

        fn max_entries(&self) -> Option<usize> {
            Some(2)
        }

        fn begin(&mut self, out: &mut dyn Writer) -> Result<()> {
            self.begins += 1;
            out.write_data(b"[")
        }

        fn append(
            &mut self,
            out: &mut dyn Writer,
            name: &str,
            stat: &Stat,
            data: &[u8],
        ) -> Result<()> {
            assert_eq!(stat.size, Some(data.len() as u64));
            out.write_data(format!("{}=", name).as_bytes())?;
            out.write_data(data)?;
            out.write_data(b";")
        }

        fn append_file(
            &mut self,
            out: &mut dyn Writer,
            name: &str,
            _stat: &Stat,
            path: &Path,
        ) -> Result<()> {
            self.streamed += 1;
            out.write_data(format!("{}=", name).as_bytes())?;
            out.write_file(path)?;
            out.write_data(b";")
        }

        fn finish(&mut self, out: &mut dyn Writer, entries: usize) -> Result<()> {
            out.write_data(format!("]{}", entries).as_bytes())
        }
    }

    #[test]
    fn test_entries_are_flushed_in_order() {
        let mut writer = ArchiveWriter::<Listing, _>::new("", MemoryWriter::new()).unwrap();
        writer.new_file("a", &Stat::new(), "").unwrap();
        writer.write_data(b"A").unwrap();
        writer.write_data(b"B").unwrap();
        writer.new_file("b", &Stat::new(), "").unwrap();
        writer.close().unwrap();
        writer.close().unwrap();

        assert_eq!(writer.encoder().begins, 1);
        assert_eq!(writer.get_ref().data(), b"[a=AB;b=;]2");
    }

    #[test]
    fn test_empty_archive_still_framed() {
        let mut writer = ArchiveWriter::<Listing, _>::new("", MemoryWriter::new()).unwrap();
        writer.close().unwrap();
        assert_eq!(writer.into_inner().into_inner(), b"[]0");
    }

    #[test]
    fn test_physical_file_handed_over() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"disk").unwrap();
        tmp.flush().unwrap();

        let mut writer = ArchiveWriter::<Listing, _>::new("", MemoryWriter::new()).unwrap();
        writer.new_file("f", &Stat::new(), "").unwrap();
        writer.write_file(tmp.path()).unwrap();
        writer.new_file("g", &Stat::new(), "").unwrap();
        writer.write_data(b"x").unwrap();
        writer.write_file(tmp.path()).unwrap();
        writer.close().unwrap();

        assert_eq!(writer.encoder().streamed, 1);
        assert_eq!(writer.get_ref().data(), b"[f=disk;g=xdisk;]2");
    }

    #[test]
    fn test_usage_errors() {
        let mut writer = ArchiveWriter::<Listing, _>::new("", MemoryWriter::new()).unwrap();
        assert!(matches!(writer.write_data(b"x"), Err(ArcError::Usage { .. })));

        writer.new_file("a", &Stat::new(), "").unwrap();
        writer.new_file("b", &Stat::new(), "").unwrap();
        assert!(matches!(
            writer.new_file("c", &Stat::new(), ""),
            Err(ArcError::Unsupported { .. })
        ));

        writer.close().unwrap();
        assert!(matches!(
            writer.new_file("d", &Stat::new(), ""),
            Err(ArcError::Usage { .. })
        ));
    }
}
