//! GZIP format support (RFC 1952).
//!
//! GZIP wraps a single DEFLATE stream, so the reader exposes exactly one
//! entry and the writer accepts exactly one file.
//!
//! ## Example
//!
//! ```rust
//! use arcstream_archive::gzip::{GzipReader, GzipWriter};
//! use arcstream_archive::memory::MemoryWriter;
//! use arcstream_core::{Reader, Stat, Writer};
//!
//! let mut writer = GzipWriter::new("", MemoryWriter::new()).unwrap();
//! writer.new_file("notes.txt", &Stat::new(), "text/plain").unwrap();
//! writer.write_data(b"Hello, World!").unwrap();
//! writer.close().unwrap();
//!
//! let archive = writer.into_inner().make_reader("notes.txt.gz");
//! let mut reader = GzipReader::new(Box::new(archive), false);
//! assert!(reader.next().unwrap());
//! assert_eq!(reader.filename(), "notes.txt");
//! assert_eq!(reader.read_data(None).unwrap().unwrap(), b"Hello, World!");
//! ```

mod header;

pub use header::{GZIP_MAGIC, GzipHeader, compress, decompress_body, flags};

use crate::archive_writer::{ArchiveEncoder, ArchiveWriter};
use crate::single::{Member, MemberDecoder, SingleEntryReader};
use arcstream_core::error::Result;
use arcstream_core::{EntryStream, Reader, Stat, Writer, path};

/// Decodes a gzip member, keeping its header.
#[derive(Debug, Default)]
pub struct GzipDecoder {
    header: Option<GzipHeader>,
}

impl GzipDecoder {
    /// Header of the last decoded member.
    pub fn header(&self) -> Option<&GzipHeader> {
        self.header.as_ref()
    }
}

impl MemberDecoder for GzipDecoder {
    fn decode(&mut self, source: &mut dyn Reader) -> Result<Member> {
        let header = GzipHeader::read(&mut EntryStream::new(&mut *source))?;
        let body = source.read_data(None)?.unwrap_or_default();
        let data = decompress_body(&body)?;
        let mtime = (header.mtime != 0).then_some(u64::from(header.mtime));
        self.header = Some(header);
        Ok(Member { data, mtime })
    }
}

/// Reader exposing the content of a gzip stream.
pub type GzipReader = SingleEntryReader<GzipDecoder>;

impl SingleEntryReader<GzipDecoder> {
    /// File name stored in the gzip header (FNAME), if any.
    pub fn original_name(&self) -> Option<&str> {
        self.decoder().header()?.filename.as_deref()
    }
}

/// Encoder producing a single gzip member.
#[derive(Debug)]
pub struct GzipEncoder {
    level: u32,
}

impl Default for GzipEncoder {
    fn default() -> Self {
        Self { level: 9 }
    }
}

impl ArchiveEncoder for GzipEncoder {
    fn mime(&self) -> &'static str {
        "application/x-gzip"
    }

    fn max_entries(&self) -> Option<usize> {
        Some(1)
    }

    fn set_level(&mut self, level: u32) {
        self.level = level;
    }

    fn append(&mut self, out: &mut dyn Writer, name: &str, stat: &Stat, data: &[u8]) -> Result<()> {
        let header = GzipHeader::new()
            .with_filename(path::basename(name))
            .with_mtime(stat.mtime.unwrap_or(0))
            .with_level(self.level);
        out.write_data(&compress(data, self.level, &header)?)
    }

    fn finish(&mut self, out: &mut dyn Writer, entries: usize) -> Result<()> {
        if entries == 0 {
            let header = GzipHeader::new().with_level(self.level);
            out.write_data(&compress(&[], self.level, &header)?)?;
        }
        Ok(())
    }
}

/// Writer producing a gzip stream holding one file.
pub type GzipWriter<W> = ArchiveWriter<GzipEncoder, W>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryReader, MemoryWriter};
    use arcstream_core::ArcError;

    fn gzip(name: &str, data: &[u8]) -> Vec<u8> {
        let mut writer = GzipWriter::new("", MemoryWriter::new()).unwrap().with_level(6);
        writer
            .new_file(name, &Stat::new().with_mtime(1_234), "")
            .unwrap();
        writer.write_data(data).unwrap();
        writer.close().unwrap();
        writer.into_inner().into_inner()
    }

    #[test]
    fn test_gzip_reader() {
        let data = gzip("dir/report.csv", b"a,b\n1,2\n");
        let source = MemoryReader::new(data, "archive/report.csv.gz");
        let mut reader = GzipReader::new(Box::new(source), false);

        assert!(reader.next().unwrap());
        assert_eq!(reader.filename(), "report.csv");
        assert_eq!(reader.original_name(), Some("report.csv"));
        assert_eq!(reader.stat().size, Some(8));
        assert_eq!(reader.stat().mtime, Some(1_234));
        assert_eq!(reader.read_data(None).unwrap().unwrap(), b"a,b\n1,2\n");
        assert!(!reader.next().unwrap());
    }

    #[test]
    fn test_single_file_only() {
        let mut writer = GzipWriter::new("out.gz", MemoryWriter::new()).unwrap();
        writer.new_file("a", &Stat::new(), "").unwrap();
        assert!(matches!(
            writer.new_file("b", &Stat::new(), ""),
            Err(ArcError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_empty_archive_is_valid() {
        let mut writer = GzipWriter::new("", MemoryWriter::new()).unwrap();
        writer.close().unwrap();
        let data = writer.into_inner().into_inner();

        let mut reader = GzipReader::new(Box::new(MemoryReader::new(data, "empty.gz")), false);
        assert!(reader.next().unwrap());
        assert_eq!(reader.filename(), "empty");
        assert_eq!(reader.stat().size, Some(0));
        assert_eq!(reader.original_name(), None);
    }

    #[test]
    fn test_corrupt_stream() {
        let mut data = gzip("x.txt", b"some text that will be damaged");
        let n = data.len();
        data[n - 6] ^= 0x55;
        let mut reader = GzipReader::new(Box::new(MemoryReader::new(data, "x.txt.gz")), false);
        assert!(reader.next().is_err());
    }
}
