//! In-memory reader and writer.

use arcstream_core::error::Result;
use arcstream_core::{Reader, Stat, Writer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Before,
    On,
    After,
}

/// Reader exposing a single entry held in memory.
#[derive(Debug, Clone)]
pub struct MemoryReader {
    data: Vec<u8>,
    name: String,
    stat: Stat,
    mime: Option<String>,
    offset: usize,
    cursor: Cursor,
}

impl MemoryReader {
    /// Create a reader for `data` named `name`.
    pub fn new(data: impl Into<Vec<u8>>, name: impl Into<String>) -> Self {
        let data = data.into();
        let stat = Stat::new().with_size(data.len() as u64);
        Self {
            data,
            name: arcstream_core::path::normalize(&name.into()),
            stat,
            mime: None,
            offset: 0,
            cursor: Cursor::Before,
        }
    }

    /// Attach metadata. The size always reflects the buffer.
    pub fn with_stat(mut self, stat: Stat) -> Self {
        self.stat = Stat {
            size: Some(self.data.len() as u64),
            ..stat
        };
        self
    }

    /// Override the extension based MIME type.
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

impl Reader for MemoryReader {
    fn next(&mut self) -> Result<bool> {
        match self.cursor {
            Cursor::Before => {
                self.cursor = Cursor::On;
                self.offset = 0;
                Ok(true)
            }
            _ => {
                self.cursor = Cursor::After;
                Ok(false)
            }
        }
    }

    fn filename(&self) -> String {
        match self.cursor {
            Cursor::On => self.name.clone(),
            _ => String::new(),
        }
    }

    fn stat(&self) -> Stat {
        match self.cursor {
            Cursor::On => self.stat,
            _ => Stat::default(),
        }
    }

    fn mime(&self) -> String {
        match &self.mime {
            Some(mime) if self.cursor == Cursor::On => mime.clone(),
            _ => arcstream_core::mime::from_filename(&self.filename()).to_string(),
        }
    }

    fn read_data(&mut self, length: Option<usize>) -> Result<Option<Vec<u8>>> {
        if self.cursor != Cursor::On || self.offset >= self.data.len() {
            return Ok(None);
        }
        let end = match length {
            Some(n) => self.offset.saturating_add(n).min(self.data.len()),
            None => self.data.len(),
        };
        let chunk = self.data[self.offset..end].to_vec();
        self.offset = end;
        Ok(Some(chunk))
    }

    fn skip(&mut self, length: u64) -> Result<u64> {
        if self.cursor != Cursor::On {
            return Ok(0);
        }
        let left = (self.data.len() - self.offset) as u64;
        let n = length.min(left);
        self.offset += n as usize;
        Ok(n)
    }

    fn close(&mut self) -> Result<()> {
        self.cursor = Cursor::Before;
        self.offset = 0;
        Ok(())
    }
}

/// Writer collecting everything it receives into one buffer.
///
/// File boundaries are not recorded; the buffer is the concatenation of all
/// written data.
#[derive(Debug, Clone, Default)]
pub struct MemoryWriter {
    data: Vec<u8>,
}

impl MemoryWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collected data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Drop the collected data.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Whether nothing has been collected.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Take the collected data.
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    /// Reader over a copy of the collected data.
    pub fn make_reader(&self, name: impl Into<String>) -> MemoryReader {
        MemoryReader::new(self.data.clone(), name)
    }
}

impl Writer for MemoryWriter {
    fn new_file(&mut self, _filename: &str, _stat: &Stat, _mime: &str) -> Result<()> {
        Ok(())
    }

    fn write_data(&mut self, data: &[u8]) -> Result<()> {
        self.data.extend_from_slice(data);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_reader() {
        let mut reader = MemoryReader::new("ABCDEFGH", "Memory");
        assert!(reader.next().unwrap());
        assert_eq!(reader.filename(), "Memory");
        assert_eq!(reader.read_data(Some(1)).unwrap().unwrap(), b"A");
        assert_eq!(reader.read_data(Some(2)).unwrap().unwrap(), b"BC");
        assert_eq!(reader.read_data(None).unwrap().unwrap(), b"DEFGH");
        assert_eq!(reader.read_data(None).unwrap(), None);
        assert!(!reader.next().unwrap());
        assert!(!reader.next().unwrap());
        reader.close().unwrap();
        assert!(reader.next().unwrap());
    }

    #[test]
    fn test_memory_reader_stat_and_mime() {
        let mut reader = MemoryReader::new(vec![1u8, 2, 3], "pic.jpg")
            .with_stat(Stat::new().with_size(99).with_mtime(5));
        assert_eq!(reader.stat().size, None);
        reader.next().unwrap();
        assert_eq!(reader.stat().size, Some(3));
        assert_eq!(reader.stat().mtime, Some(5));
        assert_eq!(reader.mime(), "image/jpeg");

        let mut reader = MemoryReader::new("x", "blob").with_mime("text/x-custom");
        reader.next().unwrap();
        assert_eq!(reader.mime(), "text/x-custom");
    }

    #[test]
    fn test_memory_reader_skip() {
        let mut reader = MemoryReader::new("0123456789", "digits");
        reader.next().unwrap();
        assert_eq!(reader.skip(4).unwrap(), 4);
        assert_eq!(reader.read_data(Some(2)).unwrap().unwrap(), b"45");
        assert_eq!(reader.skip(100).unwrap(), 4);
        assert_eq!(reader.read_data(None).unwrap(), None);
    }

    #[test]
    fn test_unbounded_length_after_partial_read() {
        let mut reader = MemoryReader::new("0123456789", "digits");
        reader.next().unwrap();
        assert_eq!(reader.read_data(Some(2)).unwrap().unwrap(), b"01");
        assert_eq!(
            reader.read_data(Some(usize::MAX)).unwrap().unwrap(),
            b"23456789"
        );
        assert_eq!(reader.read_data(Some(usize::MAX)).unwrap(), None);
    }

    #[test]
    fn test_read_full_with_huge_length() {
        let mut reader = MemoryReader::new("abc", "abc");
        reader.next().unwrap();
        assert_eq!(reader.read_data(Some(1)).unwrap().unwrap(), b"a");
        assert_eq!(reader.read_full(usize::MAX).unwrap(), b"bc");
    }

    #[test]
    fn test_memory_writer() {
        let mut writer = MemoryWriter::new();
        assert!(writer.is_empty());
        writer.new_file("a", &Stat::new(), "text/plain").unwrap();
        writer.write_data(b"ABC").unwrap();
        writer.new_file("b", &Stat::new(), "text/plain").unwrap();
        writer.write_data(b"DEF").unwrap();
        writer.close().unwrap();
        assert_eq!(writer.data(), b"ABCDEF");

        let mut reader = writer.make_reader("copy.bin");
        reader.next().unwrap();
        assert_eq!(reader.read_data(None).unwrap().unwrap(), b"ABCDEF");

        writer.clear();
        assert!(writer.is_empty());
    }
}
