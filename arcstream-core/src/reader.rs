//! The pull side of the pipeline.
//!
//! A [`Reader`] is a cursor over a sequence of entries. Each successful
//! [`Reader::next`] exposes one entry (name, metadata, MIME type and a byte
//! stream); the view is invalidated by the following call.
//!
//! ```text
//! let mut reader = ...;
//! while reader.next()? {
//!     let name = reader.filename();
//!     while let Some(chunk) = reader.read_data(Some(4096))? {
//!         ...
//!     }
//! }
//! reader.close()?;
//! ```

use crate::error::{ArcError, Result};
use crate::mime;
use crate::path::{self, Scope};
use crate::stat::Stat;
use crate::writer::{DEFAULT_BUFFER_SIZE, Writer};
use std::io::{self, Read};
use std::path::PathBuf;

/// Cursor over a sequence of entries.
///
/// Accessors called before the first successful [`Reader::next`], or after it
/// returned `false`, give empty values instead of panicking.
pub trait Reader {
    /// Move to the next entry. Returns `false` once the source is exhausted.
    fn next(&mut self) -> Result<bool>;

    /// Normalized name of the current entry.
    fn filename(&self) -> String;

    /// Metadata of the current entry.
    fn stat(&self) -> Stat;

    /// MIME type of the current entry.
    fn mime(&self) -> String {
        mime::from_filename(&self.filename()).to_string()
    }

    /// Physical file holding the current entry's bytes verbatim, if any.
    fn data_filename(&self) -> Option<PathBuf> {
        None
    }

    /// Read up to `length` bytes of the current entry, or the rest of it when
    /// `length` is `None`. Returns `Ok(None)` once the entry is exhausted.
    fn read_data(&mut self, length: Option<usize>) -> Result<Option<Vec<u8>>>;

    /// Skip up to `length` bytes of the current entry and return how many
    /// were skipped.
    fn skip(&mut self, length: u64) -> Result<u64> {
        let mut skipped = 0u64;
        while skipped < length {
            let chunk = (length - skipped).min(DEFAULT_BUFFER_SIZE as u64) as usize;
            match self.read_data(Some(chunk))? {
                Some(data) if !data.is_empty() => skipped += data.len() as u64,
                _ => break,
            }
        }
        Ok(skipped)
    }

    /// Rewind to the state before the first [`Reader::next`].
    fn close(&mut self) -> Result<()>;

    /// Release the wrapped reader, left at its current position.
    ///
    /// Returns `None` for readers that do not wrap another one.
    fn into_source(self: Box<Self>) -> Option<Box<dyn Reader>> {
        None
    }

    /// Read exactly `length` bytes unless the entry ends first.
    fn read_full(&mut self, length: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(length.min(DEFAULT_BUFFER_SIZE));
        while out.len() < length {
            match self.read_data(Some(length - out.len()))? {
                Some(data) if !data.is_empty() => out.extend_from_slice(&data),
                _ => break,
            }
        }
        Ok(out)
    }

    /// Rewind and advance to `path` or the first entry below it.
    ///
    /// An empty path selects the first entry.
    fn select(&mut self, path: &str) -> Result<bool> {
        let target = path::normalize(path);
        self.close()?;
        while self.next()? {
            if matches!(
                path::scope(&target, &self.filename()),
                Scope::Exact | Scope::Inside
            ) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Relay the rest of the current entry to `writer`.
    fn send_data(&mut self, writer: &mut dyn Writer, buffer_size: usize) -> Result<()> {
        if let Some(file) = self.data_filename() {
            return writer.write_file(&file);
        }
        let chunk = (buffer_size > 0).then_some(buffer_size);
        while let Some(data) = self.read_data(chunk)? {
            if !data.is_empty() {
                writer.write_data(&data)?;
            }
        }
        Ok(())
    }

    /// Copy every remaining entry into `writer`.
    ///
    /// The reader is closed afterwards, and so is the writer when
    /// `auto_close` is set, whether or not copying succeeded. The first error
    /// encountered is the one returned.
    fn extract(
        &mut self,
        writer: &mut dyn Writer,
        auto_close: bool,
        buffer_size: usize,
    ) -> Result<()> {
        let outcome = copy_entries(self, writer, buffer_size);
        let closed = self.close();
        let writer_closed = if auto_close { writer.close() } else { Ok(()) };
        outcome.and(closed).and(writer_closed)
    }

    /// Select `path` and copy that single entry into `writer`.
    fn extract_file(
        &mut self,
        path: &str,
        writer: &mut dyn Writer,
        auto_close: bool,
        buffer_size: usize,
    ) -> Result<()> {
        let outcome = match self.select(path) {
            Ok(true) => writer
                .new_file(&self.filename(), &self.stat(), &self.mime())
                .and_then(|()| self.send_data(writer, buffer_size)),
            Ok(false) => Err(ArcError::not_found(path)),
            Err(e) => Err(e),
        };
        let writer_closed = if auto_close { writer.close() } else { Ok(()) };
        outcome.and(writer_closed)
    }

    /// Names from the current position to the end. Closes the reader.
    fn file_list(&mut self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        while self.next()? {
            names.push(self.filename());
        }
        self.close()?;
        Ok(names)
    }
}

fn copy_entries<R: Reader + ?Sized>(
    reader: &mut R,
    writer: &mut dyn Writer,
    buffer_size: usize,
) -> Result<()> {
    while reader.next()? {
        writer.new_file(&reader.filename(), &reader.stat(), &reader.mime())?;
        reader.send_data(writer, buffer_size)?;
    }
    Ok(())
}

/// [`std::io::Read`] view of the current entry of a reader.
///
/// Lets parsers and decompressors built on `std::io` consume an entry
/// directly. Never requests more bytes from the reader than the caller's
/// buffer holds, so fixed-size header reads leave the rest of the entry
/// untouched.
pub struct EntryStream<'a> {
    reader: &'a mut dyn Reader,
    chunk: Vec<u8>,
    pos: usize,
    done: bool,
}

impl<'a> EntryStream<'a> {
    /// Wrap the current entry of `reader`.
    pub fn new(reader: &'a mut dyn Reader) -> Self {
        Self {
            reader,
            chunk: Vec::new(),
            pos: 0,
            done: false,
        }
    }
}

impl Read for EntryStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pos >= self.chunk.len() {
            if self.done {
                return Ok(0);
            }
            match self
                .reader
                .read_data(Some(buf.len()))
                .map_err(io::Error::from)?
            {
                Some(data) => {
                    self.chunk = data;
                    self.pos = 0;
                }
                None => self.done = true,
            }
        }
        let n = (self.chunk.len() - self.pos).min(buf.len());
        buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Entries held in a vector.
    struct ListReader {
        entries: Vec<(&'static str, &'static [u8])>,
        index: Option<usize>,
        offset: usize,
        closes: usize,
    }

    impl ListReader {
        fn new(entries: Vec<(&'static str, &'static [u8])>) -> Self {
            Self {
                entries,
                index: None,
                offset: 0,
                closes: 0,
            }
        }
    }

    impl Reader for ListReader {
        fn next(&mut self) -> Result<bool> {
            let next = self.index.map_or(0, |i| i + 1);
            self.index = Some(next);
            self.offset = 0;
            Ok(next < self.entries.len())
        }

        fn filename(&self) -> String {
            self.index
                .and_then(|i| self.entries.get(i))
                .map(|e| e.0.to_string())
                .unwrap_or_default()
        }

        fn stat(&self) -> Stat {
            self.index
                .and_then(|i| self.entries.get(i))
                .map(|e| Stat::new().with_size(e.1.len() as u64))
                .unwrap_or_default()
        }

        fn read_data(&mut self, length: Option<usize>) -> Result<Option<Vec<u8>>> {
            let Some(&(_, data)) = self.index.and_then(|i| self.entries.get(i)) else {
                return Ok(None);
            };
            if self.offset >= data.len() {
                return Ok(None);
            }
            let end = length.map_or(data.len(), |l| {
                self.offset.saturating_add(l).min(data.len())
            });
            let out = data[self.offset..end].to_vec();
            self.offset = end;
            Ok(Some(out))
        }

        fn close(&mut self) -> Result<()> {
            self.index = None;
            self.offset = 0;
            self.closes += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct Sink {
        files: Vec<(String, Vec<u8>)>,
        closed: bool,
        fail_on: Option<&'static str>,
    }

    impl Writer for Sink {
        fn new_file(&mut self, filename: &str, _stat: &Stat, _mime: &str) -> Result<()> {
            if self.fail_on == Some(filename) {
                return Err(ArcError::usage("refused"));
            }
            self.files.push((filename.to_string(), Vec::new()));
            Ok(())
        }

        fn write_data(&mut self, data: &[u8]) -> Result<()> {
            match self.files.last_mut() {
                Some((_, buf)) => {
                    buf.extend_from_slice(data);
                    Ok(())
                }
                None => Err(ArcError::usage("no file")),
            }
        }

        fn close(&mut self) -> Result<()> {
            self.closed = true;
            Ok(())
        }
    }

    fn sample() -> ListReader {
        ListReader::new(vec![
            ("a.txt", b"alpha"),
            ("dir/b.txt", b"bravo"),
            ("dir/sub/c.txt", b"charlie"),
        ])
    }

    #[test]
    fn test_read_full_and_skip() {
        let mut reader = sample();
        assert!(reader.next().unwrap());
        assert_eq!(reader.skip(2).unwrap(), 2);
        assert_eq!(reader.read_full(10).unwrap(), b"pha");
        assert_eq!(reader.read_data(None).unwrap(), None);
    }

    #[test]
    fn test_select() {
        let mut reader = sample();
        assert!(reader.select("dir").unwrap());
        assert_eq!(reader.filename(), "dir/b.txt");
        assert!(reader.select("./dir/sub/../sub/c.txt").unwrap());
        assert_eq!(reader.filename(), "dir/sub/c.txt");
        assert!(!reader.select("di").unwrap());
        assert!(reader.select("").unwrap());
        assert_eq!(reader.filename(), "a.txt");
    }

    #[test]
    fn test_extract_copies_everything() {
        let mut reader = sample();
        let mut sink = Sink::default();
        reader.extract(&mut sink, true, 2).unwrap();
        assert_eq!(sink.files.len(), 3);
        assert_eq!(sink.files[2].1, b"charlie");
        assert!(sink.closed);
        assert_eq!(reader.closes, 1);
    }

    #[test]
    fn test_extract_first_error_wins() {
        let mut reader = sample();
        let mut sink = Sink {
            fail_on: Some("dir/b.txt"),
            ..Sink::default()
        };
        let err = reader.extract(&mut sink, true, 0).unwrap_err();
        assert!(matches!(err, ArcError::Usage { .. }));
        assert_eq!(sink.files.len(), 1);
        assert!(sink.closed);
        assert_eq!(reader.closes, 1);
    }

    #[test]
    fn test_extract_file() {
        let mut reader = sample();
        let mut sink = Sink::default();
        reader.extract_file("dir/b.txt", &mut sink, false, 0).unwrap();
        assert_eq!(sink.files, vec![("dir/b.txt".to_string(), b"bravo".to_vec())]);
        assert!(!sink.closed);

        let err = reader
            .extract_file("missing.txt", &mut sink, true, 0)
            .unwrap_err();
        assert!(matches!(err, ArcError::NotFound { .. }));
        assert!(sink.closed);
    }

    #[test]
    fn test_file_list() {
        let mut reader = sample();
        assert!(reader.next().unwrap());
        assert_eq!(
            reader.file_list().unwrap(),
            vec!["dir/b.txt".to_string(), "dir/sub/c.txt".to_string()]
        );
        assert_eq!(reader.closes, 1);
    }

    #[test]
    fn test_entry_stream() {
        let mut reader = sample();
        reader.next().unwrap();
        reader.next().unwrap();
        let mut text = String::new();
        EntryStream::new(&mut reader)
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "bravo");
    }

    #[test]
    fn test_accessors_before_next() {
        let reader = sample();
        assert_eq!(reader.filename(), "");
        assert_eq!(reader.stat(), Stat::default());
        assert_eq!(reader.mime(), mime::DEFAULT_MIME);
    }
}
