//! The push side of the pipeline.

use crate::error::Result;
use crate::stat::Stat;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Default chunk size used when relaying data between stages.
pub const DEFAULT_BUFFER_SIZE: usize = 102_400;

/// A sink receiving a sequence of named files.
///
/// A consumer calls [`Writer::new_file`], then any number of
/// [`Writer::write_data`] / [`Writer::write_file`] calls, and finally
/// [`Writer::close`] once every file has been sent.
pub trait Writer {
    /// Start a new file. Ends the previous one, if any.
    fn new_file(&mut self, filename: &str, stat: &Stat, mime: &str) -> Result<()>;

    /// Append data to the current file.
    fn write_data(&mut self, data: &[u8]) -> Result<()>;

    /// Append the content of a physical file to the current file.
    fn write_file(&mut self, path: &Path) -> Result<()> {
        let mut file = File::open(path)?;
        let mut buf = vec![0u8; DEFAULT_BUFFER_SIZE];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            self.write_data(&buf[..n])?;
        }
        Ok(())
    }

    /// Finish the output. No call may follow.
    fn close(&mut self) -> Result<()>;
}

impl<W: Writer + ?Sized> Writer for Box<W> {
    fn new_file(&mut self, filename: &str, stat: &Stat, mime: &str) -> Result<()> {
        (**self).new_file(filename, stat, mime)
    }

    fn write_data(&mut self, data: &[u8]) -> Result<()> {
        (**self).write_data(data)
    }

    fn write_file(&mut self, path: &Path) -> Result<()> {
        (**self).write_file(path)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

impl<W: Writer + ?Sized> Writer for &mut W {
    fn new_file(&mut self, filename: &str, stat: &Stat, mime: &str) -> Result<()> {
        (**self).new_file(filename, stat, mime)
    }

    fn write_data(&mut self, data: &[u8]) -> Result<()> {
        (**self).write_data(data)
    }

    fn write_file(&mut self, path: &Path) -> Result<()> {
        (**self).write_file(path)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[derive(Default)]
    struct Recorder {
        files: Vec<(String, Vec<u8>)>,
        closed: bool,
    }

    impl Writer for Recorder {
        fn new_file(&mut self, filename: &str, _stat: &Stat, _mime: &str) -> Result<()> {
            self.files.push((filename.to_string(), Vec::new()));
            Ok(())
        }

        fn write_data(&mut self, data: &[u8]) -> Result<()> {
            if let Some((_, buf)) = self.files.last_mut() {
                buf.extend_from_slice(data);
            }
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            self.closed = true;
            Ok(())
        }
    }

    #[test]
    fn test_default_write_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&vec![7u8; DEFAULT_BUFFER_SIZE + 10]).unwrap();
        tmp.flush().unwrap();

        let mut rec = Recorder::default();
        rec.new_file("big.bin", &Stat::new(), "application/octet-stream")
            .unwrap();
        rec.write_file(tmp.path()).unwrap();
        assert_eq!(rec.files[0].1.len(), DEFAULT_BUFFER_SIZE + 10);
    }

    #[test]
    fn test_forwarding_impls() {
        let mut rec = Recorder::default();
        {
            let mut by_ref: &mut Recorder = &mut rec;
            let boxed: &mut dyn Writer = &mut by_ref;
            boxed.new_file("a", &Stat::new(), "text/plain").unwrap();
            boxed.write_data(b"xyz").unwrap();
            boxed.close().unwrap();
        }
        assert_eq!(rec.files, vec![("a".to_string(), b"xyz".to_vec())]);
        assert!(rec.closed);
    }
}
