//! Writer streaming entry data to an [`std::io::Write`] sink.

use arcstream_core::error::Result;
use arcstream_core::{Stat, Writer, mime, path};
use std::io::Write;

/// Copies the data of every entry to a byte sink, one after the other.
///
/// With headers enabled, a `Content-Type` / `Content-Disposition` block
/// describing the first entry is emitted before its data. Archive writers
/// announce their archive as the first entry, so an archive streamed to an
/// HTTP client gets a header naming the archive.
pub struct OutputWriter<W: Write> {
    sink: W,
    headers: bool,
    started: bool,
}

impl<W: Write> OutputWriter<W> {
    /// Stream into `sink` without headers.
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            headers: false,
            started: false,
        }
    }

    /// Emit a header block before the first entry.
    pub fn with_headers(mut self, headers: bool) -> Self {
        self.headers = headers;
        self
    }

    /// The sink.
    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Return the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: Write> Writer for OutputWriter<W> {
    fn new_file(&mut self, filename: &str, _stat: &Stat, mime: &str) -> Result<()> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        if self.headers {
            let content_type = if mime.is_empty() {
                mime::DEFAULT_MIME
            } else {
                mime
            };
            write!(self.sink, "Content-Type: {content_type}\r\n")?;
            let name = path::basename(filename).replace('"', "");
            if !name.is_empty() {
                write!(
                    self.sink,
                    "Content-Disposition: attachment; filename=\"{name}\"\r\n"
                )?;
            }
            self.sink.write_all(b"\r\n")?;
        }
        Ok(())
    }

    fn write_data(&mut self, data: &[u8]) -> Result<()> {
        self.sink.write_all(data)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }
}
