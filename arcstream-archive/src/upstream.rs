//! Byte source shared by the codec readers.

use arcstream_core::Reader;
use arcstream_core::error::Result;

/// The reader a codec decodes, and whether it already sits on the entry
/// holding the archive.
pub(crate) struct Upstream {
    pub(crate) source: Box<dyn Reader>,
    opened: bool,
}

impl Upstream {
    pub(crate) fn new(source: Box<dyn Reader>, opened: bool) -> Self {
        Self { source, opened }
    }

    /// Position the source on the archive entry. Returns `false` when the
    /// source holds no entry at all.
    pub(crate) fn open(&mut self) -> Result<bool> {
        if !self.opened {
            if !self.source.next()? {
                return Ok(false);
            }
            self.opened = true;
        }
        Ok(true)
    }

    /// Name of the entry holding the archive.
    pub(crate) fn filename(&self) -> String {
        self.source.filename()
    }

    pub(crate) fn close(&mut self) -> Result<()> {
        self.opened = false;
        self.source.close()
    }

    pub(crate) fn into_inner(self) -> Box<dyn Reader> {
        self.source
    }
}
