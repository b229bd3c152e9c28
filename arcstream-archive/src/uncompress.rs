//! Transparent descent into nested archives.
//!
//! [`UncompressReader`] walks a source and, whenever an entry's name carries
//! a known archive extension, replaces the source with a decoder for that
//! entry. The decoder's entries are reported under the archive's name
//! (`bundle.tar/docs/readme.txt`); once they run out the engine resumes the
//! enclosing source right after the archive. Nested archives stack up the
//! same way, to any depth.
//!
//! The number of nesting levels opened below the base directory is bounded
//! by the uncompression level: `Some(0)` never opens anything, `None` opens
//! everything.

use crate::codec;
use crate::rename::AddBaseName;
use arcstream_core::error::{ArcError, Result};
use arcstream_core::path::{self, Scope};
use arcstream_core::{Reader, Stat};
use log::debug;
use std::path::PathBuf;

/// Reader descending into archives found in its source.
pub struct UncompressReader {
    /// Reader the entries currently come from.
    active: Option<Box<dyn Reader>>,
    /// Decoder layers added by each descent, innermost last.
    frames: Vec<usize>,
    level: Option<usize>,
    base_dir: String,
    /// Nesting depth at which the base directory was reached.
    base_depth: Option<usize>,
    /// The current entry was found by `set_base_dir` and not yet reported.
    pending: bool,
}

impl UncompressReader {
    /// Walk `source`, opening archives up to `level` levels deep (`None` for
    /// no limit).
    pub fn new(source: Box<dyn Reader>, level: Option<usize>) -> Self {
        Self {
            active: Some(source),
            frames: Vec::new(),
            level,
            base_dir: String::new(),
            base_depth: None,
            pending: false,
        }
    }

    /// The uncompression level.
    pub fn level(&self) -> Option<usize> {
        self.level
    }

    /// The base directory set by [`UncompressReader::set_base_dir`].
    pub fn base_dir(&self) -> &str {
        &self.base_dir
    }

    /// Number of archives currently open.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    fn active(&self) -> Option<&dyn Reader> {
        self.active.as_deref()
    }

    fn active_mut(&mut self) -> Result<&mut Box<dyn Reader>> {
        self.active
            .as_mut()
            .ok_or_else(|| ArcError::usage("uncompress reader lost its source"))
    }

    /// Restrict the walk to `base` and position the reader on its first
    /// entry, which the next call to [`Reader::next`] reports.
    ///
    /// Archives on the way to `base` are opened whatever the level. Returns
    /// whether `base` is a directory (or archive) rather than a single
    /// entry.
    pub fn set_base_dir(&mut self, base: &str) -> Result<bool> {
        self.close()?;
        self.base_dir = path::normalize(base);
        if !self.next()? {
            return Err(ArcError::not_found(base));
        }
        self.pending = true;
        let found = self.filename();
        debug!(
            "base directory {:?} resolved to {:?} at depth {}",
            self.base_dir,
            found,
            self.frames.len()
        );
        Ok(found.len() > self.base_dir.len())
    }

    /// Descend into the current entry if it is an archive.
    ///
    /// Without `force`, descents stop once `level` archives below the base
    /// directory are open.
    fn push(&mut self, force: bool) -> Result<bool> {
        if !force {
            if let (Some(level), Some(base_depth)) = (self.level, self.base_depth) {
                if level + base_depth <= self.frames.len() {
                    return Ok(false);
                }
            }
        }

        let Some(source) = self.active.take() else {
            return Err(ArcError::usage("uncompress reader lost its source"));
        };
        let name = source.filename();
        let (reader, layers) = codec::open_chain(&name, source);
        if layers == 0 {
            self.active = Some(reader);
            return Ok(false);
        }

        debug!("entering {:?} ({} layer(s))", name, layers);
        self.active = Some(Box::new(AddBaseName::new(&name, reader)));
        self.frames.push(layers + 1);
        Ok(true)
    }

    /// Leave the innermost archive, resuming its enclosing source.
    fn pop(&mut self) -> Result<bool> {
        let Some(layers) = self.frames.pop() else {
            return Ok(false);
        };
        let mut reader = self
            .active
            .take()
            .ok_or_else(|| ArcError::usage("uncompress reader lost its source"))?;
        for _ in 0..layers {
            reader = reader
                .into_source()
                .ok_or_else(|| ArcError::usage("archive decoder does not release its source"))?;
        }
        debug!("leaving archive {:?}", reader.filename());
        self.active = Some(reader);
        Ok(true)
    }
}

impl Reader for UncompressReader {
    fn next(&mut self) -> Result<bool> {
        if self.pending {
            self.pending = false;
            return Ok(true);
        }
        loop {
            let (name, scope) = loop {
                let source = self.active_mut()?;
                if source.next()? {
                    let name = source.filename();
                    let scope = path::scope(&self.base_dir, &name);
                    if scope != Scope::Outside {
                        break (name, scope);
                    }
                } else if !self.pop()? {
                    return Ok(false);
                }
            };

            if self.base_depth.is_none() && name.len() >= self.base_dir.len() {
                self.base_depth = Some(self.frames.len());
            }
            if self.push(false)? {
                continue;
            }
            if scope == Scope::Ancestor {
                debug!("skipping {:?}: not an archive", name);
                continue;
            }
            return Ok(true);
        }
    }

    fn filename(&self) -> String {
        self.active().map(|s| s.filename()).unwrap_or_default()
    }

    fn stat(&self) -> Stat {
        self.active().map(|s| s.stat()).unwrap_or_default()
    }

    fn mime(&self) -> String {
        match self.active() {
            Some(source) => source.mime(),
            None => arcstream_core::mime::DEFAULT_MIME.to_string(),
        }
    }

    fn data_filename(&self) -> Option<PathBuf> {
        self.active()?.data_filename()
    }

    fn read_data(&mut self, length: Option<usize>) -> Result<Option<Vec<u8>>> {
        self.active_mut()?.read_data(length)
    }

    fn skip(&mut self, length: u64) -> Result<u64> {
        self.active_mut()?.skip(length)
    }

    fn select(&mut self, target: &str) -> Result<bool> {
        let target = path::normalize(target).trim_end_matches('/').to_string();
        self.close()?;
        loop {
            let source = self.active_mut()?;
            if !source.next()? {
                return Ok(false);
            }
            let name = source.filename();
            match path::scope(&target, &name) {
                Scope::Exact | Scope::Inside => return Ok(true),
                Scope::Ancestor => {
                    if !self.push(true)? {
                        return Ok(false);
                    }
                }
                Scope::Outside => {}
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        while self.pop()? {}
        self.pending = false;
        self.base_depth = None;
        self.active_mut()?.close()
    }
}
