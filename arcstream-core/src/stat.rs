//! Sparse entry metadata.

use std::fs::Metadata;
use std::time::{SystemTime, UNIX_EPOCH};

/// Metadata attached to an entry.
///
/// Every field is optional because sources disagree on what they record.
/// Codec readers always fill `size` once a header has been parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stat {
    /// Unix permission bits.
    pub mode: Option<u32>,
    /// Owner user id.
    pub uid: Option<u32>,
    /// Owner group id.
    pub gid: Option<u32>,
    /// Size of the entry data in bytes.
    pub size: Option<u64>,
    /// Modification time in seconds since the Unix epoch.
    pub mtime: Option<u64>,
}

impl Stat {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Set the Unix mode.
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set the modification time.
    pub fn with_mtime(mut self, mtime: u64) -> Self {
        self.mtime = Some(mtime);
        self
    }

    /// Set owner ids.
    pub fn with_owner(mut self, uid: u32, gid: u32) -> Self {
        self.uid = Some(uid);
        self.gid = Some(gid);
        self
    }

    /// Build metadata from filesystem information.
    pub fn from_metadata(meta: &Metadata) -> Self {
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs());

        #[cfg(unix)]
        let (mode, uid, gid) = {
            use std::os::unix::fs::MetadataExt;
            (Some(meta.mode() & 0o7777), Some(meta.uid()), Some(meta.gid()))
        };
        #[cfg(not(unix))]
        let (mode, uid, gid) = {
            let mode = if meta.permissions().readonly() {
                0o444
            } else {
                0o644
            };
            (Some(mode), None, None)
        };

        Self {
            mode,
            uid,
            gid,
            size: Some(meta.len()),
            mtime,
        }
    }

    /// Modification time, or the current time when unknown.
    pub fn mtime_or_now(&self) -> u64 {
        self.mtime.unwrap_or_else(unix_now)
    }
}

/// Current time in seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
