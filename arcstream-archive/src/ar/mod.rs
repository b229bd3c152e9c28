//! Unix `ar` archive support (also the outer layer of `.deb` packages).
//!
//! Members follow the global `!<arch>\n` magic, each behind a 60-byte text
//! header and padded to an even offset. BSD long names (`#1/<len>`) and the
//! GNU long-name table (`//` plus `/<offset>` references) are understood;
//! symbol tables are skipped.

use crate::archive_writer::{ArchiveEncoder, ArchiveWriter};
use crate::upstream::Upstream;
use arcstream_core::error::{ArcError, Result};
use arcstream_core::{Reader, Stat, Writer, path};

/// Global archive magic.
pub const AR_MAGIC: &[u8; 8] = b"!<arch>\n";

/// Size of a member header.
pub const HEADER_SIZE: usize = 60;

/// Terminator of a member header.
pub const HEADER_END: &[u8; 2] = b"`\n";

/// Prefix of BSD long names.
const BSD_LONG_NAME: &str = "#1/";

/// Member header, with long names resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArHeader {
    /// Member name.
    pub name: String,
    /// Modification time.
    pub mtime: u64,
    /// Owner user id.
    pub uid: u32,
    /// Owner group id.
    pub gid: u32,
    /// Permission bits.
    pub mode: u32,
    /// Size of the member data, long name excluded.
    pub size: u64,
}

fn field(raw: &[u8]) -> &str {
    std::str::from_utf8(raw).unwrap_or("").trim_end_matches([' ', '\0'])
}

fn parse_number<T: TryFrom<u64>>(raw: &[u8], radix: u32, what: &str) -> Result<T> {
    let text = field(raw).trim_start();
    if text.is_empty() {
        return T::try_from(0u64).map_err(|_| ArcError::invalid_header(format!("ar {}", what)));
    }
    u64::from_str_radix(text, radix)
        .ok()
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| ArcError::invalid_header(format!("invalid ar {} field {:?}", what, text)))
}

/// Whether a raw member name denotes a symbol table.
fn is_symbol_table(name: &str) -> bool {
    matches!(name, "/" | "/SYM64/") || name.starts_with("__.SYMDEF")
}

/// Streaming ar reader.
pub struct ArReader {
    upstream: Upstream,
    magic_checked: bool,
    header: Option<ArHeader>,
    left: u64,
    pad: u64,
    done: bool,
    long_names: Vec<u8>,
}

impl ArReader {
    /// Decode the ar archive held by `source`.
    ///
    /// `source_opened` tells whether `source` already sits on the entry
    /// holding the archive.
    pub fn new(source: Box<dyn Reader>, source_opened: bool) -> Self {
        Self {
            upstream: Upstream::new(source, source_opened),
            magic_checked: false,
            header: None,
            left: 0,
            pad: 0,
            done: false,
            long_names: Vec::new(),
        }
    }

    /// Header of the current member.
    pub fn header(&self) -> Option<&ArHeader> {
        self.header.as_ref()
    }

    fn skip_exact(&mut self, length: u64) -> Result<()> {
        if length > 0 && self.upstream.source.skip(length)? < length {
            return Err(ArcError::unexpected_eof(
                usize::try_from(length).unwrap_or(usize::MAX),
            ));
        }
        Ok(())
    }

    fn read_exact(&mut self, length: usize) -> Result<Vec<u8>> {
        let data = self.upstream.source.read_full(length)?;
        if data.len() < length {
            return Err(ArcError::unexpected_eof(length));
        }
        Ok(data)
    }

    /// Resolve a `/<offset>` reference into the GNU long-name table.
    fn gnu_name(&self, offset: &str) -> Result<String> {
        let start: usize = offset
            .parse()
            .map_err(|_| ArcError::invalid_header(format!("invalid ar name reference /{}", offset)))?;
        let table = self.long_names.get(start..).ok_or_else(|| {
            ArcError::invalid_header(format!("ar name reference /{} out of range", offset))
        })?;
        let end = table
            .iter()
            .position(|&b| b == b'\n')
            .unwrap_or(table.len());
        let name = String::from_utf8_lossy(&table[..end]);
        Ok(name.trim_end_matches('/').to_string())
    }
}

impl Reader for ArReader {
    fn next(&mut self) -> Result<bool> {
        if self.done {
            return Ok(false);
        }
        if !self.upstream.open()? {
            self.done = true;
            return Ok(false);
        }
        self.skip_exact(self.left + self.pad)?;
        self.header = None;
        self.left = 0;
        self.pad = 0;

        if !self.magic_checked {
            let magic = self.upstream.source.read_full(AR_MAGIC.len())?;
            if magic != AR_MAGIC {
                return Err(ArcError::invalid_magic(AR_MAGIC.to_vec(), magic));
            }
            self.magic_checked = true;
        }

        loop {
            let raw = self.upstream.source.read_full(HEADER_SIZE)?;
            if raw.is_empty() {
                self.done = true;
                return Ok(false);
            }
            if raw.len() < HEADER_SIZE {
                return Err(ArcError::unexpected_eof(HEADER_SIZE));
            }
            if &raw[58..60] != HEADER_END {
                return Err(ArcError::invalid_header("ar member header end marker missing"));
            }

            let raw_name = field(&raw[0..16]).to_string();
            let mtime: u64 = parse_number(&raw[16..28], 10, "mtime")?;
            let uid: u32 = parse_number(&raw[28..34], 10, "uid")?;
            let gid: u32 = parse_number(&raw[34..40], 10, "gid")?;
            let mode: u32 = parse_number(&raw[40..48], 8, "mode")?;
            let mut size: u64 = parse_number(&raw[48..58], 10, "size")?;
            let pad = size % 2;
            log::trace!("ar member {:?} size {}", raw_name, size);

            if is_symbol_table(&raw_name) {
                self.skip_exact(size + pad)?;
                continue;
            }
            if raw_name == "//" {
                let len = usize::try_from(size)
                    .map_err(|_| ArcError::invalid_header("ar name table too large"))?;
                self.long_names = self.read_exact(len)?;
                self.skip_exact(pad)?;
                continue;
            }

            let name = if let Some(len) = raw_name.strip_prefix(BSD_LONG_NAME) {
                let len: usize = len
                    .trim()
                    .parse()
                    .map_err(|_| ArcError::invalid_header(format!("invalid ar name {:?}", raw_name)))?;
                if len as u64 > size {
                    return Err(ArcError::invalid_header("ar long name exceeds member size"));
                }
                let bytes = self.read_exact(len)?;
                size -= len as u64;
                String::from_utf8_lossy(&bytes)
                    .trim_end_matches('\0')
                    .to_string()
            } else if let Some(offset) = raw_name
                .strip_prefix('/')
                .filter(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
            {
                self.gnu_name(offset)?
            } else {
                raw_name.trim_end_matches('/').to_string()
            };

            if name.is_empty() {
                return Err(ArcError::invalid_header("ar member without a name"));
            }

            self.left = size;
            self.pad = pad;
            self.header = Some(ArHeader {
                name: path::normalize(&name),
                mtime,
                uid,
                gid,
                mode,
                size,
            });
            return Ok(true);
        }
    }

    fn filename(&self) -> String {
        self.header
            .as_ref()
            .map(|h| h.name.clone())
            .unwrap_or_default()
    }

    fn stat(&self) -> Stat {
        match &self.header {
            Some(h) => Stat::new()
                .with_mode(h.mode)
                .with_owner(h.uid, h.gid)
                .with_size(h.size)
                .with_mtime(h.mtime),
            None => Stat::default(),
        }
    }

    fn read_data(&mut self, length: Option<usize>) -> Result<Option<Vec<u8>>> {
        if self.left == 0 {
            return Ok(None);
        }
        let left = usize::try_from(self.left).unwrap_or(usize::MAX);
        let wanted = length.map_or(left, |n| n.min(left));
        let data = self.read_exact(wanted)?;
        self.left -= data.len() as u64;
        Ok(Some(data))
    }

    fn skip(&mut self, length: u64) -> Result<u64> {
        let wanted = length.min(self.left);
        let skipped = self.upstream.source.skip(wanted)?;
        self.left -= skipped;
        Ok(skipped)
    }

    fn close(&mut self) -> Result<()> {
        self.magic_checked = false;
        self.header = None;
        self.left = 0;
        self.pad = 0;
        self.done = false;
        self.long_names.clear();
        self.upstream.close()
    }

    fn into_source(self: Box<Self>) -> Option<Box<dyn Reader>> {
        Some(self.upstream.into_inner())
    }
}

/// Left-align `value` in a header field of `width` bytes.
fn fit(value: String, width: usize, what: &str) -> Result<String> {
    if value.len() > width {
        return Err(ArcError::invalid_header(format!(
            "ar {} {} does not fit {} bytes",
            what, value, width
        )));
    }
    Ok(format!("{:<width$}", value))
}

/// Encoder producing ar archives with BSD long names.
#[derive(Debug, Default)]
pub struct ArEncoder;

impl ArEncoder {
    /// Build the 60-byte header of a member. Names that do not fit the
    /// 16-byte field, or contain spaces, are stored BSD style in front of
    /// the data and returned as the second value.
    ///
    /// Values too wide for their decimal (or octal) field are rejected.
    pub fn header(name: &str, stat: &Stat, size: u64) -> Result<(Vec<u8>, Vec<u8>)> {
        let (field, long_name, size) = if name.len() > 16 || name.contains(' ') {
            (
                format!("{}{}", BSD_LONG_NAME, name.len()),
                name.as_bytes().to_vec(),
                size + name.len() as u64,
            )
        } else {
            (name.to_string(), Vec::new(), size)
        };
        let header = [
            fit(field, 16, "name")?,
            fit(stat.mtime_or_now().to_string(), 12, "mtime")?,
            fit(stat.uid.unwrap_or(0).to_string(), 6, "uid")?,
            fit(stat.gid.unwrap_or(0).to_string(), 6, "gid")?,
            fit(format!("{:o}", stat.mode.unwrap_or(0o644)), 8, "mode")?,
            fit(size.to_string(), 10, "size")?,
        ]
        .concat();
        let mut header = header.into_bytes();
        header.extend_from_slice(HEADER_END);
        Ok((header, long_name))
    }
}

impl ArchiveEncoder for ArEncoder {
    fn mime(&self) -> &'static str {
        "application/x-archive"
    }

    fn begin(&mut self, out: &mut dyn Writer) -> Result<()> {
        out.write_data(AR_MAGIC)
    }

    fn append(&mut self, out: &mut dyn Writer, name: &str, stat: &Stat, data: &[u8]) -> Result<()> {
        let (header, long_name) = Self::header(name, stat, data.len() as u64)?;
        out.write_data(&header)?;
        out.write_data(&long_name)?;
        out.write_data(data)?;
        if (long_name.len() + data.len()) % 2 == 1 {
            out.write_data(b"\n")?;
        }
        Ok(())
    }

    fn finish(&mut self, _out: &mut dyn Writer, _entries: usize) -> Result<()> {
        Ok(())
    }
}

/// Writer producing an ar archive.
pub type ArWriter<W> = ArchiveWriter<ArEncoder, W>;
