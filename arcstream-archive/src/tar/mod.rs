//! TAR archive format support.
//!
//! Reading streams entries straight from the upstream reader: every header
//! is a 512-byte block, data is padded to the block size and the archive
//! ends with zero blocks. Supported dialects:
//! - UStar (POSIX.1-1988), including the name prefix field
//! - PAX extended headers (POSIX.1-2001), local and global
//! - GNU long names

use crate::archive_writer::{ArchiveEncoder, ArchiveWriter};
use crate::upstream::Upstream;
use arcstream_core::error::{ArcError, Result};
use arcstream_core::{Reader, Stat, Writer, path};
use log::{trace, warn};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// TAR block size.
pub const BLOCK_SIZE: usize = 512;

/// Largest size an octal size field holds.
const MAX_OCTAL_SIZE: u64 = 0o77777777777;

/// PAX typeflag for extended header (applies to next file only).
const PAX_HEADER: u8 = b'x';

/// PAX typeflag for global extended header (applies to all subsequent files).
const PAX_GLOBAL_HEADER: u8 = b'g';

/// GNU LongName typeflag.
const GNU_LONGNAME: u8 = b'L';

/// GNU LongLink typeflag.
const GNU_LONGLINK: u8 = b'K';

/// Padding needed to round `size` up to a whole block.
pub fn padding(size: u64) -> u64 {
    (BLOCK_SIZE as u64 - size % BLOCK_SIZE as u64) % BLOCK_SIZE as u64
}

/// TAR header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TarHeader {
    /// File name, prefix included.
    pub name: String,
    /// File mode.
    pub mode: u32,
    /// Owner UID.
    pub uid: u32,
    /// Owner GID.
    pub gid: u32,
    /// File size.
    pub size: u64,
    /// Modification time.
    pub mtime: u64,
    /// Type flag.
    pub typeflag: u8,
    /// Link name.
    pub linkname: String,
}

impl TarHeader {
    /// Create a header for a regular file.
    pub fn new_file(name: &str, stat: &Stat) -> Self {
        Self {
            name: name.to_string(),
            mode: stat.mode.unwrap_or(0o644) & 0o7777,
            uid: stat.uid.unwrap_or(0),
            gid: stat.gid.unwrap_or(0),
            size: stat.size.unwrap_or(0),
            mtime: stat.mtime_or_now(),
            typeflag: b'0',
            linkname: String::new(),
        }
    }

    /// Parse a header block.
    ///
    /// Returns `None` for an all-zero block, which marks the end of the
    /// archive.
    pub fn from_block(block: &[u8; BLOCK_SIZE]) -> Result<Option<Self>> {
        if block.iter().all(|&b| b == 0) {
            return Ok(None);
        }

        let stored = Self::parse_octal(&block[148..156])? as u32;
        let (unsigned, signed) = Self::checksums(block);
        if i64::from(stored) != i64::from(unsigned) && i64::from(stored) != signed {
            return Err(ArcError::checksum_mismatch(stored, unsigned));
        }

        let name = Self::parse_string(&block[0..100]);
        let ustar = &block[257..262] == b"ustar";
        let prefix = if ustar {
            Self::parse_string(&block[345..500])
        } else {
            String::new()
        };
        let name = if prefix.is_empty() {
            name
        } else {
            format!("{}/{}", prefix, name)
        };

        let header = Self {
            name,
            mode: Self::parse_octal(&block[100..108])? as u32,
            uid: Self::parse_octal(&block[108..116])? as u32,
            gid: Self::parse_octal(&block[116..124])? as u32,
            size: Self::parse_octal(&block[124..136])?,
            mtime: Self::parse_octal(&block[136..148])?,
            typeflag: block[156],
            linkname: Self::parse_string(&block[157..257]),
        };
        trace!(
            "tar header {:?} type {:?} size {}",
            header.name, header.typeflag as char, header.size
        );
        Ok(Some(header))
    }

    /// Header checksum: the byte sum with the checksum field read as spaces,
    /// computed over unsigned and signed bytes.
    fn checksums(block: &[u8; BLOCK_SIZE]) -> (u32, i64) {
        let mut unsigned = 0u32;
        let mut signed = 0i64;
        for (i, &b) in block.iter().enumerate() {
            let b = if (148..156).contains(&i) { b' ' } else { b };
            unsigned += u32::from(b);
            signed += i64::from(b as i8);
        }
        (unsigned, signed)
    }

    /// Parse a null-terminated string.
    fn parse_string(data: &[u8]) -> String {
        let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
        String::from_utf8_lossy(&data[..end]).into_owned()
    }

    /// Parse a numeric field: octal text, or big-endian base-256 when the
    /// high bit of the first byte is set.
    fn parse_octal(data: &[u8]) -> Result<u64> {
        if data.first().is_some_and(|&b| b & 0x80 != 0) {
            let value = data[1..]
                .iter()
                .fold(u64::from(data[0] & 0x7f), |acc, &b| (acc << 8) | u64::from(b));
            return Ok(value);
        }
        let s = Self::parse_string(data);
        let s = s.trim_matches(|c: char| c == ' ' || c == '\0');
        if s.is_empty() {
            return Ok(0);
        }
        u64::from_str_radix(s, 8)
            .map_err(|_| ArcError::invalid_header(format!("Invalid octal: {}", s)))
    }

    /// Whether the header describes file data.
    pub fn is_file(&self) -> bool {
        matches!(self.typeflag, b'0' | 0 | b'7') && !self.name.ends_with('/')
    }

    /// Apply PAX extended attributes to this header.
    pub fn apply_pax_attrs(&mut self, attrs: &HashMap<String, String>) {
        if let Some(path) = attrs.get("path") {
            self.name = path.clone();
        }
        if let Some(linkpath) = attrs.get("linkpath") {
            self.linkname = linkpath.clone();
        }
        if let Some(size) = attrs.get("size").and_then(|s| s.parse().ok()) {
            self.size = size;
        }
        if let Some(mtime) = attrs.get("mtime") {
            // Fractional seconds are dropped.
            let whole = mtime.split('.').next().unwrap_or_default();
            if let Ok(t) = whole.parse() {
                self.mtime = t;
            }
        }
        if let Some(uid) = attrs.get("uid").and_then(|s| s.parse().ok()) {
            self.uid = uid;
        }
        if let Some(gid) = attrs.get("gid").and_then(|s| s.parse().ok()) {
            self.gid = gid;
        }
    }

    /// Parse PAX extended header data.
    /// Format: "length key=value\n" repeated
    pub fn parse_pax_data(data: &[u8]) -> HashMap<String, String> {
        let mut attrs = HashMap::new();
        let mut pos = 0;

        while pos < data.len() {
            let Some(space) = data[pos..].iter().position(|&b| b == b' ') else {
                break;
            };
            let space = pos + space;
            let record_len: usize =
                match String::from_utf8_lossy(&data[pos..space]).trim().parse() {
                    Ok(l) => l,
                    Err(_) => break,
                };
            if record_len == 0 || pos + record_len > data.len() || space + 1 > pos + record_len {
                break;
            }

            let record_end = pos + record_len;
            let mut value_end = record_end;
            if data.get(value_end - 1) == Some(&b'\n') {
                value_end -= 1;
            }
            let record = &data[space + 1..value_end.max(space + 1)];
            if let Some(eq) = record.iter().position(|&b| b == b'=') {
                let key = String::from_utf8_lossy(&record[..eq]).into_owned();
                let value = String::from_utf8_lossy(&record[eq + 1..]).into_owned();
                attrs.insert(key, value);
            }

            pos = record_end;
        }

        attrs
    }

    /// Format a single PAX record: "len key=value\n"
    fn format_pax_record(key: &str, value: &str) -> String {
        // The length counts its own digits.
        let base_len = key.len() + value.len() + 3;
        let mut total_len = base_len + 1;
        loop {
            let expected = base_len + total_len.to_string().len();
            if expected == total_len {
                break;
            }
            total_len = expected;
        }
        format!("{} {}={}\n", total_len, key, value)
    }

    /// Split a name into UStar `(prefix, name)` fields, if it fits.
    fn split_name(name: &str) -> Option<(&str, &str)> {
        if name.len() <= 100 {
            return Some(("", name));
        }
        let limit = name.len().min(156);
        let mut cut = name[..limit].rfind('/')?;
        while cut > 0 {
            let (prefix, rest) = (&name[..cut], &name[cut + 1..]);
            if prefix.len() <= 155 && rest.len() <= 100 && !rest.is_empty() {
                return Some((prefix, rest));
            }
            cut = name[..cut].rfind('/')?;
        }
        None
    }

    /// PAX records needed to carry what the UStar fields cannot.
    fn pax_records(&self) -> String {
        let mut records = String::new();
        if Self::split_name(&self.name).is_none() {
            records.push_str(&Self::format_pax_record("path", &self.name));
        }
        if self.size > MAX_OCTAL_SIZE {
            records.push_str(&Self::format_pax_record("size", &self.size.to_string()));
        }
        records
    }

    /// Convert header to a 512-byte block.
    pub fn to_block(&self) -> [u8; BLOCK_SIZE] {
        let mut block = [0u8; BLOCK_SIZE];

        let (prefix, name) = Self::split_name(&self.name).unwrap_or_else(|| {
            let tail = path::basename(&self.name);
            ("", &tail[tail.len().saturating_sub(100)..])
        });

        Self::write_string(&mut block[0..100], name);
        Self::write_octal(&mut block[100..108], u64::from(self.mode));
        Self::write_octal(&mut block[108..116], u64::from(self.uid));
        Self::write_octal(&mut block[116..124], u64::from(self.gid));
        Self::write_octal(&mut block[124..136], self.size.min(MAX_OCTAL_SIZE));
        Self::write_octal(&mut block[136..148], self.mtime);
        block[156] = self.typeflag;
        Self::write_string(&mut block[157..257], &self.linkname);
        block[257..263].copy_from_slice(b"ustar\0");
        block[263..265].copy_from_slice(b"00");
        Self::write_string(&mut block[345..500], prefix);

        block[148..156].copy_from_slice(b"        ");
        let checksum: u32 = block.iter().map(|&b| u32::from(b)).sum();
        let checksum_str = format!("{:06o}\0 ", checksum);
        block[148..156].copy_from_slice(&checksum_str.as_bytes()[..8]);

        block
    }

    /// Write a string to a field, truncated to the field width.
    fn write_string(field: &mut [u8], s: &str) {
        let bytes = s.as_bytes();
        let len = bytes.len().min(field.len());
        field[..len].copy_from_slice(&bytes[..len]);
    }

    /// Write a zero-padded, null-terminated octal number to a field.
    fn write_octal(field: &mut [u8], value: u64) {
        let s = format!("{:0width$o}", value, width = field.len() - 1);
        let bytes = s.as_bytes();
        if bytes.len() < field.len() {
            field[..bytes.len()].copy_from_slice(bytes);
        }
    }

    /// Serialize the header, preceded by a PAX header when needed.
    fn encode(&self) -> Vec<u8> {
        let records = self.pax_records();
        let mut out = Vec::with_capacity(BLOCK_SIZE * 3);
        if !records.is_empty() {
            let pax = Self {
                name: "PaxHeader".to_string(),
                mode: 0o644,
                uid: 0,
                gid: 0,
                size: records.len() as u64,
                mtime: self.mtime,
                typeflag: PAX_HEADER,
                linkname: String::new(),
            };
            out.extend_from_slice(&pax.to_block());
            out.extend_from_slice(records.as_bytes());
            out.resize(out.len() + padding(records.len() as u64) as usize, 0);
        }
        out.extend_from_slice(&self.to_block());
        out
    }
}

/// Streaming TAR reader.
///
/// Regular files are exposed as entries; directories, links and special
/// files are passed over.
pub struct TarReader {
    upstream: Upstream,
    header: Option<TarHeader>,
    left: u64,
    pad: u64,
    done: bool,
    global_pax: HashMap<String, String>,
}

impl TarReader {
    /// Decode the tar archive held by `source`.
    ///
    /// `source_opened` tells whether `source` already sits on the entry
    /// holding the archive.
    pub fn new(source: Box<dyn Reader>, source_opened: bool) -> Self {
        Self {
            upstream: Upstream::new(source, source_opened),
            header: None,
            left: 0,
            pad: 0,
            done: false,
            global_pax: HashMap::new(),
        }
    }

    /// Header of the current entry.
    pub fn header(&self) -> Option<&TarHeader> {
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

    fn read_record(&mut self, size: u64) -> Result<Vec<u8>> {
        let size = usize::try_from(size)
            .map_err(|_| ArcError::invalid_header("tar record too large"))?;
        let data = self.upstream.source.read_full(size)?;
        if data.len() < size {
            return Err(ArcError::unexpected_eof(size));
        }
        self.skip_exact(padding(size as u64))?;
        Ok(data)
    }
}

impl Reader for TarReader {
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

        let mut local_pax: HashMap<String, String> = HashMap::new();
        let mut long_name: Option<String> = None;
        loop {
            let raw = self.upstream.source.read_full(BLOCK_SIZE)?;
            if raw.is_empty() {
                warn!(
                    "tar archive {:?} ends without end-of-archive blocks",
                    self.upstream.filename()
                );
                self.done = true;
                return Ok(false);
            }
            let block: &[u8; BLOCK_SIZE] = raw
                .as_slice()
                .try_into()
                .map_err(|_| ArcError::unexpected_eof(BLOCK_SIZE))?;

            let Some(mut header) = TarHeader::from_block(block)? else {
                self.done = true;
                return Ok(false);
            };

            match header.typeflag {
                PAX_HEADER => {
                    let data = self.read_record(header.size)?;
                    local_pax.extend(TarHeader::parse_pax_data(&data));
                }
                PAX_GLOBAL_HEADER => {
                    let data = self.read_record(header.size)?;
                    self.global_pax.extend(TarHeader::parse_pax_data(&data));
                }
                GNU_LONGNAME => {
                    let data = self.read_record(header.size)?;
                    long_name = Some(TarHeader::parse_string(&data));
                }
                GNU_LONGLINK => {
                    self.read_record(header.size)?;
                }
                _ => {
                    header.apply_pax_attrs(&self.global_pax);
                    header.apply_pax_attrs(&local_pax);
                    if let Some(name) = long_name.take() {
                        header.name = name;
                    }
                    local_pax.clear();

                    if !header.is_file() {
                        self.skip_exact(header.size + padding(header.size))?;
                        continue;
                    }
                    header.name = path::normalize(&header.name);
                    self.left = header.size;
                    self.pad = padding(header.size);
                    self.header = Some(header);
                    return Ok(true);
                }
            }
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
        let data = self.upstream.source.read_full(wanted)?;
        if data.len() < wanted {
            return Err(ArcError::unexpected_eof(wanted));
        }
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
        self.header = None;
        self.left = 0;
        self.pad = 0;
        self.done = false;
        self.global_pax.clear();
        self.upstream.close()
    }

    fn into_source(self: Box<Self>) -> Option<Box<dyn Reader>> {
        Some(self.upstream.into_inner())
    }
}

/// Encoder producing UStar archives.
#[derive(Debug, Default)]
pub struct TarEncoder;

impl ArchiveEncoder for TarEncoder {
    fn mime(&self) -> &'static str {
        "application/x-tar"
    }

    fn append(&mut self, out: &mut dyn Writer, name: &str, stat: &Stat, data: &[u8]) -> Result<()> {
        let header = TarHeader::new_file(name, &stat.with_size(data.len() as u64));
        out.write_data(&header.encode())?;
        out.write_data(data)?;
        out.write_data(&vec![0u8; padding(data.len() as u64) as usize])
    }

    fn append_file(
        &mut self,
        out: &mut dyn Writer,
        name: &str,
        stat: &Stat,
        path: &Path,
    ) -> Result<()> {
        let meta = Stat::from_metadata(&fs::metadata(path)?);
        let merged = Stat {
            mode: stat.mode.or(meta.mode),
            uid: stat.uid.or(meta.uid),
            gid: stat.gid.or(meta.gid),
            size: meta.size,
            mtime: stat.mtime.or(meta.mtime),
        };
        let header = TarHeader::new_file(name, &merged);
        out.write_data(&header.encode())?;
        out.write_file(path)?;
        out.write_data(&vec![0u8; padding(header.size) as usize])
    }

    fn finish(&mut self, out: &mut dyn Writer, _entries: usize) -> Result<()> {
        out.write_data(&[0u8; BLOCK_SIZE * 2])
    }
}

/// Writer producing a TAR archive.
pub type TarWriter<W> = ArchiveWriter<TarEncoder, W>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryReader, MemoryWriter};

    fn build(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = TarWriter::new("", MemoryWriter::new()).unwrap();
        for (name, data) in files {
            writer
                .new_file(name, &Stat::new().with_mode(0o600).with_mtime(1_000), "")
                .unwrap();
            writer.write_data(data).unwrap();
        }
        writer.close().unwrap();
        writer.into_inner().into_inner()
    }

    fn reader(data: Vec<u8>) -> TarReader {
        TarReader::new(Box::new(MemoryReader::new(data, "test.tar")), false)
    }

    #[test]
    fn test_parse_octal() {
        assert_eq!(TarHeader::parse_octal(b"0000644\0").unwrap(), 0o644);
        assert_eq!(TarHeader::parse_octal(b"  1750 \0").unwrap(), 0o1750);
        assert_eq!(TarHeader::parse_octal(b"\0\0\0\0").unwrap(), 0);
        assert_eq!(
            TarHeader::parse_octal(&[0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x01, 0x00]).unwrap(),
            256
        );
        assert!(TarHeader::parse_octal(b"0009\0").is_err());
    }

    #[test]
    fn test_parse_string() {
        assert_eq!(TarHeader::parse_string(b"hello\0world"), "hello");
        assert_eq!(TarHeader::parse_string(b"test"), "test");
    }

    #[test]
    fn test_single_entry() {
        let data = build(&[("x.txt", &b"ABCDEFGH"[..])]);
        assert_eq!(data.len(), BLOCK_SIZE * 4);

        let mut reader = reader(data);
        assert!(reader.next().unwrap());
        assert_eq!(reader.filename(), "x.txt");
        let stat = reader.stat();
        assert_eq!(stat.size, Some(8));
        assert_eq!(stat.mode, Some(0o600));
        assert_eq!(stat.mtime, Some(1_000));
        assert_eq!(reader.read_data(Some(3)).unwrap().unwrap(), b"ABC");
        assert_eq!(reader.read_data(None).unwrap().unwrap(), b"DEFGH");
        assert_eq!(reader.read_data(None).unwrap(), None);
        assert!(!reader.next().unwrap());
        assert!(!reader.next().unwrap());
    }

    #[test]
    fn test_unread_data_is_skipped() {
        let big = vec![7u8; 1500];
        let data = build(&[("a.bin", &big[..]), ("b.txt", &b"second"[..]), ("c.txt", &b""[..])]);

        let mut reader = reader(data);
        assert!(reader.next().unwrap());
        assert_eq!(reader.read_data(Some(10)).unwrap().unwrap(), vec![7u8; 10]);
        assert_eq!(reader.skip(100).unwrap(), 100);
        assert!(reader.next().unwrap());
        assert_eq!(reader.filename(), "b.txt");
        assert_eq!(reader.read_data(None).unwrap().unwrap(), b"second");
        assert!(reader.next().unwrap());
        assert_eq!(reader.filename(), "c.txt");
        assert_eq!(reader.read_data(None).unwrap(), None);
        assert!(!reader.next().unwrap());

        assert!(reader.file_list().unwrap().is_empty());
        assert_eq!(
            reader.file_list().unwrap(),
            vec!["a.bin", "b.txt", "c.txt"]
        );
    }

    #[test]
    fn test_checksum_rejected() {
        let mut data = build(&[("x.txt", &b"ABCDEFGH"[..])]);
        data[0] = b'y';
        let mut reader = reader(data);
        assert!(matches!(
            reader.next(),
            Err(ArcError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_truncated_header() {
        let data = build(&[("x.txt", &b"ABCDEFGH"[..])]);
        let mut reader = reader(data[..300].to_vec());
        assert!(matches!(
            reader.next(),
            Err(ArcError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_truncated_payload_is_an_error() {
        let payload = vec![b'a'; 1500];
        let data = build(&[("a.bin", &payload[..]), ("b.txt", &b"b"[..])]);
        let mut reader = reader(data[..1000].to_vec());
        assert!(reader.next().unwrap());
        assert_eq!(reader.stat().size, Some(1500));
        assert!(matches!(
            reader.next(),
            Err(ArcError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_missing_end_blocks_tolerated() {
        let data = build(&[("x.txt", &b"ABCDEFGH"[..])]);
        let mut reader = reader(data[..BLOCK_SIZE * 2].to_vec());
        assert!(reader.next().unwrap());
        assert!(!reader.next().unwrap());
    }

    #[test]
    fn test_long_names() {
        let prefixed = format!("{}/{}", "d".repeat(120), "file.txt");
        let flat = "n".repeat(180);
        let data = build(&[(prefixed.as_str(), &b"1"[..]), (flat.as_str(), &b"2"[..])]);

        let mut reader = reader(data);
        assert!(reader.next().unwrap());
        assert_eq!(reader.filename(), prefixed);
        assert!(reader.next().unwrap());
        assert_eq!(reader.filename(), flat);
        assert_eq!(reader.read_data(None).unwrap().unwrap(), b"2");
    }

    #[test]
    fn test_directories_and_links_skipped() {
        let mut data = Vec::new();
        let mut dir = TarHeader::new_file("docs/", &Stat::new());
        dir.typeflag = b'5';
        data.extend_from_slice(&dir.to_block());
        let mut link = TarHeader::new_file("docs/link", &Stat::new());
        link.typeflag = b'2';
        link.linkname = "target".to_string();
        data.extend_from_slice(&link.to_block());
        data.extend_from_slice(&TarHeader::new_file("docs/a.txt", &Stat::new().with_size(1)).to_block());
        data.push(b'A');
        data.resize(data.len() + BLOCK_SIZE - 1 + BLOCK_SIZE * 2, 0);

        let mut reader = reader(data);
        assert_eq!(reader.file_list().unwrap(), vec!["docs/a.txt"]);
    }

    #[test]
    fn test_pax_record_format() {
        let record = TarHeader::format_pax_record("path", "test.txt");
        assert_eq!(record, "17 path=test.txt\n");

        let long_path = "a".repeat(200);
        let record = TarHeader::format_pax_record("path", &long_path);
        assert!(record.starts_with("210 path="));
        assert_eq!(record.len(), 210);
    }

    #[test]
    fn test_parse_pax_data() {
        let attrs = TarHeader::parse_pax_data(b"17 path=test.txt\n19 mtime=1234.5678\n");
        assert_eq!(attrs.get("path").map(String::as_str), Some("test.txt"));

        let mut header = TarHeader::new_file("short", &Stat::new());
        header.apply_pax_attrs(&attrs);
        assert_eq!(header.name, "test.txt");
        assert_eq!(header.mtime, 1234);
    }

    #[test]
    fn test_write_file_streams_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("disk.txt");
        fs::write(&file, b"from disk").unwrap();

        let mut writer = TarWriter::new("out.tar", MemoryWriter::new()).unwrap();
        writer.new_file("disk.txt", &Stat::new(), "").unwrap();
        writer.write_file(&file).unwrap();
        writer.close().unwrap();

        let mut reader = reader(writer.into_inner().into_inner());
        assert!(reader.next().unwrap());
        assert_eq!(reader.stat().size, Some(9));
        assert_eq!(reader.read_data(None).unwrap().unwrap(), b"from disk");
    }
}
