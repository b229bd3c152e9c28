//! ZIP format support.
//!
//! The reader walks local file headers front to back and stops at the
//! central directory, so a ZIP archive can be decoded from a forward-only
//! stream. Entry data is inflated on the first read and its CRC-32 checked
//! then; skipping an entry never touches its data.
//!
//! The writer emits stored or deflated entries, whichever is smaller,
//! followed by the central directory and Zip64 records when offsets or sizes
//! overflow 32 bits.

mod header;

pub use header::{
    CENTRAL_DIR_HEADER_SIG, CompressionMethod, END_OF_CENTRAL_DIR_SIG, LOCAL_FILE_HEADER_SIG,
    LocalFileHeader, ZIP64_END_OF_CENTRAL_DIR_LOCATOR_SIG, ZIP64_END_OF_CENTRAL_DIR_SIG,
    dos_to_unix, flags, unix_to_dos,
};

use crate::archive_writer::{ArchiveEncoder, ArchiveWriter};
use crate::upstream::Upstream;
use arcstream_core::error::{ArcError, Result};
use arcstream_core::{Reader, Stat, Writer, path};
use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use header::{CentralDirEntry, ZIP64_MARKER_16, ZIP64_MARKER_32, clamp32};
use log::debug;
use std::io::{Read, Write};

/// Streaming ZIP reader.
pub struct ZipReader {
    upstream: Upstream,
    header: Option<LocalFileHeader>,
    /// Whether the compressed bytes of the current entry were consumed.
    consumed: bool,
    /// Decoding the current entry failed; its bytes are gone.
    failed: bool,
    data: Option<Vec<u8>>,
    offset: u64,
    done: bool,
}

impl ZipReader {
    /// Decode the ZIP archive held by `source`.
    ///
    /// `source_opened` tells whether `source` already sits on the entry
    /// holding the archive.
    pub fn new(source: Box<dyn Reader>, source_opened: bool) -> Self {
        Self {
            upstream: Upstream::new(source, source_opened),
            header: None,
            consumed: false,
            failed: false,
            data: None,
            offset: 0,
            done: false,
        }
    }

    /// Local header of the current entry.
    pub fn header(&self) -> Option<&LocalFileHeader> {
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

    /// Inflate the current entry and check its CRC.
    ///
    /// A failure is sticky: the compressed bytes were consumed, so later
    /// reads of the entry fail again without touching the source.
    fn load(&mut self) -> Result<()> {
        if self.data.is_some() || self.header.is_none() {
            return Ok(());
        }
        if self.failed {
            return Err(ArcError::corrupted(0, "entry data could not be decoded"));
        }
        let result = self.decode();
        self.failed = result.is_err();
        self.data = Some(result?);
        Ok(())
    }

    fn decode(&mut self) -> Result<Vec<u8>> {
        let Some(header) = &self.header else {
            return Ok(Vec::new());
        };
        let (method, crc32, compressed, expected) = (
            header.method,
            header.crc32,
            header.compressed_size,
            header.uncompressed_size,
        );

        let wanted = usize::try_from(compressed)
            .map_err(|_| ArcError::invalid_header("zip entry too large"))?;
        let raw = self.upstream.source.read_full(wanted)?;
        self.consumed = true;
        if raw.len() < wanted {
            return Err(ArcError::unexpected_eof(wanted));
        }

        let data = match method {
            CompressionMethod::Deflate => {
                let mut out = Vec::with_capacity(usize::try_from(expected).unwrap_or(0));
                if let Err(e) = DeflateDecoder::new(raw.as_slice()).read_to_end(&mut out) {
                    debug!("inflating zip entry failed: {}", e);
                    return Err(ArcError::crc_mismatch(crc32, crc32fast::hash(&out)));
                }
                out
            }
            _ => raw,
        };

        let computed = crc32fast::hash(&data);
        if computed != crc32 {
            return Err(ArcError::crc_mismatch(crc32, computed));
        }
        if data.len() as u64 != expected {
            return Err(ArcError::corrupted(
                compressed,
                format!("Size mismatch: expected {}, got {}", expected, data.len()),
            ));
        }
        Ok(data)
    }
}

impl Reader for ZipReader {
    fn next(&mut self) -> Result<bool> {
        if self.done {
            return Ok(false);
        }
        if !self.upstream.open()? {
            self.done = true;
            return Ok(false);
        }
        if let Some(header) = self.header.take() {
            if !self.consumed {
                self.skip_exact(header.compressed_size)?;
            }
        }
        self.data = None;
        self.consumed = false;
        self.failed = false;
        self.offset = 0;

        loop {
            let raw = self.upstream.source.read_full(4)?;
            if raw.is_empty() {
                self.done = true;
                return Ok(false);
            }
            if raw.len() < 4 {
                return Err(ArcError::unexpected_eof(4));
            }
            let signature = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
            match signature {
                LOCAL_FILE_HEADER_SIG => {}
                CENTRAL_DIR_HEADER_SIG
                | END_OF_CENTRAL_DIR_SIG
                | ZIP64_END_OF_CENTRAL_DIR_SIG => {
                    self.done = true;
                    return Ok(false);
                }
                _ => {
                    return Err(ArcError::invalid_magic(
                        LOCAL_FILE_HEADER_SIG.to_le_bytes(),
                        raw,
                    ));
                }
            }

            let mut stream = arcstream_core::EntryStream::new(&mut *self.upstream.source);
            let mut header = LocalFileHeader::read_after_signature(&mut stream)?;
            header.check_supported()?;

            if header.is_dir() {
                self.skip_exact(header.compressed_size)?;
                continue;
            }
            header.filename = path::normalize(&header.filename);
            self.header = Some(header);
            return Ok(true);
        }
    }

    fn filename(&self) -> String {
        self.header
            .as_ref()
            .map(|h| h.filename.clone())
            .unwrap_or_default()
    }

    fn stat(&self) -> Stat {
        match &self.header {
            Some(h) => Stat::new()
                .with_size(h.uncompressed_size)
                .with_mtime(h.modified()),
            None => Stat::default(),
        }
    }

    fn read_data(&mut self, length: Option<usize>) -> Result<Option<Vec<u8>>> {
        let Some(header) = &self.header else {
            return Ok(None);
        };
        if self.offset >= header.uncompressed_size {
            return Ok(None);
        }
        self.load()?;
        let Some(data) = &self.data else {
            return Ok(None);
        };
        let start = self.offset as usize;
        let left = data.len() - start;
        let n = length.map_or(left, |n| n.min(left));
        self.offset += n as u64;
        Ok(Some(data[start..start + n].to_vec()))
    }

    fn skip(&mut self, length: u64) -> Result<u64> {
        let Some(header) = &self.header else {
            return Ok(0);
        };
        let n = length.min(header.uncompressed_size.saturating_sub(self.offset));
        self.offset += n;
        Ok(n)
    }

    fn close(&mut self) -> Result<()> {
        self.header = None;
        self.data = None;
        self.consumed = false;
        self.failed = false;
        self.offset = 0;
        self.done = false;
        self.upstream.close()
    }

    fn into_source(self: Box<Self>) -> Option<Box<dyn Reader>> {
        Some(self.upstream.into_inner())
    }
}

/// Encoder producing ZIP archives.
#[derive(Debug)]
pub struct ZipEncoder {
    level: u32,
    comment: String,
    offset: u64,
    central: Vec<CentralDirEntry>,
}

impl Default for ZipEncoder {
    fn default() -> Self {
        Self {
            level: 9,
            comment: String::new(),
            offset: 0,
            central: Vec::new(),
        }
    }
}

impl ZipEncoder {
    /// Archive comment written in the end of central directory record.
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Set the archive comment.
    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
    }

    fn compress(&self, data: &[u8]) -> Result<(CompressionMethod, Vec<u8>)> {
        if self.level == 0 || data.is_empty() {
            return Ok((CompressionMethod::Stored, data.to_vec()));
        }
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::new(self.level));
        encoder.write_all(data)?;
        let deflated = encoder.finish()?;
        // Use deflate only if it actually shrinks the data.
        if deflated.len() < data.len() {
            Ok((CompressionMethod::Deflate, deflated))
        } else {
            Ok((CompressionMethod::Stored, data.to_vec()))
        }
    }

    fn write_end_records(&self, out: &mut dyn Writer, cd_offset: u64, cd_size: u64) -> Result<()> {
        let count = self.central.len() as u64;
        let needs_zip64 = count >= u64::from(ZIP64_MARKER_16)
            || cd_offset >= u64::from(ZIP64_MARKER_32)
            || cd_size >= u64::from(ZIP64_MARKER_32);

        let mut end = Vec::with_capacity(22 + 56 + 20 + self.comment.len());
        if needs_zip64 {
            let zip64_eocd_offset = cd_offset + cd_size;
            end.extend_from_slice(&ZIP64_END_OF_CENTRAL_DIR_SIG.to_le_bytes());
            end.extend_from_slice(&44u64.to_le_bytes()); // Size of remaining record
            end.extend_from_slice(&0x031Eu16.to_le_bytes()); // Version made by
            end.extend_from_slice(&45u16.to_le_bytes()); // Version needed
            end.extend_from_slice(&0u32.to_le_bytes()); // Disk number
            end.extend_from_slice(&0u32.to_le_bytes()); // Disk with CD
            end.extend_from_slice(&count.to_le_bytes()); // Entries on disk
            end.extend_from_slice(&count.to_le_bytes()); // Total entries
            end.extend_from_slice(&cd_size.to_le_bytes());
            end.extend_from_slice(&cd_offset.to_le_bytes());

            end.extend_from_slice(&ZIP64_END_OF_CENTRAL_DIR_LOCATOR_SIG.to_le_bytes());
            end.extend_from_slice(&0u32.to_le_bytes()); // Disk with Zip64 EOCD
            end.extend_from_slice(&zip64_eocd_offset.to_le_bytes());
            end.extend_from_slice(&1u32.to_le_bytes()); // Total disks
        }

        let count16 = u16::try_from(count)
            .ok()
            .filter(|&c| c != ZIP64_MARKER_16)
            .unwrap_or(ZIP64_MARKER_16);
        let comment = self.comment.as_bytes();
        let comment = &comment[..comment.len().min(usize::from(u16::MAX))];
        end.extend_from_slice(&END_OF_CENTRAL_DIR_SIG.to_le_bytes());
        end.extend_from_slice(&0u16.to_le_bytes()); // Disk number
        end.extend_from_slice(&0u16.to_le_bytes()); // Disk with CD
        end.extend_from_slice(&count16.to_le_bytes());
        end.extend_from_slice(&count16.to_le_bytes());
        end.extend_from_slice(&clamp32(cd_size).to_le_bytes());
        end.extend_from_slice(&clamp32(cd_offset).to_le_bytes());
        end.extend_from_slice(&(comment.len() as u16).to_le_bytes());
        end.extend_from_slice(comment);
        out.write_data(&end)
    }
}

/// Entry name as stored in the archive: relative, without `.` or `..`
/// components.
fn archive_name(name: &str) -> String {
    path::normalize(name)
        .split('/')
        .filter(|part| !part.is_empty() && *part != "..")
        .collect::<Vec<_>>()
        .join("/")
}

impl ArchiveEncoder for ZipEncoder {
    fn mime(&self) -> &'static str {
        "application/zip"
    }

    fn set_level(&mut self, level: u32) {
        self.level = level;
    }

    fn append(&mut self, out: &mut dyn Writer, name: &str, stat: &Stat, data: &[u8]) -> Result<()> {
        let filename = archive_name(name);
        let crc32 = crc32fast::hash(data);
        let (method, payload) = self.compress(data)?;
        let (mtime, mdate) = unix_to_dos(stat.mtime_or_now());

        let entry = CentralDirEntry {
            version_needed: if method == CompressionMethod::Deflate { 20 } else { 10 },
            method: method.to_u16(),
            mtime,
            mdate,
            crc32,
            compressed_size: payload.len() as u64,
            uncompressed_size: data.len() as u64,
            filename,
            external_attr: (0o100000 | stat.mode.unwrap_or(0o644)) << 16,
            local_header_offset: self.offset,
        };

        let sizes_overflow = entry.compressed_size >= u64::from(ZIP64_MARKER_32)
            || entry.uncompressed_size >= u64::from(ZIP64_MARKER_32);
        let mut extra = Vec::new();
        if sizes_overflow {
            extra.extend_from_slice(&header::ZIP64_EXTRA_FIELD_ID.to_le_bytes());
            extra.extend_from_slice(&16u16.to_le_bytes());
            extra.extend_from_slice(&entry.uncompressed_size.to_le_bytes());
            extra.extend_from_slice(&entry.compressed_size.to_le_bytes());
        }
        let (compressed32, uncompressed32) = if sizes_overflow {
            (ZIP64_MARKER_32, ZIP64_MARKER_32)
        } else {
            (
                entry.compressed_size as u32,
                entry.uncompressed_size as u32,
            )
        };

        let name_bytes = entry.filename.as_bytes();
        let mut local = Vec::with_capacity(30 + name_bytes.len() + extra.len());
        local.extend_from_slice(&LOCAL_FILE_HEADER_SIG.to_le_bytes());
        local.extend_from_slice(&(if sizes_overflow { 45u16 } else { entry.version_needed }).to_le_bytes());
        local.extend_from_slice(&0u16.to_le_bytes()); // Flags
        local.extend_from_slice(&entry.method.to_le_bytes());
        local.extend_from_slice(&mtime.to_le_bytes());
        local.extend_from_slice(&mdate.to_le_bytes());
        local.extend_from_slice(&crc32.to_le_bytes());
        local.extend_from_slice(&compressed32.to_le_bytes());
        local.extend_from_slice(&uncompressed32.to_le_bytes());
        local.extend_from_slice(&(name_bytes.len() as u16).to_le_bytes());
        local.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        local.extend_from_slice(name_bytes);
        local.extend_from_slice(&extra);

        out.write_data(&local)?;
        out.write_data(&payload)?;
        debug!(
            "zip entry {:?}: {} -> {} bytes ({:?})",
            entry.filename,
            data.len(),
            payload.len(),
            method
        );
        self.offset += (local.len() + payload.len()) as u64;
        self.central.push(entry);
        Ok(())
    }

    fn finish(&mut self, out: &mut dyn Writer, _entries: usize) -> Result<()> {
        let cd_offset = self.offset;
        let mut cd_size = 0u64;
        for entry in &self.central {
            let record = entry.to_bytes();
            cd_size += record.len() as u64;
            out.write_data(&record)?;
        }
        self.write_end_records(out, cd_offset, cd_size)
    }
}

/// Writer producing a ZIP archive.
pub type ZipWriter<W> = ArchiveWriter<ZipEncoder, W>;

impl<W: Writer> ArchiveWriter<ZipEncoder, W> {
    /// Set the archive comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.encoder_mut().set_comment(comment);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryReader, MemoryWriter};

    fn build(level: u32, files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new("", MemoryWriter::new())
            .unwrap()
            .with_level(level)
            .with_comment("made in tests");
        for (name, data) in files {
            writer
                .new_file(name, &Stat::new().with_mtime(946_684_800), "")
                .unwrap();
            writer.write_data(data).unwrap();
        }
        writer.close().unwrap();
        writer.into_inner().into_inner()
    }

    fn reader(data: Vec<u8>) -> ZipReader {
        ZipReader::new(Box::new(MemoryReader::new(data, "test.zip")), false)
    }

    #[test]
    fn test_zip_round_trip() {
        let text = b"Hello, World! ".repeat(50);
        let data = build(9, &[("hello.txt", &text[..]), ("dir/raw.bin", &b"\x00\x01"[..])]);

        let mut reader = reader(data);
        assert!(reader.next().unwrap());
        assert_eq!(reader.filename(), "hello.txt");
        assert_eq!(reader.header().unwrap().method, CompressionMethod::Deflate);
        assert_eq!(reader.stat().size, Some(text.len() as u64));
        assert_eq!(reader.stat().mtime, Some(946_684_800));
        assert_eq!(reader.read_data(Some(6)).unwrap().unwrap(), b"Hello,");
        assert_eq!(reader.read_data(None).unwrap().unwrap().len(), text.len() - 6);

        assert!(reader.next().unwrap());
        assert_eq!(reader.filename(), "dir/raw.bin");
        assert_eq!(reader.header().unwrap().method, CompressionMethod::Stored);
        assert_eq!(reader.read_data(None).unwrap().unwrap(), b"\x00\x01");
        assert!(!reader.next().unwrap());
        assert!(!reader.next().unwrap());
    }

    #[test]
    fn test_skipped_entries_are_never_inflated() {
        let data = build(6, &[("a.txt", &b"aaaaaaaaaaaaaaaaaaaaaaaa"[..]), ("b.txt", &b"b"[..])]);
        let mut reader = reader(data);
        assert!(reader.next().unwrap());
        assert_eq!(reader.skip(1000).unwrap(), 24);
        assert_eq!(reader.read_data(None).unwrap(), None);
        assert!(reader.next().unwrap());
        assert_eq!(reader.read_data(None).unwrap().unwrap(), b"b");
    }

    #[test]
    fn test_crc_checked_on_first_read() {
        let mut data = build(0, &[("a.txt", &b"stored payload"[..]), ("b.txt", &b"next"[..])]);
        let payload = 30 + "a.txt".len();
        data[payload] ^= 0x20;

        let mut reader = reader(data);
        assert!(reader.next().unwrap());
        assert!(matches!(
            reader.read_data(None),
            Err(ArcError::CrcMismatch { .. })
        ));
        assert!(reader.next().unwrap());
        assert_eq!(reader.filename(), "b.txt");
    }

    #[test]
    fn test_directories_and_odd_names() {
        let data = build(9, &[("../up/./x.txt", &b"x"[..])]);
        let mut reader = reader(data);
        assert!(reader.next().unwrap());
        assert_eq!(reader.filename(), "up/x.txt");

        // A directory entry followed by a file.
        let mut raw = Vec::new();
        for (name, body) in [("d/", &b""[..]), ("d/f", &b"f"[..])] {
            raw.extend_from_slice(&LOCAL_FILE_HEADER_SIG.to_le_bytes());
            raw.extend_from_slice(&[10, 0, 0, 0, 0, 0, 0, 0, 0x21, 0]);
            raw.extend_from_slice(&crc32fast::hash(body).to_le_bytes());
            raw.extend_from_slice(&(body.len() as u32).to_le_bytes());
            raw.extend_from_slice(&(body.len() as u32).to_le_bytes());
            raw.extend_from_slice(&(name.len() as u16).to_le_bytes());
            raw.extend_from_slice(&0u16.to_le_bytes());
            raw.extend_from_slice(name.as_bytes());
            raw.extend_from_slice(body);
        }
        let mut reader = self::reader(raw);
        assert!(reader.next().unwrap());
        assert_eq!(reader.filename(), "d/f");
        assert!(!reader.next().unwrap());
    }

    #[test]
    fn test_encrypted_entry_rejected() {
        let mut data = build(0, &[("secret", &b"s"[..])]);
        data[6] |= flags::ENCRYPTED as u8;
        let mut reader = reader(data);
        assert!(matches!(reader.next(), Err(ArcError::Unsupported { .. })));
    }

    #[test]
    fn test_bad_signature() {
        let mut reader = reader(b"Rar!\x1a\x07\x00".to_vec());
        assert!(matches!(reader.next(), Err(ArcError::InvalidMagic { .. })));

        let mut reader = self::reader(b"PK".to_vec());
        assert!(matches!(reader.next(), Err(ArcError::UnexpectedEof { .. })));
    }

    #[test]
    fn test_end_of_central_directory() {
        let data = build(9, &[]);
        assert_eq!(data.len(), 22 + "made in tests".len());
        assert_eq!(&data[..4], &END_OF_CENTRAL_DIR_SIG.to_le_bytes());
        assert!(data.ends_with(b"made in tests"));
        assert!(!reader(data).next().unwrap());

        let data = build(9, &[("a", &b"1"[..]), ("b", &b"2"[..])]);
        let eocd = data.len() - 22 - "made in tests".len();
        assert_eq!(u16::from_le_bytes([data[eocd + 10], data[eocd + 11]]), 2);
        let cd_offset = u32::from_le_bytes([
            data[eocd + 16],
            data[eocd + 17],
            data[eocd + 18],
            data[eocd + 19],
        ]) as usize;
        assert_eq!(&data[cd_offset..cd_offset + 4], &CENTRAL_DIR_HEADER_SIG.to_le_bytes());
    }

    #[test]
    fn test_zip_archive_announced() {
        let mut writer = ZipWriter::new("out.zip", MemoryWriter::new()).unwrap();
        assert_eq!(writer.encoder().comment(), "");
        writer.close().unwrap();
        assert_eq!(writer.get_ref().data().len(), 22);
    }
}
