//! GZIP header parsing and writing.

use arcstream_core::error::{ArcError, Result};
use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use std::io::{Read, Write};

/// GZIP magic bytes.
pub const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// GZIP compression method: DEFLATE.
pub const CM_DEFLATE: u8 = 8;

/// Size of the CRC32 + ISIZE trailer.
pub const TRAILER_SIZE: usize = 8;

/// GZIP header flags.
pub mod flags {
    /// Text file.
    pub const FTEXT: u8 = 0x01;
    /// Header CRC present.
    pub const FHCRC: u8 = 0x02;
    /// Extra field present.
    pub const FEXTRA: u8 = 0x04;
    /// Original filename present.
    pub const FNAME: u8 = 0x08;
    /// Comment present.
    pub const FCOMMENT: u8 = 0x10;
}

/// GZIP member header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GzipHeader {
    /// Compression method (should be 8 for DEFLATE).
    pub method: u8,
    /// Flags.
    pub flags: u8,
    /// Modification time (Unix timestamp, 0 when unknown).
    pub mtime: u32,
    /// Extra flags.
    pub xfl: u8,
    /// Operating system.
    pub os: u8,
    /// Original filename (if FNAME flag set).
    pub filename: Option<String>,
    /// Comment (if FCOMMENT flag set).
    pub comment: Option<String>,
}

impl Default for GzipHeader {
    fn default() -> Self {
        Self {
            method: CM_DEFLATE,
            flags: 0,
            mtime: 0,
            xfl: 0,
            os: 255, // Unknown OS
            filename: None,
            comment: None,
        }
    }
}

impl GzipHeader {
    /// Create a new GZIP header with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the original file name.
    pub fn with_filename(mut self, filename: &str) -> Self {
        if filename.is_empty() {
            self.flags &= !flags::FNAME;
            self.filename = None;
        } else {
            self.flags |= flags::FNAME;
            self.filename = Some(filename.to_string());
        }
        self
    }

    /// Record the modification time.
    pub fn with_mtime(mut self, mtime: u64) -> Self {
        self.mtime = u32::try_from(mtime).unwrap_or(0);
        self
    }

    /// Set XFL from the compression level.
    pub fn with_level(mut self, level: u32) -> Self {
        self.xfl = match level {
            0..=1 => 4, // Fastest
            9 => 2,     // Maximum compression
            _ => 0,
        };
        self
    }

    /// Write the header to a writer.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&GZIP_MAGIC)?;
        writer.write_all(&[self.method, self.flags])?;
        writer.write_all(&self.mtime.to_le_bytes())?;
        writer.write_all(&[self.xfl, self.os])?;

        if self.flags & flags::FNAME != 0 {
            if let Some(ref filename) = self.filename {
                writer.write_all(filename.as_bytes())?;
                writer.write_all(&[0])?;
            }
        }
        if self.flags & flags::FCOMMENT != 0 {
            if let Some(ref comment) = self.comment {
                writer.write_all(comment.as_bytes())?;
                writer.write_all(&[0])?;
            }
        }
        Ok(())
    }

    /// Read a GZIP header from a reader.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; 10];
        Self::read_exact(reader, &mut buf)?;

        if buf[0..2] != GZIP_MAGIC {
            return Err(ArcError::invalid_magic(GZIP_MAGIC.to_vec(), buf[0..2].to_vec()));
        }

        let method = buf[2];
        if method != CM_DEFLATE {
            return Err(ArcError::unsupported_method(format!("GZIP method {}", method)));
        }

        let flag_bits = buf[3];
        let mtime = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);

        if flag_bits & flags::FEXTRA != 0 {
            let mut xlen = [0u8; 2];
            Self::read_exact(reader, &mut xlen)?;
            let mut extra = vec![0u8; u16::from_le_bytes(xlen) as usize];
            Self::read_exact(reader, &mut extra)?;
        }
        let filename = if flag_bits & flags::FNAME != 0 {
            Some(Self::read_null_terminated(reader)?)
        } else {
            None
        };
        let comment = if flag_bits & flags::FCOMMENT != 0 {
            Some(Self::read_null_terminated(reader)?)
        } else {
            None
        };
        if flag_bits & flags::FHCRC != 0 {
            let mut crc = [0u8; 2];
            Self::read_exact(reader, &mut crc)?;
        }

        log::trace!("gzip header flags {:#04x} name {:?}", flag_bits, filename);
        Ok(Self {
            method,
            flags: flag_bits,
            mtime,
            xfl: buf[8],
            os: buf[9],
            filename,
            comment,
        })
    }

    fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
        reader.read_exact(buf).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => ArcError::unexpected_eof(buf.len()),
            _ => ArcError::Io(e),
        })
    }

    /// Read a null-terminated string.
    fn read_null_terminated<R: Read>(reader: &mut R) -> Result<String> {
        let mut bytes = Vec::new();
        let mut buf = [0u8; 1];
        loop {
            Self::read_exact(reader, &mut buf)?;
            if buf[0] == 0 {
                break;
            }
            bytes.push(buf[0]);
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Compress `data` into a complete member with the given header.
pub fn compress(data: &[u8], level: u32, header: &GzipHeader) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(data.len() / 2 + 32);
    header.write(&mut output)?;

    let mut encoder = DeflateEncoder::new(output, Compression::new(level));
    encoder.write_all(data)?;
    let mut output = encoder.finish()?;

    output.extend_from_slice(&crc32fast::hash(data).to_le_bytes());
    output.extend_from_slice(&(data.len() as u32).to_le_bytes());
    Ok(output)
}

/// Inflate a member body (everything after the header) and check its trailer.
pub fn decompress_body(body: &[u8]) -> Result<Vec<u8>> {
    if body.len() < TRAILER_SIZE {
        return Err(ArcError::unexpected_eof(TRAILER_SIZE));
    }
    let (deflated, trailer) = body.split_at(body.len() - TRAILER_SIZE);
    let expected_crc = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let expected_size = u32::from_le_bytes([trailer[4], trailer[5], trailer[6], trailer[7]]);

    let mut decompressed = Vec::new();
    DeflateDecoder::new(deflated)
        .read_to_end(&mut decompressed)
        .map_err(|e| ArcError::corrupted(0, format!("deflate stream: {}", e)))?;

    let actual_crc = crc32fast::hash(&decompressed);
    if actual_crc != expected_crc {
        return Err(ArcError::crc_mismatch(expected_crc, actual_crc));
    }
    // ISIZE holds the size modulo 2^32.
    if decompressed.len() as u32 != expected_size {
        return Err(ArcError::corrupted(
            deflated.len() as u64,
            format!(
                "Size mismatch: expected {}, got {}",
                expected_size,
                decompressed.len()
            ),
        ));
    }
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn split(member: &[u8]) -> (GzipHeader, Vec<u8>) {
        let mut cursor = Cursor::new(member);
        let header = GzipHeader::read(&mut cursor).unwrap();
        let body = member[cursor.position() as usize..].to_vec();
        (header, body)
    }

    #[test]
    fn test_header_with_filename() {
        let header = GzipHeader::new().with_filename("test.txt").with_mtime(77);
        assert_eq!(header.flags & flags::FNAME, flags::FNAME);

        let member = compress(b"", 6, &header).unwrap();
        let (parsed, _) = split(&member);
        assert_eq!(parsed, header);

        let header = header.with_filename("");
        assert_eq!(header.flags & flags::FNAME, 0);
    }

    #[test]
    fn test_compress_round_trip() {
        let original = vec![b'A'; 10000];
        let member = compress(&original, 9, &GzipHeader::new().with_level(9)).unwrap();
        assert!(member.len() < original.len() / 10);

        let (header, body) = split(&member);
        assert_eq!(header.xfl, 2);
        assert_eq!(decompress_body(&body).unwrap(), original);
    }

    #[test]
    fn test_bad_magic_and_method() {
        let mut cursor = Cursor::new(b"PK\x03\x04\0\0\0\0\0\0".to_vec());
        assert!(matches!(
            GzipHeader::read(&mut cursor),
            Err(ArcError::InvalidMagic { .. })
        ));

        let mut cursor = Cursor::new(b"\x1f\x8b\x07\0\0\0\0\0\0\0".to_vec());
        assert!(matches!(
            GzipHeader::read(&mut cursor),
            Err(ArcError::UnsupportedMethod { .. })
        ));

        let mut cursor = Cursor::new(b"\x1f\x8b".to_vec());
        assert!(matches!(
            GzipHeader::read(&mut cursor),
            Err(ArcError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_trailer_checked() {
        let member = compress(b"checked data", 6, &GzipHeader::new()).unwrap();
        let (_, mut body) = split(&member);
        let n = body.len();
        body[n - 8] ^= 0xff;
        assert!(matches!(
            decompress_body(&body),
            Err(ArcError::CrcMismatch { .. })
        ));

        let (_, mut body) = split(&member);
        body[n - 4] ^= 0x01;
        assert!(matches!(
            decompress_body(&body),
            Err(ArcError::CorruptedData { .. })
        ));

        assert!(matches!(
            decompress_body(&[0u8; 3]),
            Err(ArcError::UnexpectedEof { .. })
        ));
    }
}
