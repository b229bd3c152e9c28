//! ZIP header structures.

use arcstream_core::error::{ArcError, Result};
use std::io::Read;

/// Local file header signature.
pub const LOCAL_FILE_HEADER_SIG: u32 = 0x04034B50;

/// Central directory file header signature.
pub const CENTRAL_DIR_HEADER_SIG: u32 = 0x02014B50;

/// End of central directory signature.
pub const END_OF_CENTRAL_DIR_SIG: u32 = 0x06054B50;

/// Zip64 end of central directory signature.
pub const ZIP64_END_OF_CENTRAL_DIR_SIG: u32 = 0x06064B50;

/// Zip64 end of central directory locator signature.
pub const ZIP64_END_OF_CENTRAL_DIR_LOCATOR_SIG: u32 = 0x07064B50;

/// Zip64 extended information extra field ID.
pub const ZIP64_EXTRA_FIELD_ID: u16 = 0x0001;

/// Marker for a 32-bit field whose value lives in the Zip64 extra field.
pub const ZIP64_MARKER_32: u32 = 0xFFFF_FFFF;

/// Marker for a 16-bit field whose value lives in the Zip64 record.
pub const ZIP64_MARKER_16: u16 = 0xFFFF;

/// General purpose flag bits.
pub mod flags {
    /// Traditional encryption.
    pub const ENCRYPTED: u16 = 0x0001;
    /// Sizes and CRC follow the data in a data descriptor.
    pub const DATA_DESCRIPTOR: u16 = 0x0008;
    /// Compressed patched data.
    pub const PATCHED: u16 = 0x0020;
    /// Strong encryption.
    pub const STRONG_ENCRYPTION: u16 = 0x0040;
}

/// ZIP compression methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    /// Stored (no compression).
    Stored,
    /// Deflate compression.
    Deflate,
    /// Unknown method.
    Unknown(u16),
}

impl CompressionMethod {
    /// Create from a u16 value.
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => Self::Stored,
            8 => Self::Deflate,
            _ => Self::Unknown(value),
        }
    }

    /// Numeric value written to headers.
    pub fn to_u16(self) -> u16 {
        match self {
            Self::Stored => 0,
            Self::Deflate => 8,
            Self::Unknown(id) => id,
        }
    }
}

/// ZIP local file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileHeader {
    /// Minimum version needed to extract.
    pub version_needed: u16,
    /// General purpose bit flag.
    pub flags: u16,
    /// Compression method.
    pub method: CompressionMethod,
    /// Last modification time (DOS format).
    pub mtime: u16,
    /// Last modification date (DOS format).
    pub mdate: u16,
    /// CRC-32 of uncompressed data.
    pub crc32: u32,
    /// Compressed size, Zip64 value applied.
    pub compressed_size: u64,
    /// Uncompressed size, Zip64 value applied.
    pub uncompressed_size: u64,
    /// File name.
    pub filename: String,
    /// Extra field.
    pub extra: Vec<u8>,
}

impl LocalFileHeader {
    /// Read a local file header whose 4-byte signature was already consumed.
    pub fn read_after_signature<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; 26];
        read_exact(reader, &mut buf)?;

        let version_needed = u16::from_le_bytes([buf[0], buf[1]]);
        let flag_bits = u16::from_le_bytes([buf[2], buf[3]]);
        let method = CompressionMethod::from_u16(u16::from_le_bytes([buf[4], buf[5]]));
        let mtime = u16::from_le_bytes([buf[6], buf[7]]);
        let mdate = u16::from_le_bytes([buf[8], buf[9]]);
        let crc32 = u32::from_le_bytes([buf[10], buf[11], buf[12], buf[13]]);
        let compressed_size = u32::from_le_bytes([buf[14], buf[15], buf[16], buf[17]]);
        let uncompressed_size = u32::from_le_bytes([buf[18], buf[19], buf[20], buf[21]]);
        let filename_len = u16::from_le_bytes([buf[22], buf[23]]) as usize;
        let extra_len = u16::from_le_bytes([buf[24], buf[25]]) as usize;

        let mut filename_bytes = vec![0u8; filename_len];
        read_exact(reader, &mut filename_bytes)?;
        let filename = String::from_utf8_lossy(&filename_bytes).into_owned();

        let mut extra = vec![0u8; extra_len];
        read_exact(reader, &mut extra)?;

        let (uncompressed_64, compressed_64) =
            if uncompressed_size == ZIP64_MARKER_32 || compressed_size == ZIP64_MARKER_32 {
                Self::parse_zip64_extra(&extra, uncompressed_size, compressed_size)
            } else {
                (None, None)
            };

        log::trace!(
            "zip local header {:?} method {:?} flags {:#06x}",
            filename,
            method,
            flag_bits
        );
        Ok(Self {
            version_needed,
            flags: flag_bits,
            method,
            mtime,
            mdate,
            crc32,
            compressed_size: compressed_64.unwrap_or(u64::from(compressed_size)),
            uncompressed_size: uncompressed_64.unwrap_or(u64::from(uncompressed_size)),
            filename,
            extra,
        })
    }

    /// Parse Zip64 extended information extra field.
    ///
    /// Values are present only for the fields holding the 32-bit marker, in
    /// the order uncompressed size, compressed size.
    fn parse_zip64_extra(
        extra: &[u8],
        uncompressed_size: u32,
        compressed_size: u32,
    ) -> (Option<u64>, Option<u64>) {
        let mut offset = 0;
        while offset + 4 <= extra.len() {
            let header_id = u16::from_le_bytes([extra[offset], extra[offset + 1]]);
            let data_size = u16::from_le_bytes([extra[offset + 2], extra[offset + 3]]) as usize;
            offset += 4;
            let end = offset + data_size;

            if header_id == ZIP64_EXTRA_FIELD_ID && end <= extra.len() {
                let mut field = offset;
                let mut take = |marked: bool| {
                    if marked && field + 8 <= end {
                        let mut bytes = [0u8; 8];
                        bytes.copy_from_slice(&extra[field..field + 8]);
                        field += 8;
                        Some(u64::from_le_bytes(bytes))
                    } else {
                        None
                    }
                };
                let uncompressed = take(uncompressed_size == ZIP64_MARKER_32);
                let compressed = take(compressed_size == ZIP64_MARKER_32);
                return (uncompressed, compressed);
            }

            offset = end;
        }

        (None, None)
    }

    /// Reject features the streaming reader cannot handle.
    pub fn check_supported(&self) -> Result<()> {
        if self.flags & flags::ENCRYPTED != 0 {
            return Err(ArcError::unsupported("encrypted zip entries"));
        }
        if self.flags & flags::DATA_DESCRIPTOR != 0 {
            return Err(ArcError::unsupported("zip entries with a data descriptor"));
        }
        if self.flags & flags::PATCHED != 0 {
            return Err(ArcError::unsupported("compressed patched data"));
        }
        if self.flags & flags::STRONG_ENCRYPTION != 0 {
            return Err(ArcError::unsupported("strongly encrypted zip entries"));
        }
        if let CompressionMethod::Unknown(id) = self.method {
            return Err(ArcError::unsupported_method(format!("ZIP method {}", id)));
        }
        Ok(())
    }

    /// Whether the entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.filename.ends_with('/')
    }

    /// Modification time in seconds since the Unix epoch.
    pub fn modified(&self) -> u64 {
        dos_to_unix(self.mtime, self.mdate)
    }
}

/// Central directory entry for ZIP writing.
#[derive(Debug, Clone)]
pub(crate) struct CentralDirEntry {
    pub(crate) version_needed: u16,
    pub(crate) method: u16,
    pub(crate) mtime: u16,
    pub(crate) mdate: u16,
    pub(crate) crc32: u32,
    pub(crate) compressed_size: u64,
    pub(crate) uncompressed_size: u64,
    pub(crate) filename: String,
    pub(crate) external_attr: u32,
    pub(crate) local_header_offset: u64,
}

impl CentralDirEntry {
    /// Check if this entry requires Zip64.
    pub(crate) fn needs_zip64(&self) -> bool {
        self.compressed_size >= u64::from(ZIP64_MARKER_32)
            || self.uncompressed_size >= u64::from(ZIP64_MARKER_32)
            || self.local_header_offset >= u64::from(ZIP64_MARKER_32)
    }

    /// Build the Zip64 extra field, empty when not needed.
    fn zip64_extra(&self) -> Vec<u8> {
        let values: Vec<u64> = [
            self.uncompressed_size,
            self.compressed_size,
            self.local_header_offset,
        ]
        .into_iter()
        .filter(|&v| v >= u64::from(ZIP64_MARKER_32))
        .collect();
        if values.is_empty() {
            return Vec::new();
        }

        let mut extra = Vec::with_capacity(4 + values.len() * 8);
        extra.extend_from_slice(&ZIP64_EXTRA_FIELD_ID.to_le_bytes());
        extra.extend_from_slice(&((values.len() * 8) as u16).to_le_bytes());
        for value in values {
            extra.extend_from_slice(&value.to_le_bytes());
        }
        extra
    }

    /// Serialize the central directory record.
    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let filename = self.filename.as_bytes();
        let extra = self.zip64_extra();
        let version_needed = if self.needs_zip64() {
            45
        } else {
            self.version_needed
        };

        let mut out = Vec::with_capacity(46 + filename.len() + extra.len());
        out.extend_from_slice(&CENTRAL_DIR_HEADER_SIG.to_le_bytes());
        out.extend_from_slice(&0x031Eu16.to_le_bytes()); // Unix, version 3.0
        out.extend_from_slice(&version_needed.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // Flags
        out.extend_from_slice(&self.method.to_le_bytes());
        out.extend_from_slice(&self.mtime.to_le_bytes());
        out.extend_from_slice(&self.mdate.to_le_bytes());
        out.extend_from_slice(&self.crc32.to_le_bytes());
        out.extend_from_slice(&clamp32(self.compressed_size).to_le_bytes());
        out.extend_from_slice(&clamp32(self.uncompressed_size).to_le_bytes());
        out.extend_from_slice(&(filename.len() as u16).to_le_bytes());
        out.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // Comment length
        out.extend_from_slice(&0u16.to_le_bytes()); // Disk number start
        out.extend_from_slice(&0u16.to_le_bytes()); // Internal attributes
        out.extend_from_slice(&self.external_attr.to_le_bytes());
        out.extend_from_slice(&clamp32(self.local_header_offset).to_le_bytes());
        out.extend_from_slice(filename);
        out.extend_from_slice(&extra);
        out
    }
}

/// A 64-bit value as a 32-bit field, or the Zip64 marker when it does not fit.
pub(crate) fn clamp32(value: u64) -> u32 {
    u32::try_from(value)
        .ok()
        .filter(|&v| v != ZIP64_MARKER_32)
        .unwrap_or(ZIP64_MARKER_32)
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => ArcError::unexpected_eof(buf.len()),
        _ => ArcError::Io(e),
    })
}

/// Days since 1970-01-01 of a proleptic Gregorian date.
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Date of a day count since 1970-01-01.
fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

/// Convert a DOS time/date pair (UTC) to seconds since the Unix epoch.
pub fn dos_to_unix(time: u16, date: u16) -> u64 {
    let seconds = i64::from(time & 0x1F) * 2;
    let minutes = i64::from((time >> 5) & 0x3F);
    let hours = i64::from((time >> 11) & 0x1F);
    let day = i64::from(date & 0x1F).max(1);
    let month = i64::from((date >> 5) & 0x0F).clamp(1, 12);
    let year = i64::from((date >> 9) & 0x7F) + 1980;

    let days = days_from_civil(year, month, day);
    (days * 86_400 + hours * 3600 + minutes * 60 + seconds) as u64
}

/// Convert seconds since the Unix epoch to a DOS `(time, date)` pair (UTC).
///
/// Times before 1980 map to 1980-01-01 00:00:00.
pub fn unix_to_dos(secs: u64) -> (u16, u16) {
    let secs = i64::try_from(secs).unwrap_or(i64::MAX);
    let (year, month, day) = civil_from_days(secs.div_euclid(86_400));
    if year < 1980 {
        return (0, (1 << 5) | 1);
    }
    let year = year.min(1980 + 127);
    let tod = secs.rem_euclid(86_400);
    let time = ((tod / 3600) << 11) | (((tod % 3600) / 60) << 5) | ((tod % 60) / 2);
    let date = ((year - 1980) << 9) | (month << 5) | day;
    (time as u16, date as u16)
}
