//! Bzip2 file support.
//!
//! Bzip2 is a compression-only format (single file, no archive structure).
//! The reader checks the stream signature itself and leaves the block
//! decoding to the `bzip2` crate.

use crate::archive_writer::{ArchiveEncoder, ArchiveWriter};
use crate::single::{Member, MemberDecoder, SingleEntryReader};
use arcstream_core::error::{ArcError, Result};
use arcstream_core::{Reader, Stat, Writer};
use ::bzip2::read::BzDecoder;
use ::bzip2::write::BzEncoder;
use std::io::{Read, Write};

/// Bzip2 magic bytes ("BZh").
pub const BZIP2_MAGIC: [u8; 3] = [0x42, 0x5A, 0x68];

/// Validate the stream signature and return the block size level (1-9).
pub fn check_signature(data: &[u8]) -> Result<u8> {
    if data.len() < 4 {
        return Err(ArcError::corrupted(0, "file too short for Bzip2"));
    }
    if data[0..2] != BZIP2_MAGIC[0..2] {
        return Err(ArcError::invalid_magic([0x42, 0x5A], &data[0..2]));
    }
    if data[2] != BZIP2_MAGIC[2] {
        return Err(ArcError::corrupted(
            2,
            format!(
                "invalid bzip2 version byte: expected 0x68 ('h'), found 0x{:02x}",
                data[2]
            ),
        ));
    }
    let level = data[3];
    if !(b'1'..=b'9').contains(&level) {
        return Err(ArcError::corrupted(
            3,
            format!(
                "invalid bzip2 block size: expected '1'-'9', found 0x{:02x}",
                level
            ),
        ));
    }
    Ok(level - b'0')
}

/// Decompress a whole bzip2 stream.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    check_signature(data)?;
    let mut out = Vec::with_capacity(data.len() * 4);
    BzDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| ArcError::corrupted(0, format!("bzip2 stream: {}", e)))?;
    Ok(out)
}

/// Compress `data` at `level` (1-9).
pub fn compress(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder = BzEncoder::new(Vec::new(), ::bzip2::Compression::new(level.clamp(1, 9)));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decodes a bzip2 stream.
#[derive(Debug, Default)]
pub struct Bzip2Decoder {
    block_size_level: Option<u8>,
}

impl Bzip2Decoder {
    /// Block size level (1-9) of the last decoded stream.
    pub fn block_size_level(&self) -> Option<u8> {
        self.block_size_level
    }
}

impl MemberDecoder for Bzip2Decoder {
    fn decode(&mut self, source: &mut dyn Reader) -> Result<Member> {
        let raw = source.read_data(None)?.unwrap_or_default();
        self.block_size_level = Some(check_signature(&raw)?);
        Ok(Member {
            data: decompress(&raw)?,
            mtime: None,
        })
    }
}

/// Reader exposing the content of a bzip2 stream.
pub type Bzip2Reader = SingleEntryReader<Bzip2Decoder>;

/// Encoder producing a single bzip2 stream.
#[derive(Debug)]
pub struct Bzip2Encoder {
    level: u32,
}

impl Default for Bzip2Encoder {
    fn default() -> Self {
        Self { level: 9 }
    }
}

impl ArchiveEncoder for Bzip2Encoder {
    fn mime(&self) -> &'static str {
        "application/x-bzip2"
    }

    fn max_entries(&self) -> Option<usize> {
        Some(1)
    }

    fn set_level(&mut self, level: u32) {
        self.level = level;
    }

    fn append(&mut self, out: &mut dyn Writer, _name: &str, _stat: &Stat, data: &[u8]) -> Result<()> {
        out.write_data(&compress(data, self.level)?)
    }

    fn finish(&mut self, out: &mut dyn Writer, entries: usize) -> Result<()> {
        if entries == 0 {
            out.write_data(&compress(&[], self.level)?)?;
        }
        Ok(())
    }
}

/// Writer producing a bzip2 stream holding one file.
pub type Bzip2Writer<W> = ArchiveWriter<Bzip2Encoder, W>;
