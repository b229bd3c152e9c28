//! Readers for single-member compressed streams (gzip, bzip2).
//!
//! The member is decoded as a whole when the entry is opened, so its size is
//! known up front and integrity checks fail on [`Reader::next`] rather than
//! halfway through the data.

use crate::upstream::Upstream;
use arcstream_core::error::Result;
use arcstream_core::{Reader, Stat, path};

/// A decoded member.
#[derive(Debug, Clone, Default)]
pub struct Member {
    /// Uncompressed content.
    pub data: Vec<u8>,
    /// Modification time recorded in the stream, if any.
    pub mtime: Option<u64>,
}

/// Decodes one compressed member from the current entry of a reader.
pub trait MemberDecoder {
    /// Decode the whole current entry of `source`.
    fn decode(&mut self, source: &mut dyn Reader) -> Result<Member>;
}

/// Exposes the content of a compressed stream as one entry.
///
/// The entry is named after the upstream entry's base name with its last
/// extension removed (`logs/app.log.gz` gives `app.log`).
pub struct SingleEntryReader<D> {
    upstream: Upstream,
    decoder: D,
    name: String,
    member: Option<Member>,
    offset: usize,
    consumed: bool,
}

impl<D: MemberDecoder> SingleEntryReader<D> {
    /// Decode the stream held by `source` with `decoder`.
    ///
    /// `source_opened` tells whether `source` already sits on the entry
    /// holding the stream.
    pub fn with_decoder(source: Box<dyn Reader>, source_opened: bool, decoder: D) -> Self {
        Self {
            upstream: Upstream::new(source, source_opened),
            decoder,
            name: String::new(),
            member: None,
            offset: 0,
            consumed: false,
        }
    }

    /// The decoder, holding whatever it parsed from the stream header.
    pub fn decoder(&self) -> &D {
        &self.decoder
    }
}

impl<D: MemberDecoder + Default> SingleEntryReader<D> {
    /// Decode the stream held by `source`.
    pub fn new(source: Box<dyn Reader>, source_opened: bool) -> Self {
        Self::with_decoder(source, source_opened, D::default())
    }
}

impl<D: MemberDecoder> Reader for SingleEntryReader<D> {
    fn next(&mut self) -> Result<bool> {
        if self.consumed {
            self.member = None;
            return Ok(false);
        }
        self.consumed = true;
        if !self.upstream.open()? {
            return Ok(false);
        }

        let outer = self.upstream.filename();
        self.name = path::strip_extension(&outer).to_string();
        let member = self.decoder.decode(&mut *self.upstream.source)?;
        self.member = Some(member);
        self.offset = 0;
        Ok(true)
    }

    fn filename(&self) -> String {
        match self.member {
            Some(_) => self.name.clone(),
            None => String::new(),
        }
    }

    fn stat(&self) -> Stat {
        match &self.member {
            Some(member) => Stat {
                size: Some(member.data.len() as u64),
                mtime: member.mtime,
                ..Stat::default()
            },
            None => Stat::default(),
        }
    }

    fn read_data(&mut self, length: Option<usize>) -> Result<Option<Vec<u8>>> {
        let Some(member) = &self.member else {
            return Ok(None);
        };
        let left = member.data.len() - self.offset;
        if left == 0 {
            return Ok(None);
        }
        let n = length.map_or(left, |n| n.min(left));
        let chunk = member.data[self.offset..self.offset + n].to_vec();
        self.offset += n;
        Ok(Some(chunk))
    }

    fn skip(&mut self, length: u64) -> Result<u64> {
        let Some(member) = &self.member else {
            return Ok(0);
        };
        let left = (member.data.len() - self.offset) as u64;
        let n = length.min(left);
        self.offset += n as usize;
        Ok(n)
    }

    fn close(&mut self) -> Result<()> {
        self.member = None;
        self.offset = 0;
        self.consumed = false;
        self.upstream.close()
    }

    fn into_source(self: Box<Self>) -> Option<Box<dyn Reader>> {
        Some(self.upstream.into_inner())
    }
}
