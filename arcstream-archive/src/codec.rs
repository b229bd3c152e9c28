//! Static table of the archive formats known by extension.

use crate::ar::ArReader;
use crate::bzip2::Bzip2Reader;
use crate::gzip::GzipReader;
use crate::tar::TarReader;
use crate::zip::ZipReader;
use arcstream_core::{Reader, path};

/// An archive or compression format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    /// POSIX tar.
    Tar,
    /// PKZIP.
    Zip,
    /// gzip (RFC 1952).
    Gzip,
    /// bzip2.
    Bzip2,
    /// Unix ar.
    Ar,
}

impl ArchiveKind {
    /// Formats an extension stands for, innermost layer first.
    ///
    /// `tgz` is a tar archive inside a gzip stream, so it gives
    /// `[Gzip, Tar]`. Matching is case-insensitive.
    pub fn for_extension(extension: &str) -> Option<&'static [ArchiveKind]> {
        use ArchiveKind::*;
        let kinds: &'static [ArchiveKind] = match extension.to_ascii_lowercase().as_str() {
            "tar" => &[Tar],
            "zip" => &[Zip],
            "gz" | "gzip" => &[Gzip],
            "bz2" | "bzip2" => &[Bzip2],
            "tgz" => &[Gzip, Tar],
            "tbz" => &[Bzip2, Tar],
            "ar" | "deb" => &[Ar],
            _ => return None,
        };
        Some(kinds)
    }

    /// Decoder reading this format from `source`.
    pub fn open(self, source: Box<dyn Reader>, source_opened: bool) -> Box<dyn Reader> {
        match self {
            Self::Tar => Box::new(TarReader::new(source, source_opened)),
            Self::Zip => Box::new(ZipReader::new(source, source_opened)),
            Self::Gzip => Box::new(GzipReader::new(source, source_opened)),
            Self::Bzip2 => Box::new(Bzip2Reader::new(source, source_opened)),
            Self::Ar => Box::new(ArReader::new(source, source_opened)),
        }
    }

    /// MIME type of the format.
    pub fn mime(self) -> &'static str {
        match self {
            Self::Tar => "application/x-tar",
            Self::Zip => "application/zip",
            Self::Gzip => "application/x-gzip",
            Self::Bzip2 => "application/x-bzip2",
            Self::Ar => "application/x-archive",
        }
    }
}

/// Whether `extension` names an archive or compression format.
pub fn is_known_extension(extension: &str) -> bool {
    ArchiveKind::for_extension(extension).is_some()
}

/// Layers to decode for an entry named `name`, innermost first.
///
/// Extensions are consumed from the right for as long as they are known:
/// `logs.tar.gz` gives `[Gzip, Tar]`, `notes.txt.gz` gives `[Gzip]` and
/// `notes.txt` nothing.
pub fn codec_chain(name: &str) -> Vec<ArchiveKind> {
    let mut rest = path::basename(name);
    let mut chain = Vec::new();
    while let Some(pos) = rest.rfind('.') {
        match ArchiveKind::for_extension(&rest[pos + 1..]) {
            Some(kinds) => chain.extend_from_slice(kinds),
            None => break,
        }
        rest = &rest[..pos];
    }
    chain
}

/// Wrap `source`, which sits on the entry named `name`, in the decoders its
/// extensions call for. Returns the decoder and the number of layers added,
/// or gives `source` back untouched when the name has no known extension.
pub fn open_chain(
    name: &str,
    source: Box<dyn Reader>,
) -> (Box<dyn Reader>, usize) {
    let chain = codec_chain(name);
    let mut reader = source;
    for (i, kind) in chain.iter().enumerate() {
        reader = kind.open(reader, i == 0);
    }
    (reader, chain.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ArchiveKind::*;

    #[test]
    fn test_extension_table() {
        assert!(is_known_extension("TAR"));
        assert!(is_known_extension("deb"));
        assert!(!is_known_extension("txt"));
        assert_eq!(ArchiveKind::for_extension("tbz"), Some(&[Bzip2, Tar][..]));
    }

    #[test]
    fn test_codec_chain() {
        assert_eq!(codec_chain("a/logs.tar.gz"), vec![Gzip, Tar]);
        assert_eq!(codec_chain("x.tgz"), vec![Gzip, Tar]);
        assert_eq!(codec_chain("notes.txt.gz"), vec![Gzip]);
        assert_eq!(codec_chain("notes.txt"), vec![]);
        assert_eq!(codec_chain("tar"), vec![]);
        assert_eq!(codec_chain("dir.zip/file"), vec![]);
        assert_eq!(codec_chain("pkg.deb"), vec![Ar]);
    }
}
