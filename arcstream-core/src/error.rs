//! Error types for arcstream operations.
//!
//! Every reader and writer in the pipeline reports failures through
//! [`ArcError`]. Errors raised by an inner stage travel outward unchanged;
//! decorators never rewrite them.

use std::io;
use thiserror::Error;

/// The main error type for arcstream operations.
#[derive(Debug, Error)]
pub enum ArcError {
    /// I/O error from the filesystem, a sink, or a compression stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid magic number in an archive header.
    #[error("Invalid magic number: expected {expected:02x?}, found {found:02x?}")]
    InvalidMagic {
        /// Expected magic bytes.
        expected: Vec<u8>,
        /// Actual magic bytes found.
        found: Vec<u8>,
    },

    /// Unsupported compression method.
    #[error("Unsupported compression method: {method}")]
    UnsupportedMethod {
        /// The compression method identifier.
        method: String,
    },

    /// A feature of the container that cannot be handled in a stream.
    #[error("Unsupported feature: {feature}")]
    Unsupported {
        /// Description of the feature.
        feature: String,
    },

    /// Tar header checksum does not match the header bytes.
    #[error("Header checksum mismatch: stored {stored:#o}, computed {computed:#o}")]
    ChecksumMismatch {
        /// Checksum stored in the header.
        stored: u32,
        /// Checksum computed from the header bytes.
        computed: u32,
    },

    /// CRC checksum mismatch.
    #[error("CRC mismatch: expected {expected:#x}, computed {computed:#x}")]
    CrcMismatch {
        /// Expected CRC value from archive.
        expected: u32,
        /// Computed CRC value from data.
        computed: u32,
    },

    /// Corrupted data in archive.
    #[error("Corrupted data at offset {offset}: {message}")]
    CorruptedData {
        /// Byte offset where corruption was detected.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// Invalid header format.
    #[error("Invalid header: {message}")]
    InvalidHeader {
        /// Description of the header error.
        message: String,
    },

    /// Unexpected end of data.
    #[error("Unexpected end of file: expected {expected} more bytes")]
    UnexpectedEof {
        /// Number of bytes that were expected but not available.
        expected: usize,
    },

    /// Path not present in the source.
    #[error("Entry not found: {name}")]
    NotFound {
        /// Name that was looked up.
        name: String,
    },

    /// Invalid regular expression handed to a predicate.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Caller broke the reader/writer protocol.
    #[error("Usage error: {message}")]
    Usage {
        /// Description of the misuse.
        message: String,
    },

    /// A path component that must be a directory exists as something else.
    #[error("Path conflict: {path} exists and is not a directory")]
    PathConflict {
        /// The offending path.
        path: String,
    },
}

/// Result type alias for arcstream operations.
pub type Result<T> = std::result::Result<T, ArcError>;

/// Broad classification of an [`ArcError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or unsupported input data.
    Format,
    /// Failure of the filesystem or another byte sink/source.
    Io,
    /// Protocol misuse by the caller.
    Usage,
    /// Requested path does not exist.
    NotFound,
}

impl ArcError {
    /// Create an invalid magic error.
    pub fn invalid_magic(expected: impl Into<Vec<u8>>, found: impl Into<Vec<u8>>) -> Self {
        Self::InvalidMagic {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create an unsupported method error.
    pub fn unsupported_method(method: impl Into<String>) -> Self {
        Self::UnsupportedMethod {
            method: method.into(),
        }
    }

    /// Create an unsupported feature error.
    pub fn unsupported(feature: impl Into<String>) -> Self {
        Self::Unsupported {
            feature: feature.into(),
        }
    }

    /// Create a tar checksum mismatch error.
    pub fn checksum_mismatch(stored: u32, computed: u32) -> Self {
        Self::ChecksumMismatch { stored, computed }
    }

    /// Create a CRC mismatch error.
    pub fn crc_mismatch(expected: u32, computed: u32) -> Self {
        Self::CrcMismatch { expected, computed }
    }

    /// Create a corrupted data error.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::CorruptedData {
            offset,
            message: message.into(),
        }
    }

    /// Create an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// Create an unexpected EOF error.
    pub fn unexpected_eof(expected: usize) -> Self {
        Self::UnexpectedEof { expected }
    }

    /// Create a not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Create a usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Create a path conflict error.
    pub fn path_conflict(path: impl Into<String>) -> Self {
        Self::PathConflict { path: path.into() }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) | Self::PathConflict { .. } => ErrorKind::Io,
            Self::Usage { .. } => ErrorKind::Usage,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidMagic { .. }
            | Self::UnsupportedMethod { .. }
            | Self::Unsupported { .. }
            | Self::ChecksumMismatch { .. }
            | Self::CrcMismatch { .. }
            | Self::CorruptedData { .. }
            | Self::InvalidHeader { .. }
            | Self::UnexpectedEof { .. }
            | Self::InvalidPattern(_) => ErrorKind::Format,
        }
    }
}

impl From<ArcError> for io::Error {
    fn from(err: ArcError) -> Self {
        match err {
            ArcError::Io(inner) => inner,
            ArcError::UnexpectedEof { .. } => io::Error::new(io::ErrorKind::UnexpectedEof, err),
            ArcError::NotFound { .. } => io::Error::new(io::ErrorKind::NotFound, err),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
