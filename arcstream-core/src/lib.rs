//! # arcstream core
//!
//! Core components for the arcstream archive pipeline.
//!
//! This crate provides the protocol every stage of the pipeline speaks:
//!
//! - [`reader`]: the [`Reader`] cursor trait and its provided operations
//!   (`select`, `extract`, `file_list`, ...)
//! - [`writer`]: the [`Writer`] sink trait
//! - [`stat`]: sparse entry metadata
//! - [`path`]: virtual path normalization
//! - [`mime`]: extension based MIME lookup
//! - [`error`]: error types
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Factory      read("a.tar/b.zip/c.txt"), to_archive(...)  │
//! ├──────────────────────────────────────────────────────────┤
//! │ Decorators   Uncompress, Filter, ChangeName, Concat      │
//! ├──────────────────────────────────────────────────────────┤
//! │ Codecs       tar, zip, gzip, bzip2, ar                   │
//! ├──────────────────────────────────────────────────────────┤
//! │ Leaves       file, directory, memory / files, memory     │
//! ├──────────────────────────────────────────────────────────┤
//! │ Protocol     Reader, Writer, Stat, path (this crate)     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use arcstream_core::path::normalize;
//!
//! assert_eq!(normalize("./docs/../src/lib.rs"), "src/lib.rs");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod mime;
pub mod path;
pub mod reader;
pub mod shared;
pub mod stat;
pub mod writer;

// Re-exports for convenience
pub use error::{ArcError, ErrorKind, Result};
pub use reader::{EntryStream, Reader};
pub use shared::SharedReader;
pub use stat::Stat;
pub use writer::{DEFAULT_BUFFER_SIZE, Writer};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{ArcError, Result};
    pub use crate::reader::Reader;
    pub use crate::stat::Stat;
    pub use crate::writer::Writer;
}
