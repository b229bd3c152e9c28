//! # arcstream archive
//!
//! Readers, writers and decorators for the arcstream pipeline.
//!
//! Formats, each with a reader and a writer:
//!
//! - **TAR**: USTAR with GNU long names and PAX records
//! - **ZIP**: stored and deflated members, Zip64
//! - **GZIP** / **BZIP2**: single-member compressed streams
//! - **AR**: Unix archives with BSD and GNU long names
//!
//! Leaves read files, directories and memory buffers, and write files,
//! memory buffers and byte streams. Decorators filter, rename, fuse and
//! chain readers; [`UncompressReader`] opens archives found among the
//! entries of its source, at any nesting depth.
//!
//! ## Example
//!
//! ```rust
//! use arcstream_archive::source::{read_memory, to_memory};
//! use arcstream_archive::tar::{TarReader, TarWriter};
//! use arcstream_core::{Reader, Stat, Writer};
//!
//! let mut tar = TarWriter::new("", to_memory()).unwrap();
//! tar.new_file("x.txt", &Stat::new(), "text/plain").unwrap();
//! tar.write_data(b"ABCDEFGH").unwrap();
//! tar.close().unwrap();
//!
//! let archive = read_memory(tar.into_inner().into_inner(), "x.tar");
//! let mut reader = TarReader::new(Box::new(archive), false);
//! assert!(reader.next().unwrap());
//! assert_eq!(reader.filename(), "x.txt");
//! assert_eq!(reader.stat().size, Some(8));
//! ```
//!
//! ## Virtual paths
//!
//! [`source::read`] accepts paths reaching into archives:
//!
//! ```rust,no_run
//! use arcstream_archive::source::{ReadOptions, read, to_files};
//! use arcstream_core::{DEFAULT_BUFFER_SIZE, Reader};
//!
//! let mut reader = read("backup.tar.gz/etc/", &ReadOptions::default()).unwrap();
//! let mut files = to_files("restored");
//! reader.extract(&mut files, true, DEFAULT_BUFFER_SIZE).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod ar;
pub mod archive_writer;
pub mod bzip2;
pub mod codec;
pub mod concat;
pub mod directory;
pub mod file;
pub mod files;
pub mod filter;
pub mod gzip;
pub mod memory;
pub mod multi;
pub mod output;
pub mod predicate;
pub mod rename;
pub mod single;
pub mod source;
pub mod tar;
pub mod uncompress;
mod upstream;
pub mod zip;

// Re-exports
pub use ar::{ArReader, ArWriter};
pub use archive_writer::{ArchiveEncoder, ArchiveWriter};
pub use bzip2::{Bzip2Reader, Bzip2Writer};
pub use codec::{ArchiveKind, codec_chain, is_known_extension};
pub use concat::ConcatReader;
pub use directory::DirectoryReader;
pub use file::FileReader;
pub use files::FilesWriter;
pub use filter::FilterReader;
pub use gzip::{GzipHeader, GzipReader, GzipWriter};
pub use memory::{MemoryReader, MemoryWriter};
pub use multi::{MultiReader, MultiWriter};
pub use output::OutputWriter;
pub use predicate::{Predicate, PredicateExt};
pub use rename::{AddBaseName, ChangeBaseName};
pub use source::{ReadOptions, read, read_source, to_archive};
pub use tar::{TarHeader, TarReader, TarWriter};
pub use uncompress::UncompressReader;
pub use zip::{LocalFileHeader, ZipReader, ZipWriter};
