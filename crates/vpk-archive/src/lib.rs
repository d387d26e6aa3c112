//! Reader and writer for Valve VPK version 1 archives.
//!
//! A VPK archive is a directory tree of `(extension, directory, base)` path
//! keys, each pointing at a payload either right after the tree in the main
//! file or inside a numbered data archive. Every file carries a CRC32 that
//! is checked when it has been read to the end.
//!
//! - [`Vpk`] opens an archive and resolves entries through an [`Opener`]
//! - [`create`] writes a new archive through a [`Creator`], optionally split
//!   into data archives of bounded size
//! - [`Vpk::stat`] and [`Vpk::read_dir`] expose a read-only filesystem view
//!
//! # Example
//!
//! ```no_run
//! use vpk_archive::{create, FsCreator, MemorySource, Vpk};
//!
//! let sources = [
//!     MemorySource::new("cfg/autoexec.cfg", "bind w +forward"),
//!     MemorySource::new("readme.txt", "hello"),
//! ];
//! create(&FsCreator::Single("addon.vpk".into()), &sources, None)?;
//!
//! let vpk = Vpk::open_path("addon.vpk")?;
//! for entry in vpk.iter() {
//!     println!("{}: {} bytes", entry.path(), entry.size());
//! }
//!
//! let data = vpk.read("cfg/autoexec.cfg")?;
//! assert_eq!(data, b"bind w +forward");
//! # Ok::<(), vpk_archive::Error>(())
//! ```

mod archive;
mod crc_reader;
mod entry;
mod error;
mod fs;
mod path;
mod source;
pub mod tree;
mod vfs;
mod writer;

pub use archive::Vpk;
pub use crc_reader::CrcReader;
pub use entry::{Entry, EntryReader};
pub use error::{Error, Result};
pub use fs::{archive_path, ArchiveFile, Creator, FsCreator, FsOpener, Opener, DIR_SUFFIX};
pub use path::{PathKey, ABSENT};
pub use source::{FileSource, MemorySource, Source};
pub use tree::{DirectoryEntry, PayloadLocation};
pub use vfs::{Metadata, READ_ONLY};
pub use writer::create;
