//! VPK - reading and writing Valve VPK version 1 archives.
//!
//! This crate ties the VPK crates together behind one dependency.
//!
//! # Crates
//!
//! - [`vpk_common`] - Common utilities (binary reading, CRC32)
//! - [`vpk_archive`] - Directory tree codec, archive reader and writer
//!
//! # Example
//!
//! ```no_run
//! use vpk::prelude::*;
//!
//! let archive = Vpk::open_path("pak01_dir.vpk")?;
//!
//! if let Some(entry) = archive.entry("scripts/game_sounds.txt") {
//!     let data = entry.read()?;
//!     println!("{} bytes, crc {:08x}", data.len(), entry.crc());
//! }
//!
//! for item in archive.read_dir("materials") {
//!     println!("{} {:o}", item.name, item.mode());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use vpk_archive as archive;
pub use vpk_common as common;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use vpk_archive::{
        create, Entry, FileSource, FsCreator, FsOpener, MemorySource, Metadata, PathKey,
        PayloadLocation, Source, Vpk,
    };
    pub use vpk_common::{crc, BinaryReader};
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
