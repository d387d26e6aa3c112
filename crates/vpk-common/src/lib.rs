//! Common utilities for VPK tooling.
//!
//! This crate provides the foundational pieces used by the archive crate:
//!
//! - [`BinaryReader`] - Zero-copy binary reading from byte slices
//! - [`crc`] - IEEE CRC32 hashing utilities, including streaming hashing

mod error;
mod reader;

pub mod crc;

pub use error::{Error, Result};
pub use reader::BinaryReader;

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};
