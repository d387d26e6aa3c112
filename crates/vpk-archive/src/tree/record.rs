//! Directory entry records.

use zerocopy::byteorder::little_endian::{I16, U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Archive index meaning "payload follows the tree in the main file".
pub const DIR_INDEX: i16 = 0x7FFF;

/// Value every record ends with.
pub const TERMINATOR: u16 = 0xFFFF;

/// On-disk layout of a directory entry (18 bytes, little endian).
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub(crate) struct RawDirectoryEntry {
    crc: U32,
    preload_bytes: U16,
    archive_index: I16,
    offset: U32,
    length: U32,
    terminator: U16,
}

/// A directory entry, following each base name in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// IEEE CRC32 of the entire file, preload bytes included.
    pub crc: u32,
    /// Number of bytes stored in the tree right after this record.
    pub preload_bytes: u16,
    /// Archive holding the payload, or [`DIR_INDEX`] for the main file.
    /// Negative values are invalid.
    pub archive_index: i16,
    /// Relative to the end of the tree for [`DIR_INDEX`], otherwise to the
    /// start of the numbered archive.
    pub offset: u32,
    /// Payload length, not counting preload bytes.
    pub length: u32,
    /// Always [`TERMINATOR`].
    pub terminator: u16,
}

/// Where the non-preloaded part of an entry is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadLocation {
    /// In the main file, `offset` bytes past the end of the tree.
    Directory { offset: u32 },
    /// In numbered archive `index`, `offset` bytes from its start.
    Archive { index: u16, offset: u32 },
}

impl DirectoryEntry {
    /// Size of the on-disk record.
    pub const SIZE: usize = std::mem::size_of::<RawDirectoryEntry>();

    /// Whether the archive index and terminator are well formed.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.archive_index >= 0 && self.terminator == TERMINATOR
    }

    /// Full file size: preload bytes plus payload length.
    #[inline]
    pub fn size(&self) -> u64 {
        u64::from(self.preload_bytes) + u64::from(self.length)
    }

    /// Resolve the archive index/offset pair.
    ///
    /// Only meaningful for valid entries.
    pub fn location(&self) -> PayloadLocation {
        if self.archive_index == DIR_INDEX {
            PayloadLocation::Directory {
                offset: self.offset,
            }
        } else {
            PayloadLocation::Archive {
                index: self.archive_index as u16,
                offset: self.offset,
            }
        }
    }

    pub(crate) fn to_raw(self) -> RawDirectoryEntry {
        RawDirectoryEntry {
            crc: U32::new(self.crc),
            preload_bytes: U16::new(self.preload_bytes),
            archive_index: I16::new(self.archive_index),
            offset: U32::new(self.offset),
            length: U32::new(self.length),
            terminator: U16::new(self.terminator),
        }
    }
}

impl From<RawDirectoryEntry> for DirectoryEntry {
    fn from(raw: RawDirectoryEntry) -> Self {
        Self {
            crc: raw.crc.get(),
            preload_bytes: raw.preload_bytes.get(),
            archive_index: raw.archive_index.get(),
            offset: raw.offset.get(),
            length: raw.length.get(),
            terminator: raw.terminator.get(),
        }
    }
}
