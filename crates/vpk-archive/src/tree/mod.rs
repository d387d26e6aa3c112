//! Directory tree codec.
//!
//! A VPK main file starts with a 12-byte header followed by the directory
//! tree:
//!
//! ```text
//! magic: u32 = 0x55AA1234
//! version: u32 = 1
//! tree_length: u32
//! tree:
//!   { extension\0
//!     { directory\0
//!       { base\0 DirectoryEntry preload[preload_bytes] }* \0
//!     }* \0
//!   }* \0
//! ```
//!
//! All integers are little endian. The three nested string lists form a
//! radix structure over `(extension, directory, base)`; both the decoder and
//! the encoder treat it as a flat sequence and only track group boundaries.

mod record;

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::warn;
use vpk_common::BinaryReader;
use zerocopy::IntoBytes;

use crate::path::PathKey;
use crate::{Error, Result};

pub use record::{DirectoryEntry, PayloadLocation, DIR_INDEX, TERMINATOR};
use record::RawDirectoryEntry;

/// VPK signature.
pub const MAGIC: u32 = 0x55AA_1234;

/// The only supported format version.
pub const VERSION: u32 = 1;

/// Size of the version 1 header.
pub const HEADER_SIZE: u64 = 12;

/// An entry as parsed from a directory tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub key: PathKey,
    pub entry: DirectoryEntry,
    pub preload: Vec<u8>,
}

/// A decoded header and directory tree.
#[derive(Debug, Clone)]
pub struct Tree {
    pub version: u32,
    pub tree_length: u32,
    /// Entries in on-disk order.
    pub entries: Vec<TreeEntry>,
}

/// Anything the encoder can lay out as one tree entry.
pub trait TreeRecord {
    fn key(&self) -> &PathKey;
    fn entry(&self) -> &DirectoryEntry;
    fn preload(&self) -> &[u8];
}

impl TreeRecord for TreeEntry {
    fn key(&self) -> &PathKey {
        &self.key
    }

    fn entry(&self) -> &DirectoryEntry {
        &self.entry
    }

    fn preload(&self) -> &[u8] {
        &self.preload
    }
}

impl<T: TreeRecord + ?Sized> TreeRecord for &T {
    fn key(&self) -> &PathKey {
        (**self).key()
    }

    fn entry(&self) -> &DirectoryEntry {
        (**self).entry()
    }

    fn preload(&self) -> &[u8] {
        (**self).preload()
    }
}

/// Read the header and the directory tree from the start of a main file.
///
/// Leaves the reader positioned right after the tree.
pub fn decode<R: Read>(reader: &mut R) -> Result<Tree> {
    let magic = reader.read_u32::<LittleEndian>()?;
    if magic != MAGIC {
        return Err(Error::InvalidMagic {
            expected: MAGIC,
            actual: magic,
        });
    }

    let version = reader.read_u32::<LittleEndian>()?;
    if version != VERSION {
        return Err(Error::UnsupportedVersion(version));
    }

    let tree_length = reader.read_u32::<LittleEndian>()?;

    // Grow with the data rather than trusting the header for the allocation.
    let mut data = Vec::new();
    reader
        .by_ref()
        .take(u64::from(tree_length))
        .read_to_end(&mut data)?;
    if data.len() != tree_length as usize {
        return Err(vpk_common::Error::UnexpectedEof {
            offset: HEADER_SIZE as usize,
            needed: tree_length as usize,
            available: data.len(),
        }
        .into());
    }

    let entries = parse_tree(&data)?;

    Ok(Tree {
        version,
        tree_length,
        entries,
    })
}

/// Parse a directory tree body (everything after the header).
pub fn parse_tree(data: &[u8]) -> Result<Vec<TreeEntry>> {
    let mut reader = BinaryReader::new(data);
    let mut entries = Vec::new();

    loop {
        let ext = reader.read_cstring()?;
        if ext.is_empty() {
            break;
        }

        loop {
            let dir = reader.read_cstring()?;
            if dir.is_empty() {
                break;
            }

            loop {
                let base = reader.read_cstring()?;
                if base.is_empty() {
                    break;
                }

                let raw: RawDirectoryEntry = reader.read_struct()?;
                let entry = DirectoryEntry::from(raw);
                if !entry.is_valid() {
                    return Err(Error::InvalidEntry {
                        dir: dir.to_owned(),
                        base: base.to_owned(),
                        ext: ext.to_owned(),
                    });
                }

                let preload = reader.read_bytes(entry.preload_bytes as usize)?.to_vec();

                entries.push(TreeEntry {
                    key: PathKey::from_components(dir, base, ext),
                    entry,
                    preload,
                });
            }
        }
    }

    if reader.remaining_bytes().iter().any(|&b| b != 0) {
        warn!(
            trailing = reader.remaining(),
            "directory tree continues past its terminator"
        );
    }

    Ok(entries)
}

/// Serialize entries sorted by [`PathKey`] into a directory tree body.
///
/// A new extension or directory group is opened only when that component
/// differs from the previous entry. Both a populated and an empty tree end
/// in three null bytes.
pub fn encode<T: TreeRecord>(entries: &[T]) -> Vec<u8> {
    debug_assert!(entries.windows(2).all(|w| w[0].key() < w[1].key()));

    let mut buf = Vec::new();
    let mut previous: Option<&PathKey> = None;

    for record in entries {
        let key = record.key();

        match previous {
            Some(prev) if prev.extension() == key.extension() => {
                if prev.directory() != key.directory() {
                    buf.push(0); // end of base names
                    write_cstring(&mut buf, key.directory());
                }
            }
            Some(_) => {
                buf.extend_from_slice(&[0, 0]); // end of base names and directories
                write_cstring(&mut buf, key.extension());
                write_cstring(&mut buf, key.directory());
            }
            None => {
                write_cstring(&mut buf, key.extension());
                write_cstring(&mut buf, key.directory());
            }
        }

        write_cstring(&mut buf, key.base());
        buf.extend_from_slice(record.entry().to_raw().as_bytes());
        buf.extend_from_slice(record.preload());

        previous = Some(key);
    }

    // Closes the last base, directory and extension group, or stands in for
    // the empty extension, directory and base of an empty tree.
    buf.extend_from_slice(&[0, 0, 0]);

    buf
}

/// Write the 12-byte header.
pub fn write_header<W: Write>(writer: &mut W, tree_length: u32) -> Result<()> {
    writer.write_u32::<LittleEndian>(MAGIC)?;
    writer.write_u32::<LittleEndian>(VERSION)?;
    writer.write_u32::<LittleEndian>(tree_length)?;
    Ok(())
}

fn write_cstring(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
}
