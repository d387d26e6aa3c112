//! Error types for the VPK archive crate.

use thiserror::Error;

/// Errors that can occur when reading or writing VPK archives.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error, including failures of the opener or creator.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error (truncated tree, bad string).
    #[error("{0}")]
    Common(#[from] vpk_common::Error),

    /// The main file does not start with the VPK signature.
    #[error("invalid VPK magic: expected {expected:#010x}, got {actual:#010x}")]
    InvalidMagic { expected: u32, actual: u32 },

    /// The header names a format version other than 1.
    #[error("unsupported VPK version: {0}")]
    UnsupportedVersion(u32),

    /// A directory entry has a negative archive index or a bad terminator.
    #[error("entry for {dir}/{base}.{ext} is corrupt")]
    InvalidEntry {
        dir: String,
        base: String,
        ext: String,
    },

    /// The streamed bytes do not match the checksum in the directory entry.
    #[error("CRC mismatch: {actual:08x} (expected {expected:08x})")]
    CrcMismatch { actual: u32, expected: u32 },

    /// A length or offset does not fit the 32-bit fields of the format.
    #[error("file too big")]
    FileTooBig,

    /// A source yielded a different number of bytes than when it was hashed.
    #[error("unexpected end of file")]
    UnexpectedEof,

    /// Two entries normalize to the same path.
    #[error("duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Splitting would need an archive index that collides with the
    /// directory-file sentinel.
    #[error("too many archives")]
    TooManyArchives,

    /// Entry not found.
    #[error("entry not found: {0}")]
    EntryNotFound(String),
}

/// Result type for VPK operations.
pub type Result<T> = std::result::Result<T, Error>;
