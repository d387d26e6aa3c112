//! Error types for vpk-common.

use thiserror::Error;

/// Error raised while walking an in-memory buffer.
///
/// Offsets are relative to the start of the buffer handed to the reader.
#[derive(Debug, Error)]
pub enum Error {
    /// The buffer ends before a read completes.
    #[error("unexpected end of buffer at offset {offset}: needed {needed} bytes but only {available} available")]
    UnexpectedEof {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A string runs to the end of the buffer without a null terminator.
    #[error("string at offset {offset} is missing its null terminator")]
    MissingNullTerminator { offset: usize },

    /// A string is not valid UTF-8.
    #[error("invalid UTF-8 in string at offset {offset}: {source}")]
    Utf8 {
        offset: usize,
        source: std::str::Utf8Error,
    },
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
