//! CRC32 hashing utilities.
//!
//! VPK directory entries carry the IEEE CRC32 of the whole file, preload bytes
//! included.

use std::io::{self, Read};

/// Buffer size used when hashing streams.
const BUFFER_SIZE: usize = 64 * 1024;

/// Compute the IEEE CRC32 of a byte slice.
#[inline]
pub fn hash_bytes(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Stream a reader to its end, returning its IEEE CRC32 and byte length.
pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<(u32, u64)> {
    let mut hasher = crc32fast::Hasher::new();
    let mut buf = vec![0u8; BUFFER_SIZE];
    let mut length = 0u64;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
        length += n as u64;
    }

    Ok((hasher.finalize(), length))
}
