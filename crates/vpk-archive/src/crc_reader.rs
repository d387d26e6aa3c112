//! Reader wrapper with deferred CRC32 verification.

use std::io::{self, Read};

use crate::{Error, Result};

/// Forwards reads to an inner reader while hashing everything it returns.
///
/// The checksum can only be judged once the whole payload has streamed, so
/// verification happens in [`CrcReader::finish`], after the caller has
/// already seen the bytes.
pub struct CrcReader<R> {
    inner: R,
    hasher: crc32fast::Hasher,
    expected: u32,
}

impl<R: Read> CrcReader<R> {
    /// Wrap `inner`, expecting its bytes to hash to `expected`.
    pub fn new(inner: R, expected: u32) -> Self {
        Self {
            inner,
            hasher: crc32fast::Hasher::new(),
            expected,
        }
    }

    /// The checksum the stream is expected to have.
    #[inline]
    pub fn expected(&self) -> u32 {
        self.expected
    }

    /// Release the inner reader, then compare the checksum of everything
    /// read so far against the expected value.
    pub fn finish(self) -> Result<()> {
        let Self {
            inner,
            hasher,
            expected,
        } = self;
        drop(inner);

        let actual = hasher.finalize();
        if actual != expected {
            return Err(Error::CrcMismatch { actual, expected });
        }

        Ok(())
    }
}

impl<R: Read> Read for CrcReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vpk_common::crc::hash_bytes;

    #[test]
    fn test_matching_crc() {
        let data = b"hello world";
        let mut reader = CrcReader::new(&data[..], hash_bytes(data));

        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();

        assert_eq!(out, data);
        reader.finish().unwrap();
    }

    #[test]
    fn test_mismatch_reports_both_values() {
        let data = b"hello world";
        let mut reader = CrcReader::new(&data[..], 0xDEAD_BEEF);
        io::copy(&mut reader, &mut io::sink()).unwrap();

        match reader.finish() {
            Err(Error::CrcMismatch { actual, expected }) => {
                assert_eq!(actual, hash_bytes(data));
                assert_eq!(expected, 0xDEAD_BEEF);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_partial_read_fails_verification() {
        let data = b"hello world";
        let mut reader = CrcReader::new(&data[..], hash_bytes(data));

        let mut head = [0u8; 5];
        reader.read_exact(&mut head).unwrap();

        assert!(matches!(reader.finish(), Err(Error::CrcMismatch { .. })));
    }

    #[test]
    fn test_empty_stream() {
        let reader = CrcReader::new(io::empty(), 0);
        assert_eq!(reader.expected(), 0);
        reader.finish().unwrap();
    }
}
