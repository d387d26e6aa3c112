//! Entry resolution: turning a parsed entry into a verified byte stream.

use std::io::{self, Read, Seek, SeekFrom, Take};

use tracing::debug;

use crate::archive::Vpk;
use crate::crc_reader::CrcReader;
use crate::fs::Opener;
use crate::path::PathKey;
use crate::tree::{DirectoryEntry, PayloadLocation, TreeEntry};
use crate::Result;

/// Upper bound for the buffer reserved up front by [`Entry::read`].
const MAX_PREALLOCATION: u64 = 64 * 1024;

/// A file within an opened archive.
///
/// This borrows the archive's entry metadata; the payload is only touched by
/// [`Entry::open`].
pub struct Entry<'a, O> {
    vpk: &'a Vpk<O>,
    parsed: &'a TreeEntry,
}

impl<'a, O: Opener> Entry<'a, O> {
    pub(crate) fn new(vpk: &'a Vpk<O>, parsed: &'a TreeEntry) -> Self {
        Self { vpk, parsed }
    }

    /// Logical path of the file, lowercased.
    pub fn path(&self) -> String {
        self.parsed.key.to_string()
    }

    #[inline]
    pub fn key(&self) -> &'a PathKey {
        &self.parsed.key
    }

    /// The raw directory record.
    #[inline]
    pub fn directory_entry(&self) -> &'a DirectoryEntry {
        &self.parsed.entry
    }

    /// CRC32 of the whole file.
    #[inline]
    pub fn crc(&self) -> u32 {
        self.parsed.entry.crc
    }

    /// Bytes stored inline in the directory tree.
    #[inline]
    pub fn preload(&self) -> &'a [u8] {
        &self.parsed.preload
    }

    /// File size, preload bytes included.
    #[inline]
    pub fn size(&self) -> u64 {
        self.parsed.entry.size()
    }

    #[inline]
    pub fn location(&self) -> PayloadLocation {
        self.parsed.entry.location()
    }

    /// Open the file for reading.
    ///
    /// Entries without payload never touch the filesystem. Otherwise the
    /// main file or the numbered archive is opened and positioned; errors
    /// from the opener are returned as they are. Call
    /// [`EntryReader::finish`] to verify the checksum.
    pub fn open(&self) -> Result<EntryReader<'a, O::File>> {
        let entry = &self.parsed.entry;

        let payload = if entry.length == 0 {
            Payload::None
        } else {
            let (mut file, position) = match entry.location() {
                PayloadLocation::Directory { offset } => (
                    self.vpk.opener().open_main()?,
                    self.vpk.data_offset() + u64::from(offset),
                ),
                PayloadLocation::Archive { index, offset } => {
                    (self.vpk.opener().open_archive(index)?, u64::from(offset))
                }
            };
            file.seek(SeekFrom::Start(position))?;

            debug!(
                path = %self.parsed.key,
                location = ?entry.location(),
                position,
                length = entry.length,
                "resolved entry payload"
            );

            Payload::File(file.take(u64::from(entry.length)))
        };

        let stream = self.parsed.preload.as_slice().chain(payload);
        Ok(EntryReader {
            inner: CrcReader::new(stream, entry.crc),
        })
    }

    /// Read and verify the whole file.
    pub fn read(&self) -> Result<Vec<u8>> {
        let mut reader = self.open()?;
        // The size comes from the tree; don't let a corrupt entry pick the
        // allocation.
        let mut data = Vec::with_capacity(self.size().min(MAX_PREALLOCATION) as usize);
        reader.read_to_end(&mut data)?;
        reader.finish()?;
        Ok(data)
    }

    /// Stream the whole file and verify its checksum, discarding the bytes.
    pub fn verify(&self) -> Result<()> {
        let mut reader = self.open()?;
        io::copy(&mut reader, &mut io::sink())?;
        reader.finish()
    }
}

impl<O> std::fmt::Debug for Entry<'_, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("key", &self.parsed.key)
            .field("entry", &self.parsed.entry)
            .finish()
    }
}

/// Non-preloaded part of an entry.
enum Payload<F> {
    None,
    File(Take<F>),
}

impl<F: Read> Read for Payload<F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::None => Ok(0),
            Self::File(file) => file.read(buf),
        }
    }
}

/// Byte stream of one entry: preload bytes, then the payload.
///
/// Dropping the reader closes the underlying file without verifying;
/// [`EntryReader::finish`] closes it and checks the CRC.
pub struct EntryReader<'a, F> {
    inner: CrcReader<io::Chain<&'a [u8], Payload<F>>>,
}

impl<F: Read> EntryReader<'_, F> {
    /// Close the file and compare the CRC32 of the bytes read against the
    /// entry's checksum.
    pub fn finish(self) -> Result<()> {
        self.inner.finish()
    }
}

impl<F: Read> Read for EntryReader<'_, F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{encode, write_header, DIR_INDEX, TERMINATOR};
    use crate::Error;
    use std::cell::Cell;
    use std::io::Cursor;
    use vpk_common::crc::hash_bytes;

    /// Main file and numbered archives held in memory.
    struct MemoryOpener {
        main: Vec<u8>,
        archives: Vec<Vec<u8>>,
        opened: Cell<usize>,
    }

    impl Opener for MemoryOpener {
        type File = Cursor<Vec<u8>>;

        fn open_main(&self) -> io::Result<Self::File> {
            self.opened.set(self.opened.get() + 1);
            Ok(Cursor::new(self.main.clone()))
        }

        fn open_archive(&self, index: u16) -> io::Result<Self::File> {
            self.opened.set(self.opened.get() + 1);
            self.archives
                .get(index as usize)
                .cloned()
                .map(Cursor::new)
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
        }
    }

    fn tree_entry(rel: &str, data: &[u8], preload: usize, archive_index: i16, offset: u32) -> TreeEntry {
        TreeEntry {
            key: PathKey::new(rel),
            entry: DirectoryEntry {
                crc: hash_bytes(data),
                preload_bytes: preload as u16,
                archive_index,
                offset,
                length: (data.len() - preload) as u32,
                terminator: TERMINATOR,
            },
            preload: data[..preload].to_vec(),
        }
    }

    fn build(entries: &mut Vec<TreeEntry>, payload: &[u8], archives: Vec<Vec<u8>>) -> Vpk<MemoryOpener> {
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        let tree = encode(entries.as_slice());

        let mut main = Vec::new();
        write_header(&mut main, tree.len() as u32).unwrap();
        main.extend_from_slice(&tree);
        main.extend_from_slice(payload);

        Vpk::open(MemoryOpener {
            main,
            archives,
            opened: Cell::new(0),
        })
        .unwrap()
    }

    #[test]
    fn test_preload_only_entry_skips_file_access() {
        let mut entries = vec![tree_entry("cfg/autoexec.cfg", b"bind w +forward", 15, DIR_INDEX, 0)];
        let vpk = build(&mut entries, &[], Vec::new());
        let opened_by_open = vpk.opener().opened.get();

        let entry = vpk.entry("cfg/autoexec.cfg").unwrap();
        assert_eq!(entry.read().unwrap(), b"bind w +forward");
        assert_eq!(vpk.opener().opened.get(), opened_by_open);
    }

    #[test]
    fn test_directory_payload_after_tree() {
        let mut entries = vec![
            tree_entry("a.txt", b"first", 0, DIR_INDEX, 0),
            tree_entry("b.txt", b"second", 2, DIR_INDEX, 5),
        ];
        let vpk = build(&mut entries, b"firstcond", Vec::new());

        assert_eq!(vpk.entry("a.txt").unwrap().read().unwrap(), b"first");
        assert_eq!(vpk.entry("b.txt").unwrap().read().unwrap(), b"second");
    }

    #[test]
    fn test_archive_payload() {
        let mut entries = vec![
            tree_entry("maps/one.bsp", b"AAAA", 0, 0, 2),
            tree_entry("maps/two.bsp", b"BBBBBB", 1, 1, 0),
        ];
        let archives = vec![b"..AAAA".to_vec(), b"BBBBB".to_vec()];
        let vpk = build(&mut entries, &[], archives);

        let one = vpk.entry("maps/one.bsp").unwrap();
        assert_eq!(one.location(), PayloadLocation::Archive { index: 0, offset: 2 });
        assert_eq!(one.read().unwrap(), b"AAAA");
        assert_eq!(vpk.entry("maps/two.bsp").unwrap().read().unwrap(), b"BBBBBB");
    }

    #[test]
    fn test_missing_archive_is_io_error() {
        let mut entries = vec![tree_entry("maps/one.bsp", b"AAAA", 0, 3, 0)];
        let vpk = build(&mut entries, &[], Vec::new());

        match vpk.entry("maps/one.bsp").unwrap().open() {
            Err(Error::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::NotFound),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("opened an archive that does not exist"),
        }
    }

    #[test]
    fn test_corrupt_payload_detected_on_finish() {
        let mut entries = vec![tree_entry("a.txt", b"hello", 1, DIR_INDEX, 0)];
        let vpk = build(&mut entries, b"eLlo", Vec::new());

        let entry = vpk.entry("a.txt").unwrap();
        let mut reader = entry.open().unwrap();
        let mut data = Vec::new();
        reader.read_to_end(&mut data).unwrap();
        assert_eq!(data, b"heLlo");

        match reader.finish() {
            Err(Error::CrcMismatch { actual, expected }) => {
                assert_eq!(expected, hash_bytes(b"hello"));
                assert_eq!(actual, hash_bytes(b"heLlo"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_corrupt_length_does_not_size_the_buffer() {
        let mut entries = vec![tree_entry("maps/one.bsp", b"BSP!", 0, DIR_INDEX, 0)];
        entries[0].entry.length = u32::MAX;
        let vpk = build(&mut entries, b"BSP!", Vec::new());

        let data = vpk.entry("maps/one.bsp").unwrap().read().unwrap();
        assert_eq!(data, b"BSP!");
        assert!(data.capacity() as u64 <= MAX_PREALLOCATION);
    }

    #[test]
    fn test_size_includes_preload() {
        let mut entries = vec![tree_entry("b.txt", b"second", 2, DIR_INDEX, 0)];
        let vpk = build(&mut entries, b"cond", Vec::new());

        let entry = vpk.entry("b.txt").unwrap();
        assert_eq!(entry.size(), 6);
        assert_eq!(entry.preload(), b"se");
    }
}
