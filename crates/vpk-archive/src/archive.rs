//! Opened VPK archive.

use std::io::BufReader;
use std::path::Path;
use std::time::SystemTime;

use tracing::debug;

use crate::entry::Entry;
use crate::fs::{ArchiveFile, FsOpener, Opener};
use crate::path::{self, PathKey};
use crate::tree::{self, TreeEntry, HEADER_SIZE};
use crate::{Error, Result};

/// A VPK archive with its directory tree loaded into memory.
///
/// Entries are sorted by [`PathKey`] when the archive is opened and never
/// change afterwards, so lookups are plain binary searches and the archive
/// can be shared between threads when its opener can.
pub struct Vpk<O> {
    opener: O,
    version: u32,
    tree_length: u32,
    entries: Vec<TreeEntry>,
    modified: SystemTime,
}

impl Vpk<FsOpener> {
    /// Open an archive on disk. Names ending in `_dir.vpk` open as
    /// multi-part archives.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(FsOpener::from_path(path))
    }
}

impl<O: Opener> Vpk<O> {
    /// Read the header and directory tree of the main file.
    pub fn open(opener: O) -> Result<Self> {
        let file = opener.open_main()?;
        let modified = file.modified()?;

        let mut reader = BufReader::new(file);
        let tree = tree::decode(&mut reader)?;

        let mut entries = tree.entries;
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        if let Some(pair) = entries.windows(2).find(|w| w[0].key == w[1].key) {
            return Err(Error::DuplicateEntry(pair[0].key.to_string()));
        }

        debug!(
            entries = entries.len(),
            tree_length = tree.tree_length,
            "opened VPK archive"
        );

        Ok(Self {
            opener,
            version: tree.version,
            tree_length: tree.tree_length,
            entries,
            modified,
        })
    }

    /// Look up a file by relative path. Case and separator style do not
    /// matter.
    pub fn entry(&self, rel: &str) -> Option<Entry<'_, O>> {
        let key = PathKey::new(rel);
        path::find(&self.entries, &key, |e| &e.key).map(|i| Entry::new(self, &self.entries[i]))
    }

    /// Iterate over all files in tree order.
    pub fn iter(&self) -> impl Iterator<Item = Entry<'_, O>> + '_ {
        self.entries.iter().map(move |e| Entry::new(self, e))
    }

    /// Relative paths of all files, in tree order.
    pub fn paths(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key.to_string()).collect()
    }

    /// Read and verify a file by relative path.
    pub fn read(&self, rel: &str) -> Result<Vec<u8>> {
        self.entry(rel)
            .ok_or_else(|| Error::EntryNotFound(rel.to_owned()))?
            .read()
    }

    /// Verify every entry on the rayon thread pool.
    ///
    /// Each entry opens its own file handles. Results are in tree order.
    #[cfg(feature = "parallel")]
    pub fn verify_parallel(&self) -> Vec<(String, Result<()>)>
    where
        O: Sync,
    {
        use rayon::prelude::*;

        self.entries
            .par_iter()
            .map(|e| {
                let entry = Entry::new(self, e);
                (entry.path(), entry.verify())
            })
            .collect()
    }
}

impl<O> Vpk<O> {
    #[inline]
    pub fn opener(&self) -> &O {
        &self.opener
    }

    /// Format version from the header (always 1).
    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Length of the directory tree in bytes.
    #[inline]
    pub fn tree_length(&self) -> u32 {
        self.tree_length
    }

    /// Modification time of the main file.
    #[inline]
    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Where payloads stored in the main file begin.
    #[inline]
    pub(crate) fn data_offset(&self) -> u64 {
        HEADER_SIZE + u64::from(self.tree_length)
    }

    pub(crate) fn tree_entries(&self) -> &[TreeEntry] {
        &self.entries
    }
}

impl<O> std::fmt::Debug for Vpk<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vpk")
            .field("version", &self.version)
            .field("tree_length", &self.tree_length)
            .field("entries", &self.entries.len())
            .finish()
    }
}
