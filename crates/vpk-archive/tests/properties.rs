//! Property tests for the tree codec, the sort order of opened archives and
//! the archive-splitting rule.

use std::collections::BTreeMap;

use proptest::prelude::*;
use vpk_archive::tree::{self, TreeEntry, DIR_INDEX, TERMINATOR};
use vpk_archive::{create, DirectoryEntry, FsCreator, MemorySource, PathKey, PayloadLocation, Vpk};

/// Lowercase paths with optional directory and extension, so distinct
/// strings are distinct keys.
fn logical_path() -> impl Strategy<Value = String> {
    "([a-z0-9_]{1,6}/){0,3}[a-z0-9_]{1,8}(\\.[a-z0-9]{1,4})?"
}

fn directory_entry() -> impl Strategy<Value = DirectoryEntry> {
    (
        any::<u32>(),
        prop_oneof![Just(DIR_INDEX), 0i16..DIR_INDEX],
        any::<u32>(),
        any::<u32>(),
    )
        .prop_map(|(crc, archive_index, offset, length)| DirectoryEntry {
            crc,
            preload_bytes: 0,
            archive_index,
            offset,
            length,
            terminator: TERMINATOR,
        })
}

fn tree_entries() -> impl Strategy<Value = Vec<TreeEntry>> {
    prop::collection::btree_map(
        logical_path(),
        (directory_entry(), prop::collection::vec(any::<u8>(), 0..8)),
        1..24,
    )
    .prop_map(|files| {
        let mut entries: Vec<TreeEntry> = files
            .into_iter()
            .map(|(rel, (mut entry, preload))| {
                entry.preload_bytes = preload.len() as u16;
                TreeEntry {
                    key: PathKey::new(&rel),
                    entry,
                    preload,
                }
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    })
}

fn contents() -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    prop::collection::btree_map(
        logical_path(),
        prop::collection::vec(any::<u8>(), 0..256),
        1..12,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Encoding a sorted entry list and parsing it back is lossless.
    #[test]
    fn tree_round_trip(entries in tree_entries()) {
        let encoded = tree::encode(&entries);
        let decoded = tree::parse_tree(&encoded).map_err(|e| TestCaseError::fail(e.to_string()))?;

        prop_assert_eq!(decoded, entries);
    }

    /// Written files read back unchanged, and the opened archive lists them
    /// strictly ordered by (extension, directory, base).
    #[test]
    fn archive_round_trip(files in contents()) {
        let dir = tempfile::tempdir().map_err(|e| TestCaseError::fail(e.to_string()))?;
        let path = dir.path().join("pak.vpk");
        let sources: Vec<MemorySource> = files
            .iter()
            .rev()
            .map(|(rel, data)| MemorySource::new(rel.as_str(), data.clone()))
            .collect();

        create(&FsCreator::Single(path.clone()), &sources, None)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let vpk = Vpk::open_path(&path).map_err(|e| TestCaseError::fail(e.to_string()))?;

        prop_assert_eq!(vpk.len(), files.len());
        let keys: Vec<&PathKey> = vpk.iter().map(|e| e.key()).collect();
        prop_assert!(keys.windows(2).all(|w| w[0] < w[1]));

        for (rel, data) in &files {
            let read = vpk.read(rel).map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(&read, data);
        }
    }

    /// With equal file sizes dividing the ceiling, file `i` lands in archive
    /// `i * size / ceiling`.
    #[test]
    fn split_assignment(size in 1u64..8, per_archive in 1u64..4, count in 1usize..10) {
        let ceiling = size * per_archive;
        let dir = tempfile::tempdir().map_err(|e| TestCaseError::fail(e.to_string()))?;
        let prefix = dir.path().join("pak01");
        let sources: Vec<MemorySource> = (0..count)
            .map(|i| MemorySource::new(format!("f{i:02}.bin"), vec![i as u8; size as usize]))
            .collect();

        create(&FsCreator::multi(&prefix), &sources, Some(ceiling))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let vpk = Vpk::open_path(FsCreator::multi(&prefix).main_path())
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        for i in 0..count {
            let rel = format!("f{i:02}.bin");
            let entry = vpk.entry(&rel).ok_or_else(|| TestCaseError::fail("entry missing"))?;
            let expected = (i as u64 * size / ceiling) as u16;
            let index = match entry.location() {
                PayloadLocation::Archive { index, .. } => index,
                PayloadLocation::Directory { .. } => return Err(TestCaseError::fail("payload in main file")),
            };
            prop_assert_eq!(index, expected);
            prop_assert_eq!(entry.read().map_err(|e| TestCaseError::fail(e.to_string()))?, vec![i as u8; size as usize]);
        }
    }
}
