//! Read-only filesystem view of an archive.
//!
//! VPK trees only record files; directories are synthesized from the
//! directory components of the entries. Listing is a linear scan over the
//! sorted entry list.

use std::collections::HashSet;
use std::time::SystemTime;

use crate::archive::Vpk;
use crate::path::{self, PathKey, ABSENT};

/// Permission bits reported for everything in an archive.
pub const READ_ONLY: u32 = 0o444;

const S_IFDIR: u32 = 0o040000;
const S_IFREG: u32 = 0o100000;

/// Metadata of a file or synthesized directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Last path component.
    pub name: String,
    pub is_dir: bool,
    /// File size including preload bytes; 0 for directories.
    pub size: u64,
    /// The archive's modification time.
    pub modified: SystemTime,
}

impl Metadata {
    /// Unix-style mode: file type bits plus [`READ_ONLY`].
    pub fn mode(&self) -> u32 {
        let kind = if self.is_dir { S_IFDIR } else { S_IFREG };
        kind | READ_ONLY
    }
}

impl<O> Vpk<O> {
    /// Metadata for a file, or for a directory that contains at least one
    /// file somewhere below it. The empty path is the root.
    pub fn stat(&self, rel: &str) -> Option<Metadata> {
        let key = PathKey::new(rel);
        if let Some(index) = path::find(self.tree_entries(), &key, |e| &e.key) {
            return Some(self.file_metadata(index));
        }

        let dir = normalize_dir(rel);
        let exists = dir.is_empty()
            || self.tree_entries().iter().any(|e| {
                let d = e.key.directory();
                d == dir || d.strip_prefix(dir.as_str()).is_some_and(|rest| rest.starts_with('/'))
            });
        exists.then(|| self.dir_metadata(&dir))
    }

    /// Direct children of a directory: files in tree order, then
    /// subdirectories in the order they are first seen.
    pub fn read_dir(&self, dir: &str) -> Vec<Metadata> {
        let dir = normalize_dir(dir);
        let own = if dir.is_empty() { ABSENT } else { dir.as_str() };
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{dir}/")
        };

        let mut files = Vec::new();
        let mut subdirs: Vec<&str> = Vec::new();
        let mut seen = HashSet::new();

        for (index, e) in self.tree_entries().iter().enumerate() {
            let directory = e.key.directory();
            if directory == own {
                files.push(self.file_metadata(index));
            } else if directory != ABSENT {
                if let Some(rest) = directory.strip_prefix(prefix.as_str()) {
                    let child_len = rest.find('/').unwrap_or(rest.len());
                    let child = &directory[..prefix.len() + child_len];
                    if seen.insert(child) {
                        subdirs.push(child);
                    }
                }
            }
        }

        files.extend(subdirs.into_iter().map(|d| self.dir_metadata(d)));
        files
    }

    fn file_metadata(&self, index: usize) -> Metadata {
        let parsed = &self.tree_entries()[index];
        Metadata {
            name: parsed.key.file_name(),
            is_dir: false,
            size: parsed.entry.size(),
            modified: self.modified(),
        }
    }

    fn dir_metadata(&self, dir: &str) -> Metadata {
        let name = match dir.rsplit('/').next() {
            Some(last) if !last.is_empty() => last.to_owned(),
            _ => ".".to_owned(),
        };
        Metadata {
            name,
            is_dir: true,
            size: 0,
            modified: self.modified(),
        }
    }
}

fn normalize_dir(dir: &str) -> String {
    let lower = dir.to_lowercase();
    path::segments(&lower).join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::Opener;
    use crate::tree::{encode, write_header, DirectoryEntry, TreeEntry, DIR_INDEX, TERMINATOR};
    use std::io::{self, Cursor};

    struct BytesOpener(Vec<u8>);

    impl Opener for BytesOpener {
        type File = Cursor<Vec<u8>>;

        fn open_main(&self) -> io::Result<Self::File> {
            Ok(Cursor::new(self.0.clone()))
        }

        fn open_archive(&self, _index: u16) -> io::Result<Self::File> {
            Err(io::Error::from(io::ErrorKind::NotFound))
        }
    }

    fn archive(files: &[(&str, u32)]) -> Vpk<BytesOpener> {
        let mut entries: Vec<TreeEntry> = files
            .iter()
            .map(|(rel, length)| TreeEntry {
                key: PathKey::new(rel),
                entry: DirectoryEntry {
                    crc: 0,
                    preload_bytes: 0,
                    archive_index: DIR_INDEX,
                    offset: 0,
                    length: *length,
                    terminator: TERMINATOR,
                },
                preload: Vec::new(),
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));

        let tree = encode(entries.as_slice());
        let mut main = Vec::new();
        write_header(&mut main, tree.len() as u32).unwrap();
        main.extend_from_slice(&tree);
        Vpk::open(BytesOpener(main)).unwrap()
    }

    fn names(listing: &[Metadata]) -> Vec<(&str, bool)> {
        listing.iter().map(|m| (m.name.as_str(), m.is_dir)).collect()
    }

    #[test]
    fn test_root_listing() {
        let vpk = archive(&[
            ("readme.txt", 3),
            ("materials/brick/wall.vmt", 10),
            ("materials/sky.vmt", 4),
            ("sound/boom.wav", 8),
        ]);

        assert_eq!(
            names(&vpk.read_dir("")),
            [("readme.txt", false), ("materials", true), ("sound", true)]
        );
    }

    #[test]
    fn test_nested_listing() {
        let vpk = archive(&[
            ("materials/brick/wall.vmt", 10),
            ("materials/sky.vmt", 4),
            ("materials/brick/floor.vtf", 12),
        ]);

        let listing = vpk.read_dir("Materials/");
        assert_eq!(names(&listing), [("sky.vmt", false), ("brick", true)]);
        assert_eq!(listing[0].size, 4);

        assert_eq!(
            names(&vpk.read_dir("materials/brick")),
            [("wall.vmt", false), ("floor.vtf", false)]
        );
    }

    #[test]
    fn test_sibling_prefix_is_not_a_child() {
        let vpk = archive(&[("mat/a.vmt", 1), ("materials/b.vmt", 1)]);

        assert_eq!(names(&vpk.read_dir("mat")), [("a.vmt", false)]);
    }

    #[test]
    fn test_stat() {
        let vpk = archive(&[("materials/brick/wall.vmt", 10)]);

        let file = vpk.stat("materials/brick/wall.vmt").unwrap();
        assert!(!file.is_dir);
        assert_eq!(file.size, 10);
        assert_eq!(file.mode(), 0o100444);

        let dir = vpk.stat("materials").unwrap();
        assert!(dir.is_dir);
        assert_eq!(dir.name, "materials");
        assert_eq!(dir.mode(), 0o040444);

        assert_eq!(vpk.stat("").unwrap().name, ".");
        assert!(vpk.stat("materials/bri").is_none());
        assert!(vpk.stat("sound").is_none());
    }

    #[test]
    fn test_parent_segments_resolve_like_entry_paths() {
        let vpk = archive(&[("materials/brick/wall.vmt", 10)]);

        let dir = vpk.stat("materials/sky/../brick").unwrap();
        assert!(dir.is_dir);
        assert_eq!(dir.name, "brick");
        assert_eq!(vpk.stat("materials/x/..").unwrap().name, "materials");
        assert_eq!(
            names(&vpk.read_dir("sound/../materials/brick")),
            [("wall.vmt", false)]
        );
    }
}
