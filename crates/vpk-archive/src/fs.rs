//! File access for archives: how the main file and the numbered data
//! archives are opened for reading and created for writing.
//!
//! A single-part archive is one file holding header, tree and payloads. A
//! multi-part archive is `<prefix>_dir.vpk` plus data-only files named
//! `<prefix>_000.vpk`, `<prefix>_001.vpk`, ...

use std::ffi::OsString;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Suffix of the main file of a multi-part archive.
pub const DIR_SUFFIX: &str = "_dir.vpk";

/// A seekable handle to an archive file.
pub trait ArchiveFile: Read + Seek {
    /// Last modification time, reported as the archive's timestamp.
    fn modified(&self) -> io::Result<SystemTime>;
}

impl ArchiveFile for File {
    fn modified(&self) -> io::Result<SystemTime> {
        self.metadata()?.modified()
    }
}

impl<T: AsRef<[u8]>> ArchiveFile for Cursor<T> {
    fn modified(&self) -> io::Result<SystemTime> {
        Ok(SystemTime::UNIX_EPOCH)
    }
}

/// Opens the files of an existing archive.
///
/// Every call returns a fresh, independent handle.
pub trait Opener {
    type File: ArchiveFile;

    /// Open the main file (`*_dir.vpk`, or the only file of a single-part
    /// archive).
    fn open_main(&self) -> io::Result<Self::File>;

    /// Open data-only archive `index`.
    fn open_archive(&self, index: u16) -> io::Result<Self::File>;
}

/// Creates the files of a new archive.
pub trait Creator {
    type File: Write;

    /// Create the main file.
    fn create_main(&self) -> io::Result<Self::File>;

    /// Create data-only archive `index`.
    fn create_archive(&self, index: u16) -> io::Result<Self::File>;
}

/// Archive files on the OS filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsOpener {
    /// A single file; asking for a numbered archive fails with `NotFound`.
    Single(PathBuf),
    /// `<prefix>_dir.vpk` plus `<prefix>_NNN.vpk`.
    Multi(PathBuf),
}

impl FsOpener {
    /// Pick the layout from a file name: anything ending in `_dir.vpk` is
    /// multi-part.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match multi_prefix(path) {
            Some(prefix) => Self::Multi(prefix),
            None => Self::Single(path.to_path_buf()),
        }
    }

    /// Path of the main file.
    pub fn main_path(&self) -> PathBuf {
        match self {
            Self::Single(path) => path.clone(),
            Self::Multi(prefix) => with_suffix(prefix, DIR_SUFFIX),
        }
    }
}

impl Opener for FsOpener {
    type File = File;

    fn open_main(&self) -> io::Result<File> {
        File::open(self.main_path())
    }

    fn open_archive(&self, index: u16) -> io::Result<File> {
        match self {
            Self::Single(_) => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("single-part archive has no data archive {index:03}"),
            )),
            Self::Multi(prefix) => File::open(archive_path(prefix, index)),
        }
    }
}

/// Creates archive files on the OS filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsCreator {
    /// A single file; creating a numbered archive fails with
    /// `PermissionDenied`.
    Single(PathBuf),
    /// `<prefix>_dir.vpk` plus `<prefix>_NNN.vpk`.
    Multi(PathBuf),
}

impl FsCreator {
    /// Multi-part creator from either a bare prefix or a `*_dir.vpk` name.
    pub fn multi(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self::Multi(multi_prefix(path).unwrap_or_else(|| path.to_path_buf()))
    }

    /// Path of the main file.
    pub fn main_path(&self) -> PathBuf {
        match self {
            Self::Single(path) => path.clone(),
            Self::Multi(prefix) => with_suffix(prefix, DIR_SUFFIX),
        }
    }
}

impl Creator for FsCreator {
    type File = File;

    fn create_main(&self) -> io::Result<File> {
        File::create(self.main_path())
    }

    fn create_archive(&self, index: u16) -> io::Result<File> {
        match self {
            Self::Single(_) => Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "single-part archive cannot hold data archives",
            )),
            Self::Multi(prefix) => File::create(archive_path(prefix, index)),
        }
    }
}

/// `<prefix>_NNN.vpk`
pub fn archive_path(prefix: &Path, index: u16) -> PathBuf {
    with_suffix(prefix, &format!("_{index:03}.vpk"))
}

fn multi_prefix(path: &Path) -> Option<PathBuf> {
    let name = path.to_str()?;
    name.strip_suffix(DIR_SUFFIX).map(PathBuf::from)
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(prefix.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_detection() {
        assert_eq!(
            FsOpener::from_path("pak01_dir.vpk"),
            FsOpener::Multi(PathBuf::from("pak01"))
        );
        assert_eq!(
            FsOpener::from_path("addon.vpk"),
            FsOpener::Single(PathBuf::from("addon.vpk"))
        );
    }

    #[test]
    fn test_multi_part_names() {
        let opener = FsOpener::Multi(PathBuf::from("game/pak01"));
        assert_eq!(opener.main_path(), PathBuf::from("game/pak01_dir.vpk"));
        assert_eq!(
            archive_path(Path::new("game/pak01"), 7),
            PathBuf::from("game/pak01_007.vpk")
        );
        assert_eq!(
            archive_path(Path::new("pak01"), 1234),
            PathBuf::from("pak01_1234.vpk")
        );
    }

    #[test]
    fn test_multi_creator_accepts_dir_name() {
        assert_eq!(
            FsCreator::multi("out/pak01_dir.vpk"),
            FsCreator::multi("out/pak01")
        );
    }

    #[test]
    fn test_single_part_has_no_archives() {
        let opener = FsOpener::Single(PathBuf::from("addon.vpk"));
        let err = opener.open_archive(0).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        let creator = FsCreator::Single(PathBuf::from("addon.vpk"));
        let err = creator.create_archive(0).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }
}
