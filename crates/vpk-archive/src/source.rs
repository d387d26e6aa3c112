//! Logical files fed to the archive writer.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// A file to be stored in an archive.
///
/// The writer opens each source twice (once to hash it, once to copy it), so
/// `open` must yield identical contents every time.
pub trait Source {
    type Reader<'a>: Read
    where
        Self: 'a;

    /// Path inside the archive.
    fn rel(&self) -> &str;

    /// Open the contents for reading.
    fn open(&self) -> io::Result<Self::Reader<'_>>;
}

/// A file on disk stored under a chosen archive path.
#[derive(Debug, Clone)]
pub struct FileSource {
    rel: String,
    path: PathBuf,
}

impl FileSource {
    pub fn new(rel: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            rel: rel.into(),
            path: path.into(),
        }
    }

    /// Store a file under its own relative path.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self::new(path.to_string_lossy().replace('\\', "/"), path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Source for FileSource {
    type Reader<'a> = File;

    fn rel(&self) -> &str {
        &self.rel
    }

    fn open(&self) -> io::Result<File> {
        File::open(&self.path)
    }
}

/// In-memory contents stored under an archive path.
#[derive(Debug, Clone)]
pub struct MemorySource {
    rel: String,
    data: Vec<u8>,
}

impl MemorySource {
    pub fn new(rel: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            rel: rel.into(),
            data: data.into(),
        }
    }
}

impl Source for MemorySource {
    type Reader<'a> = &'a [u8];

    fn rel(&self) -> &str {
        &self.rel
    }

    fn open(&self) -> io::Result<&[u8]> {
        Ok(&self.data)
    }
}
