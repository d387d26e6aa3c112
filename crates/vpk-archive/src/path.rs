//! Path keys: the `(directory, base, extension)` triple entries are grouped
//! and sorted by.

use std::cmp::Ordering;
use std::fmt;

/// Stand-in for an absent path component.
///
/// The tree uses the empty string as a group terminator, so a file with no
/// extension or a file at the archive root stores a single space instead.
pub const ABSENT: &str = " ";

/// A normalized archive path split into its three tree components.
///
/// Keys order by extension, then directory, then base name, which is the
/// order entries are laid out in the directory tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathKey {
    directory: String,
    base: String,
    extension: String,
}

impl PathKey {
    /// Normalize a relative path.
    ///
    /// Both `/` and `\` separate components, empty and `.` segments are
    /// dropped, `..` removes the previous segment, and everything is
    /// lowercased.
    ///
    /// ```
    /// use vpk_archive::PathKey;
    ///
    /// let key = PathKey::new("Materials\\Brick/Wall.VMT");
    /// assert_eq!(key.directory(), "materials/brick");
    /// assert_eq!(key.base(), "wall");
    /// assert_eq!(key.extension(), "vmt");
    /// ```
    pub fn new(rel: &str) -> Self {
        let lower = rel.to_lowercase();
        let segments = segments(&lower);

        let (file, dirs) = match segments.split_last() {
            Some((file, dirs)) => (*file, dirs),
            None => ("", &[][..]),
        };
        let (base, extension) = match file.rfind('.') {
            Some(dot) => (&file[..dot], &file[dot + 1..]),
            None => (file, ""),
        };

        Self {
            directory: or_absent(&dirs.join("/")),
            base: or_absent(base),
            extension: or_absent(extension),
        }
    }

    /// Build a key from components exactly as stored in a directory tree.
    pub(crate) fn from_components(directory: &str, base: &str, extension: &str) -> Self {
        Self {
            directory: directory.to_owned(),
            base: base.to_owned(),
            extension: extension.to_owned(),
        }
    }

    /// Directory component, [`ABSENT`] for files at the root.
    #[inline]
    pub fn directory(&self) -> &str {
        &self.directory
    }

    /// File name without extension, [`ABSENT`] when empty.
    #[inline]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Extension without the dot, [`ABSENT`] when there is none.
    #[inline]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// File name with extension, without the directory.
    pub fn file_name(&self) -> String {
        let mut name = String::new();
        if self.base != ABSENT {
            name.push_str(&self.base);
        }
        if self.extension != ABSENT {
            name.push('.');
            name.push_str(&self.extension);
        }
        name
    }
}

fn or_absent(component: &str) -> String {
    if component.is_empty() {
        ABSENT.to_owned()
    } else {
        component.to_owned()
    }
}

impl Ord for PathKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.extension
            .cmp(&other.extension)
            .then_with(|| self.directory.cmp(&other.directory))
            .then_with(|| self.base.cmp(&other.base))
    }
}

impl PartialOrd for PathKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.directory != ABSENT {
            write!(f, "{}/", self.directory)?;
        }
        f.write_str(&self.file_name())
    }
}

/// Split a lowercased path into its normalized segments.
pub(crate) fn segments(lower: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in lower.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." if segments.last().is_some_and(|last| *last != "..") => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }
    segments
}

/// Binary search a slice sorted by [`PathKey`] for an exact match.
pub fn find<T>(sorted: &[T], key: &PathKey, key_of: impl Fn(&T) -> &PathKey) -> Option<usize> {
    sorted.binary_search_by(|item| key_of(item).cmp(key)).ok()
}
