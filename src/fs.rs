//! Filesystem access used while scanning an archive.
//!
//! The walker and the manifest read never call `std::fs` directly; they go
//! through [`FileSystem`] so that scans can be observed and substituted in
//! tests. [`LocalFs`] is the implementation used by default.

use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Dir,
    File,
}

/// One child of a directory listing. Symbolic links are reported with the
/// kind of their target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Dir,
        }
    }

    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }
}

pub trait FileSystem: Send + Sync {
    /// Lists the children of `dir`. Entries whose names are not valid UTF-8
    /// are left out.
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntry>>;

    /// Resolves `path` to a canonical form; two paths that reach the same
    /// directory must canonicalize to the same value.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

    /// Reads a whole file. Returns `Ok(None)` when it does not exist.
    fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>>;

    fn is_dir(&self, path: &Path) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                tracing::debug!("Skipping non UTF-8 entry in {}", dir.display());
                continue;
            };

            let mut file_type = entry.file_type()?;
            if file_type.is_symlink() {
                match std::fs::metadata(entry.path()) {
                    Ok(meta) => file_type = meta.file_type(),
                    Err(err) => {
                        tracing::debug!("Skipping dangling link {}: {err}", entry.path().display());
                        continue;
                    }
                }
            }

            let kind = if file_type.is_dir() {
                EntryKind::Dir
            } else {
                EntryKind::File
            };
            entries.push(DirEntry { name, kind });
        }
        Ok(entries)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::canonicalize(path)
    }

    fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}
