//! Bytecode retrieval.
//!
//! The archive never reads class bytes itself. It turns a class name into a
//! classpath-relative resource path (`a/b/C.class`) and asks a
//! [`ResourceLoader`] for it. [`ClasspathLayout`] does the translation.

use memmap2::Mmap;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Component, Path, PathBuf};

use crate::overlay::MultiReleaseOverlay;
use crate::walk::CLASS_SUFFIX;

pub type Bytecode = Box<dyn Read + Send>;

/// Resolves classpath-relative resource paths to byte streams.
///
/// Implementations must be safe to call from several threads at once; the
/// archive shares one loader across every entry.
pub trait ResourceLoader: Send + Sync {
    /// Opens `path`, or returns `Ok(None)` when the resource does not exist.
    fn open(&self, path: &str) -> io::Result<Option<Bytecode>>;
}

/// Serves resources from a classpath root directory on the local disk.
///
/// Only plain relative paths are served; absolute paths and `.`/`..`
/// segments come back as missing.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    root: PathBuf,
}

impl DirectoryLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ResourceLoader for DirectoryLoader {
    fn open(&self, path: &str) -> io::Result<Option<Bytecode>> {
        let relative = Path::new(path);
        if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return Ok(None);
        }
        let full = self.root.join(relative);

        let file = match File::open(&full) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };
        let meta = file.metadata()?;
        if !meta.is_file() {
            return Ok(None);
        }
        if meta.len() == 0 {
            return Ok(Some(Box::new(io::empty())));
        }

        // SAFETY: The file is opened read-only and the mapping owns its own
        // reference to it, so dropping `file` afterwards is fine.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Some(Box::new(Cursor::new(mmap))))
    }
}

/// Where an archive directory sits on the classpath its loader serves.
///
/// `/out/com/acme` scanned under base package `com.acme` lives at `com/acme/`
/// below the classpath root `/out`. When the directory does not end in the
/// package segments it is its own classpath root, and class names under the
/// base package resolve with that package removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClasspathLayout {
    root: PathBuf,
    dir_prefix: String,
    package_path: String,
}

impl ClasspathLayout {
    pub fn new(dir: &Path, base_package: &str) -> Self {
        let segments: Vec<&str> = base_package.split('.').filter(|s| !s.is_empty()).collect();
        let package_path: String = segments.iter().map(|s| format!("{s}/")).collect();

        let mut current = dir;
        for segment in segments.iter().rev() {
            let matches = current
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n == *segment);
            match current.parent() {
                Some(parent) if matches => current = parent,
                _ => {
                    return Self {
                        root: dir.to_path_buf(),
                        dir_prefix: String::new(),
                        package_path,
                    };
                }
            }
        }

        Self {
            root: current.to_path_buf(),
            dir_prefix: package_path.clone(),
            package_path,
        }
    }

    /// Directory the default loader resolves resource paths against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Turns a class name into the resource path to look up, relative to
    /// [`root`](Self::root).
    ///
    /// Anything from the first `<` and then from the first `>` is cut off.
    /// Names already ending in `.class` are taken as paths; others have their
    /// dots turned into slashes. A registered overlay redirect replaces the
    /// path.
    pub fn resource_path(&self, class_name: &str, overlay: &MultiReleaseOverlay) -> String {
        let mut name = class_name;
        if let Some(pos) = name.find('<') {
            name = &name[..pos];
        }
        if let Some(pos) = name.find('>') {
            name = &name[..pos];
        }

        let path = if name.ends_with(CLASS_SUFFIX) {
            name.to_string()
        } else {
            format!("{}{CLASS_SUFFIX}", name.replace('.', "/"))
        };

        if overlay.is_multi_release() {
            let dotted = path
                .strip_suffix(CLASS_SUFFIX)
                .unwrap_or(&path)
                .replace('/', ".");
            if let Some(source) = overlay.resolve(&dotted) {
                return format!("{}{source}{CLASS_SUFFIX}", self.dir_prefix);
            }
        }

        match path.strip_prefix(&self.package_path) {
            Some(rest) if !self.package_path.is_empty() => format!("{}{rest}", self.dir_prefix),
            _ => path,
        }
    }
}
