use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::fs::{EntryKind, FileSystem};
use crate::overlay::{MultiReleaseOverlay, VERSIONS_DIR};

pub const CLASS_SUFFIX: &str = ".class";
pub const MODULE_DESCRIPTOR: &str = "module-info";
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Where a directory sits relative to the archive root, as far as the
/// multi-release layout is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Place {
    Root,
    MetaInf,
    Versions,
    Versioned(String),
    Package,
}

impl Place {
    fn child(&self, name: &str) -> Place {
        match self {
            Place::Root if name == VERSIONS_DIR[0] => Place::MetaInf,
            Place::MetaInf if name == VERSIONS_DIR[1] => Place::Versions,
            Place::Versions => Place::Versioned(name.to_string()),
            Place::Versioned(v) => Place::Versioned(v.clone()),
            _ => Place::Package,
        }
    }
}

/// Lists the fully-qualified class names under `root`.
///
/// Files under `META-INF/versions/<N>/` are handed to `overlay` instead of
/// being listed; that subtree is not entered at all unless the overlay is in
/// multi-release mode. Classes that exist only as versioned copies are
/// appended once, in sorted order, after the walked ones.
pub fn walk(
    fs: &dyn FileSystem,
    root: &Path,
    base_package: &str,
    overlay: &mut MultiReleaseOverlay,
    max_depth: usize,
) -> Vec<String> {
    let base_prefix = if base_package.is_empty() {
        String::new()
    } else {
        format!("{base_package}.")
    };

    let mut walker = Walker {
        fs,
        overlay,
        max_depth,
        base_prefix,
        ancestors: HashSet::new(),
        classes: Vec::new(),
    };
    if fs.is_dir(root) {
        let prefix = walker.base_prefix.clone();
        walker.scan_dir(root, &prefix, &Place::Root, 0);
    }

    let Walker {
        overlay,
        mut classes,
        ..
    } = walker;

    if overlay.is_multi_release() && !overlay.is_empty() {
        let seen: HashSet<&str> = classes.iter().map(String::as_str).collect();
        let mut extra: Vec<String> = overlay
            .class_names()
            .filter(|name| !seen.contains(name))
            .map(str::to_string)
            .collect();
        extra.sort();
        classes.extend(extra);
    }
    classes
}

struct Walker<'a> {
    fs: &'a dyn FileSystem,
    overlay: &'a mut MultiReleaseOverlay,
    max_depth: usize,
    base_prefix: String,
    ancestors: HashSet<PathBuf>,
    classes: Vec<String>,
}

impl Walker<'_> {
    fn scan_dir(&mut self, dir: &Path, prefix: &str, place: &Place, depth: usize) {
        if depth > self.max_depth {
            tracing::warn!(
                "Not descending into {}: depth limit {} reached",
                dir.display(),
                self.max_depth
            );
            return;
        }

        let key = self
            .fs
            .canonicalize(dir)
            .unwrap_or_else(|_| dir.to_path_buf());
        if self.ancestors.contains(&key) {
            tracing::warn!("Not descending into {}: directory cycle", dir.display());
            return;
        }

        let entries = match self.fs.read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::debug!("Skipping unreadable directory {}: {err}", dir.display());
                return;
            }
        };

        self.ancestors.insert(key.clone());
        for entry in entries {
            match entry.kind {
                EntryKind::Dir => {
                    let child = place.child(&entry.name);
                    if child == Place::Versions && !self.overlay.is_multi_release() {
                        continue;
                    }
                    let child_prefix = match &child {
                        Place::Versions => prefix.to_string(),
                        Place::Versioned(_) if *place == Place::Versions => {
                            self.base_prefix.clone()
                        }
                        _ => format!("{prefix}{}.", entry.name),
                    };
                    self.scan_dir(&dir.join(&entry.name), &child_prefix, &child, depth + 1);
                }
                EntryKind::File => self.visit_file(&entry.name, prefix, place),
            }
        }
        self.ancestors.remove(&key);
    }

    fn visit_file(&mut self, file_name: &str, prefix: &str, place: &Place) {
        let Some(stem) = file_name.strip_suffix(CLASS_SUFFIX) else {
            return;
        };
        if stem.contains('.') || stem == MODULE_DESCRIPTOR {
            return;
        }

        let class_name = format!("{prefix}{stem}");
        match place {
            Place::Versioned(version) => {
                let path = class_name
                    .strip_prefix(&self.base_prefix)
                    .unwrap_or(&class_name)
                    .replace('.', "/");
                self.overlay.visit(version, &class_name, &path);
            }
            Place::Versions => {
                tracing::debug!("Ignoring unversioned class {file_name} in versions directory");
            }
            _ => self.classes.push(class_name),
        }
    }
}
