//! Multi-release overlay table.
//!
//! An archive whose manifest declares `Multi-Release: true` may ship
//! replacement class files under `META-INF/versions/<N>/`. The overlay records,
//! for every such class, which versioned copy should be served instead of the
//! base copy.
//!
//! When several versions provide the same class the winner is the highest
//! version not above the target release, or simply the highest version when no
//! target is set. Version directories that are not decimal integers are
//! ignored.

use std::collections::HashMap;
use std::path::Path;

use crate::error::ArchiveError;
use crate::manifest::{META_INF, Manifest};

pub const VERSIONS_DIR: [&str; 2] = [META_INF, "versions"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReleaseMode {
    #[default]
    NotMultiRelease,
    MultiRelease,
}

#[derive(Debug, Clone, Default)]
pub struct MultiReleaseOverlay {
    mode: ReleaseMode,
    target_release: Option<u32>,
    classes: HashMap<String, (u32, String)>,
}

impl MultiReleaseOverlay {
    pub fn new(target_release: Option<u32>) -> Self {
        Self {
            target_release,
            ..Self::default()
        }
    }

    /// Reads the manifest flag. Any failure leaves the overlay single-release.
    pub fn load(&mut self, manifest_path: &Path, bytes: &[u8]) {
        match read_flag(manifest_path, bytes) {
            Ok(true) => self.mode = ReleaseMode::MultiRelease,
            Ok(false) => {}
            Err(err) => tracing::debug!("Ignoring manifest: {err}"),
        }
    }

    pub fn mode(&self) -> ReleaseMode {
        self.mode
    }

    pub fn is_multi_release(&self) -> bool {
        self.mode == ReleaseMode::MultiRelease
    }

    /// Records a class found at `META-INF/versions/<version_dir>/<path>.class`.
    ///
    /// `path` is the file's location inside the version directory, so it never
    /// carries the base package. Returns whether the entry now backs
    /// `class_name`. Nothing is recorded in single-release mode.
    pub fn visit(&mut self, version_dir: &str, class_name: &str, path: &str) -> bool {
        if !self.is_multi_release() {
            return false;
        }
        let Some(version) = parse_version(version_dir) else {
            tracing::debug!("Ignoring non-numeric version directory {version_dir:?}");
            return false;
        };
        if self.target_release.is_some_and(|target| version > target) {
            return false;
        }

        if let Some((existing, _)) = self.classes.get(class_name)
            && *existing >= version
        {
            return false;
        }

        let source = format!("{}/{}/{version}/{path}", VERSIONS_DIR[0], VERSIONS_DIR[1]);
        self.classes.insert(class_name.to_string(), (version, source));
        true
    }

    /// The versioned resource path (without `.class`, relative to the archive
    /// directory) overriding `class_name`.
    pub fn resolve(&self, class_name: &str) -> Option<&str> {
        if !self.is_multi_release() {
            return None;
        }
        self.classes.get(class_name).map(|(_, source)| source.as_str())
    }

    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

fn read_flag(manifest_path: &Path, bytes: &[u8]) -> crate::error::Result<bool> {
    let manifest = Manifest::parse(bytes).map_err(|reason| ArchiveError::ManifestUnreadable {
        path: manifest_path.to_path_buf(),
        reason,
    })?;
    Ok(manifest.is_multi_release())
}

fn parse_version(dir: &str) -> Option<u32> {
    if dir.is_empty() || !dir.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    dir.parse().ok()
}
