//! Directory-backed class archive.
//!
//! An [`Archive`] is cheap to create. The first call that needs the class list
//! reads `META-INF/MANIFEST.MF`, builds the multi-release overlay and walks the
//! tree, all exactly once; later enumerations and fetches reuse that snapshot.

use std::fmt;
use std::io::Read;
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use url::Url;

use crate::decode::decode;
use crate::error::{ArchiveError, Result};
use crate::fs::{FileSystem, LocalFs};
use crate::loader::{Bytecode, ClasspathLayout, DirectoryLoader, ResourceLoader};
use crate::manifest::{MANIFEST_PATH, META_INF};
use crate::overlay::MultiReleaseOverlay;
use crate::walk::{DEFAULT_MAX_DEPTH, walk};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOptions {
    /// Prefix for every discovered class name; empty for none.
    pub base_package: String,
    /// Highest versioned overlay to honour; `None` takes the highest present.
    pub target_release: Option<u32>,
    pub max_depth: usize,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            base_package: String::new(),
            target_release: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

struct Snapshot {
    classes: Vec<String>,
    overlay: MultiReleaseOverlay,
}

pub struct Archive {
    dir: PathBuf,
    options: ArchiveOptions,
    layout: ClasspathLayout,
    fs: Arc<dyn FileSystem>,
    loader: Arc<dyn ResourceLoader>,
    snapshot: OnceLock<Snapshot>,
}

impl fmt::Debug for Archive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archive")
            .field("dir", &self.dir)
            .field("options", &self.options)
            .field("scanned", &self.snapshot.get().is_some())
            .finish()
    }
}

impl Archive {
    /// Archive over a local directory with default options.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        ArchiveBuilder::new(dir).build()
    }

    /// Archive over the directory named by a `file:` URL.
    pub fn from_url(url: &str) -> Result<Self> {
        Ok(ArchiveBuilder::from_url(url)?.build())
    }

    pub fn builder(dir: impl Into<PathBuf>) -> ArchiveBuilder {
        ArchiveBuilder::new(dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn options(&self) -> &ArchiveOptions {
        &self.options
    }

    /// Class names in walk order.
    pub fn classes(&self) -> &[String] {
        &self.snapshot().classes
    }

    pub fn iter(&self) -> ClassEntries<'_> {
        ClassEntries {
            archive: self,
            names: self.snapshot().classes.iter(),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshot().classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().classes.is_empty()
    }

    pub fn is_multi_release(&self) -> bool {
        self.snapshot().overlay.is_multi_release()
    }

    /// The versioned resource path (without `.class`, relative to
    /// [`dir`](Self::dir)) that replaces `class_name`, if the archive is
    /// multi-release and has one.
    pub fn overlay_source(&self, class_name: &str) -> Option<&str> {
        self.snapshot().overlay.resolve(class_name)
    }

    /// Classpath-relative path the loader is asked for when fetching
    /// `class_name`.
    pub fn resource_path(&self, class_name: &str) -> String {
        self.layout.resource_path(class_name, &self.snapshot().overlay)
    }

    pub fn bytecode(&self, class_name: &str) -> Result<Bytecode> {
        let path = self.resource_path(class_name);
        match self.loader.open(&path) {
            Ok(Some(stream)) => Ok(stream),
            Ok(None) => Err(ArchiveError::ClassNotFound(path)),
            Err(source) => Err(ArchiveError::ClassLoad { path, source }),
        }
    }

    pub fn read_bytecode(&self, class_name: &str) -> Result<Vec<u8>> {
        let mut stream = self.bytecode(class_name)?;
        let mut bytes = Vec::new();
        stream
            .read_to_end(&mut bytes)
            .map_err(|source| ArchiveError::ClassLoad {
                path: self.resource_path(class_name),
                source,
            })?;
        Ok(bytes)
    }

    fn snapshot(&self) -> &Snapshot {
        self.snapshot.get_or_init(|| self.scan())
    }

    fn scan(&self) -> Snapshot {
        let mut overlay = MultiReleaseOverlay::new(self.options.target_release);

        let manifest_path = self.dir.join(MANIFEST_PATH);
        match self.fs.read(&manifest_path) {
            Ok(Some(bytes)) => overlay.load(&manifest_path, &bytes),
            Ok(None) => {}
            Err(err) => {
                let err = ArchiveError::ManifestUnreadable {
                    path: manifest_path,
                    reason: err.to_string(),
                };
                tracing::debug!("Ignoring manifest: {err}");
            }
        }

        let classes = walk(
            self.fs.as_ref(),
            &self.dir,
            &self.options.base_package,
            &mut overlay,
            self.options.max_depth,
        );
        tracing::info!(
            "Scanned {}: {} classes, multi-release: {}, overlays: {}",
            self.dir.display(),
            classes.len(),
            overlay.is_multi_release(),
            overlay.len()
        );

        Snapshot { classes, overlay }
    }
}

impl<'a> IntoIterator for &'a Archive {
    type Item = ClassEntry<'a>;
    type IntoIter = ClassEntries<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A class listed by an [`Archive`]. Bytecode is only read on request.
#[derive(Debug, Clone, Copy)]
pub struct ClassEntry<'a> {
    name: &'a str,
    archive: &'a Archive,
}

impl<'a> ClassEntry<'a> {
    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn bytecode(&self) -> Result<Bytecode> {
        self.archive.bytecode(self.name)
    }

    pub fn read_bytecode(&self) -> Result<Vec<u8>> {
        self.archive.read_bytecode(self.name)
    }
}

#[derive(Debug, Clone)]
pub struct ClassEntries<'a> {
    archive: &'a Archive,
    names: std::slice::Iter<'a, String>,
}

impl<'a> Iterator for ClassEntries<'a> {
    type Item = ClassEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let archive = self.archive;
        self.names.next().map(|name| ClassEntry {
            name: name.as_str(),
            archive,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.names.size_hint()
    }
}

impl ExactSizeIterator for ClassEntries<'_> {}

impl FusedIterator for ClassEntries<'_> {}

pub struct ArchiveBuilder {
    dir: PathBuf,
    options: ArchiveOptions,
    fs: Option<Arc<dyn FileSystem>>,
    loader: Option<Arc<dyn ResourceLoader>>,
}

impl fmt::Debug for ArchiveBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveBuilder")
            .field("dir", &self.dir)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ArchiveBuilder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: strip_meta_inf(dir.into()),
            options: ArchiveOptions::default(),
            fs: None,
            loader: None,
        }
    }

    pub fn from_url(url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|_| ArchiveError::InvalidRoot(url.to_string()))?;
        Ok(Self::new(url_to_dir(url, &parsed)?))
    }

    /// Accepts either a `file:` URL or a plain directory path.
    pub fn from_location(location: &str) -> Result<Self> {
        match Url::parse(location) {
            // Single-letter schemes are Windows drive letters.
            Ok(parsed) if parsed.scheme().len() > 1 => {
                Ok(Self::new(url_to_dir(location, &parsed)?))
            }
            _ => Ok(Self::new(location)),
        }
    }

    pub fn options(mut self, options: ArchiveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn base_package(mut self, base_package: impl Into<String>) -> Self {
        self.options.base_package = base_package.into();
        self
    }

    pub fn target_release(mut self, release: Option<u32>) -> Self {
        self.options.target_release = release;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.options.max_depth = max_depth;
        self
    }

    pub fn filesystem(mut self, fs: impl FileSystem + 'static) -> Self {
        self.fs = Some(Arc::new(fs));
        self
    }

    pub fn loader(mut self, loader: impl ResourceLoader + 'static) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    pub fn build(self) -> Archive {
        let layout = ClasspathLayout::new(&self.dir, &self.options.base_package);
        let loader = self
            .loader
            .unwrap_or_else(|| Arc::new(DirectoryLoader::new(layout.root())));
        Archive {
            fs: self.fs.unwrap_or_else(|| Arc::new(LocalFs)),
            loader,
            layout,
            dir: self.dir,
            options: self.options,
            snapshot: OnceLock::new(),
        }
    }
}

fn url_to_dir(raw: &str, url: &Url) -> Result<PathBuf> {
    if url.scheme() != "file" {
        return Err(ArchiveError::InvalidRoot(raw.to_string()));
    }
    if let Some(host) = url.host_str()
        && !host.is_empty()
        && host != "localhost"
    {
        return Err(ArchiveError::InvalidRoot(raw.to_string()));
    }
    Ok(PathBuf::from(decode(url.path())?.into_owned()))
}

fn strip_meta_inf(dir: PathBuf) -> PathBuf {
    if dir.file_name().is_some_and(|n| n == META_INF)
        && let Some(parent) = dir.parent()
    {
        return parent.to_path_buf();
    }
    dir
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, rel: &str, content: &[u8]) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn from_url_decodes_path() {
        let archive = Archive::from_url("file:///tmp/my%20classes").unwrap();
        assert_eq!(archive.dir(), Path::new("/tmp/my classes"));
    }

    #[test]
    fn from_url_rejects_other_schemes() {
        let err = Archive::from_url("http://example.com/classes").unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidRoot(_)));

        let err = ArchiveBuilder::from_location("jar:file:/x.jar!/").unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidRoot(_)));
    }

    #[test]
    fn from_url_rejects_remote_hosts() {
        let err = Archive::from_url("file://server/share/classes").unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidRoot(ref raw) if raw == "file://server/share/classes"));

        let archive = Archive::from_url("file://localhost/tmp/classes").unwrap();
        assert_eq!(archive.dir(), Path::new("/tmp/classes"));
    }

    #[test]
    fn from_url_strips_meta_inf() {
        let archive = Archive::from_url("file:///tmp/classes/META-INF").unwrap();
        assert_eq!(archive.dir(), Path::new("/tmp/classes"));

        let archive = Archive::open("/tmp/classes/META-INF");
        assert_eq!(archive.dir(), Path::new("/tmp/classes"));
    }

    #[test]
    fn from_location_accepts_plain_paths() {
        let archive = ArchiveBuilder::from_location("/tmp/plain%20dir").unwrap().build();
        assert_eq!(archive.dir(), Path::new("/tmp/plain%20dir"));
    }

    #[test]
    fn fetch_reads_bytes_and_reports_missing_class() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "a/C.class", b"\xCA\xFE");

        let archive = Archive::open(tmp.path());
        assert_eq!(archive.read_bytecode("a.C").unwrap(), b"\xCA\xFE");
        assert_eq!(archive.read_bytecode("a.C<T>").unwrap(), b"\xCA\xFE");

        let err = archive.read_bytecode("a.Missing").unwrap_err();
        assert!(matches!(err, ArchiveError::ClassNotFound(ref p) if p == "a/Missing.class"));
    }

    #[test]
    fn base_package_archive_loads_from_classpath_root() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "com/acme/Widget.class", b"w");

        let archive = Archive::builder(tmp.path().join("com/acme"))
            .base_package("com.acme")
            .build();
        let names: Vec<&str> = archive.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["com.acme.Widget"]);
        assert_eq!(archive.iter().next().unwrap().read_bytecode().unwrap(), b"w");
    }

    #[test]
    fn base_package_multi_release_serves_versioned_copy() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("com/acme");
        touch(&dir, "META-INF/MANIFEST.MF", b"Multi-Release: true\n");
        touch(&dir, "Base.class", b"base");
        touch(&dir, "META-INF/versions/11/Base.class", b"v11");

        let archive = Archive::builder(&dir).base_package("com.acme").build();
        assert_eq!(archive.classes().to_vec(), vec!["com.acme.Base".to_string()]);
        assert_eq!(archive.overlay_source("com.acme.Base"), Some("META-INF/versions/11/Base"));
        assert_eq!(archive.resource_path("com.acme.Base"), "com/acme/META-INF/versions/11/Base.class");
        assert_eq!(archive.read_bytecode("com.acme.Base").unwrap(), b"v11");
    }

    #[test]
    fn absolute_resource_names_cannot_leave_the_classpath() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "root/a/C.class", b"inside");
        touch(tmp.path(), "outside/Secret.class", b"secret");

        let archive = Archive::open(tmp.path().join("root"));
        let escaping = format!("{}/outside/Secret.class", tmp.path().display());
        let err = archive.read_bytecode(&escaping).unwrap_err();
        assert!(matches!(err, ArchiveError::ClassNotFound(_)));
        assert_eq!(archive.read_bytecode("a.C").unwrap(), b"inside");
    }

    #[test]
    fn multi_release_fetch_serves_versioned_copy() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\nMulti-Release: true\n");
        touch(tmp.path(), "Base.class", b"base");
        touch(tmp.path(), "META-INF/versions/11/Base.class", b"v11");

        let archive = Archive::open(tmp.path());
        assert!(archive.is_multi_release());
        assert_eq!(archive.overlay_source("Base"), Some("META-INF/versions/11/Base"));
        assert_eq!(archive.classes().to_vec(), vec!["Base".to_string()]);
        assert_eq!(archive.read_bytecode("Base").unwrap(), b"v11");
    }

    #[test]
    fn target_release_selects_older_overlay() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "META-INF/MANIFEST.MF", b"Multi-Release: true\n");
        touch(tmp.path(), "Base.class", b"base");
        touch(tmp.path(), "META-INF/versions/11/Base.class", b"v11");
        touch(tmp.path(), "META-INF/versions/21/Base.class", b"v21");

        let latest = Archive::open(tmp.path());
        assert_eq!(latest.read_bytecode("Base").unwrap(), b"v21");

        let capped = Archive::builder(tmp.path()).target_release(Some(17)).build();
        assert_eq!(capped.read_bytecode("Base").unwrap(), b"v11");

        let too_old = Archive::builder(tmp.path()).target_release(Some(8)).build();
        assert_eq!(too_old.read_bytecode("Base").unwrap(), b"base");
    }

    #[test]
    fn malformed_manifest_degrades_to_single_release() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "META-INF/MANIFEST.MF", b"this is not a manifest\n");
        touch(tmp.path(), "Base.class", b"base");
        touch(tmp.path(), "META-INF/versions/11/Base.class", b"v11");

        let archive = Archive::open(tmp.path());
        assert!(!archive.is_multi_release());
        assert_eq!(archive.classes().to_vec(), vec!["Base".to_string()]);
        assert_eq!(archive.read_bytecode("Base").unwrap(), b"base");
    }
}
