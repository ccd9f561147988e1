use rayon::prelude::*;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::archive::Archive;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClassDigest {
    pub class_name: String,
    pub resource: String,
    pub size: Option<usize>,
    pub sha256: Option<String>,
    pub error: Option<String>,
}

pub fn hash_content(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let digest = hasher.finalize();
    hex::encode(digest)
}

/// Fetches and hashes every class of `archive` in parallel.
///
/// A class that fails to load gets an `error` instead of a hash; the rest of
/// the archive is still processed. Results are sorted by class name.
pub fn digest_archive(archive: &Archive) -> Vec<ClassDigest> {
    let mut digests: Vec<ClassDigest> = archive
        .classes()
        .par_iter()
        .map(|name| {
            let resource = archive.resource_path(name);
            match archive.read_bytecode(name) {
                Ok(bytes) => ClassDigest {
                    class_name: name.clone(),
                    resource,
                    size: Some(bytes.len()),
                    sha256: Some(hash_content(&bytes)),
                    error: None,
                },
                Err(err) => ClassDigest {
                    class_name: name.clone(),
                    resource,
                    size: None,
                    sha256: None,
                    error: Some(err.to_string()),
                },
            }
        })
        .collect();

    digests.sort_by(|a, b| a.class_name.cmp(&b.class_name));
    digests
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::Path;

    use crate::loader::{Bytecode, ResourceLoader};

    struct FailingLoader;

    impl ResourceLoader for FailingLoader {
        fn open(&self, path: &str) -> io::Result<Option<Bytecode>> {
            if path == "a/Bad.class" {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
            }
            Ok(Some(Box::new(io::Cursor::new(path.as_bytes().to_vec()))))
        }
    }

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn hash_content_is_hex_sha256() {
        assert_eq!(
            hash_content(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn digest_archive_reports_failures_per_class() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "a/Good.class");
        touch(tmp.path(), "a/Bad.class");

        let archive = Archive::builder(tmp.path()).loader(FailingLoader).build();
        let digests = digest_archive(&archive);

        assert_eq!(digests.len(), 2);
        assert_eq!(digests[0].class_name, "a.Bad");
        assert!(digests[0].sha256.is_none());
        assert!(digests[0].error.as_deref().unwrap().contains("a/Bad.class"));

        assert_eq!(digests[1].class_name, "a.Good");
        assert_eq!(digests[1].size, Some("a/Good.class".len()));
        assert_eq!(digests[1].sha256, Some(hash_content(b"a/Good.class")));
    }
}
