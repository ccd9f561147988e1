//! Error types for archive operations.
//!
//! Decoding and root validation fail the call that triggered them. Manifest
//! failures never leave the crate: they are logged and the archive degrades to
//! single-release mode. Fetch failures are scoped to the single class fetched.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ArchiveError>;

#[derive(Error, Debug)]
pub enum ArchiveError {
    /// A `%` escape was truncated or not followed by two hex digits.
    #[error("Invalid % sequence ({sequence}) at: {position}")]
    InvalidEncoding { position: usize, sequence: String },

    /// The archive location is not a directory path or a `file:` URL.
    #[error("Not a file url: {0}")]
    InvalidRoot(String),

    /// `META-INF/MANIFEST.MF` exists but could not be read or parsed.
    #[error("Unreadable manifest {path}: {reason}")]
    ManifestUnreadable { path: PathBuf, reason: String },

    /// Neither the archive nor its overlay table provides the class.
    #[error("Class not found: {0}")]
    ClassNotFound(String),

    /// The resource was located but reading it failed.
    #[error("Failed to load class {path}: {source}")]
    ClassLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
