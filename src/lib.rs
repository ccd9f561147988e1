//! # class-archive
//!
//! Presents a directory of compiled Java classes as a lazily enumerated
//! collection of named class resources.
//!
//! ## Architecture
//!
//! - **decode**: Percent-decoding of `file:` URL paths
//! - **fs**: Filesystem seam used by scanning
//! - **walk**: Recursive class discovery with package-name accumulation
//! - **manifest**: `META-INF/MANIFEST.MF` main-section parsing
//! - **overlay**: Multi-release (`META-INF/versions/<N>`) overlay table
//! - **loader**: Class name to resource path resolution and resource loaders
//! - **archive**: The cached, restartable archive and its entries
//! - **digest**: Parallel bytecode hashing
//! - **cli** / **config**: Command-line front end

pub mod archive;
pub mod cli;
pub mod config;
pub mod decode;
pub mod digest;
pub mod error;
pub mod fs;
pub mod loader;
pub mod manifest;
pub mod overlay;
pub mod walk;

pub use archive::{Archive, ArchiveBuilder, ArchiveOptions, ClassEntries, ClassEntry};
pub use error::{ArchiveError, Result};
pub use loader::{Bytecode, ClasspathLayout, DirectoryLoader, ResourceLoader};
