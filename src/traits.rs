use crate::osgi::Manifest;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("I/O error reading '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid manifest in '{path}': {source}", path = path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: crate::osgi::ManifestError,
    },
    #[error("Reader task failed: {0}")]
    Task(String),
}

/// Outcome of looking for a manifest inside one archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestLookup {
    Found(Manifest),
    /// The archive has no manifest or cannot be opened as an archive
    Missing { reason: String },
}

#[async_trait]
pub trait BundleReader: Send + Sync {
    /// Returns the archive format this reader handles (e.g., "jar").
    fn format_id(&self) -> &str;

    /// Whether `path` should be handed to this reader during a directory scan.
    fn can_handle(&self, path: &Path) -> bool;

    /// Reads the main manifest section of the archive at `path`.
    async fn read_manifest(&self, path: &Path) -> Result<ManifestLookup, ReadError>;
}
