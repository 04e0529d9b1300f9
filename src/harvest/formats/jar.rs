//! Jar archives: `META-INF/MANIFEST.MF` inside a zip file.

use async_trait::async_trait;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::osgi::{Manifest, ManifestError};
use crate::traits::{BundleReader, ManifestLookup, ReadError};

const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// Upper bound on the manifest size read from an archive (8 MiB).
const MAX_MANIFEST_SIZE: u64 = 8 * 1024 * 1024;

/// Reads bundle manifests out of `.jar` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct JarReader;

impl JarReader {
    pub fn new() -> Self {
        Self
    }

    /// Blocking implementation of [`BundleReader::read_manifest`].
    pub fn read_manifest_blocking(path: &Path) -> Result<ManifestLookup, ReadError> {
        let io_error = |source: std::io::Error| ReadError::Io {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(io_error)?;
        let mut archive = match ZipArchive::new(file) {
            Ok(archive) => archive,
            Err(ZipError::Io(e)) => return Err(io_error(e)),
            Err(e) => {
                return Ok(ManifestLookup::Missing {
                    reason: format!("not a zip archive: {e}"),
                })
            }
        };
        trace!(path = %path.display(), entries = archive.len(), "Opened jar");

        // jar tooling compares the manifest name case-insensitively
        let Some(name) = archive
            .file_names()
            .find(|name| name.eq_ignore_ascii_case(MANIFEST_PATH))
            .map(str::to_string)
        else {
            return Ok(ManifestLookup::Missing {
                reason: format!("no {MANIFEST_PATH} entry"),
            });
        };

        let entry = match archive.by_name(&name) {
            Ok(entry) => entry,
            Err(ZipError::Io(e)) => return Err(io_error(e)),
            Err(e) => {
                return Ok(ManifestLookup::Missing {
                    reason: format!("unreadable {MANIFEST_PATH}: {e}"),
                })
            }
        };
        let Some(bytes) = read_capped(entry, MAX_MANIFEST_SIZE).map_err(io_error)? else {
            return Err(ReadError::Manifest {
                path: path.to_path_buf(),
                source: ManifestError::Invalid(format!(
                    "{MANIFEST_PATH} is larger than {MAX_MANIFEST_SIZE} bytes"
                )),
            });
        };

        let manifest = Manifest::from_bytes(&bytes).map_err(|source| ReadError::Manifest {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), headers = manifest.headers().count(), "Manifest read");
        Ok(ManifestLookup::Found(manifest))
    }
}

/// Reads all of `source`, or returns `None` if it holds more than `limit` bytes.
fn read_capped<R: Read>(source: R, limit: u64) -> std::io::Result<Option<Vec<u8>>> {
    let mut bytes = Vec::new();
    source.take(limit + 1).read_to_end(&mut bytes)?;
    if bytes.len() as u64 > limit {
        return Ok(None);
    }
    Ok(Some(bytes))
}

#[async_trait]
impl BundleReader for JarReader {
    fn format_id(&self) -> &str {
        "jar"
    }

    fn can_handle(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(".jar"))
    }

    async fn read_manifest(&self, path: &Path) -> Result<ManifestLookup, ReadError> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::read_manifest_blocking(&path))
            .await
            .map_err(|e| ReadError::Task(format!("Task join error: {}", e)))?
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn write_jar(path: &Path, entries: &[(&str, &str)]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        for (name, content) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[tokio::test]
    async fn test_reads_manifest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ok.jar");
        write_jar(
            &path,
            &[
                ("META-INF/MANIFEST.MF", "Manifest-Version: 1.0\r\nBundle-SymbolicName: a.b\r\n"),
                ("a/b/C.class", "\u{0}"),
            ],
        );

        let lookup = JarReader::new().read_manifest(&path).await.unwrap();

        match lookup {
            ManifestLookup::Found(manifest) => {
                assert_eq!(manifest.get("Bundle-SymbolicName"), Some("a.b"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_manifest_name_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lower.jar");
        write_jar(&path, &[("meta-inf/manifest.mf", "Bundle-Version: 2\n")]);

        let lookup = JarReader::new().read_manifest(&path).await.unwrap();

        assert!(matches!(lookup, ManifestLookup::Found(_)));
    }

    #[tokio::test]
    async fn test_missing_manifest_and_non_zip() {
        let dir = TempDir::new().unwrap();
        let no_manifest = dir.path().join("plain.jar");
        write_jar(&no_manifest, &[("readme.txt", "hi")]);
        let garbage = dir.path().join("garbage.jar");
        std::fs::write(&garbage, b"definitely not a zip").unwrap();

        let reader = JarReader::new();
        let first = reader.read_manifest(&no_manifest).await.unwrap();
        let second = reader.read_manifest(&garbage).await.unwrap();

        assert!(matches!(first, ManifestLookup::Missing { .. }));
        assert!(matches!(second, ManifestLookup::Missing { .. }));
    }

    #[tokio::test]
    async fn test_unreadable_file_is_io_error() {
        let result = JarReader::new()
            .read_manifest(Path::new("/nonexistent/dir/x.jar"))
            .await;
        assert!(matches!(result, Err(ReadError::Io { .. })));
    }

    #[test]
    fn test_malformed_manifest_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.jar");
        write_jar(&path, &[("META-INF/MANIFEST.MF", " dangling continuation\n")]);

        let result = JarReader::read_manifest_blocking(&path);

        assert!(matches!(result, Err(ReadError::Manifest { .. })));
    }

    #[test]
    fn test_can_handle_jar_names() {
        let reader = JarReader::new();
        assert!(reader.can_handle(Path::new("/repo/org.example_1.0.jar")));
        assert!(!reader.can_handle(Path::new("/repo/notes.txt")));
        assert!(!reader.can_handle(Path::new("/repo/archive.jar.sha1")));
        assert_eq!(reader.format_id(), "jar");
    }

    #[test]
    fn test_read_capped_rejects_oversized_input() {
        assert_eq!(read_capped(&b"12345"[..], 5).unwrap(), Some(b"12345".to_vec()));
        assert_eq!(read_capped(&b"123456"[..], 5).unwrap(), None);
    }

    #[test]
    fn test_oversized_manifest_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("huge.jar");
        let mut manifest = String::from("Bundle-SymbolicName: huge\n");
        let filler = format!("X-Filler: {}\n", "a".repeat(1000));
        while (manifest.len() as u64) <= MAX_MANIFEST_SIZE {
            manifest.push_str(&filler);
        }
        write_jar(&path, &[("META-INF/MANIFEST.MF", &manifest)]);

        let result = JarReader::read_manifest_blocking(&path);

        assert!(matches!(
            result,
            Err(ReadError::Manifest {
                source: ManifestError::Invalid(_),
                ..
            })
        ));
    }
}
