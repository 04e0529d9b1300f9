use crate::harvest::traits::{Diagnostic, DiagnosticSink, HarvestError};
use crate::model::BundleRecord;
use crate::osgi::ManifestParser;
use crate::traits::{BundleReader, ManifestLookup};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, info, instrument};

/// Runs per-bundle harvests with a bounded number in flight.
pub struct HarvesterExecutor {
    semaphore: Arc<Semaphore>,
    parser: ManifestParser,
    bundle_timeout: Duration,
}

impl HarvesterExecutor {
    pub fn new(concurrency_limit: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency_limit.max(1))),
            parser: ManifestParser::new(),
            bundle_timeout: Duration::from_secs(300),
        }
    }

    /// Sets the time one bundle may take once it holds a permit.
    pub fn with_timeout(mut self, bundle_timeout: Duration) -> Self {
        self.bundle_timeout = bundle_timeout;
        self
    }

    /// Harvests one archive: read the manifest, parse it, aggregate the record.
    ///
    /// Returns `Ok(None)` when the archive carries no manifest; that case is
    /// reported to `sink` as [`Diagnostic::NoManifest`].
    #[instrument(skip(self, reader, path, sink), fields(path = %path.display()))]
    pub async fn execute<R>(
        &self,
        reader: Arc<R>,
        path: PathBuf,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<Option<BundleRecord>, HarvestError>
    where
        R: BundleReader + 'static,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| HarvestError::Task(format!("Semaphore error: {}", e)))?;

        debug!("Starting harvest for format: {}", reader.format_id());

        let lookup = timeout(self.bundle_timeout, reader.read_manifest(&path))
            .await
            .map_err(|_| HarvestError::Timeout {
                path: path.clone(),
                timeout_secs: self.bundle_timeout.as_secs(),
            })??;
        let manifest = match lookup {
            ManifestLookup::Found(manifest) => manifest,
            ManifestLookup::Missing { reason } => {
                sink.report(Diagnostic::NoManifest { path, reason });
                return Ok(None);
            }
        };

        let parsed = self
            .parser
            .parse(&manifest)
            .map_err(|source| HarvestError::Malformed {
                path: path.clone(),
                source,
            })?;
        let record = BundleRecord::from_parsed(parsed, sink.as_ref());

        info!(
            bundle = %record.name,
            imports = record.imports.len(),
            exports = record.exports.len(),
            "Finished harvest"
        );
        Ok(Some(record))
    }
}

impl Default for HarvesterExecutor {
    fn default() -> Self {
        Self::new(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::traits::CollectingSink;
    use crate::osgi::Manifest;
    use crate::traits::ReadError;
    use async_trait::async_trait;
    use std::path::Path;

    struct StaticReader(Option<&'static str>);

    #[async_trait]
    impl BundleReader for StaticReader {
        fn format_id(&self) -> &str {
            "static"
        }

        fn can_handle(&self, _path: &Path) -> bool {
            true
        }

        async fn read_manifest(&self, _path: &Path) -> Result<ManifestLookup, ReadError> {
            Ok(match self.0 {
                Some(text) => ManifestLookup::Found(Manifest::parse(text).unwrap()),
                None => ManifestLookup::Missing {
                    reason: "no manifest".to_string(),
                },
            })
        }
    }

    #[tokio::test]
    async fn test_execute_builds_record() {
        let reader = Arc::new(StaticReader(Some(
            "Bundle-ManifestVersion: 2\nBundle-SymbolicName: org.a\nBundle-Version: 1.0\nImport-Package: org.b\n",
        )));
        let sink = Arc::new(CollectingSink::new());

        let record = HarvesterExecutor::new(2)
            .execute(reader, PathBuf::from("a.jar"), sink.clone())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.name, "org.a");
        assert_eq!(record.version, "1.0.0");
        assert_eq!(record.imports.len(), 1);
        assert!(sink.diagnostics().is_empty());
    }

    #[tokio::test]
    async fn test_missing_manifest_is_reported() {
        let sink = Arc::new(CollectingSink::new());

        let result = HarvesterExecutor::default()
            .execute(
                Arc::new(StaticReader(None)),
                PathBuf::from("plain.jar"),
                sink.clone(),
            )
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(
            sink.diagnostics(),
            [Diagnostic::NoManifest {
                path: PathBuf::from("plain.jar"),
                reason: "no manifest".to_string(),
            }]
        );
    }

    struct StuckReader;

    #[async_trait]
    impl BundleReader for StuckReader {
        fn format_id(&self) -> &str {
            "stuck"
        }

        fn can_handle(&self, _path: &Path) -> bool {
            true
        }

        async fn read_manifest(&self, _path: &Path) -> Result<ManifestLookup, ReadError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(ManifestLookup::Missing {
                reason: "never".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_slow_read_times_out() {
        let err = HarvesterExecutor::new(1)
            .with_timeout(Duration::from_millis(20))
            .execute(
                Arc::new(StuckReader),
                PathBuf::from("slow.jar"),
                Arc::new(CollectingSink::new()),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, HarvestError::Timeout { .. }));
        assert!(!err.is_malformed());
    }

    #[tokio::test]
    async fn test_malformed_manifest_is_error() {
        let reader = Arc::new(StaticReader(Some(
            "Bundle-ManifestVersion: 2\nBundle-SymbolicName: org.a\nImport-Package: java.lang\n",
        )));

        let err = HarvesterExecutor::new(1)
            .execute(reader, PathBuf::from("bad.jar"), Arc::new(CollectingSink::new()))
            .await
            .unwrap_err();

        assert!(err.is_malformed());
    }
}
