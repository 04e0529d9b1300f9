//! Directory harvest pipeline.
//!
//! This module provides the [`HarvestPipeline`] coordinator that turns a
//! directory of bundle archives into [`BundleRecord`]s:
//! - Recursive scan via `walkdir`, sorted by file name
//! - One task per archive on the `tokio` runtime, bounded by
//!   [`HarvesterExecutor`]
//! - Results collected in scan order, whatever order tasks finish in
//! - A [`FailurePolicy`] deciding whether a malformed bundle aborts the run

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::executor::HarvesterExecutor;
use crate::harvest::traits::{Diagnostic, DiagnosticSink, HarvestError, TracingSink};
use crate::model::BundleRecord;
use crate::traits::BundleReader;

// ============================================================================
// Pipeline Types
// ============================================================================

/// What to do when a bundle's manifest is malformed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first malformed bundle and report nothing
    #[default]
    Abort,

    /// Report the bundle as skipped and continue with the rest
    Skip,
}

/// Complete harvest result with records and statistics.
#[derive(Debug)]
pub struct HarvestResult {
    /// Harvested bundles, in scan order
    pub bundles: Vec<BundleRecord>,

    /// Processing statistics
    pub stats: HarvestStats,
}

/// Statistics about the harvest operation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HarvestStats {
    /// Archives found by the scan
    pub jars_scanned: usize,

    /// Archives that produced a record
    pub bundles_harvested: usize,

    /// Archives without a manifest
    pub missing_manifest: usize,

    /// Malformed bundles skipped under [`FailurePolicy::Skip`]
    pub skipped: usize,

    /// Import rows across all records
    pub imports: usize,

    /// Export rows across all records
    pub exports: usize,

    /// Total time spent on the harvest (milliseconds)
    pub total_duration_ms: u64,
}

// ============================================================================
// Pipeline Errors
// ============================================================================

/// Errors that can occur during pipeline execution.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// The directory scan failed
    #[error("Scan failed: {0}")]
    Walk(#[from] walkdir::Error),

    /// A bundle harvest failed and the policy does not allow skipping it
    #[error(transparent)]
    Harvest(#[from] HarvestError),

    /// A spawned task panicked or was cancelled
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

// ============================================================================
// Pipeline Executor
// ============================================================================

/// Harvest pipeline over one bundle format.
///
/// # Example
///
/// ```ignore
/// use bundle_harvester::harvest::{FailurePolicy, HarvestPipeline, JarReader};
/// use std::path::Path;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pipeline = HarvestPipeline::new(JarReader::new())
///         .with_concurrency(8)
///         .with_timeout(Duration::from_secs(60))
///         .with_policy(FailurePolicy::Skip);
///
///     let result = pipeline.execute(Path::new("modules")).await?;
///     println!("Harvested {} bundles", result.stats.bundles_harvested);
///     Ok(())
/// }
/// ```
pub struct HarvestPipeline<R>
where
    R: BundleReader + 'static,
{
    reader: Arc<R>,

    /// Maximum number of bundles harvested at once (default: 4)
    concurrency: usize,

    /// Timeout for reading one bundle (default: 5 minutes)
    bundle_timeout: Duration,

    policy: FailurePolicy,

    sink: Arc<dyn DiagnosticSink>,
}

impl<R> HarvestPipeline<R>
where
    R: BundleReader + 'static,
{
    /// Creates a new pipeline with the given reader.
    ///
    /// Default configuration:
    /// - Concurrency: 4
    /// - Timeout: 5 minutes per bundle
    /// - Policy: [`FailurePolicy::Abort`]
    /// - Diagnostics: logged through [`TracingSink`]
    pub fn new(reader: R) -> Self {
        Self {
            reader: Arc::new(reader),
            concurrency: 4,
            bundle_timeout: Duration::from_secs(300),
            policy: FailurePolicy::default(),
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Sets the timeout for reading a single bundle.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.bundle_timeout = timeout;
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Routes non-fatal diagnostics to `sink` instead of the log.
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Lists the archives under `root` this pipeline's reader handles.
    ///
    /// Directories are walked recursively; entries are visited in file name
    /// order so the result is stable across runs. Symbolic links to files are
    /// included; links to directories are not descended into.
    pub async fn scan(&self, root: &Path) -> Result<Vec<PathBuf>, PipelineError> {
        let reader = Arc::clone(&self.reader);
        let root = root.to_path_buf();
        tokio::task::spawn_blocking(move || -> Result<Vec<PathBuf>, PipelineError> {
            let mut found = Vec::new();
            for entry in WalkDir::new(&root).sort_by_file_name() {
                let entry = entry?;
                // symlinked archives count; `Path::is_file` follows the link
                if entry.path().is_file() && reader.can_handle(entry.path()) {
                    found.push(entry.into_path());
                }
            }
            Ok(found)
        })
        .await?
    }

    /// Harvests every archive under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if:
    /// - The directory cannot be walked
    /// - A bundle cannot be read (I/O error, timeout)
    /// - A bundle is malformed and the policy is [`FailurePolicy::Abort`]
    ///
    /// Tasks still running when an error is returned are aborted.
    pub async fn execute(&self, root: &Path) -> Result<HarvestResult, PipelineError> {
        let start = Instant::now();
        let mut stats = HarvestStats::default();

        info!(root = %root.display(), format = self.reader.format_id(), "Starting scan");
        let paths = self.scan(root).await?;
        stats.jars_scanned = paths.len();
        debug!(archives = paths.len(), "Scan completed");

        let executor =
            Arc::new(HarvesterExecutor::new(self.concurrency).with_timeout(self.bundle_timeout));
        let handles: Vec<(PathBuf, JoinHandle<Result<Option<BundleRecord>, HarvestError>>)> =
            paths
                .into_iter()
                .map(|path| {
                    let executor = Arc::clone(&executor);
                    let reader = Arc::clone(&self.reader);
                    let sink = Arc::clone(&self.sink);
                    let task_path = path.clone();
                    let handle = tokio::spawn(async move {
                        executor.execute(reader, task_path, sink).await
                    });
                    (path, handle)
                })
                .collect();

        let mut bundles = Vec::with_capacity(handles.len());
        let mut pending = handles.into_iter();
        while let Some((path, handle)) = pending.next() {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    abort_all(pending);
                    return Err(e.into());
                }
            };

            match outcome {
                Ok(Some(record)) => {
                    stats.imports += record.imports.len();
                    stats.exports += record.exports.len();
                    bundles.push(record);
                }
                Ok(None) => stats.missing_manifest += 1,
                Err(err) if self.policy == FailurePolicy::Skip && err.is_malformed() => {
                    self.sink.report(Diagnostic::SkippedBundle {
                        path,
                        reason: err.to_string(),
                    });
                    stats.skipped += 1;
                }
                Err(err) => {
                    abort_all(pending);
                    return Err(err.into());
                }
            }
        }

        stats.bundles_harvested = bundles.len();
        stats.total_duration_ms = start.elapsed().as_millis() as u64;
        info!(
            bundles = stats.bundles_harvested,
            missing_manifest = stats.missing_manifest,
            skipped = stats.skipped,
            imports = stats.imports,
            exports = stats.exports,
            duration_ms = stats.total_duration_ms,
            "Harvest completed"
        );

        Ok(HarvestResult { bundles, stats })
    }
}

fn abort_all<T>(handles: impl Iterator<Item = (PathBuf, JoinHandle<T>)>) {
    for (_, handle) in handles {
        handle.abort();
    }
}

// ============================================================================
// Tests
// ============================================================================
