//! Error and diagnostic types shared by the harvest stages.
//!
//! - Fatal failures surface as [`HarvestError`]
//! - Non-fatal findings go to a caller-supplied [`DiagnosticSink`] instead of
//!   a process-wide logger

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;
use tracing::warn;

use crate::osgi::ManifestError;
use crate::traits::ReadError;

// ============================================================================
// Diagnostics
// ============================================================================

/// A non-fatal finding reported while harvesting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// An export carried directives other than `uses` and `mandatory`
    UnknownDirectives {
        package: Option<String>,
        directives: BTreeMap<String, String>,
    },

    /// A scanned archive has no manifest (or is not a readable archive)
    NoManifest { path: PathBuf, reason: String },

    /// A malformed bundle was skipped under the skip policy
    SkippedBundle { path: PathBuf, reason: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownDirectives {
                package,
                directives,
            } => {
                write!(
                    f,
                    "Unknown directives on export of '{}':",
                    package.as_deref().unwrap_or_default()
                )?;
                for (key, value) in directives {
                    write!(f, " {key}={value}")?;
                }
                Ok(())
            }
            Self::NoManifest { path, reason } => {
                write!(f, "No manifest in '{}': {reason}", path.display())
            }
            Self::SkippedBundle { path, reason } => {
                write!(f, "Skipped bundle '{}': {reason}", path.display())
            }
        }
    }
}

/// Receiver of [`Diagnostic`]s.
///
/// # Thread Safety
///
/// Sinks are shared by concurrent harvest tasks and must be `Send + Sync`.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Logs every diagnostic as a `tracing` warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        warn!("{}", diagnostic);
    }
}

/// Buffers diagnostics for later inspection.
#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns everything reported so far, in report order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .map(|d| d.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match self.diagnostics.lock() {
            Ok(mut d) => d.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that abort the harvest of one bundle.
#[derive(Error, Debug)]
pub enum HarvestError {
    /// The manifest was found but rejected by the metadata parser
    #[error("Malformed bundle '{path}': {source}", path = path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },

    /// Reading the archive failed
    #[error(transparent)]
    Read(#[from] ReadError),

    /// Reading the archive exceeded the per-bundle timeout
    #[error("Harvest of '{path}' timed out after {timeout_secs}s", path = path.display())]
    Timeout { path: PathBuf, timeout_secs: u64 },

    /// A blocking task panicked or was cancelled
    #[error("Harvest task failed: {0}")]
    Task(String),
}

impl HarvestError {
    /// Whether the skip policy may continue past this error.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::Malformed { .. } | Self::Read(ReadError::Manifest { .. })
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
