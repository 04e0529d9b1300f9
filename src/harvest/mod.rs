//! Harvest module - bundle wiring extraction pipeline.
//!
//! This module provides the core of the harvester:
//! - **Interpretation**: package requirements → [`ImportRecord`](crate::model::ImportRecord)
//! - **Classification**: package capabilities → [`ExportRecord`](crate::model::ExportRecord)
//! - **Aggregation**: one [`BundleRecord`](crate::model::BundleRecord) per bundle
//! - **Formats**: archive readers such as [`JarReader`]
//! - **Pipeline**: async directory executor via [`pipeline::HarvestPipeline`]

pub mod bundle;
pub mod classify;
pub mod formats;
pub mod interpret;
pub mod pipeline;
pub mod traits;

// Re-export commonly used types
pub use traits::{CollectingSink, Diagnostic, DiagnosticSink, HarvestError, TracingSink};

pub use formats::JarReader;
pub use pipeline::{FailurePolicy, HarvestPipeline, HarvestResult, HarvestStats, PipelineError};
