//! OSGi bundle metadata: the structured view of a jar manifest.
//!
//! This module turns raw `META-INF/MANIFEST.MF` text into the requirement and
//! capability objects the harvester interprets:
//! - **Manifest**: main-section header parsing via [`Manifest`]
//! - **Headers**: the `path;attr=value;dir:=value, ...` clause grammar
//! - **Versions**: [`Version`] and [`VersionRange`]
//! - **Parser**: [`ManifestParser`] producing a [`ParsedBundle`]

pub mod header;
pub mod manifest;
pub mod parser;
pub mod version;

use thiserror::Error;

use crate::filter::FilterParseError;

pub use header::{Clause, HeaderValue};
pub use manifest::Manifest;
pub use parser::{AttributeValue, Capability, ManifestParser, ParsedBundle, Requirement};
pub use version::{Version, VersionRange};

/// Namespace of package import/export wiring.
pub const PACKAGE_NAMESPACE: &str = "osgi.wiring.package";

/// Namespace of `Require-Bundle` wiring and the bundle capability.
pub const BUNDLE_NAMESPACE: &str = "osgi.wiring.bundle";

/// Namespace of fragment attachment.
pub const HOST_NAMESPACE: &str = "osgi.wiring.host";

/// Errors raised for manifests the parser rejects.
///
/// Every variant describes a malformed bundle; none of them is an I/O error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ManifestError {
    /// The manifest text itself is not a valid `Name: value` section
    #[error("Invalid manifest line {line}: {reason}")]
    Syntax { line: usize, reason: String },

    /// A header value does not follow the clause grammar
    #[error("Malformed '{header}' header: {reason}")]
    MalformedHeader { header: String, reason: String },

    /// A version or version range could not be parsed
    #[error("Invalid version '{value}'")]
    InvalidVersion { value: String },

    /// A `filter` directive is not a valid filter expression
    #[error(transparent)]
    InvalidFilter(#[from] FilterParseError),

    /// The manifest violates a bundle-level rule
    #[error("Invalid bundle metadata: {0}")]
    Invalid(String),
}

impl ManifestError {
    pub(crate) fn header(header: &str, reason: impl Into<String>) -> Self {
        Self::MalformedHeader {
            header: header.to_string(),
            reason: reason.into(),
        }
    }
}
