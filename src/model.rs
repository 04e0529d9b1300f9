use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::osgi::{Capability, Requirement};

/// Version bound recorded for an import that carries no version filter.
pub const ANY_VERSION: &str = "<any>";

/// One `Import-Package` style requirement, flattened.
///
/// Either `package_name` is set (with optional bounds and extra selectors) or
/// the filter shape was not recognized and only `unparsed_expression` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub package_name: Option<String>,
    /// Inclusive lower bound
    pub min_version: Option<String>,
    /// Boundary of `!(version>=X)`: the import accepts versions strictly below it
    pub max_version: Option<String>,
    pub extra_selectors: Vec<String>,
    pub unparsed_expression: Option<String>,
    pub optional: bool,
}

/// One `Export-Package` style capability, flattened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub package_name: Option<String>,
    pub version: Option<String>,
    pub extra_attributes: BTreeMap<String, String>,
    pub uses: Vec<String>,
}

/// Everything harvested from one bundle.
///
/// Built once by [`BundleRecord::from_parsed`](crate::harvest::bundle) and
/// handed to the reporter as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleRecord {
    pub name: String,
    pub version: String,
    pub imports: Vec<ImportRecord>,
    pub exports: Vec<ExportRecord>,
    /// Requirements outside the package namespace, kept verbatim
    pub unrecognized_requirements: Vec<Requirement>,
    /// Capabilities outside the package namespace, kept verbatim
    pub unrecognized_capabilities: Vec<Capability>,
}

impl BundleRecord {
    /// Creates a record with no wiring entries.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            imports: Vec::new(),
            exports: Vec::new(),
            unrecognized_requirements: Vec::new(),
            unrecognized_capabilities: Vec::new(),
        }
    }
}
