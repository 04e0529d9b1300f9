//! Bundle aggregation: routes a parsed bundle's wiring entries by namespace.

use tracing::debug;

use super::traits::DiagnosticSink;
use crate::model::{BundleRecord, ExportRecord, ImportRecord};
use crate::osgi::{ParsedBundle, PACKAGE_NAMESPACE};

impl BundleRecord {
    /// Builds the record of one parsed bundle.
    ///
    /// Package requirements and capabilities are interpreted; everything else
    /// is carried over untouched in the `unrecognized_*` lists. A legacy
    /// bundle without a symbolic name gets an empty name.
    pub fn from_parsed(parsed: ParsedBundle, sink: &dyn DiagnosticSink) -> Self {
        let mut record = Self::new(
            parsed.symbolic_name.unwrap_or_default(),
            parsed.version.to_string(),
        );

        for requirement in parsed.requirements {
            if requirement.namespace == PACKAGE_NAMESPACE {
                if let Some(filter) = &requirement.filter {
                    record
                        .imports
                        .push(ImportRecord::from_filter(filter, &requirement.directives));
                    continue;
                }
            }
            record.unrecognized_requirements.push(requirement);
        }

        for capability in parsed.capabilities {
            if capability.namespace == PACKAGE_NAMESPACE {
                record.exports.push(ExportRecord::classify(
                    &capability.attributes,
                    &capability.directives,
                    sink,
                ));
            } else {
                record.unrecognized_capabilities.push(capability);
            }
        }

        debug!(
            bundle = %record.name,
            version = %record.version,
            imports = record.imports.len(),
            exports = record.exports.len(),
            other_requirements = record.unrecognized_requirements.len(),
            other_capabilities = record.unrecognized_capabilities.len(),
            "Bundle aggregated"
        );
        record
    }
}
