//! Capability classification: attribute/directive maps → [`ExportRecord`].

use std::collections::BTreeMap;

use super::traits::{Diagnostic, DiagnosticSink};
use crate::model::ExportRecord;
use crate::osgi::{AttributeValue, PACKAGE_NAMESPACE};

impl ExportRecord {
    /// Partitions a package capability into well-known fields and extras.
    ///
    /// `bundle-symbolic-name` and `bundle-version` are dropped since the
    /// owning bundle already carries them. The `mandatory` directive is folded
    /// into the extra attributes; directives other than `uses` and
    /// `mandatory` are reported to `sink` and otherwise ignored.
    pub fn classify(
        attributes: &BTreeMap<String, AttributeValue>,
        directives: &BTreeMap<String, String>,
        sink: &dyn DiagnosticSink,
    ) -> Self {
        let mut record = Self::default();
        for (key, value) in attributes {
            match key.as_str() {
                "bundle-symbolic-name" | "bundle-version" => {}
                PACKAGE_NAMESPACE => record.package_name = Some(value.to_string()),
                "version" => record.version = Some(value.to_string()),
                _ => {
                    record.extra_attributes.insert(key.clone(), value.to_string());
                }
            }
        }

        let mut remaining = directives.clone();
        if let Some(uses) = remaining.remove("uses") {
            record.uses = split_uses(&uses);
        }
        if let Some(mandatory) = remaining.remove("mandatory") {
            record
                .extra_attributes
                .insert("mandatory".to_string(), mandatory);
        }

        if !remaining.is_empty() {
            sink.report(Diagnostic::UnknownDirectives {
                package: record.package_name.clone(),
                directives: remaining,
            });
        }
        record
    }
}

/// Splits a `uses` list on commas. Interior empty items are kept, trailing
/// ones are dropped.
fn split_uses(uses: &str) -> Vec<String> {
    let mut packages: Vec<String> = uses.split(',').map(|p| p.trim().to_string()).collect();
    while packages.last().is_some_and(String::is_empty) {
        packages.pop();
    }
    packages
}
