//! Tabular export of harvested bundles.
//!
//! Every import and every export becomes one row of nine fields:
//!
//! ```text
//! bundle  version  package  relation  min  max  other-constraints  optional  note
//! ```
//!
//! Rows are written tab-separated (no header, LF line endings) or as JSON
//! lines with the same fields. Requirements and capabilities outside the
//! package namespace never produce rows.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::model::{BundleRecord, ExportRecord, ImportRecord};

/// Output encoding of the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    /// Tab-separated rows
    #[default]
    Tsv,
    /// One JSON object per row
    Json,
}

/// Direction of a package wiring row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    Import,
    Export,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Import => write!(f, "import"),
            Self::Export => write!(f, "export"),
        }
    }
}

/// One output row. Absent values are empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub bundle_name: String,
    pub bundle_version: String,
    pub package_name: String,
    pub relation: Relation,
    pub min_version: String,
    pub max_version: String,
    pub other_constraints: String,
    pub optional: bool,
    pub note: String,
}

impl ReportRow {
    fn import(bundle: &BundleRecord, import: &ImportRecord) -> Self {
        Self {
            bundle_name: bundle.name.clone(),
            bundle_version: bundle.version.clone(),
            package_name: import.package_name.clone().unwrap_or_default(),
            relation: Relation::Import,
            min_version: import.min_version.clone().unwrap_or_default(),
            max_version: import.max_version.clone().unwrap_or_default(),
            other_constraints: render_list(&import.extra_selectors),
            optional: import.optional,
            note: import.unparsed_expression.clone().unwrap_or_default(),
        }
    }

    fn export(bundle: &BundleRecord, export: &ExportRecord) -> Self {
        let version = export.version.clone().unwrap_or_default();
        Self {
            bundle_name: bundle.name.clone(),
            bundle_version: bundle.version.clone(),
            package_name: export.package_name.clone().unwrap_or_default(),
            relation: Relation::Export,
            min_version: version.clone(),
            max_version: version,
            other_constraints: render_map(&export.extra_attributes),
            optional: false,
            note: render_list(&export.uses),
        }
    }

    /// Renders the row as one tab-separated line, including the newline.
    pub fn to_tsv_line(&self) -> String {
        let relation = self.relation.to_string();
        let optional = self.optional.to_string();
        let fields: [&str; 9] = [
            &self.bundle_name,
            &self.bundle_version,
            &self.package_name,
            &relation,
            &self.min_version,
            &self.max_version,
            &self.other_constraints,
            &optional,
            &self.note,
        ];
        let mut line = fields.join("\t");
        line.push('\n');
        line
    }
}

/// `[a, b]`
fn render_list(items: &[String]) -> String {
    format!("[{}]", items.join(", "))
}

/// `{k=v, k2=v2}`, keys sorted
fn render_map(map: &BTreeMap<String, String>) -> String {
    let entries: Vec<String> = map.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{{{}}}", entries.join(", "))
}

/// Serializes bundle records; the only writer of its output stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct TabularReporter {
    format: ReportFormat,
}

impl TabularReporter {
    pub fn new(format: ReportFormat) -> Self {
        Self { format }
    }

    /// Rows of one bundle: all imports, then all exports, in record order.
    pub fn rows(bundle: &BundleRecord) -> Vec<ReportRow> {
        bundle
            .imports
            .iter()
            .map(|import| ReportRow::import(bundle, import))
            .chain(
                bundle
                    .exports
                    .iter()
                    .map(|export| ReportRow::export(bundle, export)),
            )
            .collect()
    }

    /// Writes every bundle's rows to `out`, bundles in the given order.
    ///
    /// Returns the number of rows written.
    pub fn write<W: Write>(&self, bundles: &[BundleRecord], out: &mut W) -> io::Result<usize> {
        let mut count = 0;
        for bundle in bundles {
            for row in Self::rows(bundle) {
                match self.format {
                    ReportFormat::Tsv => out.write_all(row.to_tsv_line().as_bytes())?,
                    ReportFormat::Json => {
                        serde_json::to_writer(&mut *out, &row)?;
                        out.write_all(b"\n")?;
                    }
                }
                count += 1;
            }
        }
        Ok(count)
    }

    /// Writes the report to `path`, creating parent directories.
    ///
    /// Returns the absolute path of the written file.
    ///
    /// # Errors
    ///
    /// Any I/O error aborts the write; the partially written file is left as is.
    pub fn write_to_path(&self, bundles: &[BundleRecord], path: &Path) -> io::Result<PathBuf> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut out = BufWriter::new(File::create(&path)?);
        let rows = self.write(bundles, &mut out)?;
        out.flush()?;

        info!(path = %path.display(), rows, format = ?self.format, "Report written");
        Ok(path)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bundle() -> BundleRecord {
        let mut bundle = BundleRecord::new("B", "1.0");
        bundle.imports.push(ImportRecord {
            package_name: Some("p".to_string()),
            min_version: Some("1.0.0".to_string()),
            max_version: Some("2.0.0".to_string()),
            ..ImportRecord::default()
        });
        bundle.exports.push(ExportRecord {
            package_name: Some("p".to_string()),
            version: Some("1.0.0".to_string()),
            uses: vec!["q".to_string()],
            ..ExportRecord::default()
        });
        bundle
    }

    fn render(reporter: TabularReporter, bundles: &[BundleRecord]) -> String {
        let mut out = Vec::new();
        reporter.write(bundles, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_end_to_end_rows() {
        let text = render(TabularReporter::default(), &[sample_bundle()]);
        assert_eq!(
            text,
            "B\t1.0\tp\timport\t1.0.0\t2.0.0\t[]\tfalse\t\n\
             B\t1.0\tp\texport\t1.0.0\t1.0.0\t{}\tfalse\t[q]\n"
        );
    }

    #[test]
    fn test_unparsed_import_and_extras() {
        let mut bundle = BundleRecord::new("B", "2.0.0");
        bundle.imports.push(ImportRecord {
            unparsed_expression: Some("(|(a=b)(c=d))".to_string()),
            optional: true,
            ..ImportRecord::default()
        });
        bundle.imports.push(ImportRecord {
            package_name: Some("p".to_string()),
            extra_selectors: vec!["(vendor=acme)".to_string(), "(x=y)".to_string()],
            ..ImportRecord::default()
        });
        bundle.exports.push(ExportRecord {
            package_name: Some("e".to_string()),
            extra_attributes: BTreeMap::from([
                ("mandatory".to_string(), "vendor".to_string()),
                ("vendor".to_string(), "acme".to_string()),
            ]),
            ..ExportRecord::default()
        });

        let lines: Vec<String> = render(TabularReporter::default(), &[bundle])
            .lines()
            .map(str::to_string)
            .collect();
        assert_eq!(lines[0], "B\t2.0.0\t\timport\t\t\t[]\ttrue\t(|(a=b)(c=d))");
        assert_eq!(lines[1], "B\t2.0.0\tp\timport\t\t\t[(vendor=acme), (x=y)]\tfalse\t");
        assert_eq!(
            lines[2],
            "B\t2.0.0\te\texport\t\t\t{mandatory=vendor, vendor=acme}\tfalse\t[]"
        );
    }

    #[test]
    fn test_rows_follow_bundle_order_and_skip_unrecognized() {
        let mut first = BundleRecord::new("first", "1.0.0");
        first.exports.push(ExportRecord::default());
        first.imports.push(ImportRecord {
            package_name: Some("i".to_string()),
            ..ImportRecord::default()
        });
        first.unrecognized_capabilities.push(crate::osgi::Capability {
            namespace: "osgi.wiring.bundle".to_string(),
            directives: BTreeMap::new(),
            attributes: BTreeMap::new(),
        });
        let second = sample_bundle();

        let rows: Vec<ReportRow> = [first, second].iter().flat_map(TabularReporter::rows).collect();
        let summary: Vec<(&str, Relation)> = rows
            .iter()
            .map(|r| (r.bundle_name.as_str(), r.relation))
            .collect();
        assert_eq!(
            summary,
            [
                ("first", Relation::Import),
                ("first", Relation::Export),
                ("B", Relation::Import),
                ("B", Relation::Export),
            ]
        );
    }

    #[test]
    fn test_output_is_idempotent() {
        let bundles = vec![sample_bundle(), sample_bundle()];
        for format in [ReportFormat::Tsv, ReportFormat::Json] {
            let reporter = TabularReporter::new(format);
            assert_eq!(render(reporter, &bundles), render(reporter, &bundles));
        }
    }

    #[test]
    fn test_json_lines() {
        let text = render(TabularReporter::new(ReportFormat::Json), &[sample_bundle()]);
        let rows: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["relation"], "import");
        assert_eq!(rows[0]["max_version"], "2.0.0");
        assert_eq!(rows[0]["optional"], false);
        assert_eq!(rows[1]["note"], "[q]");
    }

    #[test]
    fn test_write_to_path_creates_parents() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("nested/out/osgi.csv");

        let written = TabularReporter::default()
            .write_to_path(&[sample_bundle()], &target)
            .unwrap();

        assert_eq!(written, target);
        let text = std::fs::read_to_string(&written).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
