//! Requirement interpretation: filter tree → [`ImportRecord`].
//!
//! Import filters produced for `Import-Package` have a small number of
//! shapes. The recognized ones are:
//! - `(osgi.wiring.package=p)`: any version
//! - `(&(osgi.wiring.package=p)(version>=a)(!(version>=b))(..))`: bounded,
//!   with any further conjuncts kept as extra selectors
//!
//! Every other shape is kept verbatim as the unparsed expression.

use std::collections::BTreeMap;

use crate::filter::FilterNode;
use crate::model::{ImportRecord, ANY_VERSION};
use crate::osgi::PACKAGE_NAMESPACE;

const VERSION_ATTRIBUTE: &str = "version";

impl ImportRecord {
    /// Interprets a package requirement's filter and directives.
    ///
    /// Within an `&` node a later conjunct overwrites an earlier one that set
    /// the same field. An `&` that never names the package is treated as
    /// unrecognized.
    pub fn from_filter(filter: &FilterNode, directives: &BTreeMap<String, String>) -> Self {
        let mut record = match filter {
            FilterNode::And(children) => {
                let record = interpret_conjunction(children);
                if record.package_name.is_some() {
                    record
                } else {
                    unparsed(filter)
                }
            }
            FilterNode::Equal { attr, value } if attr == PACKAGE_NAMESPACE => Self {
                package_name: Some(value.clone()),
                min_version: Some(ANY_VERSION.to_string()),
                max_version: Some(ANY_VERSION.to_string()),
                ..Self::default()
            },
            _ => unparsed(filter),
        };
        record.optional = directives.get("resolution").map(String::as_str) == Some("optional");
        record
    }
}

fn unparsed(filter: &FilterNode) -> ImportRecord {
    ImportRecord {
        unparsed_expression: Some(filter.to_string()),
        ..ImportRecord::default()
    }
}

fn interpret_conjunction(children: &[FilterNode]) -> ImportRecord {
    let mut record = ImportRecord::default();
    for child in children {
        match child {
            FilterNode::Equal { attr, value } if attr == PACKAGE_NAMESPACE => {
                record.package_name = Some(value.clone());
            }
            FilterNode::GreaterEqual { attr, value } if attr == VERSION_ATTRIBUTE => {
                record.min_version = Some(value.clone());
            }
            FilterNode::Not(inner) => match inner.as_ref() {
                FilterNode::GreaterEqual { attr, value } if attr == VERSION_ATTRIBUTE => {
                    record.max_version = Some(value.clone());
                }
                _ => record.extra_selectors.push(child.to_string()),
            },
            _ => record.extra_selectors.push(child.to_string()),
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_directives() -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn optional() -> BTreeMap<String, String> {
        BTreeMap::from([("resolution".to_string(), "optional".to_string())])
    }

    fn parse(s: &str) -> FilterNode {
        s.parse().unwrap()
    }

    #[test]
    fn test_bounded_import() {
        let filter = FilterNode::And(vec![
            FilterNode::equal(PACKAGE_NAMESPACE, "org.example"),
            FilterNode::greater_equal("version", "1.0.0"),
            FilterNode::not(FilterNode::greater_equal("version", "2.0.0")),
        ]);
        let record = ImportRecord::from_filter(&filter, &no_directives());

        assert_eq!(
            record,
            ImportRecord {
                package_name: Some("org.example".to_string()),
                min_version: Some("1.0.0".to_string()),
                max_version: Some("2.0.0".to_string()),
                extra_selectors: vec![],
                unparsed_expression: None,
                optional: false,
            }
        );
    }

    #[test]
    fn test_bare_package_accepts_any_version() {
        let filter = FilterNode::equal(PACKAGE_NAMESPACE, "org.example");
        let record = ImportRecord::from_filter(&filter, &no_directives());

        assert_eq!(record.package_name.as_deref(), Some("org.example"));
        assert_eq!(record.min_version.as_deref(), Some(ANY_VERSION));
        assert_eq!(record.max_version.as_deref(), Some(ANY_VERSION));
        assert!(record.unparsed_expression.is_none());
    }

    #[test]
    fn test_unrecognized_conjuncts_become_extra_selectors() {
        let filter = parse(
            "(&(osgi.wiring.package=org.a)(!(version<=1.0.0))(version<=3.0.0)(vendor=acme)(bundle-version>=2.0.0)(&(x=y)))",
        );
        let record = ImportRecord::from_filter(&filter, &no_directives());

        assert_eq!(record.package_name.as_deref(), Some("org.a"));
        assert_eq!(record.min_version, None);
        assert_eq!(record.max_version, None);
        assert_eq!(
            record.extra_selectors,
            [
                "(!(version<=1.0.0))",
                "(version<=3.0.0)",
                "(vendor=acme)",
                "(bundle-version>=2.0.0)",
                "(&(x=y))",
            ]
        );
    }

    #[test]
    fn test_last_conjunct_wins() {
        let filter = parse(
            "(&(osgi.wiring.package=a)(version>=1.0.0)(version>=1.5.0)(osgi.wiring.package=b))",
        );
        let record = ImportRecord::from_filter(&filter, &no_directives());
        assert_eq!(record.package_name.as_deref(), Some("b"));
        assert_eq!(record.min_version.as_deref(), Some("1.5.0"));
    }

    #[test]
    fn test_unrecognized_roots_are_kept_verbatim() {
        for text in [
            "(|(osgi.wiring.package=a)(osgi.wiring.package=b))",
            "(!(osgi.wiring.package=a))",
            "(version>=1.0.0)",
            "(osgi.wiring.package=org.dyn.*)",
            "(osgi.wiring.package=*)",
            "(&(version>=1.0.0)(vendor=acme))",
        ] {
            let filter = parse(text);
            let record = ImportRecord::from_filter(&filter, &no_directives());

            assert_eq!(record.package_name, None, "{text}");
            assert_eq!(record.min_version, None);
            assert_eq!(record.max_version, None);
            assert!(record.extra_selectors.is_empty());
            let expression = record.unparsed_expression.unwrap();
            assert_eq!(expression, text);
            assert_eq!(parse(&expression), filter);
        }
    }

    #[test]
    fn test_optional_follows_resolution_directive() {
        let shapes = [
            parse("(osgi.wiring.package=a)"),
            parse("(&(osgi.wiring.package=a)(version>=1.0.0))"),
            parse("(|(a=b)(c=d))"),
        ];
        for filter in &shapes {
            assert!(ImportRecord::from_filter(filter, &optional()).optional);
            assert!(!ImportRecord::from_filter(filter, &no_directives()).optional);
        }

        let dynamic = BTreeMap::from([("resolution".to_string(), "dynamic".to_string())]);
        assert!(!ImportRecord::from_filter(&shapes[0], &dynamic).optional);
    }
}
