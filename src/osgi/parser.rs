//! Conversion of bundle manifest headers into requirements and capabilities.
//!
//! [`ManifestParser`] reads the wiring headers of a [`Manifest`] and yields a
//! [`ParsedBundle`]: the bundle identity plus typed [`Requirement`] and
//! [`Capability`] objects, each tagged with its namespace. Package imports
//! become requirements whose `filter` encodes the package name and version
//! range; package exports become capabilities carrying attribute maps.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use super::header::{parse_clauses, Clause, HeaderValue};
use super::{
    Manifest, ManifestError, Version, VersionRange, BUNDLE_NAMESPACE, HOST_NAMESPACE,
    PACKAGE_NAMESPACE,
};
use crate::filter::FilterNode;

const BUNDLE_MANIFEST_VERSION: &str = "Bundle-ManifestVersion";
const BUNDLE_SYMBOLIC_NAME: &str = "Bundle-SymbolicName";
const BUNDLE_VERSION: &str = "Bundle-Version";
const FRAGMENT_HOST: &str = "Fragment-Host";
const IMPORT_PACKAGE: &str = "Import-Package";
const DYNAMIC_IMPORT_PACKAGE: &str = "DynamicImport-Package";
const EXPORT_PACKAGE: &str = "Export-Package";
const REQUIRE_BUNDLE: &str = "Require-Bundle";
const REQUIRE_CAPABILITY: &str = "Require-Capability";
const PROVIDE_CAPABILITY: &str = "Provide-Capability";

const BUNDLE_SYMBOLIC_NAME_ATTRIBUTE: &str = "bundle-symbolic-name";
const BUNDLE_VERSION_ATTRIBUTE: &str = "bundle-version";
const VERSION_ATTRIBUTE: &str = "version";
const SPECIFICATION_VERSION_ATTRIBUTE: &str = "specification-version";

// ============================================================================
// Requirement / Capability Types
// ============================================================================

/// A typed attribute value of a capability or requirement.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    String(String),
    Version(Version),
    Long(i64),
    Double(f64),
    List(Vec<AttributeValue>),
}

impl AttributeValue {
    /// Converts a header attribute according to its declared type.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown types and values that do not parse as
    /// their declared type.
    pub fn from_header(header: &str, value: &HeaderValue) -> Result<Self, ManifestError> {
        let Some(type_name) = value.type_name.as_deref() else {
            return Ok(Self::String(value.value.clone()));
        };

        if let Some(element) = type_name.strip_prefix("List") {
            let element = match element.trim() {
                "" => "String",
                e => e
                    .strip_prefix('<')
                    .and_then(|e| e.strip_suffix('>'))
                    .map(str::trim)
                    .ok_or_else(|| {
                        ManifestError::header(header, format!("unknown type '{type_name}'"))
                    })?,
            };
            let items = value
                .value
                .split(',')
                .map(|item| Self::scalar(header, element, item.trim()))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Self::List(items));
        }
        Self::scalar(header, type_name, &value.value)
    }

    fn scalar(header: &str, type_name: &str, raw: &str) -> Result<Self, ManifestError> {
        let bad_value =
            || ManifestError::header(header, format!("'{raw}' is not a valid {type_name}"));
        match type_name {
            "String" => Ok(Self::String(raw.to_string())),
            "Version" => Ok(Self::Version(raw.parse()?)),
            "Long" => raw.trim().parse().map(Self::Long).map_err(|_| bad_value()),
            "Double" => raw.trim().parse().map(Self::Double).map_err(|_| bad_value()),
            other => Err(ManifestError::header(
                header,
                format!("unknown type '{other}'"),
            )),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Version(v) => write!(f, "{v}"),
            Self::Long(n) => write!(f, "{n}"),
            Self::Double(d) => write!(f, "{d:?}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// A consumer-side constraint declared by a bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct Requirement {
    pub namespace: String,
    pub directives: BTreeMap<String, String>,
    pub attributes: BTreeMap<String, AttributeValue>,
    /// Parsed form of the `filter` directive, when one is present
    pub filter: Option<FilterNode>,
}

/// A provider-side offer declared by a bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct Capability {
    pub namespace: String,
    pub directives: BTreeMap<String, String>,
    pub attributes: BTreeMap<String, AttributeValue>,
}

/// The structured view of one bundle manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBundle {
    /// `None` only for legacy (manifest version 1) bundles
    pub symbolic_name: Option<String>,
    pub version: Version,
    pub manifest_version: u8,
    pub requirements: Vec<Requirement>,
    pub capabilities: Vec<Capability>,
}

// ============================================================================
// Parser
// ============================================================================

/// Turns manifest headers into a [`ParsedBundle`].
///
/// The parser holds no state; one instance can be shared by every task.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestParser;

impl ManifestParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses the wiring headers of `manifest`.
    ///
    /// Requirements are ordered host, imports, required bundles, required
    /// capabilities, dynamic imports; capabilities are ordered bundle, host,
    /// exports, provided capabilities.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] when any header is malformed or the bundle
    /// breaks a wiring rule (importing or exporting `java.*`, importing a
    /// package twice, using `osgi.wiring.*` namespaces in generic headers).
    pub fn parse(&self, manifest: &Manifest) -> Result<ParsedBundle, ManifestError> {
        let manifest_version = manifest_version(manifest)?;
        let version = match manifest.get(BUNDLE_VERSION) {
            Some(raw) => raw.parse()?,
            None => Version::default(),
        };

        let symbolic = symbolic_name(manifest)?;
        if manifest_version >= 2 && symbolic.is_none() {
            return Err(ManifestError::Invalid(
                "manifest version 2 bundles must declare Bundle-SymbolicName".to_string(),
            ));
        }
        let symbolic_name = symbolic.as_ref().map(|(name, _)| name.clone());
        let host = fragment_host(manifest)?;

        let mut capabilities = Vec::new();
        if let Some((name, directives)) = &symbolic {
            capabilities.push(identity_capability(BUNDLE_NAMESPACE, name, &version, directives));
            let attachable =
                directives.get("fragment-attachment").map(String::as_str) != Some("never");
            if host.is_none() && attachable {
                capabilities.push(identity_capability(HOST_NAMESPACE, name, &version, directives));
            }
        }
        capabilities.extend(exports(
            manifest,
            manifest_version,
            symbolic_name.as_deref(),
            &version,
        )?);
        capabilities.extend(provided_capabilities(manifest)?);

        let mut requirements = Vec::new();
        requirements.extend(host);
        requirements.extend(imports(manifest, manifest_version)?);
        requirements.extend(required_bundles(manifest)?);
        requirements.extend(required_capabilities(manifest)?);
        requirements.extend(dynamic_imports(manifest)?);

        Ok(ParsedBundle {
            symbolic_name,
            version,
            manifest_version,
            requirements,
            capabilities,
        })
    }
}

fn clauses(manifest: &Manifest, header: &str) -> Result<Vec<Clause>, ManifestError> {
    match manifest.get(header) {
        Some(value) if !value.trim().is_empty() => parse_clauses(header, value),
        _ => Ok(Vec::new()),
    }
}

fn manifest_version(manifest: &Manifest) -> Result<u8, ManifestError> {
    match manifest.get(BUNDLE_MANIFEST_VERSION).map(str::trim) {
        None | Some("1") => Ok(1),
        Some("2") => Ok(2),
        Some(other) => Err(ManifestError::Invalid(format!(
            "unknown Bundle-ManifestVersion '{other}'"
        ))),
    }
}

/// Reads a header that must hold exactly one clause naming exactly one path.
fn single_clause(manifest: &Manifest, header: &str) -> Result<Option<Clause>, ManifestError> {
    let mut found = clauses(manifest, header)?;
    match found.len() {
        0 => Ok(None),
        1 if found[0].paths.len() == 1 => Ok(found.pop()),
        _ => Err(ManifestError::header(header, "expected exactly one name")),
    }
}

fn symbolic_name(
    manifest: &Manifest,
) -> Result<Option<(String, BTreeMap<String, String>)>, ManifestError> {
    Ok(single_clause(manifest, BUNDLE_SYMBOLIC_NAME)?
        .map(|clause| (clause.paths[0].clone(), clause.directives)))
}

fn identity_capability(
    namespace: &str,
    name: &str,
    version: &Version,
    directives: &BTreeMap<String, String>,
) -> Capability {
    let mut attributes = BTreeMap::new();
    attributes.insert(namespace.to_string(), AttributeValue::from(name));
    attributes.insert(
        BUNDLE_VERSION_ATTRIBUTE.to_string(),
        AttributeValue::Version(version.clone()),
    );
    Capability {
        namespace: namespace.to_string(),
        directives: directives.clone(),
        attributes,
    }
}

/// Folds `specification-version` into `version`.
fn normalize_version_alias(header: &str, mut clause: Clause) -> Result<Clause, ManifestError> {
    let Some(index) = clause
        .attributes
        .iter()
        .position(|(key, _)| key == SPECIFICATION_VERSION_ATTRIBUTE)
    else {
        return Ok(clause);
    };

    let (_, alias) = clause.attributes.remove(index);
    match clause.attribute(VERSION_ATTRIBUTE) {
        Some(existing) if existing.value != alias.value => Err(ManifestError::header(
            header,
            "'version' and 'specification-version' disagree",
        )),
        Some(_) => Ok(clause),
        None => {
            clause
                .attributes
                .insert(index, (VERSION_ATTRIBUTE.to_string(), alias));
            Ok(clause)
        }
    }
}

/// Builds the filter of a wiring requirement from the clause attributes, in
/// declaration order after the name test.
fn wiring_filter(namespace: &str, path: &str, clause: &Clause) -> Result<FilterNode, ManifestError> {
    let mut nodes = vec![FilterNode::matching(namespace, path)];
    for (name, value) in &clause.attributes {
        match name.as_str() {
            VERSION_ATTRIBUTE | BUNDLE_VERSION_ATTRIBUTE => {
                let range: VersionRange = value.value.parse()?;
                nodes.extend(range.to_filters(name));
            }
            _ => nodes.push(FilterNode::matching(name.as_str(), &value.value)),
        }
    }
    Ok(FilterNode::from_comparisons(nodes))
}

fn wiring_requirement(
    namespace: &str,
    path: &str,
    clause: &Clause,
) -> Result<Requirement, ManifestError> {
    let filter = wiring_filter(namespace, path, clause)?;
    let mut directives = clause.directives.clone();
    directives.insert("filter".to_string(), filter.to_string());
    Ok(Requirement {
        namespace: namespace.to_string(),
        directives,
        attributes: BTreeMap::new(),
        filter: Some(filter),
    })
}

fn fragment_host(manifest: &Manifest) -> Result<Option<Requirement>, ManifestError> {
    single_clause(manifest, FRAGMENT_HOST)?
        .map(|clause| wiring_requirement(HOST_NAMESPACE, &clause.paths[0], &clause))
        .transpose()
}

fn imports(manifest: &Manifest, manifest_version: u8) -> Result<Vec<Requirement>, ManifestError> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut requirements = Vec::new();
    for clause in clauses(manifest, IMPORT_PACKAGE)? {
        let clause = normalize_version_alias(IMPORT_PACKAGE, clause)?;
        for path in &clause.paths {
            if manifest_version >= 2 {
                if path.starts_with("java.") {
                    return Err(ManifestError::Invalid(format!(
                        "importing java.* packages is not allowed: '{path}'"
                    )));
                }
                if !seen.insert(path.clone()) {
                    return Err(ManifestError::Invalid(format!(
                        "package '{path}' is imported more than once"
                    )));
                }
            }
            requirements.push(wiring_requirement(PACKAGE_NAMESPACE, path, &clause)?);
        }
    }
    Ok(requirements)
}

fn dynamic_imports(manifest: &Manifest) -> Result<Vec<Requirement>, ManifestError> {
    let mut requirements = Vec::new();
    for clause in clauses(manifest, DYNAMIC_IMPORT_PACKAGE)? {
        let clause = normalize_version_alias(DYNAMIC_IMPORT_PACKAGE, clause)?;
        for path in &clause.paths {
            let mut requirement = wiring_requirement(PACKAGE_NAMESPACE, path, &clause)?;
            requirement
                .directives
                .insert("resolution".to_string(), "dynamic".to_string());
            requirements.push(requirement);
        }
    }
    Ok(requirements)
}

fn required_bundles(manifest: &Manifest) -> Result<Vec<Requirement>, ManifestError> {
    let mut requirements = Vec::new();
    for clause in clauses(manifest, REQUIRE_BUNDLE)? {
        for path in &clause.paths {
            requirements.push(wiring_requirement(BUNDLE_NAMESPACE, path, &clause)?);
        }
    }
    Ok(requirements)
}

fn generic_namespace(header: &str, namespace: &str) -> Result<(), ManifestError> {
    if namespace.starts_with("osgi.wiring.") {
        return Err(ManifestError::Invalid(format!(
            "{header} cannot use the '{namespace}' namespace"
        )));
    }
    Ok(())
}

fn typed_attributes(
    header: &str,
    clause: &Clause,
) -> Result<BTreeMap<String, AttributeValue>, ManifestError> {
    clause
        .attributes
        .iter()
        .map(|(name, value)| Ok((name.clone(), AttributeValue::from_header(header, value)?)))
        .collect()
}

fn required_capabilities(manifest: &Manifest) -> Result<Vec<Requirement>, ManifestError> {
    let mut requirements = Vec::new();
    for clause in clauses(manifest, REQUIRE_CAPABILITY)? {
        let attributes = typed_attributes(REQUIRE_CAPABILITY, &clause)?;
        let filter = clause
            .directives
            .get("filter")
            .map(|raw| raw.parse::<FilterNode>())
            .transpose()?;
        for namespace in &clause.paths {
            generic_namespace(REQUIRE_CAPABILITY, namespace)?;
            requirements.push(Requirement {
                namespace: namespace.clone(),
                directives: clause.directives.clone(),
                attributes: attributes.clone(),
                filter: filter.clone(),
            });
        }
    }
    Ok(requirements)
}

fn provided_capabilities(manifest: &Manifest) -> Result<Vec<Capability>, ManifestError> {
    let mut capabilities = Vec::new();
    for clause in clauses(manifest, PROVIDE_CAPABILITY)? {
        let attributes = typed_attributes(PROVIDE_CAPABILITY, &clause)?;
        for namespace in &clause.paths {
            generic_namespace(PROVIDE_CAPABILITY, namespace)?;
            capabilities.push(Capability {
                namespace: namespace.clone(),
                directives: clause.directives.clone(),
                attributes: attributes.clone(),
            });
        }
    }
    Ok(capabilities)
}

fn exports(
    manifest: &Manifest,
    manifest_version: u8,
    symbolic_name: Option<&str>,
    bundle_version: &Version,
) -> Result<Vec<Capability>, ManifestError> {
    let mut capabilities = Vec::new();
    for clause in clauses(manifest, EXPORT_PACKAGE)? {
        let clause = normalize_version_alias(EXPORT_PACKAGE, clause)?;
        if clause.attribute(BUNDLE_SYMBOLIC_NAME_ATTRIBUTE).is_some()
            || clause.attribute(BUNDLE_VERSION_ATTRIBUTE).is_some()
        {
            return Err(ManifestError::header(
                EXPORT_PACKAGE,
                "exports must not declare bundle-symbolic-name or bundle-version",
            ));
        }

        let mut attributes = BTreeMap::new();
        attributes.insert(
            VERSION_ATTRIBUTE.to_string(),
            AttributeValue::Version(Version::default()),
        );
        for (name, value) in &clause.attributes {
            let value = if name == VERSION_ATTRIBUTE {
                AttributeValue::Version(value.value.parse()?)
            } else {
                AttributeValue::from_header(EXPORT_PACKAGE, value)?
            };
            attributes.insert(name.clone(), value);
        }
        if let Some(name) = symbolic_name {
            attributes.insert(
                BUNDLE_SYMBOLIC_NAME_ATTRIBUTE.to_string(),
                AttributeValue::from(name),
            );
            attributes.insert(
                BUNDLE_VERSION_ATTRIBUTE.to_string(),
                AttributeValue::Version(bundle_version.clone()),
            );
        }

        for path in &clause.paths {
            if manifest_version >= 2 && path.starts_with("java.") {
                return Err(ManifestError::Invalid(format!(
                    "exporting java.* packages is not allowed: '{path}'"
                )));
            }
            let mut attributes = attributes.clone();
            attributes.insert(PACKAGE_NAMESPACE.to_string(), AttributeValue::from(path.as_str()));
            capabilities.push(Capability {
                namespace: PACKAGE_NAMESPACE.to_string(),
                directives: clause.directives.clone(),
                attributes,
            });
        }
    }
    Ok(capabilities)
}

// ============================================================================
// Tests
// ============================================================================
