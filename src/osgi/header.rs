//! The OSGi header clause grammar.
//!
//! ```text
//! header    = clause ( ',' clause )*
//! clause    = path ( ';' path )* ( ';' parameter )*
//! parameter = name ( ':' type )? '=' value     (attribute)
//!           | name ':=' value                  (directive)
//! ```
//!
//! Values may be double-quoted; inside quotes `,` and `;` lose their meaning
//! and `\` escapes the next character.

use std::collections::BTreeMap;

use super::ManifestError;

/// An attribute value as written in the header, with its optional type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderValue {
    pub value: String,
    /// Declared type (`Version`, `List<String>`, ...), `None` for plain strings
    pub type_name: Option<String>,
}

/// One comma-separated clause of a header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clause {
    pub paths: Vec<String>,
    /// Attributes in declaration order
    pub attributes: Vec<(String, HeaderValue)>,
    pub directives: BTreeMap<String, String>,
}

impl Clause {
    pub fn attribute(&self, name: &str) -> Option<&HeaderValue> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}

/// Parses a header value into its clauses.
///
/// `header` names the header for error messages only.
///
/// # Errors
///
/// Returns [`ManifestError::MalformedHeader`] for unterminated quotes, empty
/// clauses or paths, parameters preceding paths, and duplicate parameters.
pub fn parse_clauses(header: &str, value: &str) -> Result<Vec<Clause>, ManifestError> {
    let mut clauses = Vec::new();
    for raw_clause in split_unquoted(header, value, ',')? {
        let raw_clause = raw_clause.trim();
        if raw_clause.is_empty() {
            return Err(ManifestError::header(header, "empty clause"));
        }

        let mut clause = Clause::default();
        for piece in split_unquoted(header, raw_clause, ';')? {
            let piece = piece.trim();
            match find_unquoted(piece, '=') {
                None => {
                    if !clause.attributes.is_empty() || !clause.directives.is_empty() {
                        return Err(ManifestError::header(
                            header,
                            format!("path '{piece}' follows parameters"),
                        ));
                    }
                    let path = unquote(header, piece)?;
                    if path.is_empty() {
                        return Err(ManifestError::header(header, "empty path"));
                    }
                    clause.paths.push(path);
                }
                Some(eq) => {
                    if clause.paths.is_empty() {
                        return Err(ManifestError::header(header, "parameter before any path"));
                    }
                    let key = piece[..eq].trim_end();
                    let value = unquote(header, piece[eq + 1..].trim())?;
                    add_parameter(header, &mut clause, key, value)?;
                }
            }
        }
        clauses.push(clause);
    }
    Ok(clauses)
}

fn add_parameter(
    header: &str,
    clause: &mut Clause,
    key: &str,
    value: String,
) -> Result<(), ManifestError> {
    if let Some(name) = key.strip_suffix(':') {
        let name = name.trim();
        if name.is_empty() {
            return Err(ManifestError::header(header, "directive without a name"));
        }
        if clause.directives.insert(name.to_string(), value).is_some() {
            return Err(ManifestError::header(
                header,
                format!("duplicate directive '{name}'"),
            ));
        }
        return Ok(());
    }

    let (name, type_name) = match key.split_once(':') {
        Some((name, type_name)) => (name.trim(), Some(type_name.trim().to_string())),
        None => (key, None),
    };
    if name.is_empty() {
        return Err(ManifestError::header(header, "attribute without a name"));
    }
    if clause.attribute(name).is_some() {
        return Err(ManifestError::header(
            header,
            format!("duplicate attribute '{name}'"),
        ));
    }
    clause
        .attributes
        .push((name.to_string(), HeaderValue { value, type_name }));
    Ok(())
}

/// Splits `text` at `delimiter` outside of double quotes.
fn split_unquoted<'a>(
    header: &str,
    text: &'a str,
    delimiter: char,
) -> Result<Vec<&'a str>, ManifestError> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == delimiter && !in_quotes => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    if in_quotes {
        return Err(ManifestError::header(header, "unterminated quoted string"));
    }
    parts.push(&text[start..]);
    Ok(parts)
}

fn find_unquoted(text: &str, target: char) -> Option<usize> {
    let mut in_quotes = false;
    for (i, c) in text.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c == target && !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}

fn unquote(header: &str, text: &str) -> Result<String, ManifestError> {
    let Some(inner) = text.strip_prefix('"') else {
        return Ok(text.to_string());
    };
    let inner = inner
        .strip_suffix('"')
        .ok_or_else(|| ManifestError::header(header, format!("bad quoting in '{text}'")))?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

// ============================================================================
// Tests
// ============================================================================
