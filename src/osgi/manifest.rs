//! Jar manifest main-section parsing.

use super::ManifestError;

/// The main attributes of a jar manifest, in declaration order.
///
/// Header names are matched case-insensitively, like `java.util.jar`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    headers: Vec<(String, String)>,
}

impl Manifest {
    /// Parses the main section of a manifest.
    ///
    /// Continuation lines start with a single space; the section ends at the
    /// first blank line. Per-entry sections after it are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Syntax`] for a line without `:`, an invalid
    /// header name, or a continuation line with nothing to continue.
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut headers: Vec<(String, String)> = Vec::new();

        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() {
                break;
            }

            if let Some(rest) = line.strip_prefix(' ') {
                match headers.last_mut() {
                    Some((_, value)) => value.push_str(rest),
                    None => {
                        return Err(ManifestError::Syntax {
                            line: line_no,
                            reason: "continuation line without a header".to_string(),
                        })
                    }
                }
                continue;
            }

            let (name, value) = line.split_once(':').ok_or_else(|| ManifestError::Syntax {
                line: line_no,
                reason: format!("missing ':' in '{line}'"),
            })?;
            if name.is_empty()
                || !name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                return Err(ManifestError::Syntax {
                    line: line_no,
                    reason: format!("invalid header name '{name}'"),
                });
            }
            let value = value.strip_prefix(' ').unwrap_or(value);
            headers.push((name.to_string(), value.to_string()));
        }

        Ok(Self { headers })
    }

    /// Decodes manifest bytes as UTF-8 and parses them.
    ///
    /// Invalid byte sequences become U+FFFD, so a free-text header written in
    /// another encoding does not make the manifest unreadable.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ManifestError> {
        Self::parse(&String::from_utf8_lossy(bytes))
    }

    /// Builds a manifest from already-split header pairs.
    pub fn from_headers<I, K, V>(headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns the value of `name`; the last declaration wins.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Iterates over all headers in declaration order.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}
