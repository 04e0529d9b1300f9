//! OSGi versions (`major.minor.micro.qualifier`) and version ranges.

use std::fmt;
use std::str::FromStr;

use super::ManifestError;
use crate::filter::FilterNode;

/// A bundle or package version.
///
/// Missing numeric components default to zero, so `"1.2"` prints as `"1.2.0"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub micro: u64,
    pub qualifier: String,
}

impl Version {
    pub fn new(major: u64, minor: u64, micro: u64) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: String::new(),
        }
    }
}

impl FromStr for Version {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() {
            return Ok(Self::default());
        }
        let invalid = || ManifestError::InvalidVersion {
            value: s.to_string(),
        };

        let mut parts = text.splitn(4, '.');
        let number = |part: Option<&str>| -> Result<u64, ManifestError> {
            match part {
                None => Ok(0),
                Some(p) if !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()) => {
                    p.parse().map_err(|_| invalid())
                }
                Some(_) => Err(invalid()),
            }
        };
        let major = number(parts.next())?;
        let minor = number(parts.next())?;
        let micro = number(parts.next())?;
        let qualifier = parts.next().unwrap_or_default().to_string();
        if !qualifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(invalid());
        }

        Ok(Self {
            major,
            minor,
            micro,
            qualifier,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if !self.qualifier.is_empty() {
            write!(f, ".{}", self.qualifier)?;
        }
        Ok(())
    }
}

/// A version interval such as `[1.0,2.0)`.
///
/// A bare version (`"1.0"`) is the half-open range from that version upwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    pub floor: Version,
    pub floor_inclusive: bool,
    pub ceiling: Option<Version>,
    pub ceiling_inclusive: bool,
}

impl VersionRange {
    /// Expresses the range as filter comparisons on `attr`.
    ///
    /// An exclusive bound is written as a negated inclusive comparison, so
    /// `[1,2)` becomes `(attr>=1.0.0)(!(attr>=2.0.0))`.
    pub fn to_filters(&self, attr: &str) -> Vec<FilterNode> {
        let mut nodes = Vec::with_capacity(2);
        let floor = self.floor.to_string();
        if self.floor_inclusive {
            nodes.push(FilterNode::greater_equal(attr, floor));
        } else {
            nodes.push(FilterNode::not(FilterNode::less_equal(attr, floor)));
        }
        if let Some(ceiling) = &self.ceiling {
            let ceiling = ceiling.to_string();
            if self.ceiling_inclusive {
                nodes.push(FilterNode::less_equal(attr, ceiling));
            } else {
                nodes.push(FilterNode::not(FilterNode::greater_equal(attr, ceiling)));
            }
        }
        nodes
    }
}

impl FromStr for VersionRange {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let invalid = || ManifestError::InvalidVersion {
            value: s.to_string(),
        };

        let floor_inclusive = match text.chars().next() {
            Some('[') => true,
            Some('(') => false,
            _ => {
                return Ok(Self {
                    floor: text.parse()?,
                    floor_inclusive: true,
                    ceiling: None,
                    ceiling_inclusive: false,
                })
            }
        };
        let ceiling_inclusive = match text.chars().last() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(invalid()),
        };
        if text.len() < 2 {
            return Err(invalid());
        }

        let inner = &text[1..text.len() - 1];
        let (floor, ceiling) = inner.split_once(',').ok_or_else(invalid)?;
        let floor: Version = floor.parse()?;
        let ceiling: Version = ceiling.parse()?;
        if ceiling < floor {
            return Err(invalid());
        }

        Ok(Self {
            floor,
            floor_inclusive,
            ceiling: Some(ceiling),
            ceiling_inclusive,
        })
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ceiling {
            None => write!(f, "{}", self.floor),
            Some(ceiling) => write!(
                f,
                "{}{},{}{}",
                if self.floor_inclusive { '[' } else { '(' },
                self.floor,
                ceiling,
                if self.ceiling_inclusive { ']' } else { ')' }
            ),
        }
    }
}
