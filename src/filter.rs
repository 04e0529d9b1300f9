//! LDAP-style filter expressions used by OSGi requirements.
//!
//! This module provides the [`FilterNode`] tree produced for every
//! requirement's `filter` directive:
//! - Parsing via [`FromStr`] (`"(&(a=b)(!(c>=1)))".parse::<FilterNode>()`)
//! - Canonical printing via [`Display`](fmt::Display); printing then parsing
//!   yields an equal tree
//! - Construction of import filters from header attributes via
//!   [`FilterNode::from_comparisons`]

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Filter Tree
// ============================================================================

/// A node of a boolean filter expression.
///
/// Composite nodes own their children; comparison nodes carry the attribute
/// name and the unescaped operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterNode {
    /// `(&(..)(..))`
    And(Vec<FilterNode>),

    /// `(|(..)(..))`
    Or(Vec<FilterNode>),

    /// `(!(..))`
    Not(Box<FilterNode>),

    /// `(attr=value)`
    Equal { attr: String, value: String },

    /// `(attr~=value)`
    Approx { attr: String, value: String },

    /// `(attr>=value)`
    GreaterEqual { attr: String, value: String },

    /// `(attr<=value)`
    LessEqual { attr: String, value: String },

    /// `(attr=*)`
    Present { attr: String },

    /// `(attr=a*b*)`, stored as the pieces between wildcards (`["a", "b", ""]`)
    Substring { attr: String, pieces: Vec<String> },
}

impl FilterNode {
    /// Shorthand for an [`FilterNode::Equal`] node.
    pub fn equal(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equal {
            attr: attr.into(),
            value: value.into(),
        }
    }

    /// Shorthand for a [`FilterNode::GreaterEqual`] node.
    pub fn greater_equal(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Self::GreaterEqual {
            attr: attr.into(),
            value: value.into(),
        }
    }

    /// Shorthand for a [`FilterNode::LessEqual`] node.
    pub fn less_equal(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Self::LessEqual {
            attr: attr.into(),
            value: value.into(),
        }
    }

    /// Shorthand for a [`FilterNode::Not`] node.
    pub fn not(inner: FilterNode) -> Self {
        Self::Not(Box::new(inner))
    }

    /// Builds an equality-style test for `attr` against a raw header value.
    ///
    /// A value containing `*` becomes a substring test, a lone `*` a presence
    /// test.
    pub fn matching(attr: impl Into<String>, value: &str) -> Self {
        let attr = attr.into();
        if !value.contains('*') {
            return Self::Equal {
                attr,
                value: value.to_string(),
            };
        }
        if value == "*" {
            return Self::Present { attr };
        }
        Self::Substring {
            attr,
            pieces: value.split('*').map(str::to_string).collect(),
        }
    }

    /// Collapses a list of comparisons into a single node: the comparison
    /// itself when there is exactly one, an `And` otherwise.
    pub fn from_comparisons(mut nodes: Vec<FilterNode>) -> Self {
        if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            Self::And(nodes)
        }
    }

    /// Returns the attribute name for comparison nodes.
    pub fn attribute(&self) -> Option<&str> {
        match self {
            Self::Equal { attr, .. }
            | Self::Approx { attr, .. }
            | Self::GreaterEqual { attr, .. }
            | Self::LessEqual { attr, .. }
            | Self::Present { attr }
            | Self::Substring { attr, .. } => Some(attr),
            Self::And(_) | Self::Or(_) | Self::Not(_) => None,
        }
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    for c in value.chars() {
        if matches!(c, '(' | ')' | '*' | '\\') {
            write!(f, "\\")?;
        }
        write!(f, "{c}")?;
    }
    Ok(())
}

impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(children) | Self::Or(children) => {
                let op = if matches!(self, Self::And(_)) { '&' } else { '|' };
                write!(f, "({op}")?;
                for child in children {
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
            Self::Not(inner) => write!(f, "(!{inner})"),
            Self::Equal { attr, value } => {
                write!(f, "({attr}=")?;
                write_escaped(f, value)?;
                write!(f, ")")
            }
            Self::Approx { attr, value } => {
                write!(f, "({attr}~=")?;
                write_escaped(f, value)?;
                write!(f, ")")
            }
            Self::GreaterEqual { attr, value } => {
                write!(f, "({attr}>=")?;
                write_escaped(f, value)?;
                write!(f, ")")
            }
            Self::LessEqual { attr, value } => {
                write!(f, "({attr}<=")?;
                write_escaped(f, value)?;
                write!(f, ")")
            }
            Self::Present { attr } => write!(f, "({attr}=*)"),
            Self::Substring { attr, pieces } => {
                write!(f, "({attr}=")?;
                for (i, piece) in pieces.iter().enumerate() {
                    if i > 0 {
                        write!(f, "*")?;
                    }
                    write_escaped(f, piece)?;
                }
                write!(f, ")")
            }
        }
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Error raised for a syntactically invalid filter string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid filter at offset {offset}: {reason} in '{input}'")]
pub struct FilterParseError {
    pub input: String,
    pub offset: usize,
    pub reason: String,
}

impl FromStr for FilterNode {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = Parser {
            input: s,
            chars: s.char_indices().collect(),
            pos: 0,
            depth: 0,
        };
        let node = parser.filter()?;
        parser.skip_ws();
        if parser.pos < parser.chars.len() {
            return Err(parser.error("trailing characters after filter"));
        }
        Ok(node)
    }
}

/// Deepest nesting of `(...)` groups accepted by the parser.
pub const MAX_FILTER_DEPTH: usize = 64;

struct Parser<'a> {
    input: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map_or(self.input.len(), |(offset, _)| *offset)
    }

    fn error(&self, reason: &str) -> FilterParseError {
        FilterParseError {
            input: self.input.to_string(),
            offset: self.offset(),
            reason: reason.to_string(),
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), FilterParseError> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{expected}'")))
        }
    }

    fn filter(&mut self) -> Result<FilterNode, FilterParseError> {
        if self.depth >= MAX_FILTER_DEPTH {
            return Err(self.error("filter nested too deeply"));
        }
        self.depth += 1;
        let node = self.group()?;
        self.depth -= 1;
        Ok(node)
    }

    fn group(&mut self) -> Result<FilterNode, FilterParseError> {
        self.skip_ws();
        self.expect('(')?;
        self.skip_ws();
        let node = match self.peek() {
            Some('&') => {
                self.pos += 1;
                FilterNode::And(self.filter_list()?)
            }
            Some('|') => {
                self.pos += 1;
                FilterNode::Or(self.filter_list()?)
            }
            Some('!') => {
                self.pos += 1;
                FilterNode::not(self.filter()?)
            }
            Some(_) => self.comparison()?,
            None => return Err(self.error("unexpected end of filter")),
        };
        self.skip_ws();
        self.expect(')')?;
        Ok(node)
    }

    fn filter_list(&mut self) -> Result<Vec<FilterNode>, FilterParseError> {
        let mut children = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() != Some('(') {
                break;
            }
            children.push(self.filter()?);
        }
        if children.is_empty() {
            return Err(self.error("empty operand list"));
        }
        Ok(children)
    }

    fn comparison(&mut self) -> Result<FilterNode, FilterParseError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, '=' | '<' | '>' | '~' | '(' | ')') {
                break;
            }
            self.pos += 1;
        }
        let attr: String = self.chars[start..self.pos].iter().map(|(_, c)| c).collect();
        let attr = attr.trim().to_string();
        if attr.is_empty() {
            return Err(self.error("missing attribute name"));
        }

        let op = match self.peek() {
            Some('=') => {
                self.pos += 1;
                '='
            }
            Some(c @ ('<' | '>' | '~')) => {
                self.pos += 1;
                self.expect('=')?;
                c
            }
            _ => return Err(self.error("expected comparison operator")),
        };

        let pieces = self.value()?;
        let node = match op {
            '=' if pieces.len() == 1 => FilterNode::Equal {
                attr,
                value: pieces.concat(),
            },
            '=' if pieces.len() == 2 && pieces.iter().all(String::is_empty) => {
                FilterNode::Present { attr }
            }
            '=' => FilterNode::Substring { attr, pieces },
            '~' => FilterNode::Approx {
                attr,
                value: pieces.join("*"),
            },
            '>' => FilterNode::GreaterEqual {
                attr,
                value: pieces.join("*"),
            },
            _ => FilterNode::LessEqual {
                attr,
                value: pieces.join("*"),
            },
        };
        Ok(node)
    }

    /// Reads an operand up to the closing parenthesis, splitting it at
    /// unescaped wildcards.
    fn value(&mut self) -> Result<Vec<String>, FilterParseError> {
        let mut pieces = vec![String::new()];
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated comparison")),
                Some(')') => break,
                Some('(') => return Err(self.error("unescaped '(' in value")),
                Some('\\') => {
                    self.pos += 1;
                    let escaped = self
                        .peek()
                        .ok_or_else(|| self.error("dangling escape"))?;
                    if let Some(last) = pieces.last_mut() {
                        last.push(escaped);
                    }
                    self.pos += 1;
                }
                Some('*') => {
                    pieces.push(String::new());
                    self.pos += 1;
                }
                Some(c) => {
                    if let Some(last) = pieces.last_mut() {
                        last.push(c);
                    }
                    self.pos += 1;
                }
            }
        }
        Ok(pieces)
    }
}

// ============================================================================
// Tests
// ============================================================================
