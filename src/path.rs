//! Key-path parsing.
//!
//! A key path addresses a column and zero or more nested JSON fields:
//! `meta->profile->country` is column `meta`, segments `profile`, `country`.
//! Projection specs additionally accept a trailing `" as <alias>"`.

use std::fmt;

use crate::error::{JsonFilterError, JsonResult};

/// Separator between the root column and nested segments.
pub const DELIMITER: &str = "->";

const ALIAS_TOKEN: &str = " as ";

/// A parsed key path. `root` is never empty and segment order is nesting order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    root: String,
    segments: Vec<String>,
}

impl KeyPath {
    pub fn parse(path: &str) -> JsonResult<Self> {
        if path.is_empty() {
            return Err(JsonFilterError::malformed(path, "key path is empty"));
        }

        let mut tokens = path.split(DELIMITER);
        // split always yields at least one token
        let root = tokens.next().unwrap_or_default();
        if root.is_empty() {
            return Err(JsonFilterError::malformed(path, "root column is empty"));
        }
        if !is_column_name(root) {
            return Err(JsonFilterError::malformed(
                path,
                format!("{root:?} is not a valid column name"),
            ));
        }

        let mut segments = Vec::new();
        for (i, seg) in tokens.enumerate() {
            if seg.is_empty() {
                return Err(JsonFilterError::malformed(
                    path,
                    format!("segment {} is empty", i + 1),
                ));
            }
            if !is_segment_name(seg) {
                return Err(JsonFilterError::malformed(
                    path,
                    format!("segment {seg:?} contains unsupported characters"),
                ));
            }
            segments.push(seg.to_string());
        }

        Ok(Self {
            root: root.to_string(),
            segments,
        })
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_nested(&self) -> bool {
        !self.segments.is_empty()
    }

    /// Segments joined with `.`, without the root (`profile.country`).
    pub fn dotted_segments(&self) -> String {
        self.segments.join(".")
    }

    /// Root and segments joined with `.` (`meta.profile.country`).
    pub fn dotted(&self) -> String {
        let mut out = self.root.clone();
        for seg in &self.segments {
            out.push('.');
            out.push_str(seg);
        }
        out
    }

    /// Alias used when a projection does not name one: delimiters, dots and
    /// any other non-identifier character become `_`, so the result is always
    /// a plain SQL identifier.
    pub fn default_alias(&self) -> String {
        self.to_string()
            .replace(DELIMITER, "_")
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect()
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)?;
        for seg in &self.segments {
            write!(f, "{}{}", DELIMITER, seg)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for KeyPath {
    type Err = JsonFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyPath::parse(s)
    }
}

/// A projection request: `meta->profile->country as country`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectSpec {
    pub path: KeyPath,
    pub alias: Option<String>,
}

impl SelectSpec {
    pub fn parse(spec: &str) -> JsonResult<Self> {
        let (path, alias) = match spec.split_once(ALIAS_TOKEN) {
            Some((path, alias)) => (path.trim(), Some(alias.trim())),
            None => (spec.trim(), None),
        };

        let path = KeyPath::parse(path)?;
        let alias = match alias {
            Some(a) if is_identifier(a) => Some(a.to_string()),
            Some(a) => return Err(JsonFilterError::InvalidAlias(a.to_string())),
            None => None,
        };

        Ok(Self { path, alias })
    }
}

/// Plain SQL identifier: letter or underscore, then letters, digits, underscores.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Column name, optionally qualified by a table: `meta` or `users.meta`.
fn is_column_name(s: &str) -> bool {
    match s.split_once('.') {
        Some((table, column)) => is_identifier(table) && is_identifier(column),
        None => is_identifier(s),
    }
}

fn is_segment_name(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '$')
}
