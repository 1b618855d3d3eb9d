//! The tag mini-grammar shared by the query builder and the exclusion
//! filter: a pattern is either an exact `key=value` pair or a bare keyword.
//!
//! Bare keywords are deliberately loose — OSM mappers use words like
//! "bunker" both as a key and as a value under the common classification
//! keys, so a bare pattern matches (and excludes) either usage.

use std::collections::HashMap;
use std::fmt;

/// Classification keys whose values are checked when a bare keyword is
/// matched or queried.
pub const COMMON_KEYS: &[&str] = &[
    "amenity", "building", "historic", "landuse", "leisure", "man_made", "military", "tourism",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagPattern {
    Exact { key: String, value: String },
    Bare { key: String },
}

impl TagPattern {
    /// Parse one raw entry. Empty and malformed entries ("key=", "=value")
    /// yield None.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        match trimmed.split_once('=') {
            Some((key, value)) => {
                let (key, value) = (key.trim(), value.trim());
                if key.is_empty() || value.is_empty() {
                    return None;
                }
                Some(Self::Exact {
                    key: key.to_string(),
                    value: value.to_string(),
                })
            }
            None => Some(Self::Bare {
                key: trimmed.to_string(),
            }),
        }
    }

    /// Parse a raw list, dropping malformed entries and duplicates while
    /// preserving order.
    pub fn parse_all(raw: &[String]) -> Vec<Self> {
        let mut patterns: Vec<Self> = Vec::new();
        for entry in raw {
            if let Some(pattern) = Self::parse(entry) {
                if !patterns.contains(&pattern) {
                    patterns.push(pattern);
                }
            }
        }
        patterns
    }

    /// Whether an element with these tags is matched by this pattern when
    /// used as an exclusion rule: exact pair match, bare-key presence, or
    /// the keyword appearing as a value under one of the common
    /// classification keys.
    pub fn excludes(&self, tags: &HashMap<String, String>) -> bool {
        match self {
            Self::Exact { key, value } => tags.get(key).is_some_and(|v| v == value),
            Self::Bare { key } => {
                tags.contains_key(key)
                    || COMMON_KEYS
                        .iter()
                        .any(|common| tags.get(*common).is_some_and(|v| v == key))
            }
        }
    }
}

impl fmt::Display for TagPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact { key, value } => write!(f, "{key}={value}"),
            Self::Bare { key } => write!(f, "{key}"),
        }
    }
}
