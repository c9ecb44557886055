//! # Scope Sets
//!
//! OAuth scope values travel on the wire as a single space-delimited string
//! but are reasoned about as a set. [`ScopeSet`] keeps insertion order so that
//! error messages and effective-scope strings are reproducible, while
//! membership checks ignore ordering and duplicates.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An ordered, duplicate-free set of scope values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeSet(Vec<String>);

impl ScopeSet {
    /// Create an empty scope set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a space-delimited scope string. Empty segments are skipped and
    /// repeated values are kept once, at their first position.
    pub fn parse(raw: &str) -> Self {
        raw.split(' ').filter(|s| !s.is_empty()).collect()
    }

    /// Add a value, returning `false` if it was already present.
    pub fn insert(&mut self, value: impl Into<String>) -> bool {
        let value = value.into();
        if self.contains(&value) {
            return false;
        }
        self.0.push(value);
        true
    }

    /// Whether the set holds `value`.
    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|v| v == value)
    }

    /// Number of distinct values.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Values present in both sets, in `self`'s order.
    pub fn intersection(&self, other: &ScopeSet) -> ScopeSet {
        self.iter().filter(|v| other.contains(v)).collect()
    }
}

impl fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

impl<S: Into<String>> FromIterator<S> for ScopeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ScopeSet::new();
        for value in iter {
            set.insert(value);
        }
        set
    }
}

impl Serialize for ScopeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ScopeSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ScopeSet::parse(&raw))
    }
}
