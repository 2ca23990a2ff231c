//! Typed codec options and the override-wins merge

use crate::error::PluginError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single option value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl OptionValue {
    /// Infer a typed value from a command-line literal.
    ///
    /// `true`/`false` become booleans, integers and floats parse as numbers,
    /// anything else is kept as text.
    pub fn parse_literal(raw: &str) -> Self {
        let raw = raw.trim();
        match raw {
            "true" => return OptionValue::Bool(true),
            "false" => return OptionValue::Bool(false),
            _ => {}
        }
        if let Ok(i) = raw.parse::<i64>() {
            return OptionValue::Int(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            if f.is_finite() {
                return OptionValue::Float(f);
            }
        }
        OptionValue::Text(raw.to_string())
    }

    /// Name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            OptionValue::Bool(_) => "boolean",
            OptionValue::Int(_) => "integer",
            OptionValue::Float(_) => "float",
            OptionValue::Text(_) => "string",
        }
    }

    /// Whether a value of this type may stand in for `reference`'s type.
    /// Integers are accepted where floats are expected.
    pub fn is_compatible_with(&self, reference: &OptionValue) -> bool {
        matches!(
            (self, reference),
            (OptionValue::Bool(_), OptionValue::Bool(_))
                | (OptionValue::Int(_), OptionValue::Int(_))
                | (OptionValue::Int(_), OptionValue::Float(_))
                | (OptionValue::Float(_), OptionValue::Float(_))
                | (OptionValue::Text(_), OptionValue::Text(_))
        )
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptionValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            OptionValue::Float(f) => Some(*f),
            OptionValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Formats the value as it appears on an external command line
impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{b}"),
            OptionValue::Int(i) => write!(f, "{i}"),
            OptionValue::Float(x) => write!(f, "{x}"),
            OptionValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Bool(v)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Int(v)
    }
}

impl From<i32> for OptionValue {
    fn from(v: i32) -> Self {
        OptionValue::Int(i64::from(v))
    }
}

impl From<u32> for OptionValue {
    fn from(v: u32) -> Self {
        OptionValue::Int(i64::from(v))
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        OptionValue::Float(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::Text(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        OptionValue::Text(v)
    }
}

/// Option mapping keyed by option name. Iteration order is sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodecOptions(BTreeMap<String, OptionValue>);

impl CodecOptions {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merge `overrides` over `defaults`.
    ///
    /// Every default key absent from `overrides` is kept unchanged, every
    /// override key is present with the override's value (including keys the
    /// defaults do not know about), and no other keys appear.
    #[must_use]
    pub fn merge(defaults: &CodecOptions, overrides: &CodecOptions) -> CodecOptions {
        let mut merged = defaults.0.clone();
        for (key, value) in &overrides.0 {
            merged.insert(key.clone(), value.clone());
        }
        CodecOptions(merged)
    }

    /// Check that every key shared with `reference` carries a compatible type.
    /// Keys unknown to `reference` are allowed.
    pub fn check_types(&self, reference: &CodecOptions) -> Result<(), PluginError> {
        for (key, value) in &self.0 {
            if let Some(expected) = reference.get(key) {
                if !value.is_compatible_with(expected) {
                    return Err(PluginError::InvalidOption {
                        key: key.clone(),
                        expected: expected.type_name().to_string(),
                        found: format!("{} ({})", value.type_name(), value),
                    });
                }
            }
        }
        Ok(())
    }

    /// Keys present here but not in `reference`
    pub fn unknown_keys<'a>(&'a self, reference: &'a CodecOptions) -> Vec<&'a str> {
        self.keys().filter(|k| !reference.contains_key(k)).collect()
    }

    fn require(&self, key: &str) -> Result<&OptionValue, PluginError> {
        self.get(key)
            .ok_or_else(|| PluginError::MissingOption(key.to_string()))
    }

    fn invalid(key: &str, expected: &str, found: &OptionValue) -> PluginError {
        PluginError::InvalidOption {
            key: key.to_string(),
            expected: expected.to_string(),
            found: format!("{} ({})", found.type_name(), found),
        }
    }

    /// Required integer option
    pub fn int(&self, key: &str) -> Result<i64, PluginError> {
        let value = self.require(key)?;
        value
            .as_int()
            .ok_or_else(|| Self::invalid(key, "integer", value))
    }

    /// Required float option (integers accepted)
    pub fn float(&self, key: &str) -> Result<f64, PluginError> {
        let value = self.require(key)?;
        value
            .as_float()
            .ok_or_else(|| Self::invalid(key, "float", value))
    }

    /// Required string option
    pub fn text(&self, key: &str) -> Result<&str, PluginError> {
        let value = self.require(key)?;
        value
            .as_str()
            .ok_or_else(|| Self::invalid(key, "string", value))
    }

    /// Required boolean option
    pub fn flag(&self, key: &str) -> Result<bool, PluginError> {
        let value = self.require(key)?;
        value
            .as_bool()
            .ok_or_else(|| Self::invalid(key, "boolean", value))
    }

    /// Required scalar option rendered for a command line, whatever its type
    pub fn arg(&self, key: &str) -> Result<String, PluginError> {
        Ok(self.require(key)?.to_string())
    }
}

impl<K: Into<String>, V: Into<OptionValue>> FromIterator<(K, V)> for CodecOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for CodecOptions {
    type Item = (String, OptionValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, OptionValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for CodecOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match value {
                OptionValue::Text(s) => write!(f, "{key}: {s:?}")?,
                other => write!(f, "{key}: {other}")?,
            }
        }
        f.write_str("}")
    }
}
