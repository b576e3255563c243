use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::api::error::EngineError;

/// String attributes of an element, as declared in markup or passed to
/// `Viewport::create_element`. Typed reads fall back to documented defaults
/// only when the attribute is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set an attribute.
    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl ToString) {
        self.0.insert(name.into(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn has(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(name)
    }

    /// Integer attribute, read with `parseInt` semantics (leading integer prefix).
    pub fn get_int(&self, name: &str, default: f32) -> Result<f32, EngineError> {
        match self.get(name) {
            None => Ok(default),
            Some(raw) => parse_int_prefix(raw)
                .map(|v| v as f32)
                .ok_or_else(|| EngineError::MalformedAttribute {
                    name: name.to_string(),
                    value: raw.to_string(),
                }),
        }
    }

    /// Floating-point attribute.
    pub fn get_float(&self, name: &str, default: f32) -> Result<f32, EngineError> {
        match self.get(name) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|_| EngineError::MalformedAttribute {
                name: name.to_string(),
                value: raw.to_string(),
            }),
        }
    }

    /// Copy every attribute of `defaults` that is not already set.
    pub fn merge_defaults(&mut self, defaults: &Attributes) {
        for (name, value) in &defaults.0 {
            self.0.entry(name.clone()).or_insert_with(|| value.clone());
        }
    }

    /// Parse an attribute object from JSON. Numbers and booleans are stringified.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)?;
        let map = raw
            .into_iter()
            .map(|(name, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (name, value)
            })
            .collect();
        Ok(Self(map))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (name, value) in iter {
            attrs.set(name, value);
        }
        attrs
    }
}

/// `parseInt(value, 10)`: optional whitespace and sign, then the longest digit prefix.
fn parse_int_prefix(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    digits[..end].parse::<i64>().ok().map(|v| v * sign)
}
