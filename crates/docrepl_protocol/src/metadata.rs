//! Typed header values carried alongside a change event.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A typed message property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Boolean property.
    Bool(bool),
    /// Integer property.
    Int(i64),
    /// Floating point property.
    Float(f64),
    /// String property.
    String(String),
}

impl PropertyValue {
    /// Returns the string value, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer value, if this is an integer.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the boolean value, if this is a boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Name of the value's type, for error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Bool(_) => "boolean",
            PropertyValue::Int(_) => "integer",
            PropertyValue::Float(_) => "float",
            PropertyValue::String(_) => "string",
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{b}"),
            PropertyValue::Int(i) => write!(f, "{i}"),
            PropertyValue::Float(x) => write!(f, "{x}"),
            PropertyValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Int(i64::from(value))
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        PropertyValue::Int(i64::from(value))
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

/// Non-structural properties of a change event, keyed by header name.
///
/// Unknown keys are kept as received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    entries: BTreeMap<String, PropertyValue>,
}

impl Metadata {
    /// Header naming the owning account.
    pub const OWNER: &'static str = "exist.resource.owner";
    /// Header naming the owning group.
    pub const GROUP: &'static str = "exist.resource.group";
    /// Header carrying the mode bit mask.
    pub const MODE: &'static str = "exist.resource.mode";
    /// Header carrying a MIME type override.
    pub const MIME_TYPE: &'static str = "exist.resource.mimetype";

    /// Creates empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a property, returning the previous value.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        self.entries.insert(key.into(), value.into())
    }

    /// Returns a property.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.get(key)
    }

    /// The owner property.
    #[must_use]
    pub fn owner(&self) -> Option<&PropertyValue> {
        self.get(Self::OWNER)
    }

    /// The group property.
    #[must_use]
    pub fn group(&self) -> Option<&PropertyValue> {
        self.get(Self::GROUP)
    }

    /// The mode property.
    #[must_use]
    pub fn mode(&self) -> Option<&PropertyValue> {
        self.get(Self::MODE)
    }

    /// The MIME type override property.
    #[must_use]
    pub fn mime_type(&self) -> Option<&PropertyValue> {
        self.get(Self::MIME_TYPE)
    }

    /// Iterates over all properties in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<PropertyValue>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_accessors() {
        let metadata: Metadata = [
            (Metadata::OWNER, PropertyValue::from("admin")),
            (Metadata::MODE, PropertyValue::from(0o644_i64)),
            ("custom.flag", PropertyValue::from(true)),
        ]
        .into_iter()
        .collect();

        assert_eq!(metadata.owner().and_then(PropertyValue::as_str), Some("admin"));
        assert_eq!(metadata.mode().and_then(PropertyValue::as_int), Some(0o644));
        assert!(metadata.group().is_none());
        assert_eq!(metadata.get("custom.flag").and_then(PropertyValue::as_bool), Some(true));
        assert_eq!(metadata.len(), 3);
    }

    #[test]
    fn untagged_values_keep_their_type() {
        let metadata: Metadata =
            serde_json::from_str(r#"{"a": "text", "b": 420, "c": false, "d": 1.5}"#).unwrap();

        assert_eq!(metadata.get("a"), Some(&PropertyValue::String("text".into())));
        assert_eq!(metadata.get("b"), Some(&PropertyValue::Int(420)));
        assert_eq!(metadata.get("c"), Some(&PropertyValue::Bool(false)));
        assert_eq!(metadata.get("d"), Some(&PropertyValue::Float(1.5)));
        assert_eq!(metadata.get("b").unwrap().type_name(), "integer");
    }
}
