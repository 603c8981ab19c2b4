//! Structured property values attached to log events, and the JSON
//! serializer for the properties column.
//!
//! Values keep their shape (scalars, sequences, structures, dictionaries) so
//! the serialized blob nests the same way the event did. Two text forms exist:
//!
//! - the display form, where strings are quoted (`"alice"`), used when a value
//!   is rendered inside a message or a larger value;
//! - the literal form, identical except that a top-level string is written
//!   bare (`alice`), used for custom-column lookups and `{Name:l}` holes.

use crate::{EventSerializer, LogRowError, LogRowResult};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;

// ============================================================================
// VALUES
// ============================================================================

/// Leaf value of a property.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
}

/// A property value of any shape.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Scalar(ScalarValue),
    Sequence(Vec<PropertyValue>),
    Structure {
        type_tag: Option<String>,
        properties: Vec<(String, PropertyValue)>,
    },
    Dictionary(Vec<(ScalarValue, PropertyValue)>),
}

impl ScalarValue {
    fn write(&self, out: &mut impl fmt::Write, literal: bool) -> fmt::Result {
        match self {
            ScalarValue::Null => out.write_str("null"),
            ScalarValue::Bool(b) => write!(out, "{}", b),
            ScalarValue::Int(i) => write!(out, "{}", i),
            ScalarValue::UInt(u) => write!(out, "{}", u),
            ScalarValue::Float(f) => write!(out, "{}", f),
            ScalarValue::String(s) if literal => out.write_str(s),
            ScalarValue::String(s) => {
                out.write_char('"')?;
                for c in s.chars() {
                    match c {
                        '"' => out.write_str("\\\"")?,
                        '\\' => out.write_str("\\\\")?,
                        _ => out.write_char(c)?,
                    }
                }
                out.write_char('"')
            }
        }
    }

    /// Text used for a dictionary key when the value is written as JSON.
    fn key_text(&self) -> String {
        let mut key = String::new();
        // Writing into a String cannot fail.
        let _ = self.write(&mut key, true);
        key
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, false)
    }
}

impl PropertyValue {
    pub fn null() -> Self {
        PropertyValue::Scalar(ScalarValue::Null)
    }

    pub fn structure<I, K>(type_tag: Option<&str>, properties: I) -> Self
    where
        I: IntoIterator<Item = (K, PropertyValue)>,
        K: Into<String>,
    {
        PropertyValue::Structure {
            type_tag: type_tag.map(str::to_string),
            properties: properties.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Literal rendering: a top-level string is written without quotes,
    /// everything else matches the display form.
    pub fn to_literal(&self) -> String {
        match self {
            PropertyValue::Scalar(scalar) => {
                let mut out = String::new();
                let _ = scalar.write(&mut out, true);
                out
            }
            other => other.to_string(),
        }
    }

    fn write(&self, out: &mut impl fmt::Write) -> fmt::Result {
        match self {
            PropertyValue::Scalar(scalar) => scalar.write(out, false),
            PropertyValue::Sequence(items) => {
                out.write_char('[')?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.write_str(", ")?;
                    }
                    item.write(out)?;
                }
                out.write_char(']')
            }
            PropertyValue::Structure {
                type_tag,
                properties,
            } => {
                if let Some(tag) = type_tag {
                    write!(out, "{} ", tag)?;
                }
                out.write_str("{ ")?;
                for (i, (name, value)) in properties.iter().enumerate() {
                    if i > 0 {
                        out.write_str(", ")?;
                    }
                    write!(out, "{}: ", name)?;
                    value.write(out)?;
                }
                out.write_str(" }")
            }
            PropertyValue::Dictionary(entries) => {
                out.write_char('[')?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.write_str(", ")?;
                    }
                    out.write_char('(')?;
                    key.write(out, false)?;
                    out.write_str(": ")?;
                    value.write(out)?;
                    out.write_char(')')?;
                }
                out.write_char(']')
            }
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f)
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Scalar(ScalarValue::String(value.to_string()))
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Scalar(ScalarValue::String(value))
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Scalar(ScalarValue::Bool(value))
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Scalar(ScalarValue::Int(value))
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Scalar(ScalarValue::Int(value.into()))
    }
}

impl From<u64> for PropertyValue {
    fn from(value: u64) -> Self {
        PropertyValue::Scalar(ScalarValue::UInt(value))
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Scalar(ScalarValue::Float(value))
    }
}

impl<T: Into<PropertyValue>> From<Vec<T>> for PropertyValue {
    fn from(values: Vec<T>) -> Self {
        PropertyValue::Sequence(values.into_iter().map(Into::into).collect())
    }
}

/// JSON objects become untagged structures, preserving field order only as
/// far as `serde_json::Map` does.
impl From<serde_json::Value> for PropertyValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => PropertyValue::null(),
            Value::Bool(b) => b.into(),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i.into()
                } else if let Some(u) = n.as_u64() {
                    u.into()
                } else {
                    n.as_f64().unwrap_or(f64::NAN).into()
                }
            }
            Value::String(s) => s.into(),
            Value::Array(items) => {
                PropertyValue::Sequence(items.into_iter().map(PropertyValue::from).collect())
            }
            Value::Object(map) => PropertyValue::Structure {
                type_tag: None,
                properties: map
                    .into_iter()
                    .map(|(k, v)| (k, PropertyValue::from(v)))
                    .collect(),
            },
        }
    }
}

// ============================================================================
// JSON FORM
// ============================================================================

impl Serialize for ScalarValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ScalarValue::Null => serializer.serialize_unit(),
            ScalarValue::Bool(b) => serializer.serialize_bool(*b),
            ScalarValue::Int(i) => serializer.serialize_i64(*i),
            ScalarValue::UInt(u) => serializer.serialize_u64(*u),
            ScalarValue::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            // JSON has no NaN/Infinity literals.
            ScalarValue::Float(f) => serializer.serialize_str(&f.to_string()),
            ScalarValue::String(s) => serializer.serialize_str(s),
        }
    }
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PropertyValue::Scalar(scalar) => scalar.serialize(serializer),
            PropertyValue::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            // Type tags are not written.
            PropertyValue::Structure { properties, .. } => {
                let mut map = serializer.serialize_map(Some(properties.len()))?;
                for (name, value) in properties {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
            PropertyValue::Dictionary(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(&key.key_text(), value)?;
                }
                map.end()
            }
        }
    }
}

// ============================================================================
// PROPERTY BAG
// ============================================================================

/// Named properties of one event, in the order they were attached.
///
/// Duplicate names are kept; lookups return the first match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyBag {
    entries: Vec<(String, PropertyValue)>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Exact-name lookup, first match.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Case-insensitive lookup, first match.
    pub fn get_ignore_case(&self, name: &str) -> Option<&PropertyValue> {
        let wanted = name.to_lowercase();
        self.entries
            .iter()
            .find(|(k, _)| k.to_lowercase() == wanted)
            .map(|(_, v)| v)
    }
}

impl<K: Into<String>, V: Into<PropertyValue>> FromIterator<(K, V)> for PropertyBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Serialize for PropertyBag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Render a property bag for the serialized-properties column.
///
/// An empty bag yields an empty string rather than `{}`.
pub fn serialize_properties(
    properties: &PropertyBag,
    serializer: EventSerializer,
) -> LogRowResult<String> {
    if properties.is_empty() {
        return Ok(String::new());
    }
    match serializer {
        EventSerializer::Json => {
            serde_json::to_string(properties).map_err(|e| LogRowError::Serialization {
                reason: e.to_string(),
            })
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
