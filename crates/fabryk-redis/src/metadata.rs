//! Typed document metadata.
//!
//! Metadata values form a closed set of categories: schema inference matches
//! on them exhaustively, and the write path knows how each one is flattened
//! into a hash field.
//!
//! # Lossy boundary
//!
//! Hash fields are byte strings. Writing turns every value into bytes
//! ([`MetadataValue::to_field_bytes`]); reading turns bytes back into a value
//! using the schema as a hint ([`MetadataValue::from_field`]). The round trip
//! is not fully invertible:
//!
//! | Written | Read back (schema kind) |
//! |---------|-------------------------|
//! | `String` | `String` (TEXT or unknown) |
//! | `Integer` / `Float` | `Integer` if it parses as `i64`, else `Float` (NUMERIC) |
//! | `Bool` | `String("true"/"false")` |
//! | `List` | `List` of `String`s split on the tag separator (TAG) |
//! | `Map` | `String` holding JSON |
//! | `Vector` | dropped when it is the reserved vector key |
//! | `Null` | not written |

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::codec::VectorData;
use crate::schema::{DEFAULT_TAG_SEPARATOR, FieldKind};

/// Metadata mapping attached to a document.
pub type Metadata = HashMap<String, MetadataValue>;

/// A dynamically-typed metadata value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// Absent value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Floating point.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Heterogeneous list.
    List(Vec<MetadataValue>),
    /// Embedding vector with a fixed element type.
    ///
    /// Never produced by deserialization; arrays decode as `List`.
    Vector(VectorData),
    /// Nested mapping.
    Map(BTreeMap<String, MetadataValue>),
}

impl MetadataValue {
    /// Category name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Vector(VectorData::F32(_)) => "float32 vector",
            Self::Vector(VectorData::F64(_)) => "float64 vector",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Borrow as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as a vector.
    pub fn as_vector(&self) -> Option<&VectorData> {
        match self {
            Self::Vector(v) => Some(v),
            _ => None,
        }
    }

    /// Render as a plain string, the way it appears inside a hash field.
    ///
    /// Lists are joined with `,`, the default tag separator.
    pub fn to_field_string(&self) -> Option<String> {
        self.to_field_string_with(DEFAULT_TAG_SEPARATOR)
    }

    /// Like [`to_field_string`](Self::to_field_string), joining lists with
    /// `separator`.
    pub fn to_field_string_with(&self, separator: &str) -> Option<String> {
        match self {
            Self::Null | Self::Vector(_) => None,
            Self::Bool(b) => Some(b.to_string()),
            Self::Integer(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::String(s) => Some(s.clone()),
            Self::List(items) => Some(
                items
                    .iter()
                    .filter_map(|item| item.to_field_string_with(separator))
                    .collect::<Vec<_>>()
                    .join(separator),
            ),
            Self::Map(_) => serde_json::to_string(self).ok(),
        }
    }

    /// Encode as hash field bytes; `None` means the field is not written.
    ///
    /// Vectors use the binary codec, everything else its string form.
    pub fn to_field_bytes(&self) -> Option<Vec<u8>> {
        self.to_field_bytes_with(DEFAULT_TAG_SEPARATOR)
    }

    /// Like [`to_field_bytes`](Self::to_field_bytes), joining lists with
    /// `separator`.
    pub fn to_field_bytes_with(&self, separator: &str) -> Option<Vec<u8>> {
        match self {
            Self::Vector(v) => Some(v.to_bytes()),
            other => other.to_field_string_with(separator).map(String::into_bytes),
        }
    }

    /// Decode a field read back from the engine.
    ///
    /// `kind` is the schema variant of the field, when known; `separator` is
    /// the tag separator for TAG fields.
    pub fn from_field(raw: &str, kind: Option<FieldKind>, separator: Option<&str>) -> Self {
        match kind {
            Some(FieldKind::Numeric) => {
                if let Ok(i) = raw.parse::<i64>() {
                    Self::Integer(i)
                } else if let Ok(f) = raw.parse::<f64>() {
                    Self::Float(f)
                } else {
                    Self::String(raw.to_string())
                }
            }
            Some(FieldKind::Tag) => {
                let sep = separator.unwrap_or(DEFAULT_TAG_SEPARATOR);
                Self::List(
                    raw.split(sep)
                        .filter(|part| !part.is_empty())
                        .map(|part| Self::String(part.to_string()))
                        .collect(),
                )
            }
            _ => Self::String(raw.to_string()),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for MetadataValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for MetadataValue {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<u32> for MetadataValue {
    fn from(i: u32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for MetadataValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<f32> for MetadataValue {
    fn from(f: f32) -> Self {
        Self::Float(f64::from(f))
    }
}

impl From<Vec<f32>> for MetadataValue {
    fn from(v: Vec<f32>) -> Self {
        Self::Vector(VectorData::F32(v))
    }
}

impl From<Vec<f64>> for MetadataValue {
    fn from(v: Vec<f64>) -> Self {
        Self::Vector(VectorData::F64(v))
    }
}

impl From<VectorData> for MetadataValue {
    fn from(v: VectorData) -> Self {
        Self::Vector(v)
    }
}

impl From<Vec<MetadataValue>> for MetadataValue {
    fn from(items: Vec<MetadataValue>) -> Self {
        Self::List(items)
    }
}

impl<T: Into<MetadataValue>> From<Option<T>> for MetadataValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for MetadataValue {
    /// JSON arrays become `List`, never `Vector`: a JSON array carries no
    /// element width.
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => n.as_f64().map_or(Self::Null, Self::Float),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect(),
            ),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
