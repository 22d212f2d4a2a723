//! The closed set of JSON-compatible values a document property can hold.
//!
//! `Value` mirrors JSON but keeps the distinctions a document model cares about:
//! 64-bit integers are separate from floating point, single and double
//! precision are separate, and dates, blobs, and sub-document handles are
//! first-class variants instead of encoded strings.

use crate::blob::Blob;
use crate::error::Result;
use crate::persist;
use crate::subdoc::SubdocId;
use chrono::{DateTime, Utc};
use serde_json::Number;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A dynamically-typed property value.
///
/// `Map` is the plain nested-map form: callers pass it to `set` to create a
/// sub-document, and a freshly loaded document holds it until the key is first
/// read. `Subdocument` is a resolved handle into the document graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f32),
    Double(f64),
    String(String),
    Date(DateTime<Utc>),
    Blob(Blob),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Subdocument(SubdocId),
}

/// The variant of a [`Value`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    Double,
    String,
    Date,
    Blob,
    Array,
    Map,
    Subdocument,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Double => "double",
            ValueKind::String => "string",
            ValueKind::Date => "date",
            ValueKind::Blob => "blob",
            ValueKind::Array => "array",
            ValueKind::Map => "map",
            ValueKind::Subdocument => "subdocument",
        };
        f.write_str(name)
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::String(_) => ValueKind::String,
            Value::Date(_) => ValueKind::Date,
            Value::Blob(_) => ValueKind::Blob,
            Value::Array(_) => ValueKind::Array,
            Value::Map(_) => ValueKind::Map,
            Value::Subdocument(_) => ValueKind::Subdocument,
        }
    }

    /// Render this value in the snapshot JSON form, without a document graph.
    ///
    /// Dates, blobs and single-precision floats become `@type` markers, as in
    /// [`Properties::to_json`](crate::Properties::to_json).
    ///
    /// # Errors
    /// Returns `PropsError::UnknownSubdocument` if the value holds a sub-document
    /// handle; use [`persist::encode_value`] with the owning graph for those.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        persist::encode_detached(self)
    }
}

/// Non-finite floats have no JSON form; they are rejected before they can be
/// stored, so mapping them to `null` here only affects unstored values.
pub(crate) fn float_to_json(f: f64) -> serde_json::Value {
    Number::from_f64(f)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

// ============================================================================
// Literal construction
// ============================================================================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! int_into_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Int(i64::from(n))
                }
            }
        )*
    };
}

int_into_value!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<Blob> for Value {
    fn from(b: Blob) -> Self {
        Value::Blob(b)
    }
}

impl From<SubdocId> for Value {
    fn from(id: SubdocId) -> Self {
        Value::Subdocument(id)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<BTreeMap<String, T>> for Value {
    fn from(map: BTreeMap<String, T>) -> Self {
        Value::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<Value>> From<HashMap<String, T>> for Value {
    fn from(map: HashMap<String, T>) -> Self {
        Value::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

/// JSON integers that do not fit in `i64` become `Double`; objects become
/// `Map` literals.
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Double(n.as_f64().unwrap_or(0.0)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}
