//! `PropertyView` -- a copyable, never-failing typed reader over one value.
//!
//! Views are what keyed access hands back. Every reader returns a usable value:
//! a type mismatch or a missing key yields the type's zero value (or `None` for
//! strings, dates, blobs, and sub-documents) instead of an error.
//!
//! # Coercion
//!
//! | reader          | accepts                              | otherwise |
//! |-----------------|--------------------------------------|-----------|
//! | `bool`          | `Bool(true)` only                    | `false`   |
//! | `int`           | `Int`, `Float`, `Double` (truncated) | `0`       |
//! | `float`/`double`| `Int`, `Float`, `Double`             | `0.0`     |
//! | `string`, `date`, `blob`, `subdocument` | exact variant | `None`  |
//!
//! `Bool` is not numeric: `int()` of `true` is `0`.

use crate::blob::Blob;
use crate::graph::DocumentGraph;
use crate::subdoc::SubdocId;
use crate::value::{Value, ValueKind};
use chrono::{DateTime, Utc};

/// Read-only view of a value that may be absent.
///
/// A view obtained from a document can follow sub-document handles with
/// [`get`](Self::get); a [`detached`](Self::detached) view over a caller-owned
/// value can only descend into plain maps and arrays.
#[derive(Debug, Clone, Copy)]
pub struct PropertyView<'a> {
    value: Option<&'a Value>,
    graph: Option<&'a DocumentGraph>,
}

impl<'a> PropertyView<'a> {
    pub(crate) fn new(value: Option<&'a Value>, graph: &'a DocumentGraph) -> Self {
        Self {
            value,
            graph: Some(graph),
        }
    }

    /// A view over a value that is not stored in any document.
    ///
    /// ```
    /// use docprops_core::{PropertyView, Value};
    ///
    /// let value = Value::from(vec![1, 2, 3]);
    /// assert_eq!(PropertyView::detached(&value).at(2).int(), 3);
    /// ```
    pub fn detached(value: &'a Value) -> Self {
        Self {
            value: Some(value),
            graph: None,
        }
    }

    /// A view over nothing.
    pub fn absent() -> Self {
        Self {
            value: None,
            graph: None,
        }
    }

    pub fn value(&self) -> Option<&'a Value> {
        self.value
    }

    pub fn exists(&self) -> bool {
        self.value.is_some()
    }

    pub fn kind(&self) -> Option<ValueKind> {
        self.value.map(Value::kind)
    }

    pub fn bool(&self) -> bool {
        matches!(self.value, Some(Value::Bool(true)))
    }

    /// Integer value; floating point values are truncated toward zero and
    /// saturate at the `i64` range.
    pub fn int(&self) -> i64 {
        match self.value {
            Some(Value::Int(n)) => *n,
            Some(Value::Float(f)) => *f as i64,
            Some(Value::Double(d)) => *d as i64,
            _ => 0,
        }
    }

    pub fn float(&self) -> f32 {
        match self.value {
            Some(Value::Float(f)) => *f,
            Some(Value::Double(d)) => *d as f32,
            Some(Value::Int(n)) => *n as f32,
            _ => 0.0,
        }
    }

    pub fn double(&self) -> f64 {
        match self.value {
            Some(Value::Double(d)) => *d,
            Some(Value::Float(f)) => f64::from(*f),
            Some(Value::Int(n)) => *n as f64,
            _ => 0.0,
        }
    }

    pub fn string(&self) -> Option<&'a str> {
        match self.value {
            Some(Value::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn date(&self) -> Option<DateTime<Utc>> {
        match self.value {
            Some(Value::Date(d)) => Some(*d),
            _ => None,
        }
    }

    pub fn blob(&self) -> Option<&'a Blob> {
        match self.value {
            Some(Value::Blob(b)) => Some(b),
            _ => None,
        }
    }

    pub fn subdocument(&self) -> Option<SubdocId> {
        match self.value {
            Some(Value::Subdocument(id)) => Some(*id),
            _ => None,
        }
    }

    /// View of `key` inside a sub-document or map; absent for anything else.
    pub fn get(&self, key: &str) -> PropertyView<'a> {
        let value = match self.value {
            Some(Value::Subdocument(id)) => self
                .graph
                .and_then(|g| g.subdocuments().content(*id))
                .and_then(|content| content.raw_get(key)),
            Some(Value::Map(map)) => map.get(key),
            _ => None,
        };
        Self {
            value,
            graph: self.graph,
        }
    }

    /// View of element `index` of an array; absent when out of bounds or when
    /// this is not an array.
    pub fn at(&self, index: usize) -> PropertyView<'a> {
        let value = match self.value {
            Some(Value::Array(items)) => items.get(index),
            _ => None,
        };
        Self {
            value,
            graph: self.graph,
        }
    }
}

impl Default for PropertyView<'_> {
    fn default() -> Self {
        Self::absent()
    }
}
