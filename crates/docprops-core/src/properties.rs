//! The `Properties` façade -- typed access to one container's key/value content.
//!
//! A container is either a top-level document or a sub-document. Values pass
//! through a conversion step in both directions:
//!
//! - **Writing**: sub-document handles are claimed for the target location
//!   (stored by reference, or copied if already attached elsewhere); map
//!   literals become new sub-documents attached at the target; arrays are
//!   converted element by element.
//! - **Reading**: nested maps still in their stored form are materialized into
//!   sub-documents attached at the key they were read from. The resolved form
//!   replaces the stored one, so later reads reuse the same instance.
//!
//! Writes are validated in full before anything changes, so a rejected `set`
//! leaves the container untouched.

use crate::blob::Blob;
use crate::error::{PropsError, Result};
use crate::graph::{ContainerId, DocumentGraph, RawMap};
use crate::persist;
use crate::subdoc::{Location, SubdocId, SubdocumentStore};
use crate::value::Value;
use crate::view::PropertyView;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::debug;

/// Accessor façade over the content of one container.
///
/// Obtained from [`DocumentGraph::properties`] or the `Database` document and
/// sub-document accessors. Setters return `&mut Self` so calls can be chained:
///
/// ```
/// use docprops_core::DocumentGraph;
///
/// let mut graph = DocumentGraph::new();
/// let doc = graph.create_document();
/// let mut props = graph.properties(doc).unwrap();
/// props.set("name", "Jim").unwrap().set("age", 42).unwrap();
/// assert_eq!(props.get_string("name").as_deref(), Some("Jim"));
/// assert_eq!(props.get_int("age"), 42);
/// ```
#[derive(Debug)]
pub struct Properties<'a> {
    graph: &'a mut DocumentGraph,
    owner: ContainerId,
}

impl<'a> Properties<'a> {
    pub(crate) fn new(graph: &'a mut DocumentGraph, owner: ContainerId) -> Self {
        Self { graph, owner }
    }

    /// The container this façade reads and writes.
    pub fn owner(&self) -> ContainerId {
        self.owner
    }

    /// The value stored under `key`, or `None` if the key is missing.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        self.view(key).value().cloned()
    }

    pub fn get_bool(&mut self, key: &str) -> bool {
        self.view(key).bool()
    }

    pub fn get_int(&mut self, key: &str) -> i64 {
        self.view(key).int()
    }

    pub fn get_float(&mut self, key: &str) -> f32 {
        self.view(key).float()
    }

    pub fn get_double(&mut self, key: &str) -> f64 {
        self.view(key).double()
    }

    pub fn get_string(&mut self, key: &str) -> Option<String> {
        self.view(key).string().map(str::to_string)
    }

    pub fn get_date(&mut self, key: &str) -> Option<DateTime<Utc>> {
        self.view(key).date()
    }

    pub fn get_blob(&mut self, key: &str) -> Option<Blob> {
        self.view(key).blob().cloned()
    }

    pub fn get_subdocument(&mut self, key: &str) -> Option<SubdocId> {
        self.view(key).subdocument()
    }

    /// A typed, never-failing view of the value under `key`.
    pub fn view(&mut self, key: &str) -> PropertyView<'_> {
        self.resolve(key);
        let graph: &DocumentGraph = &*self.graph;
        let value = graph.backing(self.owner).and_then(|b| b.raw_get(key));
        PropertyView::new(value, graph)
    }

    /// Store `value` under `key`. See [`Self::set_value`].
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.set_value(key, Some(value.into()))
    }

    /// Store `value` under `key`, or remove the key when `value` is `None`.
    ///
    /// # Errors
    /// Returns `PropsError::InvalidValueType` if the value (or anything nested
    /// in it) is a non-finite number or a sub-document handle that is not live
    /// in this graph. The container is unchanged in that case.
    pub fn set_value(&mut self, key: &str, value: Option<Value>) -> Result<&mut Self> {
        let stored = match value {
            Some(value) => {
                validate(self.graph.subdocuments(), &value).map_err(|reason| {
                    PropsError::InvalidValueType {
                        key: key.to_string(),
                        reason,
                    }
                })?;
                let location = Location::new(self.owner, key);
                Some(convert_for_write(
                    self.graph.subdocuments_mut(),
                    value,
                    &location,
                )?)
            }
            None => None,
        };
        self.backing_mut()?.raw_set(key, stored);
        Ok(self)
    }

    /// Remove `key`. Removing a missing key is a no-op.
    pub fn remove(&mut self, key: &str) -> Result<&mut Self> {
        self.set_value(key, None)
    }

    /// Whether `key` exists, without resolving its value.
    pub fn contains(&self, key: &str) -> bool {
        self.backing().is_some_and(|b| b.raw_contains(key))
    }

    /// Keys of this container in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.backing()
            .map(|b| b.keys().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.backing().map_or(0, RawMap::len)
    }

    /// The whole content of this container, or `None` when it is empty.
    ///
    /// Nested maps are returned as sub-document handles.
    pub fn all_properties(&mut self) -> Option<BTreeMap<String, Value>> {
        self.resolve_all();
        let backing = self.backing()?;
        if backing.is_empty() {
            return None;
        }
        Some(
            backing
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Replace the whole content of this container. `None` clears it.
    ///
    /// Every value is validated before anything is replaced.
    pub fn set_all_properties(
        &mut self,
        properties: Option<BTreeMap<String, Value>>,
    ) -> Result<&mut Self> {
        let properties = properties.unwrap_or_default();
        for (key, value) in &properties {
            validate(self.graph.subdocuments(), value).map_err(|reason| {
                PropsError::InvalidValueType {
                    key: key.clone(),
                    reason,
                }
            })?;
        }

        let mut converted = RawMap::new();
        for (key, value) in properties {
            let location = Location::new(self.owner, key.as_str());
            let stored = convert_for_write(self.graph.subdocuments_mut(), value, &location)?;
            converted.raw_set(&key, Some(stored));
        }

        let backing = self.backing_mut()?;
        backing.clear();
        for (key, value) in converted.into_entries() {
            backing.raw_set(&key, Some(value));
        }
        Ok(self)
    }

    /// Assign `value` to `child_key` of the sub-document stored under `key`.
    ///
    /// Returns `Ok(false)` without changing anything when `key` is missing or
    /// does not hold a sub-document; the write is dropped, not reported.
    pub fn assign_nested(
        &mut self,
        key: &str,
        child_key: &str,
        value: impl Into<Value>,
    ) -> Result<bool> {
        let Some(target) = self.get_subdocument(key) else {
            debug!(owner = %self.owner, key, child_key, "nested assignment on a non-container dropped");
            return Ok(false);
        };
        self.graph.properties(target)?.set(child_key, value)?;
        Ok(true)
    }

    /// Export the full content tree, sub-documents inlined, in the snapshot
    /// JSON form.
    pub fn to_json(&mut self) -> Result<serde_json::Value> {
        self.resolve_all();
        persist::encode_container(&*self.graph, self.owner)
    }

    /// Materialize any stored nested maps under `key`.
    fn resolve(&mut self, key: &str) {
        let owner = self.owner;
        let pending = self
            .backing()
            .and_then(|b| b.raw_get(key))
            .is_some_and(needs_materialize);
        if !pending {
            return;
        }
        let Some(stored) = self.graph.backing_mut(owner).and_then(|b| b.raw_set(key, None)) else {
            return;
        };
        let resolved = materialize(
            self.graph.subdocuments_mut(),
            stored,
            &Location::new(owner, key),
        );
        if let Some(backing) = self.graph.backing_mut(owner) {
            backing.raw_set(key, Some(resolved));
        }
    }

    fn resolve_all(&mut self) {
        for key in self.keys() {
            self.resolve(&key);
        }
    }

    fn backing(&self) -> Option<&RawMap> {
        self.graph.backing(self.owner)
    }

    fn backing_mut(&mut self) -> Result<&mut RawMap> {
        let owner = self.owner;
        self.graph.backing_mut(owner).ok_or_else(|| match owner {
            ContainerId::Document(id) => PropsError::UnknownDocument(id.to_string()),
            ContainerId::Subdocument(id) => PropsError::UnknownSubdocument(id),
        })
    }
}

// ============================================================================
// Conversion
// ============================================================================

/// Check that `value` may be stored in a graph whose arena is `store`.
fn validate(store: &SubdocumentStore, value: &Value) -> std::result::Result<(), String> {
    match value {
        Value::Float(f) if !f.is_finite() => Err(format!("non-finite float {}", f)),
        Value::Double(d) if !d.is_finite() => Err(format!("non-finite double {}", d)),
        Value::Subdocument(id) if !store.contains(*id) => {
            Err(format!("{} is not a live subdocument of this graph", id))
        }
        Value::Array(items) => items.iter().try_for_each(|item| validate(store, item)),
        Value::Map(map) => map.values().try_for_each(|item| validate(store, item)),
        _ => Ok(()),
    }
}

/// Convert a caller-supplied value into its stored form at `location`.
fn convert_for_write(
    store: &mut SubdocumentStore,
    value: Value,
    location: &Location,
) -> Result<Value> {
    match value {
        Value::Subdocument(id) => store.claim(id, location).map(Value::Subdocument),
        Value::Map(map) => {
            let id = store.create_attached(location.clone());
            let mut content = RawMap::new();
            for (key, item) in map {
                let stored = convert_for_write(store, item, &Location::new(id, key.as_str()))?;
                content.raw_set(&key, Some(stored));
            }
            if let Some(slot) = store.content_mut(id) {
                *slot = content;
            }
            debug!(subdoc = %id, location = %location, "map literal stored as subdocument");
            Ok(Value::Subdocument(id))
        }
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| convert_for_write(store, item, &location.element(i)))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        other => Ok(other),
    }
}

/// Whether a stored value still holds nested maps in their stored form.
fn needs_materialize(value: &Value) -> bool {
    match value {
        Value::Map(_) => true,
        Value::Array(items) => items.iter().any(needs_materialize),
        _ => false,
    }
}

/// Turn stored nested maps into sub-documents attached at `location`,
/// recursively, so sub-document content never holds unresolved maps.
fn materialize(store: &mut SubdocumentStore, value: Value, location: &Location) -> Value {
    match value {
        Value::Map(map) => {
            let id = store.create_attached(location.clone());
            let mut content = RawMap::new();
            for (key, item) in map {
                let resolved = materialize(store, item, &Location::new(id, key.as_str()));
                content.raw_set(&key, Some(resolved));
            }
            if let Some(slot) = store.content_mut(id) {
                *slot = content;
            }
            debug!(subdoc = %id, location = %location, "stored map materialized");
            Value::Subdocument(id)
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| materialize(store, item, &location.element(i)))
                .collect(),
        ),
        other => other,
    }
}
