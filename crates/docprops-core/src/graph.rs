//! The in-memory document graph: top-level document backings plus the
//! sub-document arena they reference.

use crate::error::{PropsError, Result};
use crate::properties::Properties;
use crate::subdoc::{SubdocId, SubdocumentStore};
use crate::value::Value;
use crate::view::PropertyView;
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a top-level document within one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocId(u32);

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}

/// Either kind of property container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContainerId {
    Document(DocId),
    Subdocument(SubdocId),
}

impl From<DocId> for ContainerId {
    fn from(id: DocId) -> Self {
        ContainerId::Document(id)
    }
}

impl From<SubdocId> for ContainerId {
    fn from(id: SubdocId) -> Self {
        ContainerId::Subdocument(id)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerId::Document(id) => id.fmt(f),
            ContainerId::Subdocument(id) => id.fmt(f),
        }
    }
}

/// Backing key/value map of one container.
///
/// This is the raw storage contract: values go in and come out exactly as
/// given, with no validation or sub-document resolution. Nested maps read
/// from storage sit here as [`Value::Map`] until first accessed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMap {
    entries: BTreeMap<String, Value>,
}

impl RawMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw_get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Store `value` under `key`, or remove the key when `value` is `None`.
    /// Returns the previous value.
    pub fn raw_set(&mut self, key: &str, value: Option<Value>) -> Option<Value> {
        match value {
            Some(value) => self.entries.insert(key.to_string(), value),
            None => self.entries.remove(key),
        }
    }

    pub fn raw_contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn into_entries(self) -> BTreeMap<String, Value> {
        self.entries
    }
}

impl From<BTreeMap<String, Value>> for RawMap {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Self { entries }
    }
}

/// All containers that can reference one another.
///
/// Sub-documents can be shared between any documents of the same graph; a
/// handle from a different graph is treated as invalid.
#[derive(Debug, Default)]
pub struct DocumentGraph {
    documents: BTreeMap<DocId, RawMap>,
    next_document: u32,
    subdocuments: SubdocumentStore,
}

impl DocumentGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty top-level document.
    pub fn create_document(&mut self) -> DocId {
        self.insert_document(RawMap::new())
    }

    /// Add a top-level document with existing (possibly unresolved) content.
    pub fn insert_document(&mut self, content: RawMap) -> DocId {
        let id = DocId(self.next_document);
        self.next_document += 1;
        self.documents.insert(id, content);
        id
    }

    /// Drop a document's content. Sub-documents it referenced stay in the
    /// arena until the next [`Self::sweep`].
    pub fn remove_document(&mut self, id: DocId) -> Option<RawMap> {
        self.documents.remove(&id)
    }

    pub fn document_ids(&self) -> impl Iterator<Item = DocId> + '_ {
        self.documents.keys().copied()
    }

    /// Create an empty, unattached sub-document.
    pub fn new_subdocument(&mut self) -> SubdocId {
        self.subdocuments.create()
    }

    pub fn subdocuments(&self) -> &SubdocumentStore {
        &self.subdocuments
    }

    pub fn subdocuments_mut(&mut self) -> &mut SubdocumentStore {
        &mut self.subdocuments
    }

    pub fn contains(&self, owner: ContainerId) -> bool {
        self.backing(owner).is_some()
    }

    pub fn backing(&self, owner: ContainerId) -> Option<&RawMap> {
        match owner {
            ContainerId::Document(id) => self.documents.get(&id),
            ContainerId::Subdocument(id) => self.subdocuments.content(id),
        }
    }

    pub(crate) fn backing_mut(&mut self, owner: ContainerId) -> Option<&mut RawMap> {
        match owner {
            ContainerId::Document(id) => self.documents.get_mut(&id),
            ContainerId::Subdocument(id) => self.subdocuments.content_mut(id),
        }
    }

    /// The accessor façade over one container.
    pub fn properties(&mut self, owner: impl Into<ContainerId>) -> Result<Properties<'_>> {
        let owner = owner.into();
        if !self.contains(owner) {
            return Err(match owner {
                ContainerId::Document(id) => PropsError::UnknownDocument(id.to_string()),
                ContainerId::Subdocument(id) => PropsError::UnknownSubdocument(id),
            });
        }
        Ok(Properties::new(self, owner))
    }

    /// A view over a value obtained from this graph, able to follow its
    /// sub-document handles.
    pub fn view<'a>(&'a self, value: &'a Value) -> PropertyView<'a> {
        PropertyView::new(Some(value), self)
    }

    /// Free sub-documents no longer reachable from any document.
    pub fn sweep(&mut self) -> usize {
        let roots: Vec<&Value> = self
            .documents
            .values()
            .flat_map(|content| content.iter().map(|(_, v)| v))
            .collect();
        self.subdocuments.retain_reachable(roots)
    }
}
