//! In-memory document database -- the storage side of the property model.
//!
//! `Database` keeps named documents in a [`DocumentGraph`] while they are open
//! and a JSON body per document once saved. Saved bodies are what survive
//! [`Database::reopen`] and what [`Database::save_file`] writes to disk.
//!
//! ```
//! use docprops_core::Database;
//!
//! let mut db = Database::new("example");
//! db.document("doc1").unwrap().set("name", "Jim").unwrap();
//! db.save("doc1").unwrap();
//! db.reopen();
//! assert_eq!(db.document("doc1").unwrap().get_string("name").as_deref(), Some("Jim"));
//! ```

use crate::error::{PropsError, Result};
use crate::graph::{DocId, DocumentGraph};
use crate::persist;
use crate::properties::Properties;
use crate::subdoc::SubdocId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info};

/// Tunables for a [`Database`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DatabaseOptions {
    /// Sweep sub-documents no longer referenced by any open document after
    /// every successful save. Handles to swept instances become invalid.
    pub sweep_on_save: bool,
}

/// Serializable form of every saved document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub documents: BTreeMap<String, serde_json::Value>,
}

/// A named collection of documents.
///
/// Overwriting or removing a sub-document leaves the old instance in the arena
/// until a sweep. Sweeps run on [`Self::revert`] and [`Self::delete`], on every
/// save when [`DatabaseOptions::sweep_on_save`] is set, and on [`Self::compact`].
/// A long-lived database that only edits and saves grows until one of those runs.
#[derive(Debug)]
pub struct Database {
    name: String,
    options: DatabaseOptions,
    graph: DocumentGraph,
    open: BTreeMap<String, DocId>,
    saved: BTreeMap<String, serde_json::Value>,
    deleted: BTreeSet<String>,
}

impl Database {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_options(name, DatabaseOptions::default())
    }

    pub fn with_options(name: impl Into<String>, options: DatabaseOptions) -> Self {
        Self {
            name: name.into(),
            options,
            graph: DocumentGraph::new(),
            open: BTreeMap::new(),
            saved: BTreeMap::new(),
            deleted: BTreeSet::new(),
        }
    }

    /// Build a database whose saved documents are those of `snapshot`.
    /// Nothing is decoded until a document is opened.
    pub fn from_snapshot(name: impl Into<String>, snapshot: Snapshot) -> Self {
        let mut db = Self::new(name);
        db.saved = snapshot.documents;
        db
    }

    /// Saved documents only; unsaved changes are not included.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            documents: self.saved.clone(),
        }
    }

    /// Load a snapshot file. The database is named after the file stem.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&text)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!(path = %path.display(), documents = snapshot.documents.len(), "snapshot loaded");
        Ok(Self::from_snapshot(name, snapshot))
    }

    /// Write every saved document to a snapshot file.
    pub fn save_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(&self.snapshot())?;
        std::fs::write(path, text)?;
        info!(path = %path.display(), documents = self.saved.len(), "snapshot written");
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> DatabaseOptions {
        self.options
    }

    /// The graph holding every open document and sub-document.
    pub fn graph(&self) -> &DocumentGraph {
        &self.graph
    }

    /// Properties of document `id`, opening it first.
    ///
    /// A document that was never saved starts out empty.
    ///
    /// # Errors
    /// Returns `PropsError::Corrupt` if the saved body cannot be decoded.
    pub fn document(&mut self, id: &str) -> Result<Properties<'_>> {
        let doc = self.open_document(id)?;
        self.graph.properties(doc)
    }

    /// Properties of a sub-document of this database.
    pub fn subdocument(&mut self, id: SubdocId) -> Result<Properties<'_>> {
        self.graph.properties(id)
    }

    /// Create an empty, unattached sub-document.
    pub fn new_subdocument(&mut self) -> SubdocId {
        self.graph.new_subdocument()
    }

    /// Free an unattached sub-document. Returns `false` if it is attached or unknown.
    pub fn release_subdocument(&mut self, id: SubdocId) -> bool {
        self.graph.subdocuments_mut().release(id)
    }

    /// Persist the current content of document `id`.
    pub fn save(&mut self, id: &str) -> Result<()> {
        let doc = self.open_document(id)?;
        let body = persist::encode_container(&self.graph, doc.into())?;
        self.saved.insert(id.to_string(), body);
        self.deleted.remove(id);
        debug!(db = %self.name, doc = id, "document saved");
        if self.options.sweep_on_save {
            self.compact();
        }
        Ok(())
    }

    /// Discard unsaved changes to document `id`.
    ///
    /// Sub-documents reachable only from the discarded state are swept, so
    /// handles to them become invalid.
    pub fn revert(&mut self, id: &str) {
        if let Some(doc) = self.open.remove(id) {
            self.graph.remove_document(doc);
            let freed = self.compact();
            debug!(db = %self.name, doc = id, freed, "document reverted");
        }
    }

    /// Whether document `id` has been saved.
    pub fn exists(&self, id: &str) -> bool {
        self.saved.contains_key(id)
    }

    pub fn is_deleted(&self, id: &str) -> bool {
        self.deleted.contains(id)
    }

    /// Delete document `id`, saved and open state alike.
    ///
    /// # Errors
    /// Returns `PropsError::UnknownDocument` if the document was never saved.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        if self.saved.remove(id).is_none() {
            return Err(PropsError::UnknownDocument(id.to_string()));
        }
        self.revert(id);
        self.deleted.insert(id.to_string());
        debug!(db = %self.name, doc = id, "document deleted");
        Ok(())
    }

    /// Drop every open document and sub-document, keeping only saved state.
    ///
    /// All sub-document handles obtained before the call become invalid.
    pub fn reopen(&mut self) {
        self.graph = DocumentGraph::new();
        self.open.clear();
        debug!(db = %self.name, saved = self.saved.len(), "database reopened");
    }

    /// Free sub-documents no longer referenced from any open document.
    pub fn compact(&mut self) -> usize {
        self.graph.sweep()
    }

    /// Ids of all saved or open documents, sorted.
    pub fn document_ids(&self) -> Vec<String> {
        let ids: BTreeSet<&String> = self.saved.keys().chain(self.open.keys()).collect();
        ids.into_iter().cloned().collect()
    }

    fn open_document(&mut self, id: &str) -> Result<DocId> {
        if let Some(doc) = self.open.get(id) {
            return Ok(*doc);
        }
        let content = match self.saved.get(id) {
            Some(body) => persist::decode_document(id, body)?,
            None => Default::default(),
        };
        let doc = self.graph.insert_document(content);
        self.open.insert(id.to_string(), doc);
        debug!(db = %self.name, doc = id, graph_id = %doc, "document opened");
        Ok(doc)
    }
}
