//! # docprops-core
//!
//! Typed dynamic property model for JSON-compatible documents.
//!
//! A document is a tree of scalars, arrays, blobs, and nested sub-documents
//! read and written through type-safe accessors. Nested maps become
//! sub-documents with single-location ownership: storing a sub-document at a
//! second location stores an independent deep copy, so two keys never share
//! one mutable tree.
//!
//! ## Quick start
//!
//! ```rust
//! use docprops_core::Database;
//! use serde_json::json;
//!
//! let mut db = Database::new("people");
//! let mut doc = db.document("jim").unwrap();
//! doc.set("name", "Jim").unwrap();
//! doc.set("address", json!({"city": "galaxy city", "zip": 12345})).unwrap();
//!
//! assert_eq!(doc.view("address").get("zip").int(), 12345);
//! assert_eq!(doc.view("missing").int(), 0);
//! ```
//!
//! ## Modules
//!
//! - [`value`] -- `Value`, the closed set of storable values
//! - [`properties`] -- `Properties`, typed get/set over one container
//! - [`view`] -- `PropertyView`, never-failing typed reads
//! - [`subdoc`] -- sub-document arena with attach/copy rules
//! - [`graph`] -- documents plus sub-documents that may reference each other
//! - [`database`] -- named documents with save/revert/reopen
//! - [`persist`] -- JSON snapshot codec
//! - [`blob`], [`date`] -- binary attachments and the ISO-8601 date format
//! - [`error`] -- Error types

pub mod blob;
pub mod database;
pub mod date;
pub mod error;
pub mod graph;
pub mod persist;
pub mod properties;
pub mod subdoc;
pub mod value;
pub mod view;

pub use blob::{Blob, BlobReader};
pub use database::{Database, DatabaseOptions, Snapshot};
pub use error::PropsError;
pub use graph::{ContainerId, DocId, DocumentGraph, RawMap};
pub use properties::Properties;
pub use subdoc::{Location, SubdocId, SubdocumentStore};
pub use value::{Value, ValueKind};
pub use view::PropertyView;
