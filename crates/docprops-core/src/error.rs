//! Error types for property access and document persistence.
//!
//! Only hard failures live here. A typed getter reading an incompatible value
//! falls back to its default, and a sub-document stored at a second location is
//! copied; neither surfaces as an error.

use crate::subdoc::SubdocId;
use thiserror::Error;

/// Errors that can occur while writing properties or loading/saving documents.
#[derive(Error, Debug)]
pub enum PropsError {
    /// A `set` or bulk set was given a value outside the JSON-compatible set.
    /// The container is left exactly as it was before the call.
    #[error("Invalid value for key '{key}': {reason}")]
    InvalidValueType { key: String, reason: String },

    /// The sub-document handle does not refer to a live instance.
    #[error("Unknown subdocument: {0}")]
    UnknownSubdocument(SubdocId),

    /// The container id does not refer to a live document.
    #[error("Unknown document: {0}")]
    UnknownDocument(String),

    /// A stored document could not be decoded back into values.
    #[error("Corrupt document '{id}': {message}")]
    Corrupt { id: String, message: String },

    /// Snapshot JSON could not be parsed or produced.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Snapshot file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout docprops-core.
pub type Result<T> = std::result::Result<T, PropsError>;
