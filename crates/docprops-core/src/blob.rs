//! Binary attachments stored as property values.

use bytes::{Buf, Bytes};
use std::fmt;
use std::io::Read;

/// An opaque binary value with a MIME content type.
///
/// Cloning a `Blob` is cheap: clones share the same immutable byte buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct Blob {
    content_type: String,
    content: Bytes,
}

impl Blob {
    /// Create a blob from a content type and its bytes.
    pub fn new(content_type: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            content_type: content_type.into(),
            content: content.into(),
        }
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Length of the content in bytes.
    pub fn length(&self) -> usize {
        self.content.len()
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Open a sequential reader over the content.
    ///
    /// Each call returns an independent reader positioned at the first byte;
    /// readers are never shared between calls.
    pub fn open_read_stream(&self) -> BlobReader {
        BlobReader {
            inner: self.content.clone().reader(),
        }
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("content_type", &self.content_type)
            .field("length", &self.content.len())
            .finish()
    }
}

/// Sequential byte source returned by [`Blob::open_read_stream`].
pub struct BlobReader {
    inner: bytes::buf::Reader<Bytes>,
}

impl Read for BlobReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}
