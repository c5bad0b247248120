//! Core data models shared by ingestion and retrieval.
//!
//! A [`Document`] is the unit handed over by a document source; it is never
//! persisted directly. Ingestion turns it into [`ChunkRecord`]s, and the
//! store hands them back as [`RetrievedChunk`]s with a distance attached.

use serde::Serialize;
use serde_json::Value;

/// Free-form metadata attached to documents and chunks.
pub type Metadata = serde_json::Map<String, Value>;

/// Metadata key naming the originating file.
pub const SOURCE_KEY: &str = "source";
/// Metadata key holding a chunk's character count.
pub const LENGTH_KEY: &str = "length";

/// A document produced by a document source (directory scan, PDF extraction).
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub content: String,
    pub metadata: Metadata,
}

impl Document {
    /// Build a document whose metadata carries only `source`.
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert(SOURCE_KEY.to_string(), Value::String(source.into()));
        Self {
            content: content.into(),
            metadata,
        }
    }

    /// The `source` metadata field, if present and a string.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).and_then(Value::as_str)
    }
}

/// A chunk ready to be embedded and written to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    /// `"{source}_{index}"`.
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
}

/// A stored chunk returned by a nearest-neighbour query.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    /// Cosine distance to the query vector (lower is closer).
    pub distance: f32,
}

impl RetrievedChunk {
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).and_then(Value::as_str)
    }
}
