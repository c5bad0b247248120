//! Storage abstraction for the chunk collection.
//!
//! The [`ChunkStore`] trait covers everything ingestion and retrieval need
//! from a persistent vector collection: append records with their vectors,
//! run a nearest-neighbour query, count records, and release resources.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{ChunkRecord, RetrievedChunk};

/// A named collection of embedded chunks.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`add`](ChunkStore::add) | Append records and their vectors |
/// | [`query`](ChunkStore::query) | `k` nearest records by cosine distance, ascending |
/// | [`count`](ChunkStore::count) | Number of stored records |
/// | [`close`](ChunkStore::close) | Flush and release the backing handle |
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Append `records`; `vectors[i]` is the embedding of `records[i]`.
    ///
    /// Adding a record whose ID already exists is an error; the whole call
    /// is rejected.
    async fn add(&self, records: &[ChunkRecord], vectors: &[Vec<f32>]) -> Result<()>;

    /// Return up to `k` records ordered by ascending cosine distance.
    ///
    /// Fewer than `k` records come back when the collection is smaller.
    /// Equal distances keep insertion order.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedChunk>>;

    /// Number of records in the collection.
    async fn count(&self) -> Result<usize>;

    /// Release the backing resources. Idempotent.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
