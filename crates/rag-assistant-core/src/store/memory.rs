//! In-memory [`ChunkStore`] implementation for tests.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`. Queries are
//! brute-force cosine distance over every stored vector.

use std::collections::HashSet;
use std::sync::RwLock;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::embedding::cosine_distance;
use crate::models::{ChunkRecord, RetrievedChunk};

use super::ChunkStore;

struct StoredChunk {
    record: ChunkRecord,
    vector: Vec<f32>,
}

/// In-memory chunk collection.
pub struct InMemoryStore {
    chunks: RwLock<Vec<StoredChunk>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChunkStore for InMemoryStore {
    async fn add(&self, records: &[ChunkRecord], vectors: &[Vec<f32>]) -> Result<()> {
        if records.len() != vectors.len() {
            bail!(
                "Record/vector count mismatch: {} records, {} vectors",
                records.len(),
                vectors.len()
            );
        }

        let mut stored = self
            .chunks
            .write()
            .map_err(|_| anyhow!("In-memory store lock poisoned"))?;

        let mut seen: HashSet<&str> = stored.iter().map(|s| s.record.id.as_str()).collect();
        for r in records {
            if !seen.insert(r.id.as_str()) {
                bail!("Duplicate chunk id: {}", r.id);
            }
        }
        drop(seen);

        for (record, vector) in records.iter().zip(vectors.iter()) {
            stored.push(StoredChunk {
                record: record.clone(),
                vector: vector.clone(),
            });
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        let stored = self
            .chunks
            .read()
            .map_err(|_| anyhow!("In-memory store lock poisoned"))?;

        let mut scored: Vec<(f32, usize)> = stored
            .iter()
            .enumerate()
            .map(|(i, s)| (cosine_distance(vector, &s.vector), i))
            .collect();
        scored.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(distance, i)| {
                let r = &stored[i].record;
                RetrievedChunk {
                    id: r.id.clone(),
                    text: r.text.clone(),
                    metadata: r.metadata.clone(),
                    distance,
                }
            })
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        let stored = self
            .chunks
            .read()
            .map_err(|_| anyhow!("In-memory store lock poisoned"))?;
        Ok(stored.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Metadata;

    fn record(id: &str, text: &str) -> ChunkRecord {
        ChunkRecord {
            id: id.to_string(),
            text: text.to_string(),
            metadata: Metadata::new(),
        }
    }

    #[tokio::test]
    async fn test_query_orders_by_distance() {
        let store = InMemoryStore::new();
        store
            .add(
                &[record("a", "far"), record("b", "near"), record("c", "mid")],
                &[vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]],
            )
            .await
            .unwrap();

        let results = store.query(&[1.0, 0.0], 10).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert!(results[0].distance < 1e-6);
        assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[tokio::test]
    async fn test_query_truncates_to_k_and_handles_empty() {
        let store = InMemoryStore::new();
        assert!(store.query(&[1.0], 5).await.unwrap().is_empty());

        store
            .add(
                &[record("a", "x"), record("b", "y")],
                &[vec![1.0], vec![1.0]],
            )
            .await
            .unwrap();
        let results = store.query(&[1.0], 1).await.unwrap();
        assert_eq!(results.len(), 1);
        // ties keep insertion order
        assert_eq!(results[0].id, "a");
    }

    #[tokio::test]
    async fn test_add_rejects_duplicates_and_mismatch() {
        let store = InMemoryStore::new();
        store.add(&[record("a", "x")], &[vec![1.0]]).await.unwrap();

        assert!(store.add(&[record("a", "y")], &[vec![1.0]]).await.is_err());
        assert!(store
            .add(&[record("b", "y"), record("b", "z")], &[vec![1.0], vec![1.0]])
            .await
            .is_err());
        assert!(store.add(&[record("c", "y")], &[]).await.is_err());
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
