//! Distance-filtered semantic retrieval.
//!
//! Embeds the query, asks the store for the `n_results` nearest chunks and
//! keeps only those with `distance <= distance_threshold`. The store's
//! ascending-distance order is preserved.
//!
//! "Nothing relevant" (empty collection, everything beyond the threshold) is
//! an empty `Ok`. A failing embedder or store is a [`RetrievalError`], so
//! callers can tell an outage apart from a question the knowledge base
//! cannot answer.

use thiserror::Error;
use tracing::debug;

use crate::embedding::{embed_query, Embedder};
use crate::models::RetrievedChunk;
use crate::store::ChunkStore;

/// Parameters for [`search`].
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub n_results: usize,
    /// Upper bound on cosine distance, inclusive.
    pub distance_threshold: f32,
}

/// Retrieval infrastructure failure.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("query embedding failed: {0:#}")]
    Embedding(anyhow::Error),
    #[error("vector store query failed: {0:#}")]
    Store(anyhow::Error),
}

/// Return the stored chunks closest to `req.query`, within the threshold.
pub async fn search<S, E>(
    store: &S,
    embedder: &E,
    req: &SearchRequest,
) -> Result<Vec<RetrievedChunk>, RetrievalError>
where
    S: ChunkStore + ?Sized,
    E: Embedder + ?Sized,
{
    if req.query.trim().is_empty() || req.n_results == 0 {
        return Ok(Vec::new());
    }

    let vector = embed_query(embedder, &req.query)
        .await
        .map_err(RetrievalError::Embedding)?;

    let candidates = store
        .query(&vector, req.n_results)
        .await
        .map_err(RetrievalError::Store)?;

    let total = candidates.len();
    let results: Vec<RetrievedChunk> = candidates
        .into_iter()
        .filter(|c| c.distance <= req.distance_threshold)
        .collect();

    debug!(
        candidates = total,
        kept = results.len(),
        threshold = req.distance_threshold,
        "Filtered retrieval candidates"
    );

    Ok(results)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use async_trait::async_trait;

    use super::*;
    use crate::chunk::ChunkingParams;
    use crate::embedding::HashingEmbedder;
    use crate::ingest::ingest_documents;
    use crate::models::{ChunkRecord, Document};
    use crate::store::memory::InMemoryStore;

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        fn model_name(&self) -> &str {
            "failing"
        }
        fn dims(&self) -> usize {
            4
        }
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            anyhow::bail!("model not loaded")
        }
    }

    struct FailingStore;

    #[async_trait]
    impl ChunkStore for FailingStore {
        async fn add(&self, _records: &[ChunkRecord], _vectors: &[Vec<f32>]) -> Result<()> {
            anyhow::bail!("disk full")
        }
        async fn query(&self, _vector: &[f32], _k: usize) -> Result<Vec<RetrievedChunk>> {
            anyhow::bail!("database is locked")
        }
        async fn count(&self) -> Result<usize> {
            Ok(0)
        }
    }

    fn request(query: &str, n: usize, threshold: f32) -> SearchRequest {
        SearchRequest {
            query: query.to_string(),
            n_results: n,
            distance_threshold: threshold,
        }
    }

    async fn seeded_store(embedder: &HashingEmbedder) -> InMemoryStore {
        let store = InMemoryStore::new();
        let docs = vec![
            Document::new(
                "The population of Nairobi County is 4.4 million.",
                "census.txt",
            ),
            Document::new(
                "Maize yields improved across western highlands during 2019.",
                "agri.txt",
            ),
            Document::new("Tea exports rose sharply last quarter.", "trade.txt"),
        ];
        let params = ChunkingParams::new(800, 150).unwrap();
        ingest_documents(&store, embedder, &docs, &params)
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_finds_relevant_chunk() {
        let embedder = HashingEmbedder::new(512);
        let store = seeded_store(&embedder).await;

        let results = search(
            &store,
            &embedder,
            &request("What is the population of Nairobi County?", 5, 0.4),
        )
        .await
        .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source(), Some("census.txt"));
        assert!(results[0].distance <= 0.4);
    }

    #[tokio::test]
    async fn test_results_sorted_and_bounded() {
        let embedder = HashingEmbedder::new(512);
        let store = seeded_store(&embedder).await;

        let results = search(&store, &embedder, &request("population exports", 2, 2.0))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].distance <= results[1].distance);
    }

    #[tokio::test]
    async fn test_empty_store_is_empty_result() {
        let embedder = HashingEmbedder::new(64);
        let store = InMemoryStore::new();
        let results = search(&store, &embedder, &request("anything", 5, 0.4))
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_all_beyond_threshold_is_empty_result() {
        let embedder = HashingEmbedder::new(512);
        let store = seeded_store(&embedder).await;
        let results = search(&store, &embedder, &request("quantum chromodynamics", 5, 0.4))
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_blank_query_and_zero_results() {
        let embedder = HashingEmbedder::new(64);
        let store = seeded_store(&embedder).await;
        assert!(search(&store, &embedder, &request("   ", 5, 2.0))
            .await
            .unwrap()
            .is_empty());
        assert!(search(&store, &embedder, &request("population", 0, 2.0))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_is_retrieval_error() {
        let store = InMemoryStore::new();
        let err = search(&store, &FailingEmbedder, &request("population", 5, 0.4))
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::Embedding(_)));
        assert!(err.to_string().contains("model not loaded"));
    }

    #[tokio::test]
    async fn test_store_failure_is_retrieval_error() {
        let embedder = HashingEmbedder::new(64);
        let err = search(&FailingStore, &embedder, &request("population", 5, 0.4))
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::Store(_)));
        assert!(err.to_string().contains("database is locked"));
    }
}
