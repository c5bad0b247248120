//! Ingestion orchestrator.
//!
//! Turns documents into chunk records, then embeds and appends them to a
//! [`ChunkStore`] in fixed-size batches.
//!
//! # ID scheme
//!
//! Chunk IDs are `"{source}_{index}"`. The index is a single running counter
//! seeded from the collection's `count()` when the call starts and advanced
//! across every document of the call. Re-ingesting the same files therefore
//! appends a second copy under fresh IDs.

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::chunk::{chunk_text, ChunkingParams};
use crate::embedding::Embedder;
use crate::models::{ChunkRecord, Document, LENGTH_KEY, SOURCE_KEY};
use crate::store::ChunkStore;

/// Chunks per embed+insert round trip.
pub const INGEST_BATCH_SIZE: usize = 500;

/// Outcome of a successful [`ingest_documents`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    pub batches: usize,
    /// Collection size after the call.
    pub total: usize,
}

/// Placeholder source for a document that carries none.
fn unknown_source() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("unknown_doc_{}.txt", &id[..6])
}

/// Chunk `documents` and build their records, numbering from `start_index`.
///
/// Each record's metadata is the parent document's metadata with `source`
/// and `length` (chunk character count) set on top.
pub fn prepare_chunks(
    documents: &[Document],
    params: &ChunkingParams,
    start_index: usize,
) -> Vec<ChunkRecord> {
    let mut records = Vec::new();
    let mut index = start_index;

    for doc in documents {
        let source = doc
            .source()
            .map(str::to_string)
            .unwrap_or_else(unknown_source);

        for text in chunk_text(&doc.content, params) {
            let mut metadata = doc.metadata.clone();
            metadata.insert(SOURCE_KEY.to_string(), Value::String(source.clone()));
            metadata.insert(
                LENGTH_KEY.to_string(),
                Value::from(text.chars().count() as u64),
            );
            records.push(ChunkRecord {
                id: format!("{}_{}", source, index),
                text,
                metadata,
            });
            index += 1;
        }
    }

    records
}

/// Chunk, embed and store `documents`.
///
/// Batches are embedded and written one after another. An embedding or
/// store error aborts the call; batches written before it stay in the
/// collection.
pub async fn ingest_documents<S, E>(
    store: &S,
    embedder: &E,
    documents: &[Document],
    params: &ChunkingParams,
) -> Result<IngestReport>
where
    S: ChunkStore + ?Sized,
    E: Embedder + ?Sized,
{
    let start = store.count().await.context("Failed to count collection")?;
    let records = prepare_chunks(documents, params, start);

    info!(
        documents = documents.len(),
        chunks = records.len(),
        "Chunked documents"
    );

    let mut batches = 0usize;
    for (i, batch) in records.chunks(INGEST_BATCH_SIZE).enumerate() {
        let texts: Vec<String> = batch.iter().map(|r| r.text.clone()).collect();
        let vectors = embedder
            .embed(&texts)
            .await
            .with_context(|| format!("Failed to embed batch {}", i + 1))?;
        if vectors.len() != batch.len() {
            anyhow::bail!(
                "Embedder returned {} vectors for {} chunks",
                vectors.len(),
                batch.len()
            );
        }
        store
            .add(batch, &vectors)
            .await
            .with_context(|| format!("Failed to store batch {}", i + 1))?;
        batches += 1;
        debug!(batch = i + 1, size = batch.len(), "Stored batch");
    }

    let total = store.count().await.context("Failed to count collection")?;
    info!(batches, total, "Ingestion complete");

    Ok(IngestReport {
        documents: documents.len(),
        chunks: records.len(),
        batches,
        total,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::embedding::HashingEmbedder;
    use crate::models::Metadata;
    use crate::store::memory::InMemoryStore;

    /// Counts embed calls and fails once `fail_on` is reached.
    struct CountingEmbedder {
        calls: AtomicUsize,
        fail_on: Option<usize>,
    }

    impl CountingEmbedder {
        fn new(fail_on: Option<usize>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on,
            }
        }
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        fn model_name(&self) -> &str {
            "counting"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if Some(call) == self.fail_on {
                anyhow::bail!("embedding backend down");
            }
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    fn params() -> ChunkingParams {
        ChunkingParams::new(800, 150).unwrap()
    }

    /// One document per chunk: short texts never split.
    fn short_docs(n: usize) -> Vec<Document> {
        (0..n)
            .map(|i| Document::new(format!("note {}", i), format!("n{}.txt", i)))
            .collect()
    }

    #[test]
    fn test_prepare_chunks_ids_and_metadata() {
        let mut doc = Document::new("Short body.", "report.pdf");
        doc.metadata
            .insert("total_pages".to_string(), Value::from(3));
        let other = Document::new("Another.", "notes.txt");

        let records = prepare_chunks(&[doc, other], &params(), 7);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "report.pdf_7");
        assert_eq!(records[1].id, "notes.txt_8");
        assert_eq!(records[0].metadata["source"], "report.pdf");
        assert_eq!(records[0].metadata["length"], 11);
        assert_eq!(records[0].metadata["total_pages"], 3);
    }

    #[test]
    fn test_prepare_chunks_unknown_source() {
        let doc = Document {
            content: "orphan text".to_string(),
            metadata: Metadata::new(),
        };
        let records = prepare_chunks(&[doc], &params(), 0);
        let source = records[0].metadata["source"].as_str().unwrap();
        assert!(source.starts_with("unknown_doc_"));
        assert!(source.ends_with(".txt"));
        assert_eq!(source.len(), "unknown_doc_".len() + 6 + ".txt".len());
        assert_eq!(records[0].id, format!("{}_0", source));
    }

    #[test]
    fn test_prepare_chunks_skips_blank_documents() {
        let docs = vec![Document::new("   \n\n  ", "blank.txt")];
        assert!(prepare_chunks(&docs, &params(), 0).is_empty());
    }

    #[tokio::test]
    async fn test_ingest_increases_count_by_chunk_total() {
        let store = InMemoryStore::new();
        let embedder = HashingEmbedder::new(64);
        let long = "word ".repeat(400);
        let docs = vec![
            Document::new("The population of Nairobi County is 4.4 million.", "a.txt"),
            Document::new(long.clone(), "b.txt"),
        ];
        let expected = prepare_chunks(&docs, &params(), 0).len();
        assert!(expected > 2);

        let report = ingest_documents(&store, &embedder, &docs, &params())
            .await
            .unwrap();
        assert_eq!(report.chunks, expected);
        assert_eq!(report.total, expected);
        assert_eq!(store.count().await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_ingest_batches_of_500() {
        let store = InMemoryStore::new();
        let embedder = CountingEmbedder::new(None);
        let report = ingest_documents(&store, &embedder, &short_docs(1201), &params())
            .await
            .unwrap();
        assert_eq!(report.batches, 3);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
        assert_eq!(store.count().await.unwrap(), 1201);
    }

    #[tokio::test]
    async fn test_reingest_appends_duplicates_with_new_ids() {
        let store = InMemoryStore::new();
        let embedder = HashingEmbedder::new(64);
        let docs = vec![Document::new("Same content.", "same.txt")];

        ingest_documents(&store, &embedder, &docs, &params())
            .await
            .unwrap();
        let report = ingest_documents(&store, &embedder, &docs, &params())
            .await
            .unwrap();
        assert_eq!(report.total, 2);

        let hits = store
            .query(&embedder.embed_one("Same content."), 10)
            .await
            .unwrap();
        let mut ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["same.txt_0", "same.txt_1"]);
    }

    #[tokio::test]
    async fn test_failure_keeps_earlier_batches() {
        let store = InMemoryStore::new();
        let embedder = CountingEmbedder::new(Some(2));
        let err = ingest_documents(&store, &embedder, &short_docs(700), &params())
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("embedding backend down"));
        assert_eq!(store.count().await.unwrap(), INGEST_BATCH_SIZE);
    }

    #[tokio::test]
    async fn test_ingest_nothing() {
        let store = InMemoryStore::new();
        let embedder = CountingEmbedder::new(None);
        let report = ingest_documents(&store, &embedder, &[], &params())
            .await
            .unwrap();
        assert_eq!(report, IngestReport::default());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }
}
