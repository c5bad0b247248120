//! SQLite-backed [`ChunkStore`] implementation.
//!
//! Each collection is a set of rows in the `chunks` table keyed by
//! `(collection, id)`, plus one row in `collections` recording the embedding
//! model and dimensionality it was built with. Vectors are little-endian f32
//! BLOBs; queries are brute-force cosine distance in Rust.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use rag_assistant_core::embedding::{blob_to_vec, cosine_distance, vec_to_blob};
use rag_assistant_core::models::{ChunkRecord, Metadata, RetrievedChunk};
use rag_assistant_core::store::ChunkStore;

use crate::config::Config;
use crate::db;
use crate::migrate;

/// A named collection inside the SQLite database.
pub struct SqliteChunkStore {
    pool: SqlitePool,
    collection: String,
    dims: usize,
}

impl SqliteChunkStore {
    /// Open `collection`, creating it when absent.
    ///
    /// An existing collection built with a different embedding model or
    /// dimensionality is rejected: its vectors are not comparable with the
    /// configured embedder's.
    pub async fn open(
        pool: SqlitePool,
        collection: &str,
        embedding_model: &str,
        dims: usize,
    ) -> Result<Self> {
        migrate::run_migrations(&pool).await?;

        let existing = sqlx::query("SELECT embedding_model, dims FROM collections WHERE name = ?")
            .bind(collection)
            .fetch_optional(&pool)
            .await?;

        match existing {
            Some(row) => {
                let stored_model: String = row.get("embedding_model");
                let stored_dims: i64 = row.get("dims");
                if stored_model != embedding_model || stored_dims as usize != dims {
                    bail!(
                        "Collection '{}' was built with embedding model '{}' ({} dims), \
                         but the configured embedder is '{}' ({} dims). \
                         Use the original model or a new collection_name.",
                        collection,
                        stored_model,
                        stored_dims,
                        embedding_model,
                        dims
                    );
                }
                debug!(collection, "Opened existing collection");
            }
            None => {
                sqlx::query(
                    "INSERT INTO collections (name, embedding_model, dims, created_at) VALUES (?, ?, ?, ?)",
                )
                .bind(collection)
                .bind(embedding_model)
                .bind(dims as i64)
                .bind(chrono::Utc::now().timestamp())
                .execute(&pool)
                .await?;
                info!(collection, embedding_model, dims, "Created collection");
            }
        }

        Ok(Self {
            pool,
            collection: collection.to_string(),
            dims,
        })
    }

    /// Connect to the configured database and open the configured collection.
    pub async fn from_config(config: &Config, embedding_model: &str, dims: usize) -> Result<Self> {
        let pool = db::connect(config).await?;
        Self::open(pool, &config.vectordb.collection_name, embedding_model, dims).await
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

#[async_trait]
impl ChunkStore for SqliteChunkStore {
    async fn add(&self, records: &[ChunkRecord], vectors: &[Vec<f32>]) -> Result<()> {
        if records.len() != vectors.len() {
            bail!(
                "Record/vector count mismatch: {} records, {} vectors",
                records.len(),
                vectors.len()
            );
        }
        if let Some(v) = vectors.iter().find(|v| v.len() != self.dims) {
            bail!(
                "Vector has {} dims, collection '{}' expects {}",
                v.len(),
                self.collection,
                self.dims
            );
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for (record, vector) in records.iter().zip(vectors.iter()) {
            let metadata_json = serde_json::to_string(&record.metadata)?;
            sqlx::query(
                r#"
                INSERT INTO chunks (collection, id, text, metadata_json, embedding, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&self.collection)
            .bind(&record.id)
            .bind(&record.text)
            .bind(&metadata_json)
            .bind(vec_to_blob(vector))
            .bind(now)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert chunk {}", record.id))?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        if vector.len() != self.dims {
            bail!(
                "Query vector has {} dims, collection '{}' expects {}",
                vector.len(),
                self.collection,
                self.dims
            );
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        // Score on vectors alone; text and metadata are loaded for the top k only.
        let rows = sqlx::query(
            "SELECT rowid, embedding FROM chunks WHERE collection = ? ORDER BY rowid",
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<(f32, i64)> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                (cosine_distance(vector, &blob_to_vec(&blob)), row.get("rowid"))
            })
            .collect();
        drop(rows);

        // Stable: equal distances keep rowid order.
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        let mut results = Vec::with_capacity(scored.len());
        for (distance, rowid) in scored {
            let row = sqlx::query("SELECT id, text, metadata_json FROM chunks WHERE rowid = ?")
                .bind(rowid)
                .fetch_one(&self.pool)
                .await
                .with_context(|| format!("Chunk row {} vanished during query", rowid))?;
            let id: String = row.get("id");
            let metadata_json: String = row.get("metadata_json");
            let metadata: Metadata = serde_json::from_str(&metadata_json)
                .with_context(|| format!("Corrupt metadata for chunk {}", id))?;
            results.push(RetrievedChunk {
                id,
                text: row.get("text"),
                metadata,
                distance,
            });
        }

        debug!(collection = %self.collection, returned = results.len(), "Vector query");
        Ok(results)
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE collection = ?")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}
