//! `rag search`: show the stored chunks closest to a query.

use anyhow::{Context, Result};

use rag_assistant_core::models::RetrievedChunk;
use rag_assistant_core::prompt::UNKNOWN_SOURCE;
use rag_assistant_core::search::{search, SearchRequest};
use rag_assistant_core::store::ChunkStore;

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::sqlite_store::SqliteChunkStore;

/// Run a retrieval and print the kept chunks.
///
/// `limit` and `threshold` override `retrieval.top_k` and
/// `retrieval.distance_threshold`. A retrieval failure is an error, not
/// an empty result.
pub async fn run_search(
    config: &Config,
    query: &str,
    limit: Option<usize>,
    threshold: Option<f32>,
    json: bool,
) -> Result<()> {
    let request = SearchRequest {
        query: query.to_string(),
        n_results: limit.unwrap_or(config.retrieval.top_k),
        distance_threshold: threshold.unwrap_or(config.retrieval.distance_threshold),
    };

    let embedder = create_embedder(&config.embedding)
        .await
        .context("Failed to initialize embedding model")?;
    let store =
        SqliteChunkStore::from_config(config, embedder.model_name(), embedder.dims()).await?;

    let result = search(&store, embedder.as_ref(), &request).await;
    store.close().await?;
    let results = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No relevant results.");
        return Ok(());
    }

    print_results(&results);
    Ok(())
}

fn print_results(results: &[RetrievedChunk]) {
    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. [{:.3}] {}",
            i + 1,
            result.distance,
            result.source().unwrap_or(UNKNOWN_SOURCE)
        );
        let excerpt: String = result.text.chars().take(240).collect();
        println!("    excerpt: \"{}\"", excerpt.replace('\n', " ").trim());
        println!("    id: {}", result.id);
        println!();
    }
}
