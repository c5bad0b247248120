//! `rag ingest`: load documents and add them to the collection.

use anyhow::{Context, Result};
use std::path::PathBuf;

use rag_assistant_core::ingest::ingest_documents;
use rag_assistant_core::store::ChunkStore;

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::sources::{load_directory, load_files};
use crate::sqlite_store::SqliteChunkStore;

/// Ingest explicit `paths`, the files under `dir`, or (with neither) the
/// configured `documents.data_dir`.
pub async fn run_ingest(config: &Config, paths: &[PathBuf], dir: Option<PathBuf>) -> Result<()> {
    let params = config.chunking.params()?;

    let mut documents = Vec::new();
    if !paths.is_empty() {
        documents.extend(load_files(paths));
    }
    let scanned = match dir {
        Some(dir) => Some(dir),
        None if paths.is_empty() => Some(config.documents.data_dir.clone()),
        None => None,
    };
    if let Some(dir) = &scanned {
        documents.extend(load_directory(dir)?);
    }

    if documents.is_empty() {
        match &scanned {
            Some(dir) => println!(
                "No documents found in {}. Add .txt or .pdf files and run ingest again.",
                dir.display()
            ),
            None => println!("No documents found among the given paths."),
        }
        return Ok(());
    }

    let embedder = create_embedder(&config.embedding)
        .await
        .context("Failed to initialize embedding model")?;
    let store =
        SqliteChunkStore::from_config(config, embedder.model_name(), embedder.dims()).await?;

    let result = ingest_documents(&store, embedder.as_ref(), &documents, &params).await;
    store.close().await?;
    let report = result?;

    println!("ingest {}", store.collection());
    println!("  documents: {}", report.documents);
    println!("  chunks added: {}", report.chunks);
    println!("  batches: {}", report.batches);
    println!("  collection total: {}", report.total);
    println!("ok");

    Ok(())
}
