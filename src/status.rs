//! `rag status`: report on the configured collection.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::db;
use crate::migrate;

pub async fn run_status(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;

    let name = &config.vectordb.collection_name;
    let collection = sqlx::query("SELECT embedding_model, dims FROM collections WHERE name = ?")
        .bind(name)
        .fetch_optional(&pool)
        .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE collection = ?")
        .bind(name)
        .fetch_one(&pool)
        .await?;

    let by_source = sqlx::query(
        r#"
        SELECT COALESCE(json_extract(metadata_json, '$.source'), '(none)') AS source,
               COUNT(*) AS chunks
        FROM chunks
        WHERE collection = ?
        GROUP BY source
        ORDER BY chunks DESC, source ASC
        "#,
    )
    .bind(name)
    .fetch_all(&pool)
    .await?;

    println!("status {}", name);
    println!("  database: {}", config.vectordb.db_path().display());
    match collection {
        Some(row) => {
            let model: String = row.get("embedding_model");
            let dims: i64 = row.get("dims");
            println!("  embedding: {} ({} dims)", model, dims);
        }
        None => println!("  embedding: (collection not created yet)"),
    }
    println!("  chunks: {}", total);
    for row in &by_source {
        let source: String = row.get("source");
        let chunks: i64 = row.get("chunks");
        println!("    {:<40} {:>6}", source, chunks);
    }

    pool.close().await;
    Ok(())
}
