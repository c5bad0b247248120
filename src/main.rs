//! # RAG Assistant CLI (`rag`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rag init` | Create the vector database and run schema migrations |
//! | `rag ingest [PATHS...] [--dir DIR]` | Load documents and add them to the collection |
//! | `rag search "<query>"` | Show the chunks closest to a query |
//! | `rag ask "<question>"` | Answer one question |
//! | `rag chat` | Interactive question loop |
//! | `rag status` | Collection size and embedding model |
//!
//! ## Examples
//!
//! ```bash
//! rag --config ./config/rag.toml init
//! rag ingest --dir ./data
//! rag search "population of Nairobi County" --limit 3
//! GROQ_API_KEY=... rag ask "What is the population of Nairobi County?"
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rag_assistant::{chat, config, db, ingest, llm, migrate, search, status};

/// RAG assistant: ask questions about your documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/rag.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "rag",
    about = "Retrieval-augmented question answering over local text and PDF documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the vector database schema.
    ///
    /// Creates the SQLite file under `vectordb.persist_directory`. Idempotent.
    Init,

    /// Load documents and add them to the collection.
    ///
    /// With no arguments, ingests every .txt and .pdf file under
    /// `documents.data_dir`. Re-ingesting a file appends a second copy.
    Ingest {
        /// Individual files to ingest.
        paths: Vec<PathBuf>,

        /// Directory to scan recursively for .txt and .pdf files.
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Show the stored chunks closest to a query.
    Search {
        /// The search query.
        query: String,

        /// Maximum number of results (default: retrieval.top_k).
        #[arg(long)]
        limit: Option<usize>,

        /// Maximum cosine distance (default: retrieval.distance_threshold).
        #[arg(long)]
        threshold: Option<f32>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Answer one question from the knowledge base.
    ///
    /// Requires GROQ_API_KEY, OPENAI_API_KEY or GOOGLE_API_KEY, set in the
    /// environment or in a `.env` file.
    Ask {
        /// The question.
        question: String,
    },

    /// Interactive question loop. Type `quit` to exit.
    Chat,

    /// Show the collection's size and embedding model.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,rag_assistant={0},rag_assistant_core={0}",
            default_level
        ))
    });
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    llm::load_dotenv();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { paths, dir } => {
            ingest::run_ingest(&cfg, &paths, dir).await?;
        }
        Commands::Search {
            query,
            limit,
            threshold,
            json,
        } => {
            search::run_search(&cfg, &query, limit, threshold, json).await?;
        }
        Commands::Ask { question } => {
            chat::run_ask(&cfg, &question).await?;
        }
        Commands::Chat => {
            chat::run_chat(&cfg).await?;
        }
        Commands::Status => {
            status::run_status(&cfg).await?;
        }
    }

    Ok(())
}
