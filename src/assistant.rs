//! The RAG assistant: retrieval, prompt assembly and generation in one object.
//!
//! [`RagAssistant`] owns its embedder, chunk store and language model. It is
//! built once per process with [`RagAssistant::open`] and released with
//! [`RagAssistant::close`].

use anyhow::{Context, Result};
use tracing::{info, warn};

use rag_assistant_core::chunk::ChunkingParams;
use rag_assistant_core::embedding::Embedder;
use rag_assistant_core::ingest::{ingest_documents, IngestReport};
use rag_assistant_core::models::{Document, RetrievedChunk};
use rag_assistant_core::prompt::{
    build_context, PromptTemplate, REFUSAL_MESSAGE, RETRIEVAL_UNAVAILABLE_MESSAGE,
};
use rag_assistant_core::search::{search, RetrievalError, SearchRequest};
use rag_assistant_core::store::ChunkStore;

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::llm::{create_language_model, LanguageModel};
use crate::sqlite_store::SqliteChunkStore;

/// Retrieval settings applied to every question.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub distance_threshold: f32,
}

pub struct RagAssistant {
    template: PromptTemplate,
    llm: Box<dyn LanguageModel>,
    embedder: Box<dyn Embedder>,
    store: Box<dyn ChunkStore>,
    chunking: ChunkingParams,
    retrieval: RetrievalSettings,
}

impl RagAssistant {
    /// Build the assistant from configuration.
    ///
    /// Fails when the prompt template is missing or invalid, when no LLM
    /// credential is set, or when the embedder or store cannot be opened.
    /// Cheap checks run before the embedding model is loaded.
    pub async fn open(config: &Config) -> Result<Self> {
        let template = config.prompt_template()?;
        let chunking = config.chunking.params()?;
        let llm = create_language_model(&config.llm)?;

        let embedder = create_embedder(&config.embedding)
            .await
            .context("Failed to initialize embedding model")?;
        let store =
            SqliteChunkStore::from_config(config, embedder.model_name(), embedder.dims()).await?;

        info!(
            collection = %config.vectordb.collection_name,
            llm = llm.name(),
            embedder = embedder.model_name(),
            "Assistant ready"
        );

        Ok(Self::from_parts(
            template,
            llm,
            embedder,
            Box::new(store),
            chunking,
            RetrievalSettings {
                top_k: config.retrieval.top_k,
                distance_threshold: config.retrieval.distance_threshold,
            },
        ))
    }

    pub fn from_parts(
        template: PromptTemplate,
        llm: Box<dyn LanguageModel>,
        embedder: Box<dyn Embedder>,
        store: Box<dyn ChunkStore>,
        chunking: ChunkingParams,
        retrieval: RetrievalSettings,
    ) -> Self {
        Self {
            template,
            llm,
            embedder,
            store,
            chunking,
            retrieval,
        }
    }

    /// Chunk, embed and store documents into the assistant's collection.
    pub async fn add_documents(&self, documents: &[Document]) -> Result<IngestReport> {
        ingest_documents(
            self.store.as_ref(),
            self.embedder.as_ref(),
            documents,
            &self.chunking,
        )
        .await
    }

    /// The chunks that would ground an answer to `question`.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        let request = SearchRequest {
            query: question.to_string(),
            n_results: self.retrieval.top_k,
            distance_threshold: self.retrieval.distance_threshold,
        };
        search(self.store.as_ref(), self.embedder.as_ref(), &request).await
    }

    /// Answer `question` from the knowledge base.
    ///
    /// Always returns user-facing text: the model's answer, the refusal
    /// message when nothing relevant is stored, or an error message when
    /// retrieval or generation fails.
    pub async fn invoke(&self, question: &str) -> String {
        let chunks = match self.retrieve(question).await {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!(error = %e, "Retrieval failed");
                return RETRIEVAL_UNAVAILABLE_MESSAGE.to_string();
            }
        };

        if chunks.is_empty() {
            info!("No chunks within distance threshold, refusing");
            return REFUSAL_MESSAGE.to_string();
        }

        let context = build_context(&chunks);
        let prompt = self.template.render(&context, question);
        info!(chunks = chunks.len(), llm = self.llm.name(), "Generating answer");

        match self.llm.generate(&prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "Generation failed");
                format!("An error occurred during LLM generation: {}", e)
            }
        }
    }

    pub async fn count(&self) -> Result<usize> {
        self.store.count().await
    }

    /// Release the store. Idempotent.
    pub async fn close(&self) -> Result<()> {
        self.store.close().await
    }
}
