//! Configuration parsing and validation.
//!
//! The assistant reads a single TOML file (default `./config/rag.toml`).
//! Every section is optional; missing keys fall back to the defaults below.
//!
//! ```toml
//! [vectordb]
//! collection_name = "rag_documents"
//! persist_directory = "./vector_db"
//!
//! [embedding]
//! provider = "local"          # local | openai | ollama | hashing
//! model = "all-minilm-l6-v2"
//!
//! [chunking]
//! chunk_size = 800
//! chunk_overlap = 150
//!
//! [retrieval]
//! top_k = 5
//! distance_threshold = 0.4
//!
//! [llm]
//! temperature = 0.0
//!
//! [prompt]
//! template = "... {context} ... {question} ..."
//! ```

use anyhow::{Context, Result};
use rag_assistant_core::chunk::ChunkingParams;
use rag_assistant_core::prompt::PromptTemplate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config path used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "./config/rag.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub vectordb: VectorDbConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub prompt: Option<PromptConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VectorDbConfig {
    #[serde(default = "default_collection_name")]
    pub collection_name: String,
    #[serde(default = "default_persist_directory")]
    pub persist_directory: PathBuf,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            collection_name: default_collection_name(),
            persist_directory: default_persist_directory(),
        }
    }
}

impl VectorDbConfig {
    /// The SQLite file backing every collection under `persist_directory`.
    pub fn db_path(&self) -> PathBuf {
        self.persist_directory.join("rag.sqlite")
    }
}

fn default_collection_name() -> String {
    "rag_documents".to_string()
}
fn default_persist_directory() -> PathBuf {
    PathBuf::from("./vector_db")
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Ollama base URL.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            url: None,
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

impl ChunkingConfig {
    pub fn params(&self) -> Result<ChunkingParams> {
        ChunkingParams::new(self.chunk_size, self.chunk_overlap)
            .map_err(|e| anyhow::anyhow!("Invalid chunking config: {}", e))
    }
}

fn default_chunk_size() -> usize {
    800
}
fn default_chunk_overlap() -> usize {
    150
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_distance_threshold")]
    pub distance_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            distance_threshold: default_distance_threshold(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_distance_threshold() -> f32 {
    0.4
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_groq_model")]
    pub groq_model: String,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_google_model")]
    pub google_model: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            groq_model: default_groq_model(),
            openai_model: default_openai_model(),
            google_model: default_google_model(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_groq_model() -> String {
    "llama-3.1-8b-instant".to_string()
}
fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_google_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_llm_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocumentsConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Deserialize, Clone)]
pub struct PromptConfig {
    pub template: String,
}

impl Config {
    /// The validated prompt template. Missing is an error: commands that
    /// generate answers cannot run without it.
    pub fn prompt_template(&self) -> Result<PromptTemplate> {
        let prompt = self
            .prompt
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("[prompt] template is missing from the config file"))?;
        PromptTemplate::new(prompt.template.clone())
            .map_err(|e| anyhow::anyhow!("Invalid [prompt] template: {}", e))
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate chunking
    config.chunking.params()?;

    // Validate retrieval
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    let threshold = config.retrieval.distance_threshold;
    if !threshold.is_finite() || !(0.0..=2.0).contains(&threshold) {
        anyhow::bail!("retrieval.distance_threshold must be in [0.0, 2.0]");
    }

    // Validate llm
    if !(0.0..=2.0).contains(&config.llm.temperature) {
        anyhow::bail!("llm.temperature must be in [0.0, 2.0]");
    }

    if config.vectordb.collection_name.trim().is_empty() {
        anyhow::bail!("vectordb.collection_name must not be empty");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "local" | "hashing" => {}
        "openai" | "ollama" => {
            if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
                anyhow::bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    config.embedding.provider
                );
            }
            if config.embedding.model.is_none() {
                anyhow::bail!(
                    "embedding.model must be specified when provider is '{}'",
                    config.embedding.provider
                );
            }
        }
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be local, openai, ollama, or hashing.",
            other
        ),
    }
    if config.embedding.dims == Some(0) {
        anyhow::bail!("embedding.dims must be > 0");
    }
    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_str)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.vectordb.collection_name, "rag_documents");
        assert_eq!(config.vectordb.db_path(), PathBuf::from("./vector_db/rag.sqlite"));
        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.chunking.chunk_overlap, 150);
        assert_eq!(config.retrieval.top_k, 5);
        assert!((config.retrieval.distance_threshold - 0.4).abs() < 1e-6);
        assert_eq!(config.embedding.provider, "local");
        assert_eq!(config.llm.groq_model, "llama-3.1-8b-instant");
        assert_eq!(config.llm.temperature, 0.0);
        assert!(config.prompt.is_none());
        assert!(config.prompt_template().is_err());
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        let err = parse("[chunking]\nchunk_size = 100\nchunk_overlap = 100\n").unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));
    }

    #[test]
    fn test_rejects_bad_retrieval() {
        assert!(parse("[retrieval]\ntop_k = 0\n").is_err());
        assert!(parse("[retrieval]\ndistance_threshold = -0.1\n").is_err());
        assert!(parse("[retrieval]\ndistance_threshold = 2.5\n").is_err());
    }

    #[test]
    fn test_remote_provider_requires_model_and_dims() {
        assert!(parse("[embedding]\nprovider = \"openai\"\n").is_err());
        assert!(
            parse("[embedding]\nprovider = \"ollama\"\nmodel = \"nomic-embed-text\"\n").is_err()
        );
        assert!(parse(
            "[embedding]\nprovider = \"openai\"\nmodel = \"text-embedding-3-small\"\ndims = 1536\n"
        )
        .is_ok());
        assert!(parse("[embedding]\nprovider = \"sentence-bert\"\n").is_err());
    }

    #[test]
    fn test_prompt_template_validation() {
        let config = parse("[prompt]\ntemplate = \"{context} / {question}\"\n").unwrap();
        assert!(config.prompt_template().is_ok());

        let config = parse("[prompt]\ntemplate = \"only {question}\"\n").unwrap();
        assert!(config.prompt_template().is_err());
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/rag.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
