//! Language-model providers.
//!
//! Groq and OpenAI share the OpenAI chat-completions wire format and differ
//! only in base URL and credential; Google uses Gemini's `generateContent`.
//!
//! # Provider Selection
//!
//! Candidates are tried in a fixed priority order and the first one whose
//! API key is present (and non-blank) wins:
//!
//! | Priority | Provider | Env var | Default model |
//! |----------|----------|---------|---------------|
//! | 1 | Groq | `GROQ_API_KEY` | `llama-3.1-8b-instant` |
//! | 2 | OpenAI | `OPENAI_API_KEY` | `gpt-4o-mini` |
//! | 3 | Google | `GOOGLE_API_KEY` | `gemini-2.0-flash` |
//!
//! Keys are read from the process environment, which [`load_dotenv`] first
//! fills from a `.env` file when one exists. No key at all is a
//! configuration error.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::LlmConfig;

/// A text-in, text-out language model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Provider and model, for logs (e.g. `"groq/llama-3.1-8b-instant"`).
    fn name(&self) -> &str;
    /// Generate a completion for a single user prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Wire format spoken by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiStyle {
    ChatCompletions,
    Gemini,
}

/// One entry of the provider priority list.
#[derive(Debug, Clone, Copy)]
pub struct ProviderSpec {
    pub name: &'static str,
    pub env_key: &'static str,
    pub base_url: &'static str,
    pub style: ApiStyle,
}

/// Providers in priority order.
pub const PROVIDERS: [ProviderSpec; 3] = [
    ProviderSpec {
        name: "groq",
        env_key: "GROQ_API_KEY",
        base_url: "https://api.groq.com/openai/v1",
        style: ApiStyle::ChatCompletions,
    },
    ProviderSpec {
        name: "openai",
        env_key: "OPENAI_API_KEY",
        base_url: "https://api.openai.com/v1",
        style: ApiStyle::ChatCompletions,
    },
    ProviderSpec {
        name: "google",
        env_key: "GOOGLE_API_KEY",
        base_url: "https://generativelanguage.googleapis.com/v1beta",
        style: ApiStyle::Gemini,
    },
];

/// The provider that would be used, with its key. `lookup` resolves env vars.
pub fn select_provider(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(ProviderSpec, String)> {
    for spec in PROVIDERS {
        match lookup(spec.env_key) {
            Some(key) if !key.trim().is_empty() => return Ok((spec, key)),
            _ => debug!(provider = spec.name, "No API key, skipping provider"),
        }
    }
    bail!(
        "No valid API key found. Set one of GROQ_API_KEY, OPENAI_API_KEY or GOOGLE_API_KEY \
         in the environment or in a .env file."
    )
}

/// Load `KEY=value` pairs from a `.env` file in the working directory or one
/// of its parents. Variables already set in the environment are not
/// overridden.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => debug!("No .env file found"),
        Err(e) => warn!(error = %e, "Failed to read .env file"),
    }
}

fn model_for(spec: &ProviderSpec, config: &LlmConfig) -> String {
    match spec.name {
        "groq" => config.groq_model.clone(),
        "openai" => config.openai_model.clone(),
        _ => config.google_model.clone(),
    }
}

/// Build the highest-priority language model with credentials in the environment.
pub fn create_language_model(config: &LlmConfig) -> Result<Box<dyn LanguageModel>> {
    create_language_model_with(config, |k| std::env::var(k).ok())
}

pub fn create_language_model_with(
    config: &LlmConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Box<dyn LanguageModel>> {
    let (spec, api_key) = select_provider(lookup)?;
    let model = model_for(&spec, config);
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    info!(provider = spec.name, model = %model, "Using language model");

    Ok(match spec.style {
        ApiStyle::ChatCompletions => Box::new(ChatCompletionsModel {
            label: format!("{}/{}", spec.name, model),
            base_url: spec.base_url.to_string(),
            api_key,
            model,
            temperature: config.temperature,
            client,
        }),
        ApiStyle::Gemini => Box::new(GeminiModel {
            label: format!("{}/{}", spec.name, model),
            base_url: spec.base_url.to_string(),
            api_key,
            model,
            temperature: config.temperature,
            client,
        }),
    })
}

/// Shared error handling: non-2xx becomes an error carrying the body.
async fn read_json(response: reqwest::Response, provider: &str) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("{} API error {}: {}", provider, status, body);
    }
    Ok(response.json().await?)
}

// ============ OpenAI-compatible chat completions ============

/// A model served over `POST {base_url}/chat/completions` (Groq, OpenAI).
pub struct ChatCompletionsModel {
    label: String,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

#[async_trait]
impl LanguageModel for ChatCompletionsModel {
    fn name(&self) -> &str {
        &self.label
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let json = read_json(response, &self.label).await?;
        parse_chat_completion(&json)
    }
}

fn parse_chat_completion(json: &Value) -> Result<String> {
    json.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Invalid chat completion response: missing content"))
}

// ============ Gemini ============

/// A Gemini model served over `generateContent`.
pub struct GeminiModel {
    label: String,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

#[async_trait]
impl LanguageModel for GeminiModel {
    fn name(&self) -> &str {
        &self.label
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}],
            "generationConfig": {"temperature": self.temperature},
        });

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let json = read_json(response, &self.label).await?;
        parse_gemini_response(&json)
    }
}

fn parse_gemini_response(json: &Value) -> Result<String> {
    let parts = json
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow::anyhow!("Invalid Gemini response: missing content parts"))?;

    Ok(parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join(""))
}
