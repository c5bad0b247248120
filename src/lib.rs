//! # RAG Assistant
//!
//! A retrieval-augmented question-answering assistant over a local document
//! collection (text files and PDF reports).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────┐
//! │  Sources    │──▶│  Ingestion  │──▶│  SQLite  │
//! │  TXT / PDF  │   │ Chunk+Embed │   │ vectors  │
//! └─────────────┘   └─────────────┘   └────┬─────┘
//!                                          │ search (distance ≤ threshold)
//!                                          ▼
//!                   ┌─────────────┐   ┌──────────┐
//!                   │     LLM     │◀──│  Prompt  │
//!                   │ Groq/OpenAI │   │ assembly │
//!                   │   /Gemini   │   └──────────┘
//!                   └─────────────┘
//! ```
//!
//! Storage-free logic (chunking, ingestion, retrieval, prompt assembly) lives
//! in the `rag-assistant-core` crate; this crate wires it to configuration,
//! SQLite, embedding backends, LLM providers and the `rag` CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite chunk store |
//! | [`embedding`] | Embedding backends |
//! | [`llm`] | Language-model providers |
//! | [`extract`] | Text and PDF extraction |
//! | [`sources`] | Directory and file loading |
//! | [`assistant`] | The question-answering assistant |
//! | [`ingest`], [`search`], [`chat`], [`status`] | CLI commands |

pub mod assistant;
pub mod chat;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod ingest;
pub mod llm;
pub mod migrate;
pub mod search;
pub mod sources;
pub mod sqlite_store;
pub mod status;
