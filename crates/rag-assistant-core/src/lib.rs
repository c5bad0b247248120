//! # RAG Assistant Core
//!
//! Storage- and network-free logic for the RAG assistant: data models,
//! recursive text chunking, the embedder and chunk-store traits, the
//! ingestion orchestrator, the distance-filtered retriever, and prompt
//! assembly.
//!
//! This crate contains no tokio, sqlx, HTTP clients, or filesystem I/O.
//! Concrete embedders, the SQLite store, and LLM providers live in the
//! `rag-assistant` app crate and plug in through [`embedding::Embedder`]
//! and [`store::ChunkStore`].

pub mod chunk;
pub mod embedding;
pub mod ingest;
pub mod models;
pub mod prompt;
pub mod search;
pub mod store;
