//! Docket - question answering over case documents
//!
//! A local-first CLI and HTTP service that indexes documents, web pages and
//! video transcripts and answers questions about them with cited sources.
//!
//! # Overview
//!
//! Docket allows you to:
//! - Ingest text files, PDFs, web pages and YouTube transcripts
//! - Build a searchable vector index over the extracted text
//! - Ask questions and get answers grounded in the retrieved passages
//! - Hold multi-turn conversations over HTTP and export them
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `extract` - Text extraction from files, web pages and videos
//! - `chunking` - Normalization and chunking with a structural fallback
//! - `ingest` - Discovery and indexing of a documents directory
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector database abstraction
//! - `conversation` - Token-bounded history and per-session buffers
//! - `generation` - Text generation backends
//! - `rag` - Context assembly and question answering
//! - `export` - Conversation transcripts
//! - `server` - HTTP API
//!
//! # Example
//!
//! ```rust,no_run
//! use docket::config::Settings;
//! use docket::conversation::ConversationBuffer;
//! use docket::rag::RagEngine;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let engine = RagEngine::from_settings(&settings)?;
//!     let mut history = ConversationBuffer::new(settings.conversation.max_history_tokens);
//!
//!     let response = engine.ask(&mut history, "Which USB devices were connected?").await;
//!     println!("{}", response.format_for_display());
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod embedding;
pub mod error;
pub mod export;
pub mod extract;
pub mod generation;
pub mod ingest;
pub mod openai;
pub mod rag;
pub mod server;
pub mod vector_store;

pub use error::{DocketError, Result};
