//! RAG (Retrieval-Augmented Generation) for question answering with sources.
//!
//! Retrieved passages and the session's conversation history are assembled
//! into a single prompt for the generator.

pub mod context;
mod response;

pub use context::{build_prompt, build_prompt_with, format_context};
pub use response::{RagEngine, RagResponse};

use crate::vector_store::ChunkMetadata;
use serde::{Deserialize, Serialize};

/// A retrieved passage, returned with each answer for citation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedSource {
    /// Passage text.
    pub content: String,
    /// File path or URL, `"Unknown"` when the store had none.
    pub source: String,
    /// Chunk index within the source, 0 when the store had none.
    pub chunk_index: usize,
}

impl RetrievedSource {
    pub fn new(content: &str, metadata: Option<&ChunkMetadata>) -> Self {
        Self {
            content: content.to_string(),
            source: metadata
                .and_then(|m| m.source.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            chunk_index: metadata.and_then(|m| m.chunk_index).unwrap_or(0),
        }
    }
}
