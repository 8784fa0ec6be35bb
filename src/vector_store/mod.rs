//! Vector store abstraction for Docket.
//!
//! Provides a trait-based interface for different vector database backends.
//! Entries are keyed by the chunk's deterministic document ID, so re-ingesting
//! an unchanged source overwrites rather than duplicates.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::chunking::Chunk;
use crate::config::Settings;
use crate::error::{DocketError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Metadata stored alongside each chunk.
///
/// Every field is optional so that entries written by other tools, or
/// damaged rows, still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkMetadata {
    pub source: Option<String>,
    pub chunk_index: Option<usize>,
    pub chunk_length: Option<usize>,
}

impl From<&Chunk> for ChunkMetadata {
    fn from(chunk: &Chunk) -> Self {
        Self {
            source: Some(chunk.source.clone()),
            chunk_index: Some(chunk.index),
            chunk_length: Some(chunk.length),
        }
    }
}

/// A chunk with its embedding, as held by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Deterministic document ID.
    pub id: String,
    /// Chunk text.
    pub content: String,
    pub metadata: ChunkMetadata,
    pub embedding: Vec<f32>,
    /// When this entry was written.
    pub indexed_at: DateTime<Utc>,
}

impl StoredChunk {
    pub fn new(chunk: &Chunk, embedding: Vec<f32>) -> Self {
        Self {
            id: chunk.document_id(),
            content: chunk.content.clone(),
            metadata: ChunkMetadata::from(chunk),
            embedding,
            indexed_at: Utc::now(),
        }
    }
}

/// Nearest-neighbour results as parallel lists, best match first.
#[derive(Debug, Clone, Default)]
pub struct QueryResults {
    pub documents: Vec<String>,
    pub metadatas: Vec<ChunkMetadata>,
    /// Cosine similarity per document.
    pub scores: Vec<f32>,
}

impl QueryResults {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Summary of one indexed source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedSource {
    /// File path or URL.
    pub source: String,
    /// Number of stored chunks.
    pub chunk_count: u32,
    /// Most recent write for this source.
    pub indexed_at: DateTime<Utc>,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace entries by ID. Returns the number written.
    async fn add(&self, chunks: &[StoredChunk]) -> Result<usize>;

    /// Return the `top_k` entries most similar to `query_embedding`.
    async fn query(&self, query_embedding: &[f32], top_k: usize) -> Result<QueryResults>;

    /// Delete every entry from `source`.
    async fn delete_by_source(&self, source: &str) -> Result<usize>;

    /// List indexed sources, most recently indexed first.
    async fn list_sources(&self) -> Result<Vec<IndexedSource>>;

    /// Get total entry count.
    async fn document_count(&self) -> Result<usize>;
}

/// Open the store selected in settings.
pub fn open_store(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    match settings.vector_store.provider.to_lowercase().as_str() {
        "sqlite" => Ok(Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?)),
        "memory" => Ok(Arc::new(MemoryVectorStore::new())),
        other => Err(DocketError::Config(format!(
            "Unknown vector store provider: {}",
            other
        ))),
    }
}

/// Rank `entries` by similarity to `query_embedding` and keep the best `top_k`.
pub(crate) fn rank<'a>(
    entries: impl Iterator<Item = (&'a str, &'a ChunkMetadata, &'a [f32])>,
    query_embedding: &[f32],
    top_k: usize,
) -> QueryResults {
    let mut scored: Vec<(f32, &str, &ChunkMetadata)> = entries
        .map(|(content, metadata, embedding)| {
            (cosine_similarity(query_embedding, embedding), content, metadata)
        })
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);

    let mut results = QueryResults::default();
    for (score, content, metadata) in scored {
        results.documents.push(content.to_string());
        results.metadatas.push(metadata.clone());
        results.scores.push(score);
    }
    results
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
