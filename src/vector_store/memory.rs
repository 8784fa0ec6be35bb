//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{rank, IndexedSource, QueryResults, StoredChunk, VectorStore};
use crate::error::{DocketError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory vector store.
pub struct MemoryVectorStore {
    entries: RwLock<HashMap<String, StoredChunk>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, StoredChunk>>> {
        self.entries
            .read()
            .map_err(|e| DocketError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, StoredChunk>>> {
        self.entries
            .write()
            .map_err(|e| DocketError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn add(&self, chunks: &[StoredChunk]) -> Result<usize> {
        let mut entries = self.write()?;
        for chunk in chunks {
            entries.insert(chunk.id.clone(), chunk.clone());
        }
        Ok(chunks.len())
    }

    async fn query(&self, query_embedding: &[f32], top_k: usize) -> Result<QueryResults> {
        let entries = self.read()?;
        Ok(rank(
            entries
                .values()
                .map(|e| (e.content.as_str(), &e.metadata, e.embedding.as_slice())),
            query_embedding,
            top_k,
        ))
    }

    async fn delete_by_source(&self, source: &str) -> Result<usize> {
        let mut entries = self.write()?;
        let initial_len = entries.len();
        entries.retain(|_, e| e.metadata.source.as_deref() != Some(source));
        Ok(initial_len - entries.len())
    }

    async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
        let entries = self.read()?;
        let mut by_source: HashMap<String, IndexedSource> = HashMap::new();

        for entry in entries.values() {
            let source = entry
                .metadata
                .source
                .clone()
                .unwrap_or_else(|| "Unknown".to_string());
            let summary = by_source.entry(source.clone()).or_insert_with(|| IndexedSource {
                source,
                chunk_count: 0,
                indexed_at: entry.indexed_at,
            });

            summary.chunk_count += 1;
            if entry.indexed_at > summary.indexed_at {
                summary.indexed_at = entry.indexed_at;
            }
        }

        let mut sources: Vec<IndexedSource> = by_source.into_values().collect();
        sources.sort_by(|a, b| b.indexed_at.cmp(&a.indexed_at));
        Ok(sources)
    }

    async fn document_count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }
}
