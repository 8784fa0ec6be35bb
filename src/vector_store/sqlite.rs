//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! Metadata is stored as a JSON column so rows written with missing fields still load.

use super::{rank, ChunkMetadata, IndexedSource, QueryResults, StoredChunk, VectorStore};
use crate::error::{DocketError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS chunks (
        id TEXT PRIMARY KEY,
        content TEXT NOT NULL,
        metadata TEXT NOT NULL,
        embedding BLOB NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(json_extract(metadata, '$.source'));
    CREATE INDEX IF NOT EXISTS idx_chunks_indexed_at ON chunks(indexed_at);
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open or create a store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DocketError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn parse_timestamp(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    async fn add(&self, chunks: &[StoredChunk]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for chunk in chunks {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO chunks (id, content, metadata, embedding, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    chunk.id,
                    chunk.content,
                    serde_json::to_string(&chunk.metadata)?,
                    Self::embedding_to_bytes(&chunk.embedding),
                    chunk.indexed_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        debug!("Wrote {} chunks", chunks.len());
        Ok(chunks.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn query(&self, query_embedding: &[f32], top_k: usize) -> Result<QueryResults> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT content, metadata, embedding FROM chunks")?;

        let rows = stmt.query_map([], |row| {
            let content: String = row.get(0)?;
            let metadata: String = row.get(1)?;
            let embedding: Vec<u8> = row.get(2)?;
            Ok((content, metadata, embedding))
        })?;

        let mut entries: Vec<(String, ChunkMetadata, Vec<f32>)> = Vec::new();
        for row in rows {
            let (content, metadata, embedding) = row?;
            let metadata = serde_json::from_str(&metadata).unwrap_or_else(|e| {
                warn!("Unreadable chunk metadata, using defaults: {}", e);
                ChunkMetadata::default()
            });
            entries.push((content, metadata, Self::bytes_to_embedding(&embedding)));
        }

        Ok(rank(
            entries
                .iter()
                .map(|(c, m, e)| (c.as_str(), m, e.as_slice())),
            query_embedding,
            top_k,
        ))
    }

    #[instrument(skip(self))]
    async fn delete_by_source(&self, source: &str) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM chunks WHERE json_extract(metadata, '$.source') = ?1",
            params![source],
        )?;
        info!("Deleted {} chunks for {}", deleted, source);
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT COALESCE(json_extract(metadata, '$.source'), 'Unknown') AS source,
                   COUNT(*) AS chunk_count,
                   MAX(indexed_at) AS indexed_at
            FROM chunks
            GROUP BY source
            ORDER BY indexed_at DESC
            "#,
        )?;

        let sources = stmt.query_map([], |row| {
            let indexed_at: String = row.get(2)?;
            Ok(IndexedSource {
                source: row.get(0)?,
                chunk_count: row.get(1)?,
                indexed_at: Self::parse_timestamp(&indexed_at),
            })
        })?;

        Ok(sources.filter_map(|s| s.ok()).collect())
    }

    async fn document_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::Chunk;

    fn stored(content: &str, source: &str, index: usize, embedding: Vec<f32>) -> StoredChunk {
        StoredChunk::new(&Chunk::new(content.repeat(10), source, index), embedding)
    }

    #[tokio::test]
    async fn test_sqlite_vector_store() {
        let store = SqliteVectorStore::in_memory().unwrap();

        let docs = vec![
            stored("usb ", "usb.txt", 0, vec![1.0, 0.0, 0.0]),
            stored("setupapi ", "usb.txt", 1, vec![0.9, 0.1, 0.0]),
            stored("exif ", "https://example.com/exif", 0, vec![0.0, 1.0, 0.0]),
        ];
        assert_eq!(store.add(&docs).await.unwrap(), 3);
        assert_eq!(store.document_count().await.unwrap(), 3);

        let results = store.query(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results.metadatas[0].chunk_index, Some(0));
        assert_eq!(results.metadatas[1].chunk_index, Some(1));
        assert!(results.documents[0].starts_with("usb"));

        let sources = store.list_sources().await.unwrap();
        assert_eq!(sources.len(), 2);
        let usb = sources.iter().find(|s| s.source == "usb.txt").unwrap();
        assert_eq!(usb.chunk_count, 2);

        assert_eq!(store.delete_by_source("usb.txt").await.unwrap(), 2);
        assert_eq!(store.document_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reingest_replaces() {
        let store = SqliteVectorStore::in_memory().unwrap();
        let entry = stored("hive ", "hive.txt", 0, vec![1.0, 0.0]);

        store.add(&[entry.clone()]).await.unwrap();
        store.add(&[entry]).await.unwrap();
        assert_eq!(store.document_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index").join("vectors.db");

        {
            let store = SqliteVectorStore::new(&path).unwrap();
            store
                .add(&[stored("mft ", "mft.csv", 0, vec![0.0, 1.0])])
                .await
                .unwrap();
        }

        let reopened = SqliteVectorStore::new(&path).unwrap();
        assert_eq!(reopened.document_count().await.unwrap(), 1);
    }

    #[test]
    fn test_embedding_roundtrip() {
        let embedding = vec![0.25f32, -1.5, 3.0];
        let bytes = SqliteVectorStore::embedding_to_bytes(&embedding);
        assert_eq!(SqliteVectorStore::bytes_to_embedding(&bytes), embedding);
    }
}
