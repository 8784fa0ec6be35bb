//! Ingestion pipeline for Docket.
//!
//! Walks a documents directory and its `urls.txt`, then extracts, normalizes,
//! chunks, embeds and indexes each source. A failing source is counted and
//! skipped; the batch always runs to completion.

use crate::chunking::{chunk_document, normalize, Chunk, ChunkingConfig};
use crate::config::{IngestSettings, Settings};
use crate::embedding::Embedder;
use crate::error::{DocketError, Result};
use crate::extract::{Extractors, Source};
use crate::vector_store::{StoredChunk, VectorStore};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

/// Name of the URL list inside the documents directory.
pub const URL_LIST: &str = "urls.txt";

/// Summary of an ingestion run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    /// Sources that produced at least one indexed chunk.
    pub succeeded: usize,
    /// Sources that failed at any stage.
    pub failed: usize,
    /// Total chunks written to the vector store.
    pub chunks_indexed: usize,
    /// Sources chunked by the fallback segmenter.
    pub degraded: usize,
    /// Failure reason per source label.
    pub failures: Vec<(String, String)>,
}

/// Result of indexing one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceResult {
    pub chunks_indexed: usize,
    pub degraded: bool,
}

/// Coordinates extraction, chunking, embedding and indexing.
pub struct Ingestor {
    settings: IngestSettings,
    chunking: ChunkingConfig,
    extractors: Extractors,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
}

impl Ingestor {
    /// Create an ingestor with the default extractors.
    pub fn new(
        settings: &Settings,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        Ok(Self {
            settings: settings.ingest.clone(),
            chunking: settings.chunking.clone(),
            extractors: Extractors::new(&settings.ingest)?,
            embedder,
            vector_store,
        })
    }

    /// Replace the extractors.
    pub fn with_extractors(mut self, extractors: Extractors) -> Self {
        self.extractors = extractors;
        self
    }

    /// List the sources under `dir`: supported files (sorted) followed by the URLs in `urls.txt`.
    pub fn discover(&self, dir: &Path) -> Result<Vec<Source>> {
        if !dir.is_dir() {
            return Err(DocketError::InvalidInput(format!(
                "Documents directory not found: {}",
                dir.display()
            )));
        }

        let mut sources: Vec<Source> = self
            .discover_files(dir)
            .into_iter()
            .map(Source::File)
            .collect();

        let url_list = dir.join(URL_LIST);
        if url_list.is_file() {
            let content = std::fs::read_to_string(&url_list)?;
            sources.extend(parse_url_list(&content).iter().map(|u| Source::from_url(u)));
        }

        Ok(sources)
    }

    fn discover_files(&self, dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| path.file_name().and_then(|n| n.to_str()) != Some(URL_LIST))
            .filter(|path| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| self.settings.supports(e))
                    .unwrap_or(false)
            })
            .collect();

        files.sort();
        files
    }

    /// Ingest every source under `dir`.
    #[instrument(skip(self))]
    pub async fn ingest_dir(&self, dir: &Path) -> Result<IngestReport> {
        let sources = self.discover(dir)?;
        info!("Found {} sources in {}", sources.len(), dir.display());
        Ok(self.ingest_all(&sources).await)
    }

    /// Ingest `sources`, a few at a time.
    pub async fn ingest_all(&self, sources: &[Source]) -> IngestReport {
        let concurrency = self.settings.max_concurrent_fetches.max(1);

        let results: Vec<(String, Result<SourceResult>)> = stream::iter(sources)
            .map(|source| async move { (source.label(), self.ingest_source(source).await) })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut report = IngestReport::default();
        for (label, result) in results {
            match result {
                Ok(result) => {
                    report.succeeded += 1;
                    report.chunks_indexed += result.chunks_indexed;
                    if result.degraded {
                        report.degraded += 1;
                    }
                }
                Err(e) => {
                    warn!("Failed to ingest {}: {}", label, e);
                    report.failed += 1;
                    report.failures.push((label, e.to_string()));
                }
            }
        }
        report.failures.sort();

        info!(
            "Ingestion finished: {} succeeded, {} failed, {} chunks indexed",
            report.succeeded, report.failed, report.chunks_indexed
        );
        report
    }

    /// Extract, chunk, embed and index a single source.
    #[instrument(skip(self), fields(source = %source))]
    pub async fn ingest_source(&self, source: &Source) -> Result<SourceResult> {
        let raw = self.extractors.extract(source).await;
        self.index_text(&source.label(), &raw).await
    }

    /// Normalize, chunk, embed and index `text` under the `label` source.
    pub async fn index_text(&self, label: &str, text: &str) -> Result<SourceResult> {
        let text = normalize(text);
        if text.is_empty() {
            return Err(DocketError::Extraction(format!("No text extracted from {}", label)));
        }

        let outcome = chunk_document(&text, &self.chunking)?;
        let degraded = outcome.is_degraded();
        let chunks = Chunk::from_segments(label, outcome.into_chunks());
        if chunks.is_empty() {
            return Err(DocketError::Extraction(format!("No chunks created from {}", label)));
        }
        debug!("Created {} chunks from {}", chunks.len(), label);

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let stored: Vec<StoredChunk> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| StoredChunk::new(chunk, embedding))
            .collect();

        let chunks_indexed = self.vector_store.add(&stored).await?;
        info!("Indexed {} chunks from {}", chunks_indexed, label);

        Ok(SourceResult {
            chunks_indexed,
            degraded,
        })
    }
}

/// Parse a URL list: one URL per line, blank lines and `#` comments ignored.
pub fn parse_url_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
