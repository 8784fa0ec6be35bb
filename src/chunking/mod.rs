//! Text chunking for breaking extracted documents into retrievable segments.
//!
//! The primary [`BoundaryChunker`] produces overlapping, sentence-aligned
//! windows. When it cannot allocate what it needs, [`chunk_document`] retries
//! with the [`StructuralChunker`] and reports the degradation in the returned
//! [`ChunkOutcome`].

mod boundary;
mod normalize;
mod structural;

pub use boundary::BoundaryChunker;
pub use normalize::normalize;
pub use structural::StructuralChunker;

use crate::error::{DocketError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

/// Chunks shorter than this (after trimming) are discarded.
pub const MIN_CHUNK_CHARS: usize = 50;

/// How far past the nominal window end to search for a sentence boundary.
pub const LOOKAHEAD_CHARS: usize = 100;

/// Upper bound on chunking loop iterations for a single text.
pub const MAX_ITERATIONS: usize = 10_000;

/// A chunk of text from an ingested source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Text content of this chunk.
    pub content: String,
    /// File path or URL the text came from.
    pub source: String,
    /// Position of this chunk within its source.
    pub index: usize,
    /// Length of the content in characters.
    pub length: usize,
}

impl Chunk {
    pub fn new(content: String, source: &str, index: usize) -> Self {
        let length = content.chars().count();
        Self {
            content,
            source: source.to_string(),
            index,
            length,
        }
    }

    /// Build chunks for `source` from segmented text, skipping fragments too short to keep.
    pub fn from_segments(source: &str, segments: Vec<String>) -> Vec<Chunk> {
        segments
            .into_iter()
            .enumerate()
            .filter(|(_, s)| s.trim().chars().count() >= MIN_CHUNK_CHARS)
            .map(|(i, s)| Chunk::new(s, source, i))
            .collect()
    }

    /// Label identifying this chunk's position, e.g. `notes.pdf_3`.
    pub fn label(&self) -> String {
        format!("{}_{}", self.source, self.index)
    }

    /// Deterministic ID for the vector store.
    pub fn document_id(&self) -> String {
        document_id(&self.content, &self.label())
    }
}

/// Fingerprint of chunk content plus its `source_index` label.
pub fn document_id(content: &str, label: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hasher.update(b"_");
    hasher.update(label.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Configuration for chunking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Characters repeated between consecutive chunks.
    pub chunk_overlap: usize,
    /// Maximum chunks produced from a single source.
    pub max_chunks: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
            max_chunks: 500,
        }
    }
}

/// A strategy for splitting text into chunk strings.
pub trait Segmenter: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Split `text` into chunks, in order.
    fn segment(&self, text: &str) -> Result<Vec<String>>;
}

/// How a text was chunked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// The primary chunker succeeded.
    Primary(Vec<String>),
    /// The primary chunker ran out of resources and the fallback was used.
    Fallback { chunks: Vec<String>, cause: String },
}

impl ChunkOutcome {
    pub fn chunks(&self) -> &[String] {
        match self {
            ChunkOutcome::Primary(chunks) => chunks,
            ChunkOutcome::Fallback { chunks, .. } => chunks,
        }
    }

    pub fn into_chunks(self) -> Vec<String> {
        match self {
            ChunkOutcome::Primary(chunks) => chunks,
            ChunkOutcome::Fallback { chunks, .. } => chunks,
        }
    }

    /// Whether the fallback segmenter produced these chunks.
    pub fn is_degraded(&self) -> bool {
        matches!(self, ChunkOutcome::Fallback { .. })
    }
}

/// Chunk `text` with the default primary/fallback pair.
///
/// An `Err` means the fallback also failed.
pub fn chunk_document(text: &str, config: &ChunkingConfig) -> Result<ChunkOutcome> {
    chunk_with(
        &BoundaryChunker::from_config(config),
        &StructuralChunker::from_config(config),
        text,
    )
}

/// Chunk `text` with `primary`, falling back to `fallback` only on resource exhaustion.
pub fn chunk_with(
    primary: &dyn Segmenter,
    fallback: &dyn Segmenter,
    text: &str,
) -> Result<ChunkOutcome> {
    match primary.segment(text) {
        Ok(chunks) => Ok(ChunkOutcome::Primary(chunks)),
        Err(DocketError::ChunkingExhausted(cause)) => {
            warn!(
                "{} chunker exhausted resources ({}), using {} fallback",
                primary.name(),
                cause,
                fallback.name()
            );
            let chunks = fallback.segment(text)?;
            Ok(ChunkOutcome::Fallback { chunks, cause })
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Exhausted;

    impl Segmenter for Exhausted {
        fn name(&self) -> &'static str {
            "exhausted"
        }

        fn segment(&self, _text: &str) -> Result<Vec<String>> {
            Err(DocketError::ChunkingExhausted("out of memory".to_string()))
        }
    }

    struct Broken;

    impl Segmenter for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn segment(&self, _text: &str) -> Result<Vec<String>> {
            Err(DocketError::InvalidInput("bad text".to_string()))
        }
    }

    const TWO_PARAGRAPHS: &str = "USB device history was recovered from the SYSTEM registry hive.\n\nThe setupapi log confirmed the first connection time of the thumb drive.";

    #[test]
    fn test_primary_outcome() {
        let outcome = chunk_document(TWO_PARAGRAPHS, &ChunkingConfig::default()).unwrap();
        assert!(!outcome.is_degraded());
        assert_eq!(outcome.chunks().len(), 1);
    }

    #[test]
    fn test_empty_text_is_not_degraded() {
        let outcome = chunk_document("", &ChunkingConfig::default()).unwrap();
        assert_eq!(outcome, ChunkOutcome::Primary(Vec::new()));
    }

    #[test]
    fn test_fallback_on_exhaustion() {
        let fallback = StructuralChunker::default();
        let outcome = chunk_with(&Exhausted, &fallback, TWO_PARAGRAPHS).unwrap();

        assert!(outcome.is_degraded());
        assert_eq!(outcome.chunks().len(), 2);
        match outcome {
            ChunkOutcome::Fallback { cause, .. } => assert_eq!(cause, "out of memory"),
            other => panic!("expected fallback, got {:?}", other),
        }
    }

    #[test]
    fn test_fallback_failure_propagates() {
        let result = chunk_with(&Exhausted, &Exhausted, TWO_PARAGRAPHS);
        assert!(matches!(result, Err(DocketError::ChunkingExhausted(_))));
    }

    #[test]
    fn test_other_errors_skip_fallback() {
        let fallback = StructuralChunker::default();
        let result = chunk_with(&Broken, &fallback, TWO_PARAGRAPHS);
        assert!(matches!(result, Err(DocketError::InvalidInput(_))));
    }

    #[test]
    fn test_document_id_is_deterministic() {
        let a = Chunk::new("content".repeat(10), "case/report.pdf", 3);
        let b = Chunk::new("content".repeat(10), "case/report.pdf", 3);
        assert_eq!(a.document_id(), b.document_id());
        assert_eq!(a.document_id().len(), 64);

        let other_index = Chunk::new("content".repeat(10), "case/report.pdf", 4);
        let other_source = Chunk::new("content".repeat(10), "case/notes.pdf", 3);
        let other_content = Chunk::new("contents".repeat(10), "case/report.pdf", 3);
        assert_ne!(a.document_id(), other_index.document_id());
        assert_ne!(a.document_id(), other_source.document_id());
        assert_ne!(a.document_id(), other_content.document_id());
    }

    #[test]
    fn test_from_segments() {
        let segments = vec!["x".repeat(60), "short".to_string(), "y".repeat(70)];
        let chunks = Chunk::from_segments("https://example.com/usb", segments);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[1].index, 2);
        assert_eq!(chunks[1].length, 70);
        assert_eq!(chunks[1].label(), "https://example.com/usb_2");
    }
}
