//! Sentence-boundary chunking with overlap.
//!
//! Walks the text left to right in windows of `chunk_size` characters. Each
//! window end is pushed forward to the first sentence terminator found in a
//! short lookahead, and the next window starts `overlap` characters before the
//! previous end, or further along if that would stall.

use super::{ChunkingConfig, Segmenter, LOOKAHEAD_CHARS, MAX_ITERATIONS, MIN_CHUNK_CHARS};
use crate::error::{DocketError, Result};
use tracing::{debug, warn};

/// Primary chunker.
#[derive(Debug, Clone)]
pub struct BoundaryChunker {
    chunk_size: usize,
    overlap: usize,
    max_chunks: usize,
}

impl BoundaryChunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
            max_chunks: ChunkingConfig::default().max_chunks,
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            overlap: config.chunk_overlap,
            max_chunks: config.max_chunks,
        }
    }

    /// Cap the number of chunks produced for one text.
    pub fn with_max_chunks(mut self, max_chunks: usize) -> Self {
        self.max_chunks = max_chunks;
        self
    }
}

impl Default for BoundaryChunker {
    fn default() -> Self {
        Self::from_config(&ChunkingConfig::default())
    }
}

impl Segmenter for BoundaryChunker {
    fn name(&self) -> &'static str {
        "boundary"
    }

    fn segment(&self, text: &str) -> Result<Vec<String>> {
        if text.is_empty() || self.chunk_size == 0 {
            return Ok(Vec::new());
        }

        let mut chars: Vec<char> = Vec::new();
        chars
            .try_reserve_exact(text.len())
            .map_err(|e| DocketError::ChunkingExhausted(format!("text buffer: {}", e)))?;
        chars.extend(text.chars());
        let len = chars.len();

        let mut chunks: Vec<String> = Vec::new();
        let mut start = 0usize;
        let mut iterations = 0usize;
        let min_step = (self.chunk_size / 2).max(1);

        while start < len && chunks.len() < self.max_chunks {
            if iterations >= MAX_ITERATIONS {
                warn!(
                    "Chunking stopped after {} iterations at offset {}/{}",
                    iterations, start, len
                );
                break;
            }
            iterations += 1;

            let mut end = (start + self.chunk_size).min(len);

            if end == len {
                push_if_meaningful(&mut chunks, &chars[start..end])?;
                break;
            }

            if let Some(offset) = find_boundary(&chars[end..(end + LOOKAHEAD_CHARS).min(len)]) {
                end += offset + 1;
            }

            push_if_meaningful(&mut chunks, &chars[start..end])?;

            start = end.saturating_sub(self.overlap).max(start + min_step);
        }

        debug!(
            "Split {} characters into {} chunks in {} iterations",
            len,
            chunks.len(),
            iterations
        );

        Ok(chunks)
    }
}

/// Position of the earliest sentence terminator (`. `, `? `, `! `) or line break.
fn find_boundary(window: &[char]) -> Option<usize> {
    window.iter().enumerate().position(|(i, &c)| match c {
        '\n' => true,
        '.' | '?' | '!' => window.get(i + 1) == Some(&' '),
        _ => false,
    })
}

fn push_if_meaningful(chunks: &mut Vec<String>, span: &[char]) -> Result<()> {
    let first = span.iter().position(|c| !c.is_whitespace());
    let last = span.iter().rposition(|c| !c.is_whitespace());
    let (Some(first), Some(last)) = (first, last) else {
        return Ok(());
    };

    let trimmed = &span[first..=last];
    if trimmed.len() < MIN_CHUNK_CHARS {
        return Ok(());
    }

    let mut chunk = String::new();
    chunk
        .try_reserve(trimmed.len())
        .map_err(|e| DocketError::ChunkingExhausted(format!("chunk buffer: {}", e)))?;
    chunk.extend(trimmed);

    chunks
        .try_reserve(1)
        .map_err(|e| DocketError::ChunkingExhausted(format!("chunk list: {}", e)))?;
    chunks.push(chunk);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence_text(sentences: usize) -> String {
        (0..sentences)
            .map(|i| {
                format!(
                    "Sentence {} describes the write blocker attached to evidence drive {}.",
                    i, i
                )
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_empty_and_zero_size() {
        assert!(BoundaryChunker::new(800, 100).segment("").unwrap().is_empty());
        assert!(BoundaryChunker::new(0, 100)
            .segment(&sentence_text(3))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_short_text() {
        let chunker = BoundaryChunker::new(800, 100);

        let short = "Forty characters of text, give or take.";
        assert!(short.len() < 50);
        assert!(chunker.segment(short).unwrap().is_empty());

        let medium = "  This sentence is long enough to pass the minimum meaningful size.  ";
        let chunks = chunker.segment(medium).unwrap();
        assert_eq!(chunks, vec![medium.trim().to_string()]);
    }

    #[test]
    fn test_no_punctuation() {
        let text = "a".repeat(1000);
        let chunks = BoundaryChunker::new(800, 100).segment(&text).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "a".repeat(800));
        // Second window starts at 700 and runs to the end.
        assert_eq!(chunks[1], "a".repeat(300));
    }

    #[test]
    fn test_snaps_to_sentence_end() {
        let text = sentence_text(40);
        let chunks = BoundaryChunker::new(200, 50).segment(&text).unwrap();

        // The last two windows may end inside the final sentence.
        assert!(chunks.len() > 2);
        for chunk in &chunks[..chunks.len() - 2] {
            assert!(chunk.ends_with('.'), "chunk did not end at a sentence: {:?}", chunk);
        }
    }

    #[test]
    fn test_chunk_length_bounds() {
        let text = sentence_text(60);
        let chunk_size = 300;
        let chunks = BoundaryChunker::new(chunk_size, 60).segment(&text).unwrap();

        for chunk in &chunks {
            let n = chunk.chars().count();
            assert!(n >= MIN_CHUNK_CHARS);
            assert!(n <= chunk_size + LOOKAHEAD_CHARS);
        }
    }

    #[test]
    fn test_overlap_and_coverage() {
        let text = sentence_text(50);
        let chunks = BoundaryChunker::new(250, 40).segment(&text).unwrap();

        let mut previous_start = 0;
        let mut covered_to = 0;
        for chunk in &chunks {
            let start = text.find(chunk.as_str()).expect("chunk is a slice of the input");
            assert!(start >= previous_start);
            assert!(start <= covered_to, "gap before offset {}", start);
            previous_start = start;
            covered_to = start + chunk.len();
        }
        assert_eq!(covered_to, text.trim_end().len());
    }

    #[test]
    fn test_deterministic() {
        let text = sentence_text(30);
        let chunker = BoundaryChunker::new(180, 30);
        assert_eq!(chunker.segment(&text).unwrap(), chunker.segment(&text).unwrap());
    }

    #[test]
    fn test_large_overlap_terminates() {
        let text = sentence_text(30);
        let chunks = BoundaryChunker::new(100, 500).segment(&text).unwrap();
        assert!(!chunks.is_empty());
        assert!(chunks.len() < MAX_ITERATIONS);

        let tiny = BoundaryChunker::new(1, 1).segment(&"x".repeat(200)).unwrap();
        assert!(tiny.is_empty());
    }

    #[test]
    fn test_max_chunks_cap() {
        let text = sentence_text(100);
        let chunks = BoundaryChunker::new(100, 0)
            .with_max_chunks(5)
            .segment(&text)
            .unwrap();
        assert_eq!(chunks.len(), 5);
    }

    #[test]
    fn test_newline_boundary() {
        let mut text = "b".repeat(120);
        text.push('\n');
        text.push_str(&"c".repeat(200));
        let chunks = BoundaryChunker::new(100, 0).segment(&text).unwrap();
        assert_eq!(chunks[0], "b".repeat(120));
    }
}
