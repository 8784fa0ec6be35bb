//! Structural fallback segmentation.
//!
//! Splits on blank lines, then packs sentences of oversized paragraphs
//! greedily. Lower quality than [`BoundaryChunker`](super::BoundaryChunker):
//! no overlap, no lookahead.

use super::{ChunkingConfig, Segmenter, MIN_CHUNK_CHARS};
use crate::error::{DocketError, Result};
use regex::Regex;
use tracing::debug;

/// Paragraph/sentence splitter used when the primary chunker runs out of resources.
pub struct StructuralChunker {
    chunk_size: usize,
    max_chunks: usize,
    sentence_break: Regex,
}

impl StructuralChunker {
    pub fn new(chunk_size: usize, max_chunks: usize) -> Self {
        // Terminal punctuation followed by whitespace; the punctuation stays with its sentence.
        let sentence_break = Regex::new(r"[.!?]\s+").expect("Invalid regex");

        Self {
            chunk_size,
            max_chunks,
            sentence_break,
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.max_chunks)
    }

    fn sentences<'a>(&self, paragraph: &'a str) -> Vec<&'a str> {
        let mut sentences = Vec::new();
        let mut last = 0;
        for m in self.sentence_break.find_iter(paragraph) {
            sentences.push(&paragraph[last..m.start() + 1]);
            last = m.end();
        }
        sentences.push(&paragraph[last..]);
        sentences
    }
}

impl Default for StructuralChunker {
    fn default() -> Self {
        Self::from_config(&ChunkingConfig::default())
    }
}

impl Segmenter for StructuralChunker {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn segment(&self, text: &str) -> Result<Vec<String>> {
        let mut out = Emitter::new(self.max_chunks);

        'paragraphs: for paragraph in text.split("\n\n").map(str::trim) {
            if paragraph.is_empty() {
                continue;
            }

            if paragraph.chars().count() <= self.chunk_size {
                if !out.emit(paragraph)? {
                    break;
                }
                continue;
            }

            let mut current = String::new();
            for sentence in self.sentences(paragraph) {
                let sentence = sentence.trim();
                if sentence.is_empty() {
                    continue;
                }

                let current_len = current.chars().count();
                if current_len + sentence.chars().count() + 1 < self.chunk_size {
                    if !current.is_empty() {
                        current.push(' ');
                    }
                    current.push_str(sentence);
                } else {
                    if !out.emit(&current)? {
                        break 'paragraphs;
                    }
                    current = sentence.to_string();
                }
            }

            if !out.emit(&current)? {
                break;
            }
        }

        debug!("Structural split produced {} chunks", out.chunks.len());
        Ok(out.chunks)
    }
}

/// Collects chunks up to a hard cap.
struct Emitter {
    chunks: Vec<String>,
    max_chunks: usize,
}

impl Emitter {
    fn new(max_chunks: usize) -> Self {
        Self {
            chunks: Vec::new(),
            max_chunks,
        }
    }

    /// Push `chunk` if it is long enough. Returns `false` once the cap is reached.
    fn emit(&mut self, chunk: &str) -> Result<bool> {
        if self.chunks.len() >= self.max_chunks {
            return Ok(false);
        }
        if chunk.chars().count() >= MIN_CHUNK_CHARS {
            self.chunks
                .try_reserve(1)
                .map_err(|e| DocketError::ChunkingExhausted(format!("fallback list: {}", e)))?;
            self.chunks.push(chunk.to_string());
        }
        Ok(self.chunks.len() < self.max_chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARA_A: &str =
        "The suspect laptop was imaged with a hardware write blocker in place at all times.";
    const PARA_B: &str =
        "Camera EXIF metadata placed the photographs in the warehouse on the night in question.";

    #[test]
    fn test_two_paragraphs() {
        let text = format!("{}\n\n{}", PARA_A, PARA_B);
        let chunks = StructuralChunker::new(800, 500).segment(&text).unwrap();
        assert_eq!(chunks, vec![PARA_A.to_string(), PARA_B.to_string()]);
    }

    #[test]
    fn test_drops_short_paragraphs() {
        let text = format!("Too short.\n\n{}\n\n   \n\n", PARA_A);
        let chunks = StructuralChunker::new(800, 500).segment(&text).unwrap();
        assert_eq!(chunks, vec![PARA_A.to_string()]);
    }

    #[test]
    fn test_packs_sentences_of_long_paragraph() {
        let paragraph = format!("{} {} {} {}", PARA_A, PARA_B, PARA_A, PARA_B);
        let chunks = StructuralChunker::new(200, 500).segment(&paragraph).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], format!("{} {}", PARA_A, PARA_B));
        assert_eq!(chunks[1], format!("{} {}", PARA_A, PARA_B));
        for chunk in &chunks {
            assert!(chunk.len() < 200);
        }
    }

    #[test]
    fn test_sentence_split_keeps_punctuation() {
        let chunker = StructuralChunker::new(100, 500);
        let sentences = chunker.sentences("One. Two!  Three? Four");
        assert_eq!(sentences, vec!["One.", "Two!", "Three?", "Four"]);
    }

    #[test]
    fn test_cap_stops_immediately() {
        let text = vec![PARA_A; 10].join("\n\n");
        let chunks = StructuralChunker::new(800, 3).segment(&text).unwrap();
        assert_eq!(chunks.len(), 3);

        let long = vec![PARA_B; 10].join(" ");
        let chunks = StructuralChunker::new(100, 2).segment(&long).unwrap();
        assert_eq!(chunks.len(), 2);
    }
}
