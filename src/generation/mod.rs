//! Text generation and approximate token accounting.

mod openai;

pub use openai::OpenAiGenerator;

use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;

/// Reply returned when generation fails.
pub const APOLOGY: &str = "I apologize, but I encountered an error while generating a response.";

/// Approximate token accounting.
///
/// The default methods count whitespace-delimited words. Implementations may
/// use a real tokenizer as long as more text never yields fewer tokens.
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }

    /// Keep at most `max_tokens` tokens of `text`.
    fn truncate_to_tokens(&self, text: &str, max_tokens: usize) -> String {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() <= max_tokens {
            return text.to_string();
        }
        words[..max_tokens].join(" ")
    }
}

/// Word-count token approximation.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCounter;

impl TokenCounter for WordCounter {}

/// Trait for completion backends.
#[async_trait]
pub trait Generator: TokenCounter {
    /// Complete `prompt`, producing at most `max_tokens` tokens.
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String>;
}

/// Tidy a raw completion: drop a trailing unfinished sentence and capitalize the first letter.
pub fn clean_response(response: &str) -> String {
    static TRAILING_FRAGMENT: OnceLock<Regex> = OnceLock::new();
    let trailing = TRAILING_FRAGMENT.get_or_init(|| Regex::new(r"[^.!?]+$").expect("Invalid regex"));

    let trimmed = trailing.replace(response.trim(), "");
    let mut chars = trimmed.chars();
    let capitalized = match chars.next() {
        Some(first) if first.is_lowercase() => first.to_uppercase().chain(chars).collect(),
        _ => trimmed.to_string(),
    };
    capitalized.trim().to_string()
}
