//! Token-bounded conversation buffer.

use super::{Role, Turn};
use crate::generation::{TokenCounter, WordCounter};
use std::sync::Arc;
use tracing::debug;

/// Default history budget in approximate tokens.
pub const DEFAULT_MAX_HISTORY_TOKENS: usize = 1000;

/// Ordered conversation turns bounded by an approximate token budget.
///
/// After every append, the oldest non-system turns are evicted until the total
/// fits the budget. At least one turn is always kept, and system turns are
/// never evicted.
#[derive(Clone)]
pub struct ConversationBuffer {
    turns: Vec<Turn>,
    max_tokens: usize,
    counter: Arc<dyn TokenCounter>,
}

impl ConversationBuffer {
    pub fn new(max_tokens: usize) -> Self {
        Self::with_counter(max_tokens, Arc::new(WordCounter))
    }

    /// Count tokens with `counter` instead of plain word counts.
    pub fn with_counter(max_tokens: usize, counter: Arc<dyn TokenCounter>) -> Self {
        Self {
            turns: Vec::new(),
            max_tokens,
            counter,
        }
    }

    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.turns.push(Turn::new(role, content));
        self.evict();
    }

    fn evict(&mut self) {
        let mut total = self.total_tokens();

        while total > self.max_tokens && self.turns.len() > 1 {
            let Some(pos) = self.turns.iter().position(|t| t.role != Role::System) else {
                break;
            };
            let removed = self.turns.remove(pos);
            total -= self.counter.count_tokens(&removed.content);
            debug!(
                "Evicted {} turn, history now {} tokens in {} turns",
                removed.role,
                total,
                self.turns.len()
            );
        }
    }

    /// Approximate token count across all turns.
    pub fn total_tokens(&self) -> usize {
        self.turns
            .iter()
            .map(|t| self.counter.count_tokens(&t.content))
            .sum()
    }

    /// Render as `Role: content` blocks separated by blank lines.
    pub fn render(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("{}: {}", t.role.label(), t.content))
            .collect::<Vec<_>>()
            .join("\n\n")
            .trim()
            .to_string()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }
}

impl Default for ConversationBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY_TOKENS)
    }
}

impl std::fmt::Debug for ConversationBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationBuffer")
            .field("turns", &self.turns)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}
