//! Prompt assembly from retrieved passages and conversation history.

use super::RetrievedSource;
use crate::config::Prompts;
use crate::vector_store::QueryResults;

/// Format retrieval results as numbered passages and collect their sources.
///
/// Documents and metadata are paired by position. A document with no
/// metadata entry is attributed to `"Unknown"`, chunk 0.
pub fn format_context(results: &QueryResults) -> (String, Vec<RetrievedSource>) {
    let mut parts = Vec::with_capacity(results.documents.len());
    let mut sources = Vec::with_capacity(results.documents.len());

    for (i, doc) in results.documents.iter().enumerate() {
        parts.push(format!("[Document {}]: {}", i + 1, doc));
        sources.push(RetrievedSource::new(doc, results.metadatas.get(i)));
    }

    (parts.join("\n\n"), sources)
}

/// Build the prompt with the default templates.
pub fn build_prompt(question: &str, context: &str, history: &str) -> String {
    build_prompt_with(&Prompts::default(), question, context, history)
}

/// Build the prompt from `prompts`.
///
/// The `Previous Conversation:` section is left out entirely when `history`
/// is empty. Nothing is truncated here.
pub fn build_prompt_with(prompts: &Prompts, question: &str, context: &str, history: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str(&prompts.render_custom(&prompts.rag.persona));
    prompt.push_str("\n\n");
    prompt.push_str(&prompts.render_custom(&prompts.rag.guidance));
    prompt.push_str("\n\nContext Information:\n");
    prompt.push_str(context);
    prompt.push_str("\n\n");

    if !history.is_empty() {
        prompt.push_str("Previous Conversation:\n");
        prompt.push_str(history);
        prompt.push_str("\n\n");
    }

    prompt.push_str("Current Question: ");
    prompt.push_str(question);
    prompt.push_str("\n\nInstructions:\n");
    prompt.push_str(&prompts.render_custom(&prompts.rag.instructions));
    prompt.push_str("\n\nAssistant: ");

    prompt
}
