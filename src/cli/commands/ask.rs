//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::conversation::ConversationBuffer;
use crate::rag::RagEngine;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    model: Option<String>,
    top_k: Option<usize>,
    mut settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    if let Some(model) = model {
        settings.generation.model = model;
    }
    if let Some(top_k) = top_k {
        settings.rag.top_k = top_k;
    }

    let engine = RagEngine::from_settings(&settings)?;
    let mut history = ConversationBuffer::new(settings.conversation.max_history_tokens);

    let spinner = Output::spinner("Searching knowledge base...");
    let response = engine.ask(&mut history, question).await;
    spinner.finish_and_clear();

    println!("\n{}\n", response.answer);

    if !response.sources.is_empty() {
        Output::header("Sources");
        for source in &response.sources {
            Output::citation(&source.source, source.chunk_index, &source.content);
        }
        println!();
    }

    Ok(())
}
