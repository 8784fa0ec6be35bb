//! Interactive chat command.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::conversation::ConversationBuffer;
use crate::export::{export_filename_now, render_export, ExportMessage, ExportSource};
use crate::rag::RagEngine;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

/// Run the interactive chat command.
pub async fn run_chat(model: Option<String>, mut settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    if let Some(model) = model {
        settings.generation.model = model;
    }

    let engine = RagEngine::from_settings(&settings)?;
    let mut history = ConversationBuffer::new(settings.conversation.max_history_tokens);
    let mut transcript: Vec<ExportMessage> = Vec::new();

    println!("\n{}", style("Docket Chat").bold().cyan());
    println!(
        "{}\n",
        style("Type your questions, or 'exit' to quit. Use 'clear' to reset the conversation and '/export [file]' to save it.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            history.clear();
            transcript.clear();
            Output::info("Conversation history cleared.");
            continue;
        }

        if let Some(path) = export_target(input) {
            let path = path.unwrap_or_else(export_filename_now);
            match std::fs::write(&path, render_export(&transcript)) {
                Ok(()) => Output::success(&format!("Conversation exported to {}", path)),
                Err(e) => Output::error(&format!("Failed to export conversation: {}", e)),
            }
            continue;
        }

        let asked_at = chrono::Local::now().to_rfc3339();
        let spinner = Output::spinner("Thinking...");
        let response = engine.ask(&mut history, input).await;
        spinner.finish_and_clear();

        println!("\n{} {}\n", style("Docket:").cyan().bold(), response.answer);

        let sources: Vec<ExportSource> = response
            .sources
            .iter()
            .map(|s| ExportSource {
                source: s.source.clone(),
                chunk_index: s.chunk_index,
            })
            .collect();
        for source in &sources {
            println!("  {}", style(format!("{} (chunk {})", source.source, source.chunk_index)).dim());
        }
        if !sources.is_empty() {
            println!();
        }

        transcript.push(ExportMessage::new("user", input).with_timestamp(asked_at));
        transcript.push(
            ExportMessage::new("assistant", response.answer)
                .with_sources(sources)
                .with_timestamp(chrono::Local::now().to_rfc3339()),
        );
    }

    Ok(())
}

/// Parse `/export` or `/export <file>`.
///
/// The slash keeps questions that start with the word "export" going to the
/// engine.
fn export_target(input: &str) -> Option<Option<String>> {
    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, char::is_whitespace);
    if !parts.next()?.eq_ignore_ascii_case("export") {
        return None;
    }
    Some(
        parts
            .next()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string),
    )
}
