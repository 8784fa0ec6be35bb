//! Serve command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::conversation::SessionStore;
use crate::rag::RagEngine;
use crate::server::{self, AppState};
use anyhow::Result;
use std::sync::Arc;

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let engine = RagEngine::from_settings(&settings)?;
    let conversation = &settings.conversation;
    let sessions = SessionStore::new(conversation.max_history_tokens)
        .with_limits(conversation.max_sessions, conversation.session_idle_timeout());
    let state = Arc::new(AppState::new(engine, sessions));

    Output::header("Docket API Server");
    println!();
    Output::success(&format!("Listening on http://{}:{}", host, port));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Ask (RAG)", "POST /api/ask");
    Output::kv("Clear session", "POST /api/clear");
    Output::kv("End session", "POST /api/end");
    Output::kv("Export chat", "POST /api/export");
    Output::kv("List sources", "GET  /api/sources");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    server::serve(host, port, state).await?;

    Ok(())
}
