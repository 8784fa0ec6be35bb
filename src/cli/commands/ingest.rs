//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::embedding::OpenAiEmbedder;
use crate::extract::Source;
use crate::ingest::Ingestor;
use crate::vector_store::open_store;
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

/// Run the ingest command.
pub async fn run_ingest(dir: Option<String>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let dir = dir
        .map(|d| Settings::expand_path(&d))
        .unwrap_or_else(|| settings.ingest_dir());

    let ingestor = Ingestor::new(
        &settings,
        Arc::new(OpenAiEmbedder::from_settings(&settings.embedding)?),
        open_store(&settings)?,
    )?;

    let sources = ingestor.discover(&dir)?;
    if sources.is_empty() {
        Output::warning(&format!("No supported documents found in {}", dir.display()));
        return Ok(());
    }

    if sources.iter().any(|s| matches!(s, Source::Youtube { .. })) {
        if let Err(e) = preflight::check_tool("yt-dlp") {
            Output::warning(&format!("{} Video transcripts will be skipped.", e));
        }
    }

    Output::header(&format!("Ingesting {} sources from {}", sources.len(), display(&dir)));

    let spinner = Output::spinner("Extracting, chunking and embedding...");
    let report = ingestor.ingest_all(&sources).await;
    spinner.finish_and_clear();

    for (source, reason) in &report.failures {
        Output::warning(&format!("{}: {}", source, reason));
    }

    println!();
    Output::kv("Succeeded", &report.succeeded.to_string());
    Output::kv("Failed", &report.failed.to_string());
    Output::kv("Chunks indexed", &report.chunks_indexed.to_string());
    if report.degraded > 0 {
        Output::kv("Fallback chunking", &report.degraded.to_string());
    }
    println!();

    if report.succeeded > 0 {
        Output::success("Ingestion complete.");
    } else {
        Output::error("No sources were indexed.");
    }

    Ok(())
}

fn display(dir: &Path) -> String {
    dir.canonicalize()
        .unwrap_or_else(|_| dir.to_path_buf())
        .display()
        .to_string()
}
