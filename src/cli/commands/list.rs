//! List and remove commands.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::vector_store::open_store;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    preflight::check(Operation::Browse)?;
    let store = open_store(&settings)?;

    match store.list_sources().await {
        Ok(sources) => {
            if sources.is_empty() {
                Output::info("No documents indexed yet. Use 'docket ingest' to add content.");
            } else {
                Output::header(&format!("Indexed Sources ({})", sources.len()));
                println!();

                for item in &sources {
                    Output::source_info(
                        &item.source,
                        item.chunk_count,
                        &item.indexed_at.format("%Y-%m-%d %H:%M").to_string(),
                    );
                }

                let total_chunks: u32 = sources.iter().map(|s| s.chunk_count).sum();
                println!();
                Output::kv("Total sources", &sources.len().to_string());
                Output::kv("Total chunks", &total_chunks.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list sources: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}

/// Run the remove command.
pub async fn run_remove(source: &str, settings: Settings) -> Result<()> {
    let store = open_store(&settings)?;

    let removed = store.delete_by_source(source).await?;
    if removed == 0 {
        Output::warning(&format!("No chunks found for source: {}", source));
    } else {
        Output::success(&format!("Removed {} chunks from {}", removed, source));
    }

    Ok(())
}
