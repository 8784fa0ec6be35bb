//! Local file extraction.

use super::Extractor;
use crate::error::{DocketError, Result};
use async_trait::async_trait;
use std::path::Path;
use tracing::instrument;

/// Reads PDFs with `pdf-extract` and everything else as lossy UTF-8.
pub struct FileExtractor;

impl FileExtractor {
    fn is_pdf(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false)
    }
}

#[async_trait]
impl Extractor for FileExtractor {
    fn name(&self) -> &'static str {
        "file"
    }

    #[instrument(skip(self))]
    async fn extract(&self, source: &str) -> Result<String> {
        let path = Path::new(source);
        let bytes = tokio::fs::read(path).await?;

        if !Self::is_pdf(path) {
            return Ok(String::from_utf8_lossy(&bytes).into_owned());
        }

        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| DocketError::Extraction(format!("PDF task failed: {}", e)))?
            .map_err(|e| DocketError::Extraction(format!("PDF read error in {}: {}", source, e)))?;

        Ok(text)
    }
}
