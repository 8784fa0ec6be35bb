//! Raw text extraction from local files, web pages and video transcripts.
//!
//! Extractors return errors; [`Extractors::extract`] logs them and yields an
//! empty string so one bad source never stops a batch.

mod file;
mod web;
mod youtube;

pub use file::FileExtractor;
pub use web::{html_to_text, WebExtractor};
pub use youtube::{extract_video_id, parse_vtt, YoutubeExtractor};

use crate::config::IngestSettings;
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Where a document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A local file.
    File(PathBuf),
    /// A web page.
    Web(String),
    /// A video whose subtitles are used as text.
    Youtube { url: String, video_id: String },
}

impl Source {
    /// Classify a URL as a video or a plain web page.
    pub fn from_url(url: &str) -> Self {
        let url = url.trim();
        match extract_video_id(url) {
            Some(video_id) if is_youtube_url(url) => Source::Youtube {
                url: url.to_string(),
                video_id,
            },
            _ => Source::Web(url.to_string()),
        }
    }

    /// The label stored with each chunk: the file path or the URL.
    pub fn label(&self) -> String {
        match self {
            Source::File(path) => path.display().to_string(),
            Source::Web(url) | Source::Youtube { url, .. } => url.clone(),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

fn is_youtube_url(input: &str) -> bool {
    url::Url::parse(input)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .map(|host| {
            let host = host.trim_start_matches("www.").trim_start_matches("m.");
            host == "youtube.com" || host == "youtu.be"
        })
        .unwrap_or(false)
}

/// Trait for text extractors.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Extract raw text from `source` (a path or a URL).
    async fn extract(&self, source: &str) -> Result<String>;
}

/// One extractor per source kind.
#[derive(Clone)]
pub struct Extractors {
    file: Arc<dyn Extractor>,
    web: Arc<dyn Extractor>,
    youtube: Arc<dyn Extractor>,
}

impl Extractors {
    /// Build the default extractors.
    pub fn new(settings: &IngestSettings) -> Result<Self> {
        Ok(Self {
            file: Arc::new(FileExtractor),
            web: Arc::new(WebExtractor::new(Duration::from_secs(
                settings.fetch_timeout_seconds,
            ))?),
            youtube: Arc::new(YoutubeExtractor::new()),
        })
    }

    /// Use the given extractors instead of the defaults.
    pub fn with(
        file: Arc<dyn Extractor>,
        web: Arc<dyn Extractor>,
        youtube: Arc<dyn Extractor>,
    ) -> Self {
        Self { file, web, youtube }
    }

    /// Extract text from `source`, or `""` if extraction fails.
    pub async fn extract(&self, source: &Source) -> String {
        let (extractor, target) = match source {
            Source::File(path) => (&self.file, path.display().to_string()),
            Source::Web(url) => (&self.web, url.clone()),
            Source::Youtube { url, .. } => (&self.youtube, url.clone()),
        };

        match extractor.extract(&target).await {
            Ok(text) => {
                debug!("{} extracted {} bytes from {}", extractor.name(), text.len(), target);
                text
            }
            Err(e) => {
                warn!("Error extracting text from {}: {}", target, e);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_urls() {
        assert_eq!(
            Source::from_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10"),
            Source::Youtube {
                url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10".to_string(),
                video_id: "dQw4w9WgXcQ".to_string(),
            }
        );
        assert!(matches!(
            Source::from_url("https://youtu.be/dQw4w9WgXcQ"),
            Source::Youtube { .. }
        ));
        assert_eq!(
            Source::from_url(" https://forensics.example.org/usb-artifacts "),
            Source::Web("https://forensics.example.org/usb-artifacts".to_string())
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(Source::File(PathBuf::from("docs/usb.txt")).label(), "docs/usb.txt");
        assert_eq!(Source::Web("https://a.example".into()).to_string(), "https://a.example");
    }

    struct Failing;

    #[async_trait]
    impl Extractor for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn extract(&self, source: &str) -> Result<String> {
            Err(crate::error::DocketError::Extraction(source.to_string()))
        }
    }

    #[tokio::test]
    async fn test_failures_yield_empty_text() {
        let failing: Arc<dyn Extractor> = Arc::new(Failing);
        let extractors = Extractors::with(failing.clone(), failing.clone(), failing);

        let text = extractors.extract(&Source::Web("https://a.example".into())).await;
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_missing_file_yields_empty_text() {
        let extractors = Extractors::new(&IngestSettings::default()).unwrap();
        let text = extractors
            .extract(&Source::File(PathBuf::from("/nonexistent/evidence.txt")))
            .await;
        assert_eq!(text, "");
    }
}
