//! Video transcript extraction through yt-dlp subtitles.

use super::Extractor;
use crate::error::{DocketError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, instrument};

fn video_id_regex() -> &'static Regex {
    static VIDEO_ID: OnceLock<Regex> = OnceLock::new();
    VIDEO_ID.get_or_init(|| {
        // Matches various YouTube URL formats and bare video IDs
        Regex::new(
            r"(?x)
            (?:
                (?:https?://)?
                (?:www\.|m\.)?
                (?:youtube\.com/watch\?(?:[^&\s]*&)*v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/)
                ([a-zA-Z0-9_-]{11})
            )
            |
            ^([a-zA-Z0-9_-]{11})$
        ",
        )
        .expect("Invalid regex")
    })
}

/// Extract the video ID from a YouTube URL or bare ID.
pub fn extract_video_id(input: &str) -> Option<String> {
    let caps = video_id_regex().captures(input.trim())?;

    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Downloads auto-generated subtitles and flattens them to plain text.
pub struct YoutubeExtractor {
    languages: String,
}

impl YoutubeExtractor {
    pub fn new() -> Self {
        Self {
            languages: "en.*".to_string(),
        }
    }

    async fn download_subtitles(&self, video_id: &str, dir: &Path) -> Result<PathBuf> {
        let url = format!("https://www.youtube.com/watch?v={}", video_id);
        let template = dir.join("%(id)s.%(ext)s");

        let output = tokio::process::Command::new("yt-dlp")
            .args([
                "--skip-download",
                "--write-auto-subs",
                "--write-subs",
                "--sub-format",
                "vtt",
                "--sub-langs",
                self.languages.as_str(),
                "--no-warnings",
                "-o",
            ])
            .arg(&template)
            .arg(&url)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    DocketError::ToolNotFound("yt-dlp".to_string())
                } else {
                    DocketError::ToolFailed(format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DocketError::ToolFailed(format!(
                "yt-dlp could not fetch subtitles for {}: {}",
                video_id, stderr
            )));
        }

        let mut subtitles: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("vtt"))
            .collect();
        subtitles.sort();

        subtitles.into_iter().next().ok_or_else(|| {
            DocketError::Extraction(format!("No subtitles available for video {}", video_id))
        })
    }
}

impl Default for YoutubeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for YoutubeExtractor {
    fn name(&self) -> &'static str {
        "youtube"
    }

    #[instrument(skip(self))]
    async fn extract(&self, source: &str) -> Result<String> {
        let video_id = extract_video_id(source).ok_or_else(|| {
            DocketError::InvalidInput(format!("Invalid YouTube URL format: {}", source))
        })?;

        let dir = tempfile::tempdir()?;
        let path = self.download_subtitles(&video_id, dir.path()).await?;
        let vtt = tokio::fs::read_to_string(&path).await?;

        debug!("Read subtitles from {:?}", path);
        Ok(parse_vtt(&vtt))
    }
}

/// Flatten WebVTT cues to one line of text.
///
/// Headers, cue identifiers, timing lines and inline tags are dropped.
/// Auto-generated captions repeat the previous line as each cue rolls in,
/// so a line equal to the last kept line is skipped.
pub fn parse_vtt(vtt: &str) -> String {
    static INLINE_TAG: OnceLock<Regex> = OnceLock::new();
    let inline_tag = INLINE_TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("Invalid regex"));

    let mut lines: Vec<String> = Vec::new();
    let mut in_header = true;
    let mut skip_block = false;

    for raw in vtt.lines() {
        let line = raw.trim();

        if line.is_empty() {
            in_header = false;
            skip_block = false;
            continue;
        }
        if in_header || skip_block {
            continue;
        }
        if line.starts_with("NOTE") || line == "STYLE" || line == "REGION" {
            skip_block = true;
            continue;
        }
        if line.contains("-->") || line.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }

        let text = inline_tag.replace_all(line, "");
        let text = text
            .replace("&nbsp;", " ")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&amp;", "&");
        let text = text.trim();

        if text.is_empty() || lines.last().map(String::as_str) == Some(text) {
            continue;
        }
        lines.push(text.to_string());
    }

    lines.join(" ")
}
