//! Plain-text conversation transcripts.

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

const TITLE: &str = "Cyber-Forensics Q&A Export";

/// A cited source in an exported message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSource {
    pub source: String,
    #[serde(default)]
    pub chunk_index: usize,
}

/// One message of an exported conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMessage {
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub sources: Vec<ExportSource>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl ExportMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            sources: Vec::new(),
            timestamp: None,
        }
    }

    pub fn with_sources(mut self, sources: Vec<ExportSource>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }
}

/// Render `messages` as a plain-text transcript.
pub fn render_export(messages: &[ExportMessage]) -> String {
    let mut out = format!("{}\n{}\n\n", TITLE, "=".repeat(40));

    for msg in messages {
        out.push_str(&format!("{}: {}\n", msg.role.to_uppercase(), msg.content));
        if !msg.sources.is_empty() {
            out.push_str("Sources:\n");
            for source in &msg.sources {
                out.push_str(&format!("  - {} (Chunk {})\n", source.source, source.chunk_index));
            }
        }
        out.push_str(&format!(
            "Timestamp: {}\n",
            msg.timestamp.as_deref().unwrap_or("N/A")
        ));
        out.push_str(&"-".repeat(40));
        out.push('\n');
    }

    out
}

/// Download name for an export written at `at`.
pub fn export_filename<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("forensics_export_{}.txt", at.format("%Y%m%d_%H%M%S"))
}

/// Download name for an export written now.
pub fn export_filename_now() -> String {
    export_filename(&Local::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_render_export() {
        let messages = vec![
            ExportMessage::new("user", "Where are USB serials?").with_timestamp("2024-05-01T10:00:00"),
            ExportMessage::new("assistant", "Under USBSTOR.").with_sources(vec![ExportSource {
                source: "usb.txt".to_string(),
                chunk_index: 2,
            }]),
        ];

        let expected = "Cyber-Forensics Q&A Export\n\
========================================\n\n\
USER: Where are USB serials?\n\
Timestamp: 2024-05-01T10:00:00\n\
----------------------------------------\n\
ASSISTANT: Under USBSTOR.\n\
Sources:\n  - usb.txt (Chunk 2)\n\
Timestamp: N/A\n\
----------------------------------------\n";

        assert_eq!(render_export(&messages), expected);
    }

    #[test]
    fn test_empty_export_has_header() {
        assert_eq!(
            render_export(&[]),
            format!("Cyber-Forensics Q&A Export\n{}\n\n", "=".repeat(40))
        );
    }

    #[test]
    fn test_messages_from_json() {
        let json = r#"[{"role": "assistant", "content": "ok", "sources": [{"source": "a.pdf"}]}]"#;
        let messages: Vec<ExportMessage> = serde_json::from_str(json).unwrap();
        assert_eq!(messages[0].sources[0].chunk_index, 0);
        assert_eq!(messages[0].timestamp, None);
    }

    #[test]
    fn test_filename() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 3, 7).unwrap();
        assert_eq!(export_filename(&at), "forensics_export_20240501_090307.txt");
    }
}
