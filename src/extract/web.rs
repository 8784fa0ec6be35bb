//! Web page extraction.

use super::Extractor;
use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::instrument;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Elements whose content is never part of the readable text.
const BOILERPLATE_TAGS: [&str; 6] = ["script", "style", "nav", "footer", "header", "aside"];

/// Fetches a page and reduces its HTML to readable text.
pub struct WebExtractor {
    client: reqwest::Client,
}

impl WebExtractor {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Extractor for WebExtractor {
    fn name(&self) -> &'static str {
        "web"
    }

    #[instrument(skip(self))]
    async fn extract(&self, source: &str) -> Result<String> {
        let body = self
            .client
            .get(source)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(html_to_text(&body))
    }
}

struct HtmlPatterns {
    comments: Regex,
    boilerplate: Vec<Regex>,
    main: Regex,
    article: Regex,
    line_breaks: Regex,
    tags: Regex,
    numeric_entity: Regex,
}

fn patterns() -> &'static HtmlPatterns {
    static PATTERNS: OnceLock<HtmlPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| HtmlPatterns {
        comments: Regex::new(r"(?s)<!--.*?-->").expect("Invalid regex"),
        boilerplate: BOILERPLATE_TAGS
            .iter()
            .map(|tag| {
                Regex::new(&format!(r"(?is)<{0}\b[^>]*>.*?</{0}\s*>", tag)).expect("Invalid regex")
            })
            .collect(),
        main: Regex::new(r"(?is)<main\b[^>]*>(.*?)</main\s*>").expect("Invalid regex"),
        article: Regex::new(r"(?is)<article\b[^>]*>(.*?)</article\s*>").expect("Invalid regex"),
        line_breaks: Regex::new(r"(?i)<br\s*/?>|</(p|div|li|tr|h[1-6]|section|blockquote|pre)\s*>")
            .expect("Invalid regex"),
        tags: Regex::new(r"(?s)<[^>]*>").expect("Invalid regex"),
        numeric_entity: Regex::new(r"&#([xX][0-9a-fA-F]+|[0-9]+);").expect("Invalid regex"),
    })
}

/// Reduce an HTML document to its readable text.
///
/// Boilerplate elements are dropped and `<main>` or `<article>` content is
/// preferred over the whole body. Lines are trimmed and phrases separated
/// by double spaces are joined with a single space.
pub fn html_to_text(html: &str) -> String {
    let p = patterns();

    let mut doc = p.comments.replace_all(html, "").into_owned();
    for pattern in &p.boilerplate {
        doc = pattern.replace_all(&doc, "").into_owned();
    }

    let content = element_text(&p.main, &doc)
        .or_else(|| element_text(&p.article, &doc))
        .unwrap_or(doc);

    let content = p.line_breaks.replace_all(&content, "\n");
    let content = p.tags.replace_all(&content, "");
    let content = decode_entities(&content);

    content
        .lines()
        .flat_map(|line| line.trim().split("  "))
        .map(str::trim)
        .filter(|phrase| !phrase.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Inner HTML of every element matched by `pattern`, one per line.
fn element_text(pattern: &Regex, doc: &str) -> Option<String> {
    let parts: Vec<&str> = pattern
        .captures_iter(doc)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect();
    (!parts.is_empty()).then(|| parts.join("\n"))
}

/// Decode numeric references and the common named entities.
fn decode_entities(text: &str) -> String {
    let decoded = patterns()
        .numeric_entity
        .replace_all(text, |caps: &regex::Captures| {
            let raw = &caps[1];
            let code = match raw.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => raw.parse().ok(),
            };
            code.and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_default()
        });

    decoded
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_boilerplate() {
        let html = r#"<html><head><style>p { color: red }</style><script>var x = "<p>";</script></head>
<body><header>Site name</header><nav><a href="/">Home</a></nav>
<div><p>Write blockers prevent changes to evidence.</p></div>
<aside>Related posts</aside><footer>(c) 2024</footer></body></html>"#;

        assert_eq!(html_to_text(html), "Write blockers prevent changes to evidence.");
    }

    #[test]
    fn test_prefers_main_then_article() {
        let with_main = "<body><div>Sidebar</div><main><p>Main text</p></main></body>";
        assert_eq!(html_to_text(with_main), "Main text");

        let with_article = "<body><div>Menu</div><article><h1>Title</h1><p>Body</p></article></body>";
        assert_eq!(html_to_text(with_article), "Title Body");
    }

    #[test]
    fn test_multiple_articles_skip_text_between() {
        let html = "<body><article><p>First report</p></article>\
                    <div>Related links</div>\
                    <article><p>Second report</p></article></body>";
        assert_eq!(html_to_text(html), "First report Second report");
    }

    #[test]
    fn test_joins_lines_and_phrases() {
        let html = "<p>  first line  </p>\n\n<p>second   phrase</p><br/>third";
        assert_eq!(html_to_text(html), "first line second phrase third");
    }

    #[test]
    fn test_decodes_entities() {
        assert_eq!(
            html_to_text("<p>Tom &amp; Jerry &lt;3 &#65;&#x42; caf&#233;&nbsp;ok</p>"),
            "Tom & Jerry <3 AB caf\u{e9} ok"
        );
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(html_to_text(""), "");
        assert_eq!(html_to_text("<script>only()</script>"), "");
    }
}
