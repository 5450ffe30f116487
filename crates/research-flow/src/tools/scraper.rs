//! HTTP page scraper
//!
//! Fetches a page, strips markup down to readable text and, when built
//! with a generation backend, runs the caller's extraction instruction
//! over that text.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, warn};

use super::{ScrapeError, ScrapeSession, ScrapedPage, Scraper};
use crate::llm::LLMProvider;

const USER_AGENT: &str = concat!("web-research-agent/", env!("CARGO_PKG_VERSION"));

/// Page text handed to the extraction prompt
const EXTRACTION_INPUT_CHARS: usize = 20_000;

fn script_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("valid script regex"))
}

fn style_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("valid style regex"))
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid tag regex"))
}

fn blank_lines_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n[ \t]*(\n[ \t]*){2,}").expect("valid blank line regex"))
}

/// Reduce HTML to plain text: drop scripts and styles, strip tags, decode
/// common entities and collapse runs of blank lines.
pub fn strip_html_tags(html: &str) -> String {
    let cleaned = script_re().replace_all(html, "");
    let cleaned = style_re().replace_all(&cleaned, "");
    let text = tag_re().replace_all(&cleaned, "");

    let text = text
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");

    blank_lines_re()
        .replace_all(&text, "\n\n")
        .trim()
        .to_string()
}

/// Scraper backed by plain HTTP fetches.
pub struct HttpScraper {
    timeout: Duration,
    extractor: Option<Arc<dyn LLMProvider>>,
}

impl HttpScraper {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            extractor: None,
        }
    }

    /// Run extraction instructions through `llm`.
    pub fn with_extractor(mut self, llm: Arc<dyn LLMProvider>) -> Self {
        self.extractor = Some(llm);
        self
    }
}

#[async_trait]
impl Scraper for HttpScraper {
    async fn session(&self) -> Result<Box<dyn ScrapeSession>, ScrapeError> {
        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ScrapeError::Unavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Box::new(HttpScrapeSession {
            client,
            extractor: self.extractor.clone(),
        }))
    }
}

/// Whether the body opens like an HTML document.
fn looks_like_html(body: &str) -> bool {
    let head: String = body.trim_start().chars().take(15).collect::<String>().to_ascii_lowercase();
    head.starts_with("<html") || head.starts_with("<!doctype html")
}

struct HttpScrapeSession {
    client: Client,
    extractor: Option<Arc<dyn LLMProvider>>,
}

impl HttpScrapeSession {
    async fn fetch_text(&self, url: &str) -> Result<String, ScrapeError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ScrapeError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status(status.as_u16()));
        }

        let html_header = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("html"))
            .unwrap_or(false);

        let body = response
            .text()
            .await
            .map_err(|e| ScrapeError::Request(format!("Failed to read response body: {}", e)))?;

        Ok(if html_header || looks_like_html(&body) {
            strip_html_tags(&body)
        } else {
            body
        })
    }

    async fn extract(&self, llm: &dyn LLMProvider, instruction: &str, text: &str) -> Option<String> {
        let input: String = text.chars().take(EXTRACTION_INPUT_CHARS).collect();
        let prompt = format!("{}\n\nPage content:\n{}", instruction, input);

        match llm.generate(&prompt).await {
            Ok(reply) if !reply.trim().is_empty() => Some(reply.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Content extraction failed, keeping page text");
                None
            }
        }
    }
}

#[async_trait]
impl ScrapeSession for HttpScrapeSession {
    async fn scrape(&self, url: &str, instruction: &str) -> Result<ScrapedPage, ScrapeError> {
        debug!(url = %url, "Fetching page");

        let text = self.fetch_text(url).await?;
        if text.trim().is_empty() {
            return Err(ScrapeError::EmptyContent);
        }

        let extracted = match &self.extractor {
            Some(llm) => self.extract(llm.as_ref(), instruction, &text).await,
            None => None,
        };

        debug!(url = %url, chars = text.len(), extracted = extracted.is_some(), "Page scraped");

        Ok(ScrapedPage {
            extracted,
            text: Some(text),
        })
    }
}
