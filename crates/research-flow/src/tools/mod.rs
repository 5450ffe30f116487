//! External collaborators consumed by the research stages
//!
//! - Web search: [`TavilySearchTool`]
//! - News search: [`NewsApiTool`]
//! - Page scraping: [`HttpScraper`]
//!
//! Search collaborators never fail across the trait boundary; transport
//! and API errors are logged and replaced by placeholder results. Scraping
//! fails per URL so the scrape stage can record each failure and move on.

mod news;
mod scraper;
mod tavily;

pub use news::{redact_api_key, NewsApiError, NewsApiTool};
pub use scraper::{strip_html_tags, HttpScraper};
pub use tavily::{SearchDepth, TavilyError, TavilySearchTool, Topic};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single web search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

/// A single news article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub url: String,
    pub title: String,
    pub summary: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub source: String,
}

/// Content produced by scraping one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapedPage {
    /// Instruction-driven extraction, when the scraper supports it
    pub extracted: Option<String>,
    /// Rendered page text
    pub text: Option<String>,
}

impl ScrapedPage {
    /// Extracted content if present, else rendered text.
    pub fn into_content(self) -> Option<String> {
        self.extracted
            .filter(|s| !s.trim().is_empty())
            .or(self.text)
            .filter(|s| !s.trim().is_empty())
    }
}

/// Scrape failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScrapeError {
    /// The scraping subsystem could not start
    #[error("Scraper unavailable: {0}")]
    Unavailable(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Failed to extract content")]
    EmptyContent,
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Search the web. Returns an empty or placeholder list on failure.
    async fn search(&self, query: &str) -> Vec<SearchResult>;
}

#[async_trait]
pub trait NewsSearch: Send + Sync {
    /// Search recent news published within `days_back` days.
    async fn search_news(&self, query: &str, days_back: u32) -> Vec<NewsArticle>;
}

/// Opens scrape sessions.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Start a session for one batch of URLs.
    async fn session(&self) -> Result<Box<dyn ScrapeSession>, ScrapeError>;
}

#[async_trait]
pub trait ScrapeSession: Send + Sync {
    async fn scrape(&self, url: &str, instruction: &str) -> Result<ScrapedPage, ScrapeError>;
}
