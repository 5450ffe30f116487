//! Tavily Search - web search collaborator
//!
//! Calls the Tavily Search API with HTTP timeout and retry with
//! exponential backoff. Failures never reach the caller: after the last
//! attempt the tool logs the error and returns deterministic placeholder
//! results so the workflow can keep going.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::{SearchResult, WebSearch};

const DEFAULT_BASE_URL: &str = "https://api.tavily.com";

/// Default timeout for Tavily API requests
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum retry attempts for transient failures
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds)
const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Tavily caps `max_results` at 20
const TAVILY_MAX_RESULTS: usize = 20;

/// Placeholder results returned on failure
const PLACEHOLDER_COUNT: usize = 3;

/// Search depth for Tavily API
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    /// Fast search with basic results
    #[default]
    Basic,
    /// More thorough search with detailed results
    Advanced,
}

/// Topic filter for Tavily API
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    #[default]
    General,
    News,
}

/// Tavily web search collaborator
///
/// # Example
/// ```ignore
/// let tool = TavilySearchTool::new(Some(api_key), 10)
///     .with_timeout(Duration::from_secs(30));
/// let results = tool.search("Rust async runtimes").await;
/// ```
pub struct TavilySearchTool {
    api_key: Option<String>,
    client: Client,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
    retry_base_delay: Duration,
    max_results: usize,
    search_depth: SearchDepth,
    topic: Topic,
}

impl TavilySearchTool {
    /// Create a tool returning up to `max_results` hits per query.
    ///
    /// Without an API key every search returns placeholders.
    pub fn new(api_key: Option<String>, max_results: usize) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: MAX_RETRIES,
            retry_base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
            max_results,
            search_depth: SearchDepth::default(),
            topic: Topic::default(),
        }
    }

    /// Set custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set custom max retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the first backoff delay; later attempts double it
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Point the tool at a different API host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_search_depth(mut self, depth: SearchDepth) -> Self {
        self.search_depth = depth;
        self
    }

    pub fn with_topic(mut self, topic: Topic) -> Self {
        self.topic = topic;
        self
    }

    /// Run one search, surfacing the typed error.
    pub async fn try_search(&self, query: &str) -> Result<Vec<SearchResult>, TavilyError> {
        let api_key = self.api_key.as_deref().ok_or(TavilyError::MissingApiKey)?;

        let request = TavilyRequest {
            query: query.to_string(),
            max_results: self.max_results.min(TAVILY_MAX_RESULTS),
            search_depth: self.search_depth,
            include_answer: false,
            include_raw_content: false,
            topic: self.topic,
        };

        let response = self.execute_with_retry(api_key, &request).await?;

        let results: Vec<SearchResult> = response
            .results
            .into_iter()
            .take(self.max_results)
            .map(|r| SearchResult {
                url: r.url,
                title: r.title,
                snippet: r.content,
            })
            .collect();

        for (i, result) in results.iter().enumerate() {
            debug!(
                index = i + 1,
                title = %truncate_chars(&result.title, 100),
                url = %result.url,
                snippet = %truncate_chars(&result.snippet, 150),
                "Tavily result"
            );
        }

        Ok(results)
    }

    /// Execute HTTP request with retry and backoff
    async fn execute_with_retry(
        &self,
        api_key: &str,
        request: &TavilyRequest,
    ) -> Result<TavilyResponse, TavilyError> {
        let mut last_error = TavilyError::Unknown("No attempts made".to_string());

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.retry_base_delay * 2u32.pow(attempt - 1);
                debug!(attempt, delay_ms = delay.as_millis(), "Retrying Tavily request");
                tokio::time::sleep(delay).await;
            }

            match self.execute_single_request(api_key, request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if !e.is_retryable() {
                        return Err(e);
                    }
                    warn!(attempt, error = %e, "Tavily request failed, will retry");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    async fn execute_single_request(
        &self,
        api_key: &str,
        request: &TavilyRequest,
    ) -> Result<TavilyResponse, TavilyError> {
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TavilyError::Timeout
                } else if e.is_connect() {
                    TavilyError::Connection(e.to_string())
                } else {
                    TavilyError::Network(e.to_string())
                }
            })?;

        let status = response.status();

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| TavilyError::ParseError(e.to_string()));
        }

        let error_text = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 => Err(TavilyError::Unauthorized),
            429 => Err(TavilyError::RateLimited),
            400 => Err(TavilyError::BadRequest(error_text)),
            500..=599 => Err(TavilyError::ServerError(status.as_u16(), error_text)),
            _ => Err(TavilyError::HttpError(status.as_u16(), error_text)),
        }
    }

    fn placeholders(&self, query: &str, reason: &TavilyError) -> Vec<SearchResult> {
        (0..PLACEHOLDER_COUNT.min(self.max_results))
            .map(|i| SearchResult {
                url: format!("https://example.com/result{}", i),
                title: format!("Example Result {} for {}", i, query),
                snippet: format!(
                    "This is a fallback snippet related to {}. Tavily API call failed: {}",
                    query, reason
                ),
            })
            .collect()
    }
}

#[async_trait]
impl WebSearch for TavilySearchTool {
    async fn search(&self, query: &str) -> Vec<SearchResult> {
        info!(query = %query, "Performing Tavily web search");

        match self.try_search(query).await {
            Ok(results) => {
                info!(query = %query, count = results.len(), "Tavily web search completed");
                results
            }
            Err(e) => {
                error!(query = %query, error = %e, "Error in Tavily web search");
                self.placeholders(query, &e)
            }
        }
    }
}

impl std::fmt::Debug for TavilySearchTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilySearchTool")
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .field("max_results", &self.max_results)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Typed errors for Tavily API
#[derive(Debug, thiserror::Error)]
pub enum TavilyError {
    #[error("TAVILY_API_KEY not configured")]
    MissingApiKey,

    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized - check API key")]
    Unauthorized,

    #[error("Rate limited - too many requests")]
    RateLimited,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("HTTP error ({0}): {1}")]
    HttpError(u16, String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl TavilyError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TavilyError::Timeout
                | TavilyError::Connection(_)
                | TavilyError::RateLimited
                | TavilyError::ServerError(_, _)
        )
    }
}

/// Request body for Tavily API
#[derive(Debug, Serialize)]
struct TavilyRequest {
    query: String,
    max_results: usize,
    search_depth: SearchDepth,
    include_answer: bool,
    include_raw_content: bool,
    topic: Topic,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(TavilyError: Send, Sync);

    #[test]
    fn test_search_depth_serialization() {
        assert_eq!(serde_json::to_string(&SearchDepth::Basic).unwrap(), "\"basic\"");
        assert_eq!(serde_json::to_string(&SearchDepth::Advanced).unwrap(), "\"advanced\"");
    }

    #[test]
    fn test_request_body_shape() {
        let request = TavilyRequest {
            query: "rust".to_string(),
            max_results: 10,
            search_depth: SearchDepth::Basic,
            include_answer: false,
            include_raw_content: false,
            topic: Topic::General,
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "query": "rust",
                "max_results": 10,
                "search_depth": "basic",
                "include_answer": false,
                "include_raw_content": false,
                "topic": "general"
            })
        );
    }

    #[test]
    fn test_tavily_error_retryable() {
        assert!(TavilyError::Timeout.is_retryable());
        assert!(TavilyError::Connection("refused".into()).is_retryable());
        assert!(TavilyError::RateLimited.is_retryable());
        assert!(TavilyError::ServerError(503, String::new()).is_retryable());
        assert!(!TavilyError::Unauthorized.is_retryable());
        assert!(!TavilyError::BadRequest("q".into()).is_retryable());
        assert!(!TavilyError::MissingApiKey.is_retryable());
    }

    #[test]
    fn test_placeholders_capped_by_max_results() {
        let tool = TavilySearchTool::new(None, 2);
        let results = tool.placeholders("rust", &TavilyError::Timeout);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://example.com/result0");
        assert_eq!(results[1].title, "Example Result 1 for rust");
        assert!(results[0].snippet.contains("Request timed out"));
    }

    #[test]
    fn test_blank_key_treated_as_missing() {
        let tool = TavilySearchTool::new(Some("  ".into()), 5);
        assert!(tool.api_key.is_none());
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        assert_eq!(truncate_chars("abc", 3), "abc");
    }
}
