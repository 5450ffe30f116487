//! NewsAPI news search collaborator

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Local, NaiveDate, Utc};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::{NewsArticle, NewsSearch};

const DEFAULT_BASE_URL: &str = "https://newsapi.org/v2";

const PLACEHOLDER_COUNT: usize = 3;

/// NewsAPI failures
#[derive(Debug, Error)]
pub enum NewsApiError {
    #[error("NewsAPI key missing")]
    MissingApiKey,

    #[error("Request failed: {0}")]
    Request(String),

    #[error("HTTP error ({0}): {1}")]
    Status(u16, String),

    #[error("NewsAPI returned an error: {0}")]
    Api(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

fn api_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(api_?[kK]ey=)[^&]+").expect("valid api key regex"))
}

/// Replace API key query parameter values with `[REDACTED]`.
pub fn redact_api_key(url: &str) -> String {
    api_key_re().replace_all(url, "${1}[REDACTED]").into_owned()
}

/// NewsAPI `everything` endpoint client.
pub struct NewsApiTool {
    api_key: Option<String>,
    client: Client,
    base_url: String,
    timeout: Duration,
    max_results: usize,
}

impl NewsApiTool {
    pub fn new(api_key: Option<String>, max_results: usize) -> Self {
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            warn!("NEWS_API_KEY not provided. News search will return mock data.");
        }
        Self {
            api_key,
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_results,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Run one query, surfacing the typed error.
    pub async fn try_search_news(
        &self,
        query: &str,
        days_back: u32,
    ) -> Result<Vec<NewsArticle>, NewsApiError> {
        let api_key = self.api_key.as_deref().ok_or(NewsApiError::MissingApiKey)?;

        let from_date = (Utc::now() - ChronoDuration::days(i64::from(days_back)))
            .format("%Y-%m-%d")
            .to_string();
        let page_size = self.max_results.to_string();

        let request = self
            .client
            .get(format!("{}/everything", self.base_url))
            .query(&[
                ("q", query),
                ("from", from_date.as_str()),
                ("sortBy", "relevancy"),
                ("pageSize", page_size.as_str()),
                ("apiKey", api_key),
            ])
            .timeout(self.timeout)
            .build()
            .map_err(|e| NewsApiError::Request(redact_api_key(&e.to_string())))?;

        debug!(url = %redact_api_key(request.url().as_str()), "NewsAPI request");

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| NewsApiError::Request(redact_api_key(&e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NewsApiError::Status(status.as_u16(), body));
        }

        let body: NewsApiResponse = response
            .json()
            .await
            .map_err(|e| NewsApiError::Parse(e.to_string()))?;

        if body.status != "ok" {
            return Err(NewsApiError::Api(
                body.message.unwrap_or_else(|| body.status.clone()),
            ));
        }

        Ok(body
            .articles
            .into_iter()
            .take(self.max_results)
            .map(NewsApiArticle::into_article)
            .collect())
    }
}

#[async_trait]
impl NewsSearch for NewsApiTool {
    async fn search_news(&self, query: &str, days_back: u32) -> Vec<NewsArticle> {
        info!(query = %query, days_back, "Searching news");

        match self.try_search_news(query, days_back).await {
            Ok(articles) => {
                info!(query = %query, count = articles.len(), "News search completed");
                articles
            }
            Err(NewsApiError::MissingApiKey) => {
                info!("NewsAPI key missing, returning mock data");
                mock_articles(
                    query,
                    days_back,
                    self.max_results,
                    "NewsAPI key missing. This is mock data.",
                    Local::now().date_naive(),
                )
            }
            Err(e) => {
                error!(query = %query, error = %e, "Error in NewsAPI search");
                mock_articles(
                    query,
                    days_back,
                    self.max_results,
                    &format!("NewsAPI search failed: {}. This is mock data.", e),
                    Local::now().date_naive(),
                )
            }
        }
    }
}

impl std::fmt::Debug for NewsApiTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewsApiTool")
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .field("max_results", &self.max_results)
            .finish()
    }
}

fn mock_articles(
    query: &str,
    days_back: u32,
    max_results: usize,
    summary: &str,
    today: NaiveDate,
) -> Vec<NewsArticle> {
    let days_back = days_back.max(1) as usize;
    (0..PLACEHOLDER_COUNT.min(max_results))
        .map(|i| {
            let date = today - ChronoDuration::days((i % days_back) as i64);
            NewsArticle {
                url: format!("https://news-example.com/article{}", i),
                title: format!("[MOCK] News Article {} about {}", i, query),
                summary: summary.to_string(),
                date: date.format("%Y-%m-%d").to_string(),
                source: format!("Mock News Source {}", i),
            }
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiArticle {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    source: Option<NewsApiSource>,
}

#[derive(Debug, Deserialize)]
struct NewsApiSource {
    #[serde(default)]
    name: Option<String>,
}

impl NewsApiArticle {
    fn into_article(self) -> NewsArticle {
        let summary = self
            .description
            .filter(|d| !d.is_empty())
            .or(self.content)
            .unwrap_or_default();
        let date = self
            .published_at
            .map(|p| p.chars().take(10).collect())
            .unwrap_or_default();

        NewsArticle {
            url: self.url.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            summary,
            date,
            source: self.source.and_then(|s| s.name).unwrap_or_default(),
        }
    }
}
