//! Research workflow configuration
//!
//! Every tunable the stages and collaborators read lives here and is
//! handed to the workflow at construction time. Nothing reads process
//! environment at runtime; the binary maps env vars onto this struct.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ResearchError;

/// Per-counter iteration ceilings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationLimits {
    pub search_refinement: u32,
    pub scraping_attempts: u32,
    pub total_research: u32,
}

impl Default for IterationLimits {
    fn default() -> Self {
        Self {
            search_refinement: 3,
            scraping_attempts: 2,
            total_research: 8,
        }
    }
}

/// Configuration for one research workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Generation model identifier
    pub model: String,

    /// Temperature for LLM calls
    pub temperature: f64,

    /// Results requested per web search query
    pub max_search_results: usize,

    /// Articles requested per news query
    pub max_news_results: usize,

    /// Upper bound on URLs handed to the scrape stage
    pub max_urls_to_scrape: usize,

    /// Search queries generated by analysis and executed by web search
    pub max_search_queries: usize,

    /// Iteration ceilings; `total_research` bounds re-planning
    pub max_iterations: IterationLimits,

    /// URLs picked from the snippet list when evaluation is inconclusive
    pub fallback_scrape_count: usize,

    /// Snippets longer than this count as substantive evidence
    pub substantive_snippet_chars: usize,

    /// Substantive snippets required before trusting a "sufficient" verdict
    pub min_substantive_snippets: usize,

    /// Per-document character cap in the synthesis context
    pub scraped_content_cap: usize,

    /// Kill-switch: route news and parallel plans to web search only
    pub news_search_disabled: bool,

    /// Network timeout for collaborator requests
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Engine hard stop on executed steps
    pub max_workflow_steps: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            temperature: 0.1,
            max_search_results: 10,
            max_news_results: 5,
            max_urls_to_scrape: 5,
            max_search_queries: 5,
            max_iterations: IterationLimits::default(),
            fallback_scrape_count: 3,
            substantive_snippet_chars: 100,
            min_substantive_snippets: 3,
            scraped_content_cap: 10_000,
            news_search_disabled: false,
            request_timeout: Duration::from_secs(30),
            max_workflow_steps: 64,
        }
    }
}

impl ResearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_total_research(mut self, max: u32) -> Self {
        self.max_iterations.total_research = max;
        self
    }

    pub fn with_news_disabled(mut self, disabled: bool) -> Self {
        self.news_search_disabled = disabled;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_fallback_scrape_count(mut self, count: usize) -> Self {
        self.fallback_scrape_count = count;
        self
    }

    /// Reject values the workflow cannot run with.
    pub fn validate(&self) -> Result<(), ResearchError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ResearchError::config(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }
        let caps = [
            ("max_search_results", self.max_search_results),
            ("max_news_results", self.max_news_results),
            ("max_urls_to_scrape", self.max_urls_to_scrape),
            ("max_search_queries", self.max_search_queries),
            ("max_workflow_steps", self.max_workflow_steps),
        ];
        if let Some((name, _)) = caps.iter().find(|(_, value)| *value == 0) {
            return Err(ResearchError::config(format!("{} must be at least 1", name)));
        }
        if self.max_iterations.total_research == 0 {
            return Err(ResearchError::config(
                "max_iterations.total_research must be at least 1",
            ));
        }
        if self.model.trim().is_empty() {
            return Err(ResearchError::config("model cannot be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ResearchConfig::default();
        assert_eq!(config.model, "gemini-2.0-flash");
        assert!((config.temperature - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.max_search_results, 10);
        assert_eq!(config.max_news_results, 5);
        assert_eq!(config.max_urls_to_scrape, 5);
        assert_eq!(config.max_search_queries, 5);
        assert_eq!(config.max_iterations.total_research, 8);
        assert_eq!(config.fallback_scrape_count, 3);
        assert!(!config.news_search_disabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_temperature() {
        let config = ResearchConfig::default().with_temperature(3.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_cap_rejected() {
        let mut config = ResearchConfig::default();
        config.max_urls_to_scrape = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_urls_to_scrape"));
    }

    #[test]
    fn test_zero_total_research_rejected() {
        let config = ResearchConfig::default().with_max_total_research(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_serializes_human_readable() {
        let config = ResearchConfig::default().with_request_timeout(Duration::from_secs(45));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["request_timeout"], "45s");
        let back: ResearchConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back.request_timeout, Duration::from_secs(45));
    }
}
