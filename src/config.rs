//! # Configuration Module
//!
//! Loads runtime settings from the environment (and a `.env` file) once at
//! startup, then converts them into the library's `ResearchConfig`.
//! Command-line flags are applied on top in `main.rs`.

use anyhow::{Context, Result};
use clap::ValueEnum;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use research_flow::{IterationLimits, LLMConfig, ResearchConfig};

// =============================================================================
// PROVIDER SELECTION
// =============================================================================
/// Generation backend served through Rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    Ollama,
    Gemini,
    #[value(name = "openai")]
    OpenAi,
}

impl Provider {
    /// Model used when neither `LLM_MODEL` nor `--model` is given
    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Ollama => "llama3.2",
            Provider::Gemini => "gemini-2.0-flash",
            Provider::OpenAi => "gpt-4o-mini",
        }
    }

    /// Environment variable Rig reads the API key from, if any
    pub fn api_key_var(self) -> Option<&'static str> {
        match self {
            Provider::Ollama => None,
            Provider::Gemini => Some("GEMINI_API_KEY"),
            Provider::OpenAi => Some("OPENAI_API_KEY"),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Provider::Ollama => "ollama",
            Provider::Gemini => "gemini",
            Provider::OpenAi => "openai",
        }
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        <Provider as ValueEnum>::from_str(s, true)
            .map_err(|_| anyhow::anyhow!("unknown LLM provider '{}' (expected ollama, gemini or openai)", s))
    }
}

// =============================================================================
// CONFIGURATION STRUCT
// =============================================================================
/// Settings for one invocation of the binary.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: Provider,

    /// Explicit model; `None` means the provider default
    pub model: Option<String>,

    pub temperature: f64,

    /// Response token cap passed to the provider agent
    pub max_tokens: Option<u64>,

    pub max_search_results: usize,
    pub max_news_results: usize,
    pub max_urls_to_scrape: usize,
    pub max_search_queries: usize,
    pub max_total_research: u32,

    /// Route every plan to web search only
    pub disable_news_search: bool,

    /// Network timeout for search and scrape requests
    pub search_timeout: Duration,

    pub tavily_api_key: Option<String>,
    pub news_api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let library = ResearchConfig::default();
        Self {
            provider: Provider::Gemini,
            model: None,
            temperature: library.temperature,
            max_tokens: None,
            max_search_results: library.max_search_results,
            max_news_results: library.max_news_results,
            max_urls_to_scrape: library.max_urls_to_scrape,
            max_search_queries: library.max_search_queries,
            max_total_research: library.max_iterations.total_research,
            disable_news_search: false,
            search_timeout: library.request_timeout,
            tavily_api_key: None,
            news_api_key: None,
        }
    }
}

// =============================================================================
// CONFIGURATION LOADING
// =============================================================================
impl Config {
    /// Load configuration from `.env` and the process environment.
    pub fn from_env() -> Result<Self> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        if let Some(val) = get("LLM_PROVIDER") {
            config.provider = val.parse().context("LLM_PROVIDER must be ollama, gemini or openai")?;
        }
        config.model = get("LLM_MODEL");

        if let Some(val) = get("LLM_TEMPERATURE") {
            config.temperature = val
                .parse()
                .context("LLM_TEMPERATURE must be a valid floating-point number (e.g., 0.1)")?;
        }
        if let Some(val) = get("LLM_MAX_TOKENS") {
            config.max_tokens = Some(
                val.parse()
                    .context("LLM_MAX_TOKENS must be a valid positive integer")?,
            );
        }
        if let Some(val) = get("MAX_SEARCH_RESULTS") {
            config.max_search_results = val
                .parse()
                .context("MAX_SEARCH_RESULTS must be a valid positive integer")?;
        }
        if let Some(val) = get("MAX_NEWS_RESULTS") {
            config.max_news_results = val
                .parse()
                .context("MAX_NEWS_RESULTS must be a valid positive integer")?;
        }
        if let Some(val) = get("MAX_URLS_TO_SCRAPE") {
            config.max_urls_to_scrape = val
                .parse()
                .context("MAX_URLS_TO_SCRAPE must be a valid positive integer")?;
        }
        if let Some(val) = get("MAX_SEARCH_QUERIES") {
            config.max_search_queries = val
                .parse()
                .context("MAX_SEARCH_QUERIES must be a valid positive integer")?;
        }
        if let Some(val) = get("MAX_TOTAL_RESEARCH") {
            config.max_total_research = val
                .parse()
                .context("MAX_TOTAL_RESEARCH must be a valid positive integer")?;
        }
        if let Some(val) = get("DISABLE_NEWS_SEARCH") {
            config.disable_news_search = parse_flag(&val)
                .with_context(|| format!("DISABLE_NEWS_SEARCH must be true or false, got '{}'", val))?;
        }
        if let Some(val) = get("SEARCH_TIMEOUT") {
            let secs: u64 = val
                .parse()
                .context("SEARCH_TIMEOUT must be a whole number of seconds")?;
            config.search_timeout = Duration::from_secs(secs);
        }

        config.tavily_api_key = get("TAVILY_API_KEY");
        config.news_api_key = get("NEWS_API_KEY");

        Ok(config)
    }

    /// Model name after applying the provider default
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// Library configuration for the research workflow.
    pub fn research_config(&self) -> ResearchConfig {
        ResearchConfig {
            max_search_results: self.max_search_results,
            max_news_results: self.max_news_results,
            max_urls_to_scrape: self.max_urls_to_scrape,
            max_search_queries: self.max_search_queries,
            max_iterations: IterationLimits {
                total_research: self.max_total_research,
                ..IterationLimits::default()
            },
            ..ResearchConfig::default()
        }
        .with_model(self.model())
        .with_temperature(self.temperature)
        .with_news_disabled(self.disable_news_search)
        .with_request_timeout(self.search_timeout)
    }

    /// Provider agent settings
    pub fn llm_config(&self) -> LLMConfig {
        let config = LLMConfig::from(&self.research_config());
        match self.max_tokens {
            Some(max_tokens) => config.with_max_tokens(max_tokens),
            None => config,
        }
    }

    /// Validate before any client is built.
    pub fn validate(&self) -> Result<()> {
        self.research_config()
            .validate()
            .context("invalid research configuration")?;

        if self.search_timeout.is_zero() {
            anyhow::bail!("SEARCH_TIMEOUT must be at least 1 second");
        }

        if self.max_tokens == Some(0) {
            anyhow::bail!("LLM_MAX_TOKENS must be at least 1");
        }

        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// =============================================================================
// UNIT TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.provider, Provider::Gemini);
        assert_eq!(config.model(), "gemini-2.0-flash");
        assert!((config.temperature - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.max_search_results, 10);
        assert_eq!(config.max_total_research, 8);
        assert!(!config.disable_news_search);
        assert_eq!(config.search_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("LLM_PROVIDER", "Ollama"),
            ("LLM_TEMPERATURE", "0.4"),
            ("MAX_TOTAL_RESEARCH", "3"),
            ("DISABLE_NEWS_SEARCH", "true"),
            ("SEARCH_TIMEOUT", "12"),
            ("TAVILY_API_KEY", "tvly-123"),
            ("NEWS_API_KEY", ""),
        ]))
        .unwrap();

        assert_eq!(config.provider, Provider::Ollama);
        assert_eq!(config.model(), "llama3.2");
        assert_eq!(config.max_total_research, 3);
        assert!(config.disable_news_search);
        assert_eq!(config.search_timeout, Duration::from_secs(12));
        assert_eq!(config.tavily_api_key.as_deref(), Some("tvly-123"));
        assert_eq!(config.news_api_key, None);
        assert_eq!(config.llm_config().max_tokens, None);
    }

    #[test]
    fn test_ollama_base_url_left_to_provider_client() {
        let config = Config::from_lookup(lookup(&[
            ("LLM_PROVIDER", "ollama"),
            ("OLLAMA_API_BASE_URL", "http://gpu-box:11434"),
        ]))
        .unwrap();

        assert_eq!(config.provider, Provider::Ollama);
        assert_eq!(config.provider.api_key_var(), None);
        assert!(!format!("{:?}", config).contains("gpu-box"));
    }

    #[test]
    fn test_llm_config() {
        let config = Config::from_lookup(lookup(&[("LLM_MODEL", "gpt-4o"), ("LLM_MAX_TOKENS", "2048")])).unwrap();
        let llm = config.llm_config();

        assert_eq!(llm.model, "gpt-4o");
        assert_eq!(llm.temperature, Some(0.1));
        assert_eq!(llm.max_tokens, Some(2048));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::from_lookup(lookup(&[("LLM_TEMPERATURE", "warm")])).is_err());
        assert!(Config::from_lookup(lookup(&[("DISABLE_NEWS_SEARCH", "maybe")])).is_err());
        assert!(Config::from_lookup(lookup(&[("LLM_PROVIDER", "carrier")])).is_err());
    }

    #[test]
    fn test_research_config_conversion() {
        let config = Config {
            model: Some("custom".into()),
            max_total_research: 2,
            disable_news_search: true,
            ..Config::default()
        };
        let research = config.research_config();

        assert_eq!(research.model, "custom");
        assert_eq!(research.max_iterations.total_research, 2);
        assert_eq!(research.max_iterations.search_refinement, 3);
        assert!(research.news_search_disabled);
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::default().validate().is_ok());

        let config = Config {
            temperature: 3.0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            max_urls_to_scrape: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
