//! # Agent Module
//!
//! Wires a Rig provider agent and the search/scrape collaborators into a
//! `research_flow::ResearchAgent`, and persists finished reports.

use anyhow::{Context, Result};
use rig::agent::Agent;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::CompletionModel;
use rig::providers::{gemini, ollama, openai};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use research_flow::{
    report_header, HttpScraper, LLMConfig, LLMProvider, NewsApiTool, ResearchAgent, RigAgentAdapter,
    TavilySearchTool,
};

use crate::config::{Config, Provider};

/// Directory reports are written into
pub const REPORTS_DIR: &str = "test_reports";

const PREAMBLE: &str = "You are a careful research assistant. Follow the output format each request asks for exactly.";

// =============================================================================
// PROVIDER WIRING
// =============================================================================
/// Build a Rig agent for `$client` with the configured model settings.
macro_rules! provider_agent {
    ($client:expr, $llm:expr) => {{
        let llm: &LLMConfig = $llm;
        let builder = $client.agent(&llm.model).preamble(PREAMBLE);
        let builder = match llm.temperature {
            Some(temperature) => builder.temperature(temperature),
            None => builder,
        };
        let builder = match llm.max_tokens {
            Some(max_tokens) => builder.max_tokens(max_tokens),
            None => builder,
        };
        builder.build()
    }};
}

fn adapter<M>(agent: Agent<M>, provider: Provider, model: &str) -> Arc<dyn LLMProvider>
where
    M: CompletionModel + Send + Sync + 'static,
{
    Arc::new(RigAgentAdapter::with_names(agent, provider.name(), model))
}

/// Build the generation backend for the configured provider.
///
/// Rig reads API keys and the Ollama base URL from the environment, so a
/// missing key is reported here instead of panicking inside the client.
pub fn build_llm(config: &Config) -> Result<Arc<dyn LLMProvider>> {
    if let Some(var) = config.provider.api_key_var() {
        if std::env::var(var).map(|v| v.trim().is_empty()).unwrap_or(true) {
            anyhow::bail!("{} must be set to use the {} provider", var, config.provider.name());
        }
    }

    let llm = config.llm_config();
    info!(
        provider = config.provider.name(),
        model = %llm.model,
        temperature = ?llm.temperature,
        "Building generation backend"
    );

    let provider = match config.provider {
        Provider::Ollama => adapter(
            provider_agent!(ollama::Client::from_env(), &llm),
            config.provider,
            &llm.model,
        ),
        Provider::Gemini => adapter(
            provider_agent!(gemini::Client::from_env(), &llm),
            config.provider,
            &llm.model,
        ),
        Provider::OpenAi => adapter(
            provider_agent!(openai::Client::from_env(), &llm),
            config.provider,
            &llm.model,
        ),
    };
    Ok(provider)
}

/// Assemble the research workflow with live collaborators.
pub fn build_agent(config: &Config) -> Result<ResearchAgent> {
    if config.tavily_api_key.is_none() {
        warn!("TAVILY_API_KEY not set, web search will return placeholder results");
    }
    if config.news_api_key.is_none() && !config.disable_news_search {
        warn!("NEWS_API_KEY not set, news search will return mock articles");
    }

    let research_config = config.research_config();
    let timeout = research_config.request_timeout;
    let llm = build_llm(config)?;

    let web_search = TavilySearchTool::new(config.tavily_api_key.clone(), research_config.max_search_results)
        .with_timeout(timeout);
    let news_search =
        NewsApiTool::new(config.news_api_key.clone(), research_config.max_news_results).with_timeout(timeout);
    let scraper = HttpScraper::new(timeout).with_extractor(Arc::clone(&llm));

    ResearchAgent::builder(llm)
        .config(research_config)
        .web_search(Arc::new(web_search))
        .news_search(Arc::new(news_search))
        .scraper(Arc::new(scraper))
        .build()
        .context("failed to assemble research workflow")
}

// =============================================================================
// REPORT PERSISTENCE
// =============================================================================
/// File name used when none is given: `research_report_<first 30 chars>.txt`
pub fn default_report_name(query: &str) -> String {
    let safe: String = query
        .chars()
        .take(30)
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    format!("research_report_{}.txt", safe)
}

/// Write `report` into `reports_dir`, keeping only the base name of `output`.
pub fn save_report(report: &str, query: &str, output: Option<&str>, reports_dir: &Path) -> Result<PathBuf> {
    let file_name = match output {
        Some(path) => Path::new(path)
            .file_name()
            .map(|name| name.to_os_string())
            .with_context(|| format!("output path '{}' has no file name", path))?,
        None => default_report_name(query).into(),
    };

    fs::create_dir_all(reports_dir)
        .with_context(|| format!("failed to create {}", reports_dir.display()))?;
    let path = reports_dir.join(file_name);

    let header = report_header(query);
    let contents = if report.starts_with(&header) {
        report.to_string()
    } else {
        format!("{}{}", header, report)
    };

    fs::write(&path, contents).with_context(|| format!("failed to write report to {}", path.display()))?;
    info!(path = %path.display(), "Report saved");
    Ok(path)
}
