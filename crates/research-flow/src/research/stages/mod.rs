//! Stage functions of the research graph
//!
//! Each stage reads the merged [`ResearchState`] and returns a partial
//! [`ResearchUpdate`]. Malformed backend replies are absorbed inside the
//! stage through schema-complete fallbacks; only backend call failures
//! escape as errors.

mod analyze;
mod compile;
mod evaluate;
mod plan;
mod scrape;
mod search;
mod synthesize;

pub use analyze::analyze_query;
pub use compile::{compile_final_report, report_header};
pub use evaluate::{evaluate_results_and_select_urls, is_high_scrutiny};
pub use plan::plan_research_strategy;
pub use scrape::scrape_websites;
pub use search::{execute_news_search, execute_web_search};
pub use synthesize::extract_and_synthesize_information;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::state::{ResearchState, ResearchUpdate, Stage};
use crate::config::ResearchConfig;
use crate::error::ResearchError;
use crate::llm::LLMProvider;
use crate::tools::{NewsSearch, Scraper, WebSearch};
use crate::workflow::{Node, WorkflowError};

/// Collaborators and configuration shared by every stage
pub struct StageContext {
    pub llm: Arc<dyn LLMProvider>,
    pub web_search: Arc<dyn WebSearch>,
    pub news_search: Arc<dyn NewsSearch>,
    pub scraper: Arc<dyn Scraper>,
    pub config: ResearchConfig,
}

impl StageContext {
    /// Send a prompt to the generation backend on behalf of `stage`.
    pub(crate) async fn generate(&self, stage: Stage, prompt: &str) -> Result<String, ResearchError> {
        debug!(
            stage = %stage,
            provider = self.llm.name(),
            prompt_chars = prompt.len(),
            "Calling generation backend"
        );
        self.llm.generate(prompt).await
    }
}

impl std::fmt::Debug for StageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageContext")
            .field("llm", &self.llm.name())
            .field("config", &self.config)
            .finish()
    }
}

/// Run one stage against the current state.
pub async fn run_stage(
    stage: Stage,
    ctx: &StageContext,
    state: &ResearchState,
) -> Result<ResearchUpdate, ResearchError> {
    match stage {
        Stage::Analyze => analyze_query(ctx, state).await,
        Stage::Plan => plan_research_strategy(ctx, state).await,
        Stage::WebSearch => execute_web_search(ctx, state).await,
        Stage::NewsSearch => execute_news_search(ctx, state).await,
        Stage::Evaluate => evaluate_results_and_select_urls(ctx, state).await,
        Stage::Scrape => scrape_websites(ctx, state).await,
        Stage::Synthesize => extract_and_synthesize_information(ctx, state).await,
        Stage::Compile => compile_final_report(ctx, state).await,
    }
}

/// Graph node running a single stage
pub struct StageNode {
    stage: Stage,
    ctx: Arc<StageContext>,
}

impl StageNode {
    pub fn new(stage: Stage, ctx: Arc<StageContext>) -> Self {
        Self { stage, ctx }
    }
}

#[async_trait]
impl Node<ResearchState> for StageNode {
    async fn run(&self, state: &ResearchState) -> Result<ResearchUpdate, WorkflowError> {
        run_stage(self.stage, &self.ctx, state)
            .await
            .map_err(|e| WorkflowError::node_error_with_source(self.stage.name(), e.to_string(), e))
    }
}

/// Pretty JSON for prompt context; `{}` if serialization fails.
pub(crate) fn to_prompt_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}
