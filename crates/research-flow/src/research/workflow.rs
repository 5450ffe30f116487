//! Research graph assembly and the top-level entry point
//!
//! ```text
//! analyze ─► plan ─┬─► web_search ──┐
//!                  ├─► news_search ─┤
//!                  └─► synthesize   ▼
//!                       ▲        evaluate ─┬─► scrape ─► synthesize ─► compile ─► END
//!                       └──────────────────┤
//!                            plan ◄────────┘ (guarded by total_research)
//! ```

use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use super::router::{evaluate_paths, plan_paths, route_after_evaluate, route_after_plan};
use super::stages::{StageContext, StageNode};
use super::state::{ErrorEntry, ResearchState, Stage};
use crate::config::ResearchConfig;
use crate::error::ResearchError;
use crate::llm::LLMProvider;
use crate::tools::{HttpScraper, NewsApiTool, NewsSearch, Scraper, TavilySearchTool, WebSearch};
use crate::workflow::{BuiltWorkflowGraph, RuntimeConfig, WorkflowGraph, WorkflowRuntime, END};

/// Build the research graph over a shared stage context.
pub fn build_research_graph(ctx: Arc<StageContext>) -> Result<BuiltWorkflowGraph<ResearchState>, ResearchError> {
    let news_disabled = ctx.config.news_search_disabled;

    let graph = Stage::ALL
        .into_iter()
        .fold(WorkflowGraph::new().name("research"), |graph, stage| {
            graph.node(stage.name(), StageNode::new(stage, Arc::clone(&ctx)))
        })
        .entry(Stage::Analyze.name())
        .edge(Stage::Analyze.name(), Stage::Plan.name())
        .conditional_edges(
            Stage::Plan.name(),
            move |state: &ResearchState| route_after_plan(state, news_disabled),
            plan_paths(),
        )
        .edge(Stage::WebSearch.name(), Stage::Evaluate.name())
        .edge(Stage::NewsSearch.name(), Stage::Evaluate.name())
        .conditional_edges(Stage::Evaluate.name(), route_after_evaluate, evaluate_paths())
        .edge(Stage::Scrape.name(), Stage::Synthesize.name())
        .edge(Stage::Synthesize.name(), Stage::Compile.name())
        .edge(Stage::Compile.name(), END)
        .build()?;

    Ok(graph)
}

/// Result of one research run
#[derive(Debug, Clone, Serialize)]
pub struct ResearchOutcome {
    pub final_report: String,
    pub error_log: Vec<ErrorEntry>,
    pub state: ResearchState,
    /// Stage names in execution order; empty when the run aborted
    pub trace: Vec<String>,
}

/// Runs the research graph for one query at a time
pub struct ResearchAgent {
    runtime: WorkflowRuntime<ResearchState>,
    config: ResearchConfig,
}

impl ResearchAgent {
    pub fn builder(llm: Arc<dyn LLMProvider>) -> ResearchAgentBuilder {
        ResearchAgentBuilder::new(llm)
    }

    /// Assemble the agent from a ready stage context.
    pub fn from_context(ctx: StageContext) -> Result<Self, ResearchError> {
        ctx.config.validate()?;
        let config = ctx.config.clone();
        let graph = build_research_graph(Arc::new(ctx))?;
        let runtime = WorkflowRuntime::new(graph).with_config(RuntimeConfig {
            max_steps: config.max_workflow_steps,
        });
        Ok(Self { runtime, config })
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Mermaid flowchart of the research graph
    pub fn graph_mermaid(&self) -> String {
        self.runtime.graph().to_mermaid()
    }

    /// Research `query` end to end.
    ///
    /// Never fails: an aborted run still yields a report text and an
    /// `agent_error` entry.
    pub async fn run(&self, query: &str) -> ResearchOutcome {
        let run_id = Uuid::new_v4();
        let span = info_span!("research", run_id = %run_id, query = %query);

        async {
            info!("Starting research");
            let initial = ResearchState::new(query, self.config.max_iterations);

            match self.execute(initial).await {
                Ok(outcome) => {
                    info!(
                        stages = outcome.trace.len(),
                        errors = outcome.error_log.len(),
                        "Research complete"
                    );
                    outcome
                }
                Err(e) => {
                    error!(error = %e, "Research aborted");
                    Self::failed(query, &e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, initial: ResearchState) -> Result<ResearchOutcome, ResearchError> {
        let result = self.runtime.run(initial).await?;
        let final_report = result
            .state
            .final_report
            .clone()
            .ok_or_else(|| ResearchError::stage(Stage::Compile.name(), "workflow finished without a final report"))?;

        Ok(ResearchOutcome {
            final_report,
            error_log: result.state.error_log.clone(),
            state: result.state,
            trace: result.trace,
        })
    }

    fn failed(query: &str, err: &ResearchError) -> ResearchOutcome {
        let final_report = format!("Error conducting research: {}", err);
        let error_log = vec![ErrorEntry::agent(err.to_string())];
        let state = ResearchState {
            final_report: Some(final_report.clone()),
            error_log: error_log.clone(),
            ..ResearchState::new(query, Default::default())
        };

        ResearchOutcome {
            final_report,
            error_log,
            state,
            trace: Vec::new(),
        }
    }
}

impl std::fmt::Debug for ResearchAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResearchAgent")
            .field("graph", self.runtime.graph())
            .field("config", &self.config)
            .finish()
    }
}

/// Builder for [`ResearchAgent`]
///
/// Collaborators left unset fall back to keyless Tavily and NewsAPI
/// clients, which answer with placeholder results, and a plain HTTP scraper.
pub struct ResearchAgentBuilder {
    llm: Arc<dyn LLMProvider>,
    config: ResearchConfig,
    web_search: Option<Arc<dyn WebSearch>>,
    news_search: Option<Arc<dyn NewsSearch>>,
    scraper: Option<Arc<dyn Scraper>>,
}

impl ResearchAgentBuilder {
    pub fn new(llm: Arc<dyn LLMProvider>) -> Self {
        Self {
            llm,
            config: ResearchConfig::default(),
            web_search: None,
            news_search: None,
            scraper: None,
        }
    }

    pub fn config(mut self, config: ResearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn web_search(mut self, web_search: Arc<dyn WebSearch>) -> Self {
        self.web_search = Some(web_search);
        self
    }

    pub fn news_search(mut self, news_search: Arc<dyn NewsSearch>) -> Self {
        self.news_search = Some(news_search);
        self
    }

    pub fn scraper(mut self, scraper: Arc<dyn Scraper>) -> Self {
        self.scraper = Some(scraper);
        self
    }

    pub fn build(self) -> Result<ResearchAgent, ResearchError> {
        let config = self.config;
        let timeout = config.request_timeout;

        let web_search = self.web_search.unwrap_or_else(|| {
            Arc::new(TavilySearchTool::new(None, config.max_search_results).with_timeout(timeout))
        });
        let news_search = self.news_search.unwrap_or_else(|| {
            Arc::new(NewsApiTool::new(None, config.max_news_results).with_timeout(timeout))
        });
        let scraper = self
            .scraper
            .unwrap_or_else(|| Arc::new(HttpScraper::new(timeout)));

        ResearchAgent::from_context(StageContext {
            llm: self.llm,
            web_search,
            news_search,
            scraper,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::stages::testing::*;
    use crate::research::state::ErrorKind;

    fn graph() -> BuiltWorkflowGraph<ResearchState> {
        build_research_graph(Arc::new(context(Arc::new(ScriptedLlm::default())))).unwrap()
    }

    #[test]
    fn test_graph_topology() {
        let graph = graph();
        assert_eq!(graph.entry_point, "analyze_query");
        assert_eq!(graph.node_names().len(), 8);
        assert_eq!(graph.edges["execute_web_search"], vec!["evaluate_results_and_select_urls"]);
        assert_eq!(graph.edges["execute_news_search"], vec!["evaluate_results_and_select_urls"]);
        assert_eq!(graph.edges["compile_final_report"], vec![END]);
        assert!(graph.routers.contains_key("plan_research_strategy"));
        assert!(graph.routers.contains_key("evaluate_results_and_select_urls"));
    }

    #[test]
    fn test_graph_mermaid_lists_every_stage() {
        let mermaid = graph().to_mermaid();
        assert!(mermaid.starts_with("flowchart TD"));
        for stage in Stage::ALL {
            assert!(mermaid.contains(stage.name()), "missing {}", stage);
        }
        assert!(mermaid.contains("-. \"web_search\" .-> execute_web_search"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut ctx = context(Arc::new(ScriptedLlm::default()));
        ctx.config.temperature = 5.0;
        assert!(matches!(
            ResearchAgent::from_context(ctx),
            Err(ResearchError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_backend_failure_becomes_degraded_outcome() {
        let agent = ResearchAgent::from_context(context(Arc::new(ScriptedLlm::failing("offline")))).unwrap();

        let outcome = agent.run("rust").await;
        assert!(outcome.final_report.starts_with("Error conducting research: "));
        assert!(outcome.final_report.contains("offline"));
        assert_eq!(outcome.error_log.len(), 1);
        assert_eq!(outcome.error_log[0].kind, ErrorKind::AgentError);
        assert_eq!(outcome.state.original_query, "rust");
        assert!(outcome.trace.is_empty());
    }
}
