//! Research workflow state definition
//!
//! [`ResearchState`] is the single record threaded through the graph.
//! Stages return [`ResearchUpdate`]s; merging applies a fixed policy per
//! field:
//!
//! | Policy      | Fields                                                        |
//! |-------------|---------------------------------------------------------------|
//! | write-once  | `original_query`                                              |
//! | append      | `web_results`, `news_results`, `synthesized_information`, `error_log` |
//! | union       | `scraped_content` (later write wins per URL)                  |
//! | overwrite   | everything else, and only when the update carries a value     |

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::config::IterationLimits;
use crate::tools::{NewsArticle, SearchResult};
use crate::workflow::{StateUpdate, WorkflowState};

/// The eight named stages of the research graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    #[serde(rename = "analyze_query")]
    Analyze,
    #[serde(rename = "plan_research_strategy")]
    Plan,
    #[serde(rename = "execute_web_search")]
    WebSearch,
    #[serde(rename = "execute_news_search")]
    NewsSearch,
    #[serde(rename = "evaluate_results_and_select_urls")]
    Evaluate,
    #[serde(rename = "scrape_websites")]
    Scrape,
    #[serde(rename = "extract_and_synthesize_information")]
    Synthesize,
    #[serde(rename = "compile_final_report")]
    Compile,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::Analyze,
        Stage::Plan,
        Stage::WebSearch,
        Stage::NewsSearch,
        Stage::Evaluate,
        Stage::Scrape,
        Stage::Synthesize,
        Stage::Compile,
    ];

    /// Node id used in the graph
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Analyze => "analyze_query",
            Stage::Plan => "plan_research_strategy",
            Stage::WebSearch => "execute_web_search",
            Stage::NewsSearch => "execute_news_search",
            Stage::Evaluate => "evaluate_results_and_select_urls",
            Stage::Scrape => "scrape_websites",
            Stage::Synthesize => "extract_and_synthesize_information",
            Stage::Compile => "compile_final_report",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.name() == name)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Structured reading of the user's query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzedQuery {
    pub main_topic: String,
    pub specific_request: String,
    pub info_type: String,
    pub time_sensitive: bool,
    pub key_entities: Vec<String>,
    pub subjective_criteria: Vec<String>,
    /// `low`, `medium` or `high`
    pub depth_required: String,
    pub regional_context: Option<String>,
    pub search_queries: Vec<String>,
    pub requires_web_scraping: bool,
}

impl Default for AnalyzedQuery {
    fn default() -> Self {
        Self {
            main_topic: String::new(),
            specific_request: String::new(),
            info_type: String::new(),
            time_sensitive: false,
            key_entities: Vec::new(),
            subjective_criteria: Vec::new(),
            depth_required: "medium".to_string(),
            regional_context: None,
            search_queries: Vec::new(),
            requires_web_scraping: false,
        }
    }
}

impl AnalyzedQuery {
    /// Analysis used when the backend reply cannot be parsed.
    pub fn fallback(query: &str) -> Self {
        Self {
            main_topic: query.to_string(),
            specific_request: query.to_string(),
            info_type: "facts".to_string(),
            key_entities: vec![query.to_string()],
            search_queries: vec![query.to_string()],
            ..Default::default()
        }
    }

    pub fn is_high_depth(&self) -> bool {
        self.depth_required.eq_ignore_ascii_case("high")
    }
}

/// Strategy chosen by the plan stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchPlan {
    /// `web_search`, `news_search`, `parallel_search`, or a stage name
    pub search_approach: String,
    pub priority_info: Vec<String>,
    pub source_priorities: Vec<String>,
    pub search_refinement_needed: bool,
}

impl Default for ResearchPlan {
    fn default() -> Self {
        Self::with_approach("web_search")
    }
}

impl ResearchPlan {
    pub fn with_approach(approach: impl Into<String>) -> Self {
        Self {
            search_approach: approach.into(),
            priority_info: Vec::new(),
            source_priorities: Vec::new(),
            search_refinement_needed: false,
        }
    }
}

/// One synthesized topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyTopic {
    pub topic: String,
    pub key_findings: Vec<String>,
    pub confidence: String,
    pub supporting_evidence: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceSummary {
    pub overall: String,
    pub reasoning: String,
}

/// Schema-complete synthesis record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synthesis {
    pub key_topics: Vec<KeyTopic>,
    pub information_gaps: Vec<String>,
    pub source_assessment: String,
    pub recommendations: Vec<String>,
    pub confidence_summary: ConfidenceSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SearchError,
    ScrapeError,
    AgentError,
}

/// A recoverable anomaly recorded during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ErrorEntry {
    pub fn search(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::SearchError,
            message: message.into(),
            url: None,
        }
    }

    pub fn scrape(url: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::ScrapeError,
            message: message.into(),
            url: url.map(str::to_string),
        }
    }

    pub fn agent(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::AgentError,
            message: message.into(),
            url: None,
        }
    }
}

/// Iteration counters; `total_research` is the global re-planning guard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationCounters {
    pub search_refinement: u32,
    pub total_research: u32,
}

/// The complete research workflow state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchState {
    pub original_query: String,
    pub analyzed_query: Option<AnalyzedQuery>,
    pub search_queries: Vec<String>,
    pub research_plan: Option<ResearchPlan>,
    pub web_results: Vec<SearchResult>,
    pub news_results: Vec<NewsArticle>,
    pub urls_to_scrape: Vec<String>,
    pub scraped_content: BTreeMap<String, String>,
    pub synthesized_information: Vec<Synthesis>,
    pub final_report: Option<String>,
    pub error_log: Vec<ErrorEntry>,
    pub iteration_count: IterationCounters,
    pub max_iterations: IterationLimits,
    pub next_node: Option<Stage>,
}

impl ResearchState {
    /// Create the initial state for a query
    pub fn new(query: impl Into<String>, max_iterations: IterationLimits) -> Self {
        Self {
            original_query: query.into(),
            max_iterations,
            ..Default::default()
        }
    }

    /// Whether the re-planning ceiling has been reached
    pub fn reached_max_research(&self) -> bool {
        self.iteration_count.total_research >= self.max_iterations.total_research
    }

    /// Search queries to run, falling back to the original query
    pub fn effective_queries(&self) -> Vec<String> {
        if self.search_queries.is_empty() {
            vec![self.original_query.clone()]
        } else {
            self.search_queries.clone()
        }
    }
}

/// Update to the research state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchUpdate {
    pub original_query: Option<String>,
    pub analyzed_query: Option<AnalyzedQuery>,
    pub search_queries: Option<Vec<String>>,
    pub research_plan: Option<ResearchPlan>,
    pub web_results: Vec<SearchResult>,
    pub news_results: Vec<NewsArticle>,
    pub urls_to_scrape: Option<Vec<String>>,
    pub scraped_content: BTreeMap<String, String>,
    pub synthesized_information: Vec<Synthesis>,
    pub final_report: Option<String>,
    pub error_log: Vec<ErrorEntry>,
    pub iteration_count: Option<IterationCounters>,
    pub max_iterations: Option<IterationLimits>,
    pub next_node: Option<Stage>,
}

impl ResearchUpdate {
    /// Add an error entry
    pub fn with_error(mut self, entry: ErrorEntry) -> Self {
        self.error_log.push(entry);
        self
    }

    /// Fold `other` into `self`; `other` is the later writer.
    pub fn merge(mut self, other: ResearchUpdate) -> Self {
        if self.original_query.is_none() {
            self.original_query = other.original_query;
        }
        overwrite(&mut self.analyzed_query, other.analyzed_query);
        overwrite(&mut self.search_queries, other.search_queries);
        overwrite(&mut self.research_plan, other.research_plan);
        overwrite(&mut self.urls_to_scrape, other.urls_to_scrape);
        overwrite(&mut self.final_report, other.final_report);
        overwrite(&mut self.iteration_count, other.iteration_count);
        overwrite(&mut self.max_iterations, other.max_iterations);
        overwrite(&mut self.next_node, other.next_node);

        self.web_results.extend(other.web_results);
        self.news_results.extend(other.news_results);
        self.synthesized_information
            .extend(other.synthesized_information);
        self.error_log.extend(other.error_log);
        self.scraped_content.extend(other.scraped_content);
        self
    }
}

fn overwrite<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

impl StateUpdate for ResearchUpdate {
    fn empty() -> Self {
        Self::default()
    }

    fn is_empty(&self) -> bool {
        self.original_query.is_none()
            && self.analyzed_query.is_none()
            && self.search_queries.is_none()
            && self.research_plan.is_none()
            && self.web_results.is_empty()
            && self.news_results.is_empty()
            && self.urls_to_scrape.is_none()
            && self.scraped_content.is_empty()
            && self.synthesized_information.is_empty()
            && self.final_report.is_none()
            && self.error_log.is_empty()
            && self.iteration_count.is_none()
            && self.max_iterations.is_none()
            && self.next_node.is_none()
    }
}

impl WorkflowState for ResearchState {
    type Update = ResearchUpdate;

    fn apply_update(&self, update: Self::Update) -> Self {
        let mut new_state = self.clone();

        if new_state.original_query.is_empty() {
            if let Some(query) = update.original_query {
                new_state.original_query = query;
            }
        }

        if let Some(analysis) = update.analyzed_query {
            new_state.analyzed_query = Some(analysis);
        }
        if let Some(queries) = update.search_queries {
            new_state.search_queries = queries;
        }
        if let Some(plan) = update.research_plan {
            new_state.research_plan = Some(plan);
        }
        if let Some(urls) = update.urls_to_scrape {
            new_state.urls_to_scrape = urls;
        }
        if let Some(report) = update.final_report {
            new_state.final_report = Some(report);
        }
        if let Some(counters) = update.iteration_count {
            new_state.iteration_count = counters;
        }
        if let Some(limits) = update.max_iterations {
            new_state.max_iterations = limits;
        }
        if let Some(next) = update.next_node {
            new_state.next_node = Some(next);
        }

        new_state.web_results.extend(update.web_results);
        new_state.news_results.extend(update.news_results);
        new_state
            .synthesized_information
            .extend(update.synthesized_information);
        new_state.error_log.extend(update.error_log);
        new_state.scraped_content.extend(update.scraped_content);

        new_state
    }

    fn merge_updates(updates: Vec<Self::Update>) -> Self::Update {
        updates
            .into_iter()
            .fold(ResearchUpdate::empty(), ResearchUpdate::merge)
    }

    fn is_terminal(&self) -> bool {
        self.final_report.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn web(url: &str) -> SearchResult {
        SearchResult {
            url: url.to_string(),
            title: format!("title {}", url),
            snippet: "snippet".to_string(),
        }
    }

    fn news(url: &str) -> NewsArticle {
        NewsArticle {
            url: url.to_string(),
            title: "headline".to_string(),
            summary: "summary".to_string(),
            date: "2024-01-01".to_string(),
            source: "wire".to_string(),
        }
    }

    fn populated_state() -> ResearchState {
        let mut state = ResearchState::new("rust async", IterationLimits::default());
        state.analyzed_query = Some(AnalyzedQuery::fallback("rust async"));
        state.search_queries = vec!["q1".into()];
        state.research_plan = Some(ResearchPlan::default());
        state.web_results = vec![web("https://a")];
        state.news_results = vec![news("https://n")];
        state.urls_to_scrape = vec!["https://a".into()];
        state
            .scraped_content
            .insert("https://a".into(), "content".into());
        state.error_log = vec![ErrorEntry::search("none")];
        state.iteration_count.total_research = 2;
        state.next_node = Some(Stage::Scrape);
        state
    }

    #[test]
    fn test_stage_names_round_trip() {
        for stage in Stage::ALL {
            assert_eq!(Stage::from_name(stage.name()), Some(stage));
        }
        assert_eq!(Stage::from_name("web_search"), None);
        assert_eq!(
            serde_json::to_value(Stage::Synthesize).unwrap(),
            "extract_and_synthesize_information"
        );
    }

    #[test]
    fn test_analyzed_query_fallback() {
        let analysis = AnalyzedQuery::fallback("quantum batteries");
        assert_eq!(analysis.main_topic, "quantum batteries");
        assert_eq!(analysis.specific_request, "quantum batteries");
        assert_eq!(analysis.key_entities, vec!["quantum batteries"]);
        assert_eq!(analysis.search_queries, vec!["quantum batteries"]);
        assert_eq!(analysis.info_type, "facts");
        assert_eq!(analysis.depth_required, "medium");
        assert!(!analysis.time_sensitive);
        assert!(!analysis.requires_web_scraping);
        assert!(analysis.subjective_criteria.is_empty());
    }

    #[test]
    fn test_analyzed_query_partial_fields_default() {
        let analysis: AnalyzedQuery =
            serde_json::from_str(r#"{"main_topic": "x", "depth_required": "HIGH"}"#).unwrap();
        assert_eq!(analysis.main_topic, "x");
        assert!(analysis.is_high_depth());
        assert!(analysis.search_queries.is_empty());
    }

    #[test]
    fn test_plan_defaults_to_web_search() {
        let plan: ResearchPlan = serde_json::from_str("{}").unwrap();
        assert_eq!(plan.search_approach, "web_search");
    }

    #[test]
    fn test_error_entry_serialization() {
        let entry = ErrorEntry::scrape(Some("https://x"), "timeout");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "scrape_error");
        assert_eq!(json["url"], "https://x");

        let json = serde_json::to_value(ErrorEntry::agent("boom")).unwrap();
        assert_eq!(json["type"], "agent_error");
        assert!(json.get("url").is_none());
    }

    #[test]
    fn test_empty_update_is_noop() {
        let state = populated_state();
        assert!(ResearchUpdate::empty().is_empty());

        let after = state.apply_update(ResearchUpdate::empty());
        assert_eq!(after.original_query, state.original_query);
        assert_eq!(after.analyzed_query, state.analyzed_query);
        assert_eq!(after.search_queries, state.search_queries);
        assert_eq!(after.research_plan, state.research_plan);
        assert_eq!(after.web_results, state.web_results);
        assert_eq!(after.news_results, state.news_results);
        assert_eq!(after.urls_to_scrape, state.urls_to_scrape);
        assert_eq!(after.scraped_content, state.scraped_content);
        assert_eq!(after.error_log, state.error_log);
        assert_eq!(after.iteration_count, state.iteration_count);
        assert_eq!(after.next_node, state.next_node);
        assert_eq!(after.final_report, state.final_report);
    }

    #[test]
    fn test_concurrent_branches_both_appended() {
        let state = populated_state();
        let web_branch = ResearchUpdate {
            web_results: vec![web("https://b")],
            error_log: vec![ErrorEntry::search("web hiccup")],
            ..Default::default()
        };
        let news_branch = ResearchUpdate {
            news_results: vec![news("https://m")],
            error_log: vec![ErrorEntry::search("news hiccup")],
            ..Default::default()
        };

        let after = state.apply_updates(vec![news_branch, web_branch]);
        assert_eq!(after.web_results.len(), 2);
        assert_eq!(after.news_results.len(), 2);
        assert_eq!(after.error_log.len(), 3);
        let messages: Vec<_> = after.error_log.iter().map(|e| e.message.as_str()).collect();
        assert!(messages.contains(&"web hiccup"));
        assert!(messages.contains(&"news hiccup"));
    }

    #[test]
    fn test_original_query_write_once() {
        let state = populated_state();
        let after = state.apply_update(ResearchUpdate {
            original_query: Some("something else".into()),
            ..Default::default()
        });
        assert_eq!(after.original_query, "rust async");

        let merged = ResearchState::merge_updates(vec![
            ResearchUpdate {
                original_query: Some("first".into()),
                ..Default::default()
            },
            ResearchUpdate {
                original_query: Some("second".into()),
                ..Default::default()
            },
        ]);
        assert_eq!(merged.original_query.as_deref(), Some("first"));
    }

    #[test]
    fn test_scraped_content_union_keeps_existing_keys() {
        let state = populated_state();
        let mut scraped = BTreeMap::new();
        scraped.insert("https://b".to_string(), "b content".to_string());
        let after = state.apply_update(ResearchUpdate {
            scraped_content: scraped,
            ..Default::default()
        });
        assert_eq!(after.scraped_content.len(), 2);
        assert_eq!(after.scraped_content["https://a"], "content");

        let mut rewrite = BTreeMap::new();
        rewrite.insert("https://a".to_string(), "fresh".to_string());
        let after = after.apply_update(ResearchUpdate {
            scraped_content: rewrite,
            ..Default::default()
        });
        assert_eq!(after.scraped_content["https://a"], "fresh");
    }

    #[test]
    fn test_overwrite_fields_last_writer_wins() {
        let merged = ResearchState::merge_updates(vec![
            ResearchUpdate {
                next_node: Some(Stage::Scrape),
                urls_to_scrape: Some(vec!["https://a".into()]),
                ..Default::default()
            },
            ResearchUpdate {
                next_node: Some(Stage::Synthesize),
                ..Default::default()
            },
        ]);
        assert_eq!(merged.next_node, Some(Stage::Synthesize));
        assert_eq!(merged.urls_to_scrape, Some(vec!["https://a".to_string()]));
    }

    #[test]
    fn test_terminal_on_final_report() {
        let state = populated_state();
        assert!(!state.is_terminal());
        let done = state.apply_update(ResearchUpdate {
            final_report: Some("report".into()),
            ..Default::default()
        });
        assert!(done.is_terminal());
    }

    #[test]
    fn test_reached_max_research() {
        let mut state = ResearchState::new("q", IterationLimits::default());
        assert!(!state.reached_max_research());
        state.iteration_count.total_research = 8;
        assert!(state.reached_max_research());
    }

    #[test]
    fn test_effective_queries_fall_back_to_original() {
        let state = ResearchState::new("q", IterationLimits::default());
        assert_eq!(state.effective_queries(), vec!["q"]);
    }
}
