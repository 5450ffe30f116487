//! Routing decisions after the plan and evaluate stages
//!
//! Both routers are pure functions of the merged state. Route keys are
//! search approaches or stage names; the graph only accepts the keys
//! declared in [`plan_paths`] and [`evaluate_paths`].

use tracing::{info, warn};

use super::state::{ResearchState, Stage};
use crate::workflow::Route;

pub const WEB_SEARCH: &str = "web_search";
pub const NEWS_SEARCH: &str = "news_search";
pub const PARALLEL_SEARCH: &str = "parallel_search";

/// Route keys accepted after the plan stage, with their target stages
pub fn plan_paths() -> Vec<(&'static str, &'static str)> {
    vec![
        (WEB_SEARCH, Stage::WebSearch.name()),
        (NEWS_SEARCH, Stage::NewsSearch.name()),
        (Stage::WebSearch.name(), Stage::WebSearch.name()),
        (Stage::NewsSearch.name(), Stage::NewsSearch.name()),
        (Stage::Synthesize.name(), Stage::Synthesize.name()),
    ]
}

/// Route keys accepted after the evaluate stage
pub fn evaluate_paths() -> Vec<(&'static str, &'static str)> {
    [Stage::Scrape, Stage::Synthesize, Stage::Plan]
        .into_iter()
        .map(|stage| (stage.name(), stage.name()))
        .collect()
}

/// Pick the search stage(s) for the current plan.
///
/// With news disabled, news and parallel plans collapse to web search.
pub fn route_after_plan(state: &ResearchState, news_disabled: bool) -> Route {
    let approach = state
        .research_plan
        .as_ref()
        .map(|plan| plan.search_approach.as_str())
        .unwrap_or(WEB_SEARCH);

    if news_disabled && (approach == NEWS_SEARCH || approach == PARALLEL_SEARCH) {
        info!(approach, "News search disabled, routing to web search only");
        return Route::to(WEB_SEARCH);
    }

    if approach == PARALLEL_SEARCH {
        info!("Routing to parallel web and news search");
        return Route::fan_out([WEB_SEARCH, NEWS_SEARCH]);
    }

    info!(approach, "Routing after plan");
    Route::to(approach)
}

/// Follow the evaluate stage's decision, breaking re-planning loops.
pub fn route_after_evaluate(state: &ResearchState) -> Route {
    let next = state.next_node.unwrap_or(Stage::Synthesize);

    if next == Stage::Plan && state.reached_max_research() {
        warn!(
            total_research = state.iteration_count.total_research,
            max = state.max_iterations.total_research,
            "Maximum research iterations reached, proceeding to synthesis"
        );
        return Route::to(Stage::Synthesize.name());
    }

    info!(next = %next, "Routing after evaluation");
    Route::to(next.name())
}
