use tracing::{info, warn};

use super::{to_prompt_json, StageContext};
use crate::error::ResearchError;
use crate::extract::extract_or;
use crate::research::prompts::ResearchPrompts;
use crate::research::state::{ResearchPlan, ResearchState, ResearchUpdate, Stage};

/// Choose the search approach.
///
/// Every visit counts against `total_research`, re-plans included. Past
/// the ceiling the stage skips the backend and plans straight to
/// synthesis.
pub async fn plan_research_strategy(
    ctx: &StageContext,
    state: &ResearchState,
) -> Result<ResearchUpdate, ResearchError> {
    let mut counters = state.iteration_count;
    counters.total_research += 1;
    if state.next_node == Some(Stage::Plan) {
        counters.search_refinement += 1;
    }

    info!(
        total_research = counters.total_research,
        max = state.max_iterations.total_research,
        "Planning research strategy"
    );

    if counters.total_research > state.max_iterations.total_research {
        warn!(
            total_research = counters.total_research,
            "Exceeded maximum total research iterations"
        );
        return Ok(ResearchUpdate {
            iteration_count: Some(counters),
            research_plan: Some(ResearchPlan::with_approach(Stage::Synthesize.name())),
            ..Default::default()
        });
    }

    let prompt = ResearchPrompts::plan(&to_prompt_json(&state.analyzed_query));
    let reply = ctx.generate(Stage::Plan, &prompt).await?;
    let plan: ResearchPlan = extract_or(&reply, Stage::Plan.name(), ResearchPlan::default);

    info!(approach = %plan.search_approach, "Research plan created");

    Ok(ResearchUpdate {
        iteration_count: Some(counters),
        research_plan: Some(plan),
        ..Default::default()
    })
}
