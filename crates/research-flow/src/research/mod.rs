//! The research workflow: shared state, prompts, stages, routing and the
//! assembled graph.

pub mod prompts;
pub mod router;
pub mod stages;
pub mod state;
pub mod workflow;

pub use stages::{StageContext, StageNode};
pub use state::{
    AnalyzedQuery, ConfidenceSummary, ErrorEntry, ErrorKind, IterationCounters, KeyTopic, ResearchPlan,
    ResearchState, ResearchUpdate, Stage, Synthesis,
};
pub use workflow::{build_research_graph, ResearchAgent, ResearchAgentBuilder, ResearchOutcome};
