//! research-flow: graph-driven web research workflow
//!
//! A query runs through eight stages on a step-based graph engine:
//! - analyze and plan with the generation backend
//! - web and news search, concurrently when the plan asks for both
//! - evaluate snippets, optionally scrape pages, loop back to planning
//!   under a global iteration guard
//! - synthesize and compile a Markdown report
//!
//! # LLM Providers
//!
//! Use `RigAgentAdapter` to wrap Rig's native providers:
//!
//! ```rust,ignore
//! use rig::providers::gemini::Client;
//! use rig::client::{CompletionClient, ProviderClient};
//! use research_flow::{RigAgentAdapter, ResearchAgent};
//!
//! let agent = Client::from_env().agent("gemini-2.0-flash").build();
//! let research = ResearchAgent::builder(Arc::new(RigAgentAdapter::new(agent))).build()?;
//! let outcome = research.run("state of edible robotics").await;
//! println!("{}", outcome.final_report);
//! ```

pub mod compat;
pub mod config;
pub mod error;
pub mod extract;
pub mod llm;
pub mod research;
pub mod tools;
pub mod workflow;

pub use compat::RigAgentAdapter;
pub use config::{IterationLimits, ResearchConfig};
pub use error::ResearchError;
pub use extract::{extract, extract_json, extract_object, extract_or, ExtractError};
pub use llm::{LLMConfig, LLMProvider};

pub use research::{
    build_research_graph, ErrorEntry, ErrorKind, ResearchAgent, ResearchAgentBuilder, ResearchOutcome,
    ResearchState, ResearchUpdate, Stage, StageContext, Synthesis,
};
pub use research::prompts::{PromptBuilder, ResearchPrompts};
pub use research::stages::report_header;

pub use tools::{
    HttpScraper, NewsApiTool, NewsArticle, NewsSearch, ScrapeError, ScrapeSession, ScrapedPage, Scraper,
    SearchResult, TavilySearchTool, WebSearch,
};
pub use workflow::{WorkflowError, WorkflowGraph, WorkflowRuntime};
