//! Top-level error types for research-flow.

use thiserror::Error;

use crate::workflow::{WorkflowBuildError, WorkflowError};

/// Errors surfaced by the research workflow and its stages.
#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Stage {stage} failed: {message}")]
    Stage { stage: String, message: String },

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Invalid workflow graph: {0}")]
    Graph(#[from] WorkflowBuildError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ResearchError {
    /// Create a stage error
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

#[cfg(test)]
mod tests {
    static_assertions::assert_impl_all!(super::ResearchError: Send, Sync);
    use super::*;

    #[test]
    fn test_stage_error_display() {
        let err = ResearchError::stage("scrape_websites", "crawler unavailable");
        assert_eq!(
            err.to_string(),
            "Stage scrape_websites failed: crawler unavailable"
        );
    }

    #[test]
    fn test_workflow_error_conversion() {
        let err: ResearchError = WorkflowError::MaxStepsExceeded(64).into();
        assert!(matches!(err, ResearchError::Workflow(_)));
        assert!(err.to_string().contains("64"));
    }
}
