//! Error types for the workflow runtime

use thiserror::Error;

/// Errors that can occur while executing a workflow graph
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Maximum steps exceeded
    #[error("Max steps exceeded: {0}")]
    MaxStepsExceeded(usize),

    /// Error during node computation
    #[error("Node error in {node}: {message}")]
    NodeError {
        node: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Router returned a key with no declared target
    #[error("Routing error in {node}: {decision}")]
    RoutingError { node: String, decision: String },

    /// Node referenced at runtime but never registered
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    /// A spawned node task panicked or was cancelled
    #[error("Task join error in {node}: {message}")]
    JoinError { node: String, message: String },
}

impl WorkflowError {
    /// Create a node error with a message
    pub fn node_error(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NodeError {
            node: node.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a node error with source
    pub fn node_error_with_source(
        node: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::NodeError {
            node: node.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a routing error
    pub fn routing_error(node: impl Into<String>, decision: impl Into<String>) -> Self {
        Self::RoutingError {
            node: node.into(),
            decision: decision.into(),
        }
    }
}
