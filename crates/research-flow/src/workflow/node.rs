//! Node abstraction: one unit of work in the workflow graph.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use super::error::WorkflowError;
use super::state::WorkflowState;

/// A unit of work reading the shared state and returning a partial update.
#[async_trait]
pub trait Node<S: WorkflowState>: Send + Sync {
    async fn run(&self, state: &S) -> Result<S::Update, WorkflowError>;
}

/// Shared node handle stored by the graph
pub type BoxedNode<S> = Arc<dyn Node<S>>;

/// Wraps an async closure as a node.
///
/// The closure receives an owned snapshot of the state.
pub struct FnNode<F>(pub F);

#[async_trait]
impl<S, F, Fut> Node<S> for FnNode<F>
where
    S: WorkflowState,
    F: Fn(S) -> Fut + Send + Sync,
    Fut: Future<Output = Result<S::Update, WorkflowError>> + Send,
{
    async fn run(&self, state: &S) -> Result<S::Update, WorkflowError> {
        (self.0)(state.clone()).await
    }
}
