//! Step-based execution of a [`BuiltWorkflowGraph`].
//!
//! Each step runs the current node set concurrently, waits for every node
//! (a join, not a race), merges their updates into the shared state in one
//! place, then asks the graph which nodes come next.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::WorkflowError;
use super::graph::{dedupe_targets, BuiltWorkflowGraph};
use super::state::WorkflowState;

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Hard stop on executed steps, independent of any state-level counter
    pub max_steps: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { max_steps: 64 }
    }
}

/// Result of a workflow execution
#[derive(Debug, Clone)]
pub struct WorkflowResult<S: WorkflowState> {
    /// Final workflow state
    pub state: S,
    /// Number of steps executed
    pub steps: usize,
    /// Node names in execution order; nodes sharing a step appear together
    pub trace: Vec<String>,
}

/// Executes workflow graphs
pub struct WorkflowRuntime<S: WorkflowState> {
    graph: Arc<BuiltWorkflowGraph<S>>,
    config: RuntimeConfig,
}

impl<S: WorkflowState> WorkflowRuntime<S> {
    pub fn new(graph: BuiltWorkflowGraph<S>) -> Self {
        Self {
            graph: Arc::new(graph),
            config: RuntimeConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn graph(&self) -> &BuiltWorkflowGraph<S> {
        &self.graph
    }

    /// Run from the entry point until no node is scheduled or the state
    /// reports itself terminal.
    pub async fn run(&self, initial_state: S) -> Result<WorkflowResult<S>, WorkflowError> {
        let mut state = initial_state;
        let mut active = vec![self.graph.entry_point.clone()];
        let mut trace = Vec::new();
        let mut steps = 0;

        while !active.is_empty() {
            if steps >= self.config.max_steps {
                warn!(max_steps = self.config.max_steps, "Workflow step limit reached");
                return Err(WorkflowError::MaxStepsExceeded(self.config.max_steps));
            }

            debug!(step = steps, nodes = ?active, "Executing step");
            let updates = self.execute_step(&active, &state).await?;
            state = state.apply_updates(updates);
            steps += 1;

            if state.is_terminal() {
                trace.append(&mut active);
                break;
            }

            let mut next = Vec::new();
            for node in &active {
                next.extend(self.graph.successors(node, &state)?);
            }
            trace.append(&mut active);
            active = dedupe_targets(next);
        }

        info!(
            workflow = %self.graph.name,
            steps,
            "Workflow finished"
        );

        Ok(WorkflowResult {
            state,
            steps,
            trace,
        })
    }

    /// Run every node of a step concurrently and collect updates in step order.
    async fn execute_step(&self, nodes: &[String], state: &S) -> Result<Vec<S::Update>, WorkflowError> {
        let snapshot = Arc::new(state.clone());
        let mut handles = Vec::with_capacity(nodes.len());

        for name in nodes {
            let node = self.graph.get(name)?;
            let snapshot = Arc::clone(&snapshot);
            let handle = tokio::spawn(async move { node.run(&snapshot).await });
            handles.push((name.clone(), handle));
        }

        let mut updates = Vec::with_capacity(handles.len());
        let mut pending = handles.into_iter();
        while let Some((name, handle)) = pending.next() {
            let result = handle
                .await
                .map_err(|e| WorkflowError::JoinError {
                    node: name.clone(),
                    message: e.to_string(),
                })
                .and_then(|result| result);

            match result {
                Ok(update) => updates.push(update),
                Err(e) => {
                    for (sibling, handle) in pending {
                        debug!(node = %sibling, "Aborting sibling after step failure");
                        handle.abort();
                    }
                    return Err(e);
                }
            }
        }

        Ok(updates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::graph::{Route, WorkflowGraph, END};
    use crate::workflow::node::FnNode;
    use crate::workflow::state::tests::{TraceState, TraceUpdate};
    use std::time::Duration;

    fn visit(
        name: &'static str,
    ) -> FnNode<impl Fn(TraceState) -> futures::future::Ready<Result<TraceUpdate, WorkflowError>>> {
        FnNode(move |_s: TraceState| futures::future::ready(Ok(TraceUpdate::visit(name))))
    }

    #[tokio::test]
    async fn test_linear_workflow() {
        let graph = WorkflowGraph::<TraceState>::new()
            .node("a", visit("a"))
            .node("b", visit("b"))
            .entry("a")
            .edge("a", "b")
            .edge("b", END)
            .build()
            .unwrap();

        let result = WorkflowRuntime::new(graph)
            .run(TraceState::default())
            .await
            .unwrap();

        assert_eq!(result.state.visits, vec!["a", "b"]);
        assert_eq!(result.steps, 2);
        assert_eq!(result.trace, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_fan_out_joins_before_fan_in() {
        let slow = FnNode(|_s: TraceState| async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok::<_, WorkflowError>(TraceUpdate::visit("slow"))
        });
        let join = FnNode(|s: TraceState| async move {
            // Both branches must be visible when the join node runs
            assert!(s.visits.contains(&"slow".to_string()));
            assert!(s.visits.contains(&"fast".to_string()));
            Ok::<_, WorkflowError>(TraceUpdate::visit("join"))
        });

        let graph = WorkflowGraph::<TraceState>::new()
            .node("start", visit("start"))
            .node("slow", slow)
            .node("fast", visit("fast"))
            .node("join", join)
            .entry("start")
            .conditional_edges(
                "start",
                |_s: &TraceState| Route::fan_out(["slow", "fast"]),
                vec![("slow", "slow"), ("fast", "fast")],
            )
            .edge("slow", "join")
            .edge("fast", "join")
            .edge("join", END)
            .build()
            .unwrap();

        let result = WorkflowRuntime::new(graph)
            .run(TraceState::default())
            .await
            .unwrap();

        assert_eq!(result.state.visits, vec!["start", "slow", "fast", "join"]);
        // join scheduled once despite two incoming edges
        assert_eq!(result.steps, 3);
    }

    #[tokio::test]
    async fn test_node_error_aborts_run() {
        let failing = FnNode(|_s: TraceState| async {
            Err::<TraceUpdate, _>(WorkflowError::node_error("boom", "exploded"))
        });
        let graph = WorkflowGraph::<TraceState>::new()
            .node("boom", failing)
            .entry("boom")
            .build()
            .unwrap();

        let err = WorkflowRuntime::new(graph)
            .run(TraceState::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NodeError { .. }));
    }

    #[tokio::test]
    async fn test_failed_branch_aborts_siblings() {
        let finished = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        let failing = FnNode(|_s: TraceState| async {
            Err::<TraceUpdate, _>(WorkflowError::node_error("fail", "exploded"))
        });
        let slow = FnNode(move |_s: TraceState| {
            let flag = Arc::clone(&flag);
            async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                flag.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok::<_, WorkflowError>(TraceUpdate::visit("slow"))
            }
        });

        let graph = WorkflowGraph::<TraceState>::new()
            .node("start", visit("start"))
            .node("fail", failing)
            .node("slow", slow)
            .entry("start")
            .conditional_edges(
                "start",
                |_s: &TraceState| Route::fan_out(["fail", "slow"]),
                vec![("fail", "fail"), ("slow", "slow")],
            )
            .build()
            .unwrap();

        let err = WorkflowRuntime::new(graph)
            .run(TraceState::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NodeError { .. }));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!finished.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_max_steps_guard() {
        let tick = FnNode(|_s: TraceState| async {
            Ok::<_, WorkflowError>(TraceUpdate {
                delta: 1,
                ..Default::default()
            })
        });
        let graph = WorkflowGraph::<TraceState>::new()
            .node("loop", tick)
            .entry("loop")
            .edge("loop", "loop")
            .build()
            .unwrap();

        let err = WorkflowRuntime::new(graph)
            .with_config(RuntimeConfig { max_steps: 5 })
            .run(TraceState::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::MaxStepsExceeded(5)));
    }

    #[tokio::test]
    async fn test_terminal_state_stops_run() {
        let finish = FnNode(|_s: TraceState| async {
            Ok::<_, WorkflowError>(TraceUpdate {
                done: true,
                ..Default::default()
            })
        });
        let graph = WorkflowGraph::<TraceState>::new()
            .node("finish", finish)
            .node("never", visit("never"))
            .entry("finish")
            .edge("finish", "never")
            .build()
            .unwrap();

        let result = WorkflowRuntime::new(graph)
            .run(TraceState::default())
            .await
            .unwrap();
        assert!(result.state.visits.is_empty());
        assert_eq!(result.trace, vec!["finish"]);
    }

    #[tokio::test]
    async fn test_router_loop_back_until_condition() {
        let tick = FnNode(|_s: TraceState| async {
            Ok::<_, WorkflowError>(TraceUpdate {
                delta: 1,
                ..Default::default()
            })
        });
        let graph = WorkflowGraph::<TraceState>::new()
            .node("tick", tick)
            .node("done", visit("done"))
            .entry("tick")
            .conditional_edges(
                "tick",
                |s: &TraceState| {
                    if s.count >= 3 {
                        Route::to("finish")
                    } else {
                        Route::to("again")
                    }
                },
                vec![("again", "tick"), ("finish", "done")],
            )
            .edge("done", END)
            .build()
            .unwrap();

        let result = WorkflowRuntime::new(graph)
            .run(TraceState::default())
            .await
            .unwrap();
        assert_eq!(result.state.count, 3);
        assert_eq!(result.trace, vec!["tick", "tick", "tick", "done"]);
    }
}
