//! Workflow state abstraction
//!
//! Defines how shared state is updated and merged between steps.
//! The runtime collects the updates produced by every node of a step and
//! applies them together once all of them have finished.

/// Trait for partial state updates produced by a node
pub trait StateUpdate: Clone + Send + Sync + 'static {
    /// Create an empty (no-op) update
    fn empty() -> Self;

    /// Check if this update has no effect
    fn is_empty(&self) -> bool;
}

/// Trait for workflow state managed by the runtime
///
/// Nodes read the state and return updates; they never mutate it directly.
/// Merging is where per-field policies (append, union, overwrite) live.
///
/// # Example
///
/// ```ignore
/// impl WorkflowState for ResearchState {
///     type Update = ResearchUpdate;
///
///     fn apply_update(&self, update: Self::Update) -> Self {
///         let mut new = self.clone();
///         new.web_results.extend(update.web_results);
///         if let Some(plan) = update.research_plan {
///             new.research_plan = Some(plan);
///         }
///         new
///     }
///
///     fn merge_updates(updates: Vec<Self::Update>) -> Self::Update {
///         updates.into_iter().fold(ResearchUpdate::empty(), ResearchUpdate::merge)
///     }
/// }
/// ```
pub trait WorkflowState: Clone + Send + Sync + 'static {
    /// The update type produced by nodes
    type Update: StateUpdate;

    /// Apply an update to produce a new state
    ///
    /// This should be a pure function - the original state is not modified.
    fn apply_update(&self, update: Self::Update) -> Self;

    /// Merge multiple updates into a single update
    ///
    /// Called when several nodes produce updates in the same step.
    /// Updates arrive in step order, which the merge may rely on for
    /// last-writer-wins fields.
    fn merge_updates(updates: Vec<Self::Update>) -> Self::Update;

    /// Check if the state represents a terminal condition
    ///
    /// When true, the workflow stops regardless of outgoing edges.
    fn is_terminal(&self) -> bool {
        false
    }

    /// Apply multiple updates at once
    ///
    /// Default implementation merges updates then applies the result.
    fn apply_updates(&self, updates: Vec<Self::Update>) -> Self {
        if updates.is_empty() {
            return self.clone();
        }
        let merged = Self::merge_updates(updates);
        self.apply_update(merged)
    }
}
