//! WorkflowGraph builder DSL.
//!
//! Provides a fluent API for defining nodes, direct edges, conditional
//! edges and the entry point, then validates the graph into a
//! [`BuiltWorkflowGraph`] the runtime can execute.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::error::WorkflowError;
use super::node::{BoxedNode, Node};
use super::state::WorkflowState;

/// Sentinel source used in visualizations.
pub const START: &str = "START";

/// Sentinel target for terminal edges.
pub const END: &str = "END";

/// Decision returned by a router: a single target or a concurrent fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    To(String),
    FanOut(Vec<String>),
}

impl Route {
    pub fn to(target: impl Into<String>) -> Self {
        Self::To(target.into())
    }

    pub fn fan_out<I, T>(targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::FanOut(targets.into_iter().map(Into::into).collect())
    }

    /// Route keys in dispatch order
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Route::To(target) => vec![target.as_str()],
            Route::FanOut(targets) => targets.iter().map(String::as_str).collect(),
        }
    }
}

/// Router function evaluated after a node completes.
pub type RouterFn<S> = Arc<dyn Fn(&S) -> Route + Send + Sync>;

/// Conditional edges leaving one node.
pub struct ConditionalEdges<S> {
    router: RouterFn<S>,
    /// Route key -> target node, in declaration order
    pub paths: Vec<(String, String)>,
}

impl<S> Clone for ConditionalEdges<S> {
    fn clone(&self) -> Self {
        Self {
            router: Arc::clone(&self.router),
            paths: self.paths.clone(),
        }
    }
}

/// Errors that can occur while building a workflow graph.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowBuildError {
    #[error("workflow entry point not set")]
    NoEntryPoint,
    #[error("unknown node id: {0}")]
    UnknownNode(String),
    #[error("node {0} already has a router")]
    DuplicateRouter(String),
    #[error("node {0} has both direct and conditional edges")]
    ConflictingEdges(String),
}

/// Builder for constructing workflow graphs with fluent API.
pub struct WorkflowGraph<S: WorkflowState> {
    name: String,
    nodes: HashMap<String, BoxedNode<S>>,
    node_order: Vec<String>,
    edges: Vec<(String, String)>,
    routers: Vec<(String, ConditionalEdges<S>)>,
    entry_point: Option<String>,
}

impl<S: WorkflowState> Default for WorkflowGraph<S> {
    fn default() -> Self {
        Self {
            name: String::new(),
            nodes: HashMap::new(),
            node_order: Vec::new(),
            edges: Vec::new(),
            routers: Vec::new(),
            entry_point: None,
        }
    }
}

impl<S: WorkflowState> WorkflowGraph<S> {
    /// Create a new workflow graph builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the workflow name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a node. Re-adding an id replaces the previous node.
    pub fn node(mut self, id: impl Into<String>, node: impl Node<S> + 'static) -> Self {
        let id = id.into();
        if !self.nodes.contains_key(&id) {
            self.node_order.push(id.clone());
        }
        self.nodes.insert(id, Arc::new(node));
        self
    }

    /// Set the entry point node.
    pub fn entry(mut self, id: impl Into<String>) -> Self {
        self.entry_point = Some(id.into());
        self
    }

    /// Add a direct edge between nodes.
    ///
    /// Several nodes may point at the same target; when they run in the
    /// same step the target is scheduled once (fan-in).
    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push((from.into(), to.into()));
        self
    }

    /// Add conditional edges from a node.
    ///
    /// `paths` maps route keys to target nodes. Only declared keys (and
    /// [`END`]) resolve; any other key is a routing error at run time.
    pub fn conditional_edges<F>(
        mut self,
        from: impl Into<String>,
        router: F,
        paths: Vec<(&str, &str)>,
    ) -> Self
    where
        F: Fn(&S) -> Route + Send + Sync + 'static,
    {
        self.routers.push((
            from.into(),
            ConditionalEdges {
                router: Arc::new(router),
                paths: paths
                    .into_iter()
                    .map(|(key, target)| (key.to_string(), target.to_string()))
                    .collect(),
            },
        ));
        self
    }

    /// Validate and build the workflow graph.
    pub fn build(self) -> Result<BuiltWorkflowGraph<S>, WorkflowBuildError> {
        let entry_point = self.entry_point.ok_or(WorkflowBuildError::NoEntryPoint)?;

        if !self.nodes.contains_key(&entry_point) {
            return Err(WorkflowBuildError::UnknownNode(entry_point));
        }

        let mut edges: HashMap<String, Vec<String>> = HashMap::new();
        for (from, to) in self.edges {
            if !self.nodes.contains_key(&from) {
                return Err(WorkflowBuildError::UnknownNode(from));
            }
            if to != END && !self.nodes.contains_key(&to) {
                return Err(WorkflowBuildError::UnknownNode(to));
            }
            edges.entry(from).or_default().push(to);
        }

        let mut routers: HashMap<String, ConditionalEdges<S>> = HashMap::new();
        for (from, conditional) in self.routers {
            if !self.nodes.contains_key(&from) {
                return Err(WorkflowBuildError::UnknownNode(from));
            }
            if edges.contains_key(&from) {
                return Err(WorkflowBuildError::ConflictingEdges(from));
            }
            if let Some((_, target)) = conditional
                .paths
                .iter()
                .find(|(_, target)| target != END && !self.nodes.contains_key(target))
            {
                return Err(WorkflowBuildError::UnknownNode(target.clone()));
            }
            if routers.contains_key(&from) {
                return Err(WorkflowBuildError::DuplicateRouter(from));
            }
            routers.insert(from, conditional);
        }

        Ok(BuiltWorkflowGraph {
            nodes: self.nodes,
            node_order: self.node_order,
            edges,
            routers,
            entry_point,
            name: self.name,
        })
    }
}

/// Built workflow graph representation.
pub struct BuiltWorkflowGraph<S: WorkflowState> {
    pub(crate) nodes: HashMap<String, BoxedNode<S>>,
    pub(crate) node_order: Vec<String>,
    pub edges: HashMap<String, Vec<String>>,
    pub routers: HashMap<String, ConditionalEdges<S>>,
    pub entry_point: String,
    pub name: String,
}

impl<S: WorkflowState> fmt::Debug for BuiltWorkflowGraph<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltWorkflowGraph")
            .field("name", &self.name)
            .field("entry_point", &self.entry_point)
            .field("nodes", &self.node_order)
            .field("edges", &self.edges)
            .field("routers", &self.routers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<S: WorkflowState> BuiltWorkflowGraph<S> {
    /// Registered node ids in insertion order
    pub fn node_names(&self) -> &[String] {
        &self.node_order
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub(crate) fn get(&self, id: &str) -> Result<BoxedNode<S>, WorkflowError> {
        self.nodes
            .get(id)
            .cloned()
            .ok_or_else(|| WorkflowError::UnknownNode(id.to_string()))
    }

    /// Resolve the nodes that follow `node` given the merged state.
    ///
    /// May include [`END`]; the runtime drops it when scheduling.
    pub fn successors(&self, node: &str, state: &S) -> Result<Vec<String>, WorkflowError> {
        let Some(conditional) = self.routers.get(node) else {
            return Ok(self.edges.get(node).cloned().unwrap_or_default());
        };

        let route = (conditional.router)(state);
        route
            .keys()
            .into_iter()
            .map(|key| self.resolve_route_key(node, conditional, key))
            .collect()
    }

    fn resolve_route_key(
        &self,
        node: &str,
        conditional: &ConditionalEdges<S>,
        key: &str,
    ) -> Result<String, WorkflowError> {
        if let Some((_, target)) = conditional.paths.iter().find(|(k, _)| k == key) {
            return Ok(target.clone());
        }
        if key == END {
            return Ok(END.to_string());
        }
        Err(WorkflowError::routing_error(node, key))
    }
}

/// Dedupe successor lists while keeping first-seen order.
pub(crate) fn dedupe_targets(targets: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    targets
        .into_iter()
        .filter(|t| t != END && seen.insert(t.clone()))
        .collect()
}
