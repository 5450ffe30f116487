//! Graph workflow engine
//!
//! - **Node**: unit of work returning a partial state update
//! - **Edge**: direct, or conditional via a router function
//! - **Step**: the set of nodes scheduled together; they run concurrently
//!   and their updates are merged once all of them finish
//!
//! ```text
//! entry ──► step 0 ──► merge ──► route ──► step 1 ──► ... ──► END
//! ```

pub mod error;
pub mod graph;
pub mod node;
pub mod runtime;
pub mod state;
pub mod visualization;

pub use error::WorkflowError;
pub use graph::{BuiltWorkflowGraph, Route, WorkflowBuildError, WorkflowGraph, END, START};
pub use node::{BoxedNode, FnNode, Node};
pub use runtime::{RuntimeConfig, WorkflowResult, WorkflowRuntime};
pub use state::{StateUpdate, WorkflowState};
