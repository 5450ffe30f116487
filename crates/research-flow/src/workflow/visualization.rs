//! Mermaid diagram generation for workflow graphs
//!
//! | Element           | Shape             | Mermaid Syntax |
//! |-------------------|-------------------|----------------|
//! | Node              | Rectangle         | `id[label]`    |
//! | Router source     | Diamond           | `id{label}`    |
//! | START/END         | Stadium           | `id([label])`  |

use super::graph::{BuiltWorkflowGraph, END, START};
use super::state::WorkflowState;

/// Sanitize a node ID for use as a Mermaid node identifier.
///
/// ```ignore
/// assert_eq!(sanitize_id("my-node"), "my_node");
/// ```
pub fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Render a node declaration.
pub fn render_node(id: &str, is_router: bool) -> String {
    let safe_id = sanitize_id(id);
    if id == START || id == END {
        format!("    {}([{}])", safe_id, id)
    } else if is_router {
        format!("    {}{{{}}}", safe_id, id)
    } else {
        format!("    {}[{}]", safe_id, id)
    }
}

/// Render an edge.
///
/// - Unconditional edges: solid arrow `-->`
/// - Conditional edges: dotted arrow with label `-. "label" .->`
pub fn render_edge(from: &str, to: &str, condition: Option<&str>) -> String {
    let from_safe = sanitize_id(from);
    let to_safe = sanitize_id(to);

    match condition {
        Some(label) => format!("    {} -. \"{}\" .-> {}", from_safe, label, to_safe),
        None => format!("    {} --> {}", from_safe, to_safe),
    }
}

impl<S: WorkflowState> BuiltWorkflowGraph<S> {
    /// Render the graph topology as a Mermaid flowchart.
    ///
    /// Output is deterministic: nodes follow insertion order.
    pub fn to_mermaid(&self) -> String {
        let mut lines = vec!["flowchart TD".to_string()];

        lines.push(render_node(START, false));
        for name in &self.node_order {
            lines.push(render_node(name, self.routers.contains_key(name)));
        }
        lines.push(render_node(END, false));

        lines.push(render_edge(START, &self.entry_point, None));
        for name in &self.node_order {
            if let Some(targets) = self.edges.get(name) {
                for target in targets {
                    lines.push(render_edge(name, target, None));
                }
            }
            if let Some(conditional) = self.routers.get(name) {
                for (key, target) in &conditional.paths {
                    lines.push(render_edge(name, target, Some(key)));
                }
            }
        }

        lines.join("\n")
    }
}
