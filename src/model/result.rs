//! Result shapes returned by the engine facade.

use serde::{Deserialize, Serialize};

use super::flow::Node;
use super::instance::{FlowInstance, NodeInstance};

/// A node the traversal left pending for human action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextNode {
    pub node: Node,
    pub node_instance: NodeInstance,
    pub candidate_ids: Vec<String>,
}

/// Aggregate outcome of a start or handle call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandleResult {
    /// Whether the flow instance ended during this traversal.
    pub is_end: bool,
    /// Newly pending nodes, in the order they were reached.
    pub next_nodes: Vec<NextNode>,
    pub flow_instance: FlowInstance,
}

/// Pending-node summary for a user's todo list: the node instance joined
/// with its node, flow, and form data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoItem {
    pub node_instance_id: String,
    pub flow_instance_id: String,
    pub flow_name: String,
    pub node_id: String,
    pub node_code: String,
    pub node_name: String,
    pub input_data: String,
    pub launcher: String,
    pub launch_time: i64,
    pub form_data: Option<String>,
}
