//! Flow-definition records: flow, node, transition, assignment, property.
//!
//! All of these are written once at deploy time and never mutated; a new
//! deployment of the same flow code creates an entirely new record set.

use serde::{Deserialize, Serialize};

use super::types::{FlowFlag, FlowStatus, NodeType};

/// A versioned process definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flow {
    /// Record id (generated).
    pub record_id: String,
    /// Business key; at most one active flow per code.
    pub code: String,
    pub name: String,
    pub version: i64,
    pub status: FlowStatus,
    pub flag: FlowFlag,
    /// Serialized source document the definition was deployed from.
    pub source: String,
    pub created: i64,
}

/// One step in a flow's graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub record_id: String,
    pub flow_id: String,
    /// Business code, unique within the flow.
    pub code: String,
    pub name: String,
    pub node_type: NodeType,
    /// Ordering key within the deployment.
    pub order_num: String,
    /// Linked form record, if the node carries an input schema.
    pub form_id: Option<String>,
    pub created: i64,
}

/// A directed, optionally guarded edge between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    pub record_id: String,
    pub source_node_id: String,
    pub target_node_id: String,
    /// Boolean guard script; empty means unconditional.
    pub expression: String,
    pub explain: String,
    pub created: i64,
}

/// Candidate-resolution expression attached to a node; evaluated when a
/// traversal reaches the node to produce its handler set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeAssignment {
    pub record_id: String,
    pub node_id: String,
    /// Script returning a string list of candidate identifiers.
    pub expression: String,
    pub created: i64,
}

/// Free-form key/value configuration on a node (e.g. `timing`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeProperty {
    pub record_id: String,
    pub node_id: String,
    pub name: String,
    pub value: String,
    pub created: i64,
}
