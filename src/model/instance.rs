//! Execution records: flow instances, node instances, candidates, timers.

use serde::{Deserialize, Serialize};

use super::types::{FlowInstanceStatus, NodeInstanceStatus};

/// One running execution of a flow. Created on start, status-mutated on
/// completion or stop, never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowInstance {
    pub record_id: String,
    pub flow_id: String,
    pub status: FlowInstanceStatus,
    pub launcher: String,
    pub launch_time: i64,
    pub created: i64,
}

/// One visit to a node within a flow instance. Loops create new instances,
/// never revisits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInstance {
    pub record_id: String,
    pub flow_instance_id: String,
    pub node_id: String,
    /// Who completed the instance; empty while pending.
    pub processor: String,
    pub process_time: i64,
    /// Raw input payload as submitted (JSON text).
    pub input_data: String,
    /// Output payload recorded on completion.
    pub out_data: String,
    pub status: NodeInstanceStatus,
    pub created: i64,
}

/// Binding of a node instance to one eligible handler identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeCandidate {
    pub record_id: String,
    pub node_instance_id: String,
    pub candidate_id: String,
    pub created: i64,
}

/// Deferred escalation record, created when a reached node declares a
/// `timing` property. Expiry firing is an external collaborator's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeTiming {
    pub node_instance_id: String,
    /// Resolved processor who will act if the timer fires.
    pub processor: String,
    pub input: String,
    pub expired_at: i64,
    pub created: i64,
}
