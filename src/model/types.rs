//! Enumerated codes shared across records.

use serde::{Deserialize, Serialize};

/// Node type within a flow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// Start event: entry point of a flow.
    Start,
    /// Human task awaiting a candidate's decision.
    UserTask,
    /// Join point requiring every incoming branch to complete.
    ParallelGateway,
    /// End event: terminates the flow once no other work is pending.
    End,
    /// Terminate event: ends the flow unconditionally.
    Terminate,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Start => "start",
            NodeType::UserTask => "user_task",
            NodeType::ParallelGateway => "parallel_gateway",
            NodeType::End => "end",
            NodeType::Terminate => "terminate",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flow definition status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStatus {
    Enabled,
    Disabled,
}

/// Primary flow vs sub-process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowFlag {
    Primary,
    SubProcess,
}

/// Flow instance lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowInstanceStatus {
    NotStarted,
    InProgress,
    Paused,
    Stopped,
    Completed,
}

/// Node instance processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeInstanceStatus {
    Pending,
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_type_display() {
        assert_eq!(NodeType::Start.to_string(), "start");
        assert_eq!(NodeType::ParallelGateway.to_string(), "parallel_gateway");
    }

    #[test]
    fn test_node_type_serde_round() {
        let v = serde_json::to_string(&NodeType::UserTask).unwrap();
        assert_eq!(v, "\"user_task\"");
        let t: NodeType = serde_json::from_str("\"terminate\"").unwrap();
        assert_eq!(t, NodeType::Terminate);
    }
}
