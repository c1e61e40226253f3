//! Repository contract over durable flow state.
//!
//! The engine core talks to persistence only through [`FlowStore`]; the
//! multi-record writes (`create_flow_graph`, `create_flow_instance`,
//! `create_node_instance`) are contractually atomic — a failure leaves no
//! partial graph or instance state from that single call.

mod memory;

use async_trait::async_trait;

use crate::error::FlowError;
use crate::model::{
    Flow, FlowInstance, FlowInstanceStatus, FormBatch, Node, NodeAssignment, NodeBatch,
    NodeCandidate, NodeInstance, NodeProperty, NodeTiming, TodoItem, Transition,
};

pub use memory::MemoryFlowStore;

#[async_trait]
pub trait FlowStore: Send + Sync {
    // --- Flow definition ---

    async fn get_flow_by_code(&self, code: &str) -> Result<Option<Flow>, FlowError>;

    /// Persist a deployed graph as one atomic unit.
    async fn create_flow_graph(
        &self,
        flow: Flow,
        nodes: NodeBatch,
        forms: FormBatch,
    ) -> Result<(), FlowError>;

    async fn get_node(&self, record_id: &str) -> Result<Option<Node>, FlowError>;

    async fn get_node_by_code(
        &self,
        flow_id: &str,
        code: &str,
    ) -> Result<Option<Node>, FlowError>;

    /// Outgoing transitions of a node, in deployment order.
    async fn query_transitions(&self, source_node_id: &str)
        -> Result<Vec<Transition>, FlowError>;

    async fn query_assignments(&self, node_id: &str) -> Result<Vec<NodeAssignment>, FlowError>;

    async fn query_node_properties(&self, node_id: &str)
        -> Result<Vec<NodeProperty>, FlowError>;

    // --- Flow instances ---

    async fn get_flow_instance(&self, record_id: &str)
        -> Result<Option<FlowInstance>, FlowError>;

    async fn create_flow_instance(
        &self,
        instance: FlowInstance,
        node_instances: Vec<NodeInstance>,
    ) -> Result<(), FlowError>;

    async fn update_flow_instance_status(
        &self,
        record_id: &str,
        status: FlowInstanceStatus,
    ) -> Result<(), FlowError>;

    // --- Node instances ---

    async fn get_node_instance(&self, record_id: &str)
        -> Result<Option<NodeInstance>, FlowError>;

    async fn create_node_instance(
        &self,
        instance: NodeInstance,
        candidates: Vec<NodeCandidate>,
    ) -> Result<(), FlowError>;

    /// Conditional completion: succeeds only while the instance is still
    /// pending, so racing completions serialize on instance identity.
    async fn mark_node_instance_done(
        &self,
        record_id: &str,
        processor: &str,
        out_data: &str,
        process_time: i64,
    ) -> Result<(), FlowError>;

    async fn count_pending_node_instances(
        &self,
        flow_instance_id: &str,
    ) -> Result<i64, FlowError>;

    // --- Candidates ---

    async fn query_candidates(
        &self,
        node_instance_id: &str,
    ) -> Result<Vec<NodeCandidate>, FlowError>;

    async fn candidate_exists(
        &self,
        node_instance_id: &str,
        user_id: &str,
    ) -> Result<bool, FlowError>;

    // --- Timers ---

    async fn create_timing(&self, timing: NodeTiming) -> Result<(), FlowError>;

    // --- Queries ---

    /// Pending node instances the user is a candidate for, most recent
    /// first, optionally restricted to one flow code.
    async fn query_todo(
        &self,
        flow_code: Option<&str>,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<TodoItem>, FlowError>;

    /// Flow instances of the given code with at least one node instance
    /// completed by the user.
    async fn query_done_flow_ids(
        &self,
        flow_code: &str,
        user_id: &str,
    ) -> Result<Vec<String>, FlowError>;
}
