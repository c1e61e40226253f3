//! Flow service: record construction and state transitions over the store.
//!
//! This layer owns id/timestamp generation for new records and the
//! completion guard. The guard is deliberately coarse — it serializes all
//! concurrent node-instance completions — which is acceptable at expected
//! load; the store's conditional `mark_node_instance_done` additionally
//! rejects a second completion of the same instance.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::FlowError;
use crate::model::{
    Flow, FlowInstance, FlowInstanceStatus, FormBatch, Node, NodeAssignment, NodeBatch,
    NodeCandidate, NodeInstance, NodeInstanceStatus, NodeTiming, TodoItem, Transition,
};
use crate::runtime::RuntimeContext;
use crate::store::FlowStore;

pub struct FlowService {
    store: Arc<dyn FlowStore>,
    runtime: RuntimeContext,
    complete_guard: Mutex<()>,
}

impl FlowService {
    pub fn new(store: Arc<dyn FlowStore>, runtime: RuntimeContext) -> Self {
        Self {
            store,
            runtime,
            complete_guard: Mutex::new(()),
        }
    }

    pub fn runtime(&self) -> &RuntimeContext {
        &self.runtime
    }

    // --- Definitions ---

    pub async fn get_flow_by_code(&self, code: &str) -> Result<Option<Flow>, FlowError> {
        self.store.get_flow_by_code(code).await
    }

    pub async fn create_flow(
        &self,
        flow: Flow,
        nodes: NodeBatch,
        forms: FormBatch,
    ) -> Result<(), FlowError> {
        self.store.create_flow_graph(flow, nodes, forms).await
    }

    pub async fn get_node(&self, record_id: &str) -> Result<Node, FlowError> {
        self.store
            .get_node(record_id)
            .await?
            .ok_or_else(|| FlowError::NodeNotFound(record_id.to_string()))
    }

    pub async fn query_transitions(
        &self,
        source_node_id: &str,
    ) -> Result<Vec<Transition>, FlowError> {
        self.store.query_transitions(source_node_id).await
    }

    pub async fn query_assignments(
        &self,
        node_id: &str,
    ) -> Result<Vec<NodeAssignment>, FlowError> {
        self.store.query_assignments(node_id).await
    }

    /// Node properties as a name → value map.
    pub async fn get_node_properties(
        &self,
        node_id: &str,
    ) -> Result<HashMap<String, String>, FlowError> {
        let items = self.store.query_node_properties(node_id).await?;
        Ok(items.into_iter().map(|p| (p.name, p.value)).collect())
    }

    // --- Instances ---

    /// Create a flow instance plus its initial node instance at the given
    /// start node, as one atomic write.
    pub async fn launch_flow_instance(
        &self,
        flow_code: &str,
        node_code: &str,
        launcher: &str,
        input_data: &str,
    ) -> Result<NodeInstance, FlowError> {
        let flow = self
            .store
            .get_flow_by_code(flow_code)
            .await?
            .ok_or_else(|| FlowError::FlowNotFound(flow_code.to_string()))?;
        let node = self
            .store
            .get_node_by_code(&flow.record_id, node_code)
            .await?
            .ok_or_else(|| FlowError::NodeNotFound(node_code.to_string()))?;

        let now = self.runtime.now();
        let flow_instance = FlowInstance {
            record_id: self.runtime.next_id(),
            flow_id: flow.record_id,
            status: FlowInstanceStatus::InProgress,
            launcher: launcher.to_string(),
            launch_time: now,
            created: now,
        };
        let node_instance = NodeInstance {
            record_id: self.runtime.next_id(),
            flow_instance_id: flow_instance.record_id.clone(),
            node_id: node.record_id,
            processor: String::new(),
            process_time: 0,
            input_data: input_data.to_string(),
            out_data: String::new(),
            status: NodeInstanceStatus::Pending,
            created: now,
        };
        self.store
            .create_flow_instance(flow_instance, vec![node_instance.clone()])
            .await?;
        Ok(node_instance)
    }

    pub async fn get_flow_instance(&self, record_id: &str) -> Result<FlowInstance, FlowError> {
        self.store
            .get_flow_instance(record_id)
            .await?
            .ok_or_else(|| FlowError::FlowInstanceNotFound(record_id.to_string()))
    }

    pub async fn get_node_instance(&self, record_id: &str) -> Result<NodeInstance, FlowError> {
        self.store
            .get_node_instance(record_id)
            .await?
            .ok_or_else(|| FlowError::NodeInstanceNotFound(record_id.to_string()))
    }

    /// Create a node instance with its candidate set for a routed-to node.
    pub async fn create_node_instance(
        &self,
        flow_instance_id: &str,
        node_id: &str,
        input_data: &str,
        candidates: &[String],
    ) -> Result<NodeInstance, FlowError> {
        let now = self.runtime.now();
        let node_instance = NodeInstance {
            record_id: self.runtime.next_id(),
            flow_instance_id: flow_instance_id.to_string(),
            node_id: node_id.to_string(),
            processor: String::new(),
            process_time: 0,
            input_data: input_data.to_string(),
            out_data: String::new(),
            status: NodeInstanceStatus::Pending,
            created: now,
        };
        let node_candidates = candidates
            .iter()
            .map(|candidate_id| NodeCandidate {
                record_id: self.runtime.next_id(),
                node_instance_id: node_instance.record_id.clone(),
                candidate_id: candidate_id.clone(),
                created: now,
            })
            .collect();
        self.store
            .create_node_instance(node_instance.clone(), node_candidates)
            .await?;
        Ok(node_instance)
    }

    /// Complete a node instance. Serialized against concurrent competing
    /// completions; acting on a missing or already-done instance is
    /// rejected.
    pub async fn done_node_instance(
        &self,
        node_instance_id: &str,
        processor: &str,
        out_data: &str,
    ) -> Result<(), FlowError> {
        let _guard = self.complete_guard.lock().await;

        let instance = self.get_node_instance(node_instance_id).await?;
        if instance.status == NodeInstanceStatus::Done {
            return Err(FlowError::InvalidState(format!(
                "node instance {node_instance_id} is not pending"
            )));
        }
        self.store
            .mark_node_instance_done(node_instance_id, processor, out_data, self.runtime.now())
            .await
    }

    /// Whether the flow instance still has pending node instances.
    pub async fn check_flow_instance_todo(
        &self,
        flow_instance_id: &str,
    ) -> Result<bool, FlowError> {
        Ok(self
            .store
            .count_pending_node_instances(flow_instance_id)
            .await?
            > 0)
    }

    pub async fn done_flow_instance(&self, flow_instance_id: &str) -> Result<(), FlowError> {
        self.store
            .update_flow_instance_status(flow_instance_id, FlowInstanceStatus::Completed)
            .await
    }

    pub async fn stop_flow_instance(&self, flow_instance_id: &str) -> Result<(), FlowError> {
        self.store
            .update_flow_instance_status(flow_instance_id, FlowInstanceStatus::Stopped)
            .await
    }

    // --- Candidates ---

    pub async fn query_node_candidates(
        &self,
        node_instance_id: &str,
    ) -> Result<Vec<NodeCandidate>, FlowError> {
        self.store.query_candidates(node_instance_id).await
    }

    pub async fn check_node_candidate(
        &self,
        node_instance_id: &str,
        user_id: &str,
    ) -> Result<bool, FlowError> {
        self.store.candidate_exists(node_instance_id, user_id).await
    }

    // --- Timers ---

    pub async fn create_node_timing(&self, timing: NodeTiming) -> Result<(), FlowError> {
        self.store.create_timing(timing).await
    }

    // --- Queries ---

    pub async fn query_todo(
        &self,
        flow_code: Option<&str>,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<TodoItem>, FlowError> {
        self.store.query_todo(flow_code, user_id, limit).await
    }

    pub async fn query_done_flow_ids(
        &self,
        flow_code: &str,
        user_id: &str,
    ) -> Result<Vec<String>, FlowError> {
        self.store.query_done_flow_ids(flow_code, user_id).await
    }
}
