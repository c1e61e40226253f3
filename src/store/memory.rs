//! In-memory [`FlowStore`] backed by `parking_lot`, used by tests and by
//! embedders that do not need durable persistence. Every write takes the
//! single write lock, which makes the multi-record operations atomic.

use async_trait::async_trait;
use parking_lot::RwLock;

use super::FlowStore;
use crate::error::FlowError;
use crate::model::{
    FieldOption, FieldProperty, FieldValidation, Flow, FlowFlag, FlowInstance,
    FlowInstanceStatus, Form, FormBatch, FormField, Node, NodeAssignment, NodeBatch,
    NodeCandidate, NodeInstance, NodeInstanceStatus, NodeProperty, NodeTiming, TodoItem,
    Transition,
};

#[derive(Default)]
struct Inner {
    flows: Vec<Flow>,
    nodes: Vec<Node>,
    transitions: Vec<Transition>,
    assignments: Vec<NodeAssignment>,
    properties: Vec<NodeProperty>,
    forms: Vec<Form>,
    form_fields: Vec<FormField>,
    field_options: Vec<FieldOption>,
    field_properties: Vec<FieldProperty>,
    field_validations: Vec<FieldValidation>,
    flow_instances: Vec<FlowInstance>,
    node_instances: Vec<NodeInstance>,
    candidates: Vec<NodeCandidate>,
    timings: Vec<NodeTiming>,
}

#[derive(Default)]
pub struct MemoryFlowStore {
    inner: RwLock<Inner>,
}

impl MemoryFlowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timer records created so far; exposed for tests and for external
    /// timer-firing collaborators.
    pub fn timings(&self) -> Vec<NodeTiming> {
        self.inner.read().timings.clone()
    }
}

#[async_trait]
impl FlowStore for MemoryFlowStore {
    async fn get_flow_by_code(&self, code: &str) -> Result<Option<Flow>, FlowError> {
        let inner = self.inner.read();
        Ok(inner
            .flows
            .iter()
            .filter(|f| f.code == code)
            .max_by_key(|f| f.version)
            .cloned())
    }

    async fn create_flow_graph(
        &self,
        flow: Flow,
        nodes: NodeBatch,
        forms: FormBatch,
    ) -> Result<(), FlowError> {
        let mut inner = self.inner.write();
        inner.flows.push(flow);
        inner.nodes.extend(nodes.nodes);
        inner.transitions.extend(nodes.transitions);
        inner.assignments.extend(nodes.assignments);
        inner.properties.extend(nodes.properties);
        inner.forms.extend(forms.forms);
        inner.form_fields.extend(forms.fields);
        inner.field_options.extend(forms.options);
        inner.field_properties.extend(forms.properties);
        inner.field_validations.extend(forms.validations);
        Ok(())
    }

    async fn get_node(&self, record_id: &str) -> Result<Option<Node>, FlowError> {
        let inner = self.inner.read();
        Ok(inner.nodes.iter().find(|n| n.record_id == record_id).cloned())
    }

    async fn get_node_by_code(
        &self,
        flow_id: &str,
        code: &str,
    ) -> Result<Option<Node>, FlowError> {
        let inner = self.inner.read();
        Ok(inner
            .nodes
            .iter()
            .find(|n| n.flow_id == flow_id && n.code == code)
            .cloned())
    }

    async fn query_transitions(
        &self,
        source_node_id: &str,
    ) -> Result<Vec<Transition>, FlowError> {
        let inner = self.inner.read();
        Ok(inner
            .transitions
            .iter()
            .filter(|t| t.source_node_id == source_node_id)
            .cloned()
            .collect())
    }

    async fn query_assignments(&self, node_id: &str) -> Result<Vec<NodeAssignment>, FlowError> {
        let inner = self.inner.read();
        Ok(inner
            .assignments
            .iter()
            .filter(|a| a.node_id == node_id)
            .cloned()
            .collect())
    }

    async fn query_node_properties(
        &self,
        node_id: &str,
    ) -> Result<Vec<NodeProperty>, FlowError> {
        let inner = self.inner.read();
        Ok(inner
            .properties
            .iter()
            .filter(|p| p.node_id == node_id)
            .cloned()
            .collect())
    }

    async fn get_flow_instance(
        &self,
        record_id: &str,
    ) -> Result<Option<FlowInstance>, FlowError> {
        let inner = self.inner.read();
        Ok(inner
            .flow_instances
            .iter()
            .find(|i| i.record_id == record_id)
            .cloned())
    }

    async fn create_flow_instance(
        &self,
        instance: FlowInstance,
        node_instances: Vec<NodeInstance>,
    ) -> Result<(), FlowError> {
        let mut inner = self.inner.write();
        inner.flow_instances.push(instance);
        inner.node_instances.extend(node_instances);
        Ok(())
    }

    async fn update_flow_instance_status(
        &self,
        record_id: &str,
        status: FlowInstanceStatus,
    ) -> Result<(), FlowError> {
        let mut inner = self.inner.write();
        let instance = inner
            .flow_instances
            .iter_mut()
            .find(|i| i.record_id == record_id)
            .ok_or_else(|| FlowError::FlowInstanceNotFound(record_id.to_string()))?;
        instance.status = status;
        Ok(())
    }

    async fn get_node_instance(
        &self,
        record_id: &str,
    ) -> Result<Option<NodeInstance>, FlowError> {
        let inner = self.inner.read();
        Ok(inner
            .node_instances
            .iter()
            .find(|i| i.record_id == record_id)
            .cloned())
    }

    async fn create_node_instance(
        &self,
        instance: NodeInstance,
        candidates: Vec<NodeCandidate>,
    ) -> Result<(), FlowError> {
        let mut inner = self.inner.write();
        inner.node_instances.push(instance);
        inner.candidates.extend(candidates);
        Ok(())
    }

    async fn mark_node_instance_done(
        &self,
        record_id: &str,
        processor: &str,
        out_data: &str,
        process_time: i64,
    ) -> Result<(), FlowError> {
        let mut inner = self.inner.write();
        let instance = inner
            .node_instances
            .iter_mut()
            .find(|i| i.record_id == record_id)
            .ok_or_else(|| FlowError::NodeInstanceNotFound(record_id.to_string()))?;
        if instance.status == NodeInstanceStatus::Done {
            return Err(FlowError::InvalidState(format!(
                "node instance {record_id} is already done"
            )));
        }
        instance.processor = processor.to_string();
        instance.out_data = out_data.to_string();
        instance.process_time = process_time;
        instance.status = NodeInstanceStatus::Done;
        Ok(())
    }

    async fn count_pending_node_instances(
        &self,
        flow_instance_id: &str,
    ) -> Result<i64, FlowError> {
        let inner = self.inner.read();
        Ok(inner
            .node_instances
            .iter()
            .filter(|i| {
                i.flow_instance_id == flow_instance_id
                    && i.status == NodeInstanceStatus::Pending
            })
            .count() as i64)
    }

    async fn query_candidates(
        &self,
        node_instance_id: &str,
    ) -> Result<Vec<NodeCandidate>, FlowError> {
        let inner = self.inner.read();
        Ok(inner
            .candidates
            .iter()
            .filter(|c| c.node_instance_id == node_instance_id)
            .cloned()
            .collect())
    }

    async fn candidate_exists(
        &self,
        node_instance_id: &str,
        user_id: &str,
    ) -> Result<bool, FlowError> {
        let inner = self.inner.read();
        Ok(inner
            .candidates
            .iter()
            .any(|c| c.node_instance_id == node_instance_id && c.candidate_id == user_id))
    }

    async fn create_timing(&self, timing: NodeTiming) -> Result<(), FlowError> {
        let mut inner = self.inner.write();
        inner.timings.push(timing);
        Ok(())
    }

    async fn query_todo(
        &self,
        flow_code: Option<&str>,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<TodoItem>, FlowError> {
        let inner = self.inner.read();
        let mut items = Vec::new();
        for ni in inner.node_instances.iter().rev() {
            if items.len() >= limit {
                break;
            }
            if ni.status != NodeInstanceStatus::Pending {
                continue;
            }
            let eligible = inner
                .candidates
                .iter()
                .any(|c| c.node_instance_id == ni.record_id && c.candidate_id == user_id);
            if !eligible {
                continue;
            }
            let Some(fi) = inner
                .flow_instances
                .iter()
                .find(|f| f.record_id == ni.flow_instance_id)
            else {
                continue;
            };
            if fi.status != FlowInstanceStatus::InProgress {
                continue;
            }
            let node = inner.nodes.iter().find(|n| n.record_id == ni.node_id);
            let flow = node.and_then(|n| {
                inner
                    .flows
                    .iter()
                    .find(|f| f.record_id == n.flow_id && f.flag == FlowFlag::Primary)
            });
            if let Some(code) = flow_code {
                match flow {
                    Some(f) if f.code == code => {}
                    _ => continue,
                }
            }
            let form_data = node
                .and_then(|n| n.form_id.as_deref())
                .and_then(|form_id| inner.forms.iter().find(|f| f.record_id == form_id))
                .map(|f| f.data.clone());
            items.push(TodoItem {
                node_instance_id: ni.record_id.clone(),
                flow_instance_id: ni.flow_instance_id.clone(),
                flow_name: flow.map(|f| f.name.clone()).unwrap_or_default(),
                node_id: ni.node_id.clone(),
                node_code: node.map(|n| n.code.clone()).unwrap_or_default(),
                node_name: node.map(|n| n.name.clone()).unwrap_or_default(),
                input_data: ni.input_data.clone(),
                launcher: fi.launcher.clone(),
                launch_time: fi.launch_time,
                form_data,
            });
        }
        Ok(items)
    }

    async fn query_done_flow_ids(
        &self,
        flow_code: &str,
        user_id: &str,
    ) -> Result<Vec<String>, FlowError> {
        let inner = self.inner.read();
        let flow_ids: Vec<&str> = inner
            .flows
            .iter()
            .filter(|f| f.code == flow_code && f.flag == FlowFlag::Primary)
            .map(|f| f.record_id.as_str())
            .collect();
        let ids = inner
            .flow_instances
            .iter()
            .filter(|fi| flow_ids.contains(&fi.flow_id.as_str()))
            .filter(|fi| {
                inner.node_instances.iter().any(|ni| {
                    ni.flow_instance_id == fi.record_id
                        && ni.status == NodeInstanceStatus::Done
                        && ni.processor == user_id
                })
            })
            .map(|fi| fi.record_id.clone())
            .collect();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FlowStatus, NodeType};

    fn flow(record_id: &str, code: &str, version: i64) -> Flow {
        Flow {
            record_id: record_id.into(),
            code: code.into(),
            name: "Test".into(),
            version,
            status: FlowStatus::Enabled,
            flag: FlowFlag::Primary,
            source: String::new(),
            created: 1,
        }
    }

    fn node_instance(record_id: &str, flow_instance_id: &str, node_id: &str) -> NodeInstance {
        NodeInstance {
            record_id: record_id.into(),
            flow_instance_id: flow_instance_id.into(),
            node_id: node_id.into(),
            processor: String::new(),
            process_time: 0,
            input_data: "{}".into(),
            out_data: String::new(),
            status: NodeInstanceStatus::Pending,
            created: 1,
        }
    }

    #[tokio::test]
    async fn test_get_flow_by_code_picks_highest_version() {
        let store = MemoryFlowStore::new();
        for (id, version) in [("f1", 1), ("f2", 3), ("f3", 2)] {
            store
                .create_flow_graph(
                    flow(id, "leave", version),
                    NodeBatch::default(),
                    FormBatch::default(),
                )
                .await
                .unwrap();
        }
        let active = store.get_flow_by_code("leave").await.unwrap().unwrap();
        assert_eq!(active.record_id, "f2");
        assert!(store.get_flow_by_code("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_done_is_conditional() {
        let store = MemoryFlowStore::new();
        store
            .create_node_instance(node_instance("ni1", "fi1", "n1"), vec![])
            .await
            .unwrap();

        store
            .mark_node_instance_done("ni1", "F002", "{}", 42)
            .await
            .unwrap();
        let ni = store.get_node_instance("ni1").await.unwrap().unwrap();
        assert_eq!(ni.status, NodeInstanceStatus::Done);
        assert_eq!(ni.processor, "F002");
        assert_eq!(ni.process_time, 42);

        let err = store
            .mark_node_instance_done("ni1", "F003", "{}", 43)
            .await
            .unwrap_err();
        assert!(err.is_invalid_state());

        let err = store
            .mark_node_instance_done("missing", "F003", "{}", 43)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_count_pending() {
        let store = MemoryFlowStore::new();
        store
            .create_node_instance(node_instance("ni1", "fi1", "n1"), vec![])
            .await
            .unwrap();
        store
            .create_node_instance(node_instance("ni2", "fi1", "n2"), vec![])
            .await
            .unwrap();
        assert_eq!(store.count_pending_node_instances("fi1").await.unwrap(), 2);
        store
            .mark_node_instance_done("ni1", "u", "", 1)
            .await
            .unwrap();
        assert_eq!(store.count_pending_node_instances("fi1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_candidates() {
        let store = MemoryFlowStore::new();
        let candidate = NodeCandidate {
            record_id: "c1".into(),
            node_instance_id: "ni1".into(),
            candidate_id: "F002".into(),
            created: 1,
        };
        store
            .create_node_instance(node_instance("ni1", "fi1", "n1"), vec![candidate])
            .await
            .unwrap();
        assert!(store.candidate_exists("ni1", "F002").await.unwrap());
        assert!(!store.candidate_exists("ni1", "F003").await.unwrap());
        assert_eq!(store.query_candidates("ni1").await.unwrap().len(), 1);
    }
}
