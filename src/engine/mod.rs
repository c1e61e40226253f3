//! Engine facade: deploy definitions, start and advance flow instances,
//! and query pending work.
//!
//! The facade composes the deployment manager, the node router, and the
//! flow service behind a small async API. Expression evaluation is
//! pluggable through [`Execer`]; persistence through [`FlowStore`].

mod deploy;
mod router;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use router::{FlowEndHandler, NextNodeHandler, NodeRouter, RouterOptions};

use crate::dsl::{parse_definition, validate_schema, DslFormat};
use crate::error::FlowError;
use crate::expression::Execer;
use crate::model::{
    FlowInstance, HandleResult, NextNode, Node, NodeCandidate, NodeInstance,
    NodeInstanceStatus, TodoItem,
};
use crate::service::FlowService;
use crate::store::FlowStore;

pub struct Engine {
    service: FlowService,
    execer: Arc<dyn Execer>,
}

impl Engine {
    pub fn new(store: Arc<dyn FlowStore>, execer: Arc<dyn Execer>) -> Self {
        Self::with_runtime(store, execer, crate::runtime::RuntimeContext::default())
    }

    /// Build an engine with injected time and id generation.
    pub fn with_runtime(
        store: Arc<dyn FlowStore>,
        execer: Arc<dyn Execer>,
        runtime: crate::runtime::RuntimeContext,
    ) -> Self {
        Self {
            service: FlowService::new(store, runtime),
            execer,
        }
    }

    /// Deploy a definition document and return the flow record id.
    ///
    /// Deploying a version at or below the currently stored one is a
    /// no-op returning the existing record id, so repeated deploys of
    /// the same document are idempotent.
    pub async fn deploy(&self, content: &str, format: DslFormat) -> Result<String, FlowError> {
        let schema = parse_definition(content, format)?;
        validate_schema(&schema)?;

        if let Some(existing) = self.service.get_flow_by_code(&schema.code).await? {
            if schema.version <= existing.version {
                info!(
                    flow = %schema.code,
                    version = schema.version,
                    existing = existing.version,
                    "deploy skipped, version not newer"
                );
                return Ok(existing.record_id);
            }
        }

        let (flow, nodes, forms) = deploy::build_graph(&schema, content, self.service.runtime())?;
        let record_id = flow.record_id.clone();
        self.service.create_flow(flow, nodes, forms).await?;
        info!(flow = %schema.code, version = schema.version, "flow deployed");
        Ok(record_id)
    }

    /// Start a flow instance at the named start node and route until the
    /// traversal rests.
    pub async fn start_flow(
        &self,
        cancel: CancellationToken,
        flow_code: &str,
        node_code: &str,
        user_id: &str,
        input_data: &str,
    ) -> Result<HandleResult, FlowError> {
        let node_instance = self
            .service
            .launch_flow_instance(flow_code, node_code, user_id, input_data)
            .await?;
        self.route(cancel, &node_instance.record_id, user_id, input_data)
            .await
    }

    /// Complete a pending node instance as the given user and route the
    /// flow onward.
    pub async fn handle_flow(
        &self,
        cancel: CancellationToken,
        node_instance_id: &str,
        user_id: &str,
        input_data: &str,
    ) -> Result<HandleResult, FlowError> {
        let node_instance = self.service.get_node_instance(node_instance_id).await?;
        if node_instance.status != NodeInstanceStatus::Pending {
            return Err(FlowError::InvalidState(format!(
                "node instance {node_instance_id} is not pending"
            )));
        }
        let allowed = self
            .service
            .check_node_candidate(node_instance_id, user_id)
            .await?;
        if !allowed {
            return Err(FlowError::InvalidState(format!(
                "user {user_id} is not a candidate of node instance {node_instance_id}"
            )));
        }
        self.route(cancel, node_instance_id, user_id, input_data)
            .await
    }

    /// Run one router traversal and assemble its outcome.
    async fn route(
        &self,
        cancel: CancellationToken,
        node_instance_id: &str,
        user_id: &str,
        input_data: &str,
    ) -> Result<HandleResult, FlowError> {
        let next_nodes: Arc<Mutex<Vec<NextNode>>> = Arc::new(Mutex::new(Vec::new()));
        let ended: Arc<Mutex<bool>> = Arc::new(Mutex::new(false));

        let collect_next = Arc::clone(&next_nodes);
        let collect_end = Arc::clone(&ended);
        let opts = RouterOptions {
            auto_start: true,
            on_next_node: Some(Arc::new(
                move |node: &Node, node_instance: &NodeInstance, candidates: &[NodeCandidate]| {
                    collect_next.lock().push(NextNode {
                        node: node.clone(),
                        node_instance: node_instance.clone(),
                        candidate_ids: candidates
                            .iter()
                            .map(|c| c.candidate_id.clone())
                            .collect(),
                    });
                },
            )),
            on_flow_end: Some(Arc::new(move |_: &FlowInstance| {
                *collect_end.lock() = true;
            })),
        };

        let router = NodeRouter::init(
            &self.service,
            self.execer.as_ref(),
            node_instance_id,
            input_data,
            cancel,
            opts,
        )
        .await?;
        let flow_instance_id = router.flow_instance().record_id.clone();
        router.next(user_id).await?;

        // Re-read the instance so the result reflects any status change
        // made during the traversal.
        let flow_instance = self.service.get_flow_instance(&flow_instance_id).await?;
        let is_end = *ended.lock();
        let next_nodes = std::mem::take(&mut *next_nodes.lock());
        Ok(HandleResult {
            is_end,
            next_nodes,
            flow_instance,
        })
    }

    /// Pending work for a user, most recent first, optionally limited to
    /// one flow code.
    pub async fn query_todo(
        &self,
        flow_code: Option<&str>,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<TodoItem>, FlowError> {
        self.service.query_todo(flow_code, user_id, limit).await
    }

    /// Flow instances of a code with at least one node completed by the
    /// user.
    pub async fn query_done_flow_ids(
        &self,
        flow_code: &str,
        user_id: &str,
    ) -> Result<Vec<String>, FlowError> {
        self.service.query_done_flow_ids(flow_code, user_id).await
    }

    /// Candidate ids of a pending node instance.
    pub async fn query_candidates(
        &self,
        node_instance_id: &str,
    ) -> Result<Vec<String>, FlowError> {
        let candidates = self.service.query_node_candidates(node_instance_id).await?;
        Ok(candidates.into_iter().map(|c| c.candidate_id).collect())
    }

    /// Stop a running flow instance. The caller-supplied predicate sees
    /// the current instance and may veto the stop (for example to limit
    /// it to the launcher).
    pub async fn stop_flow_instance<F>(
        &self,
        flow_instance_id: &str,
        allow: F,
    ) -> Result<(), FlowError>
    where
        F: FnOnce(&FlowInstance) -> bool,
    {
        let instance = self.service.get_flow_instance(flow_instance_id).await?;
        if !allow(&instance) {
            return Err(FlowError::InvalidState(format!(
                "stop of flow instance {flow_instance_id} rejected"
            )));
        }
        self.service.stop_flow_instance(flow_instance_id).await?;
        info!(flow_instance = %flow_instance_id, "flow instance stopped");
        Ok(())
    }
}
