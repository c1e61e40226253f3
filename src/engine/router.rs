//! Node router: the state machine advancing a flow instance node by node.
//!
//! A traversal starts from one node instance and recurses depth-first
//! through the graph: complete the current instance, evaluate outgoing
//! transition guards, resolve candidate assignments for each surviving
//! target, create the next node instances, and descend into them until a
//! user task becomes pending or an end/terminate node halts the flow.
//!
//! Each recursion level works on an immutable [`Frame`] passed by value;
//! the only parent state the routing rules consult is the parent frame's
//! node type, so frames carry that instead of a back-reference.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::FlowError;
use crate::expression::{build_exp_context, Execer};
use crate::model::{
    FlowInstance, Node, NodeCandidate, NodeInstance, NodeTiming, NodeType,
};
use crate::service::FlowService;

/// Node property declaring a timer, in minutes.
const PROP_TIMING: &str = "timing";
/// Node property carrying the timer's input payload.
const PROP_TIMING_INPUT: &str = "timing_input";

pub type NextNodeHandler = Arc<dyn Fn(&Node, &NodeInstance, &[NodeCandidate]) + Send + Sync>;
pub type FlowEndHandler = Arc<dyn Fn(&FlowInstance) + Send + Sync>;

/// Shared routing options for one traversal.
pub struct RouterOptions {
    /// Whether a user task directly after the start event is advanced
    /// automatically instead of left pending.
    pub auto_start: bool,
    /// Invoked for every node left pending for human action.
    pub on_next_node: Option<NextNodeHandler>,
    /// Invoked once if the flow instance ends during the traversal.
    pub on_flow_end: Option<FlowEndHandler>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            auto_start: true,
            on_next_node: None,
            on_flow_end: None,
        }
    }
}

/// One traversal frame.
struct Frame {
    node: Node,
    node_instance: NodeInstance,
    /// Node type of the frame that spawned this one; `None` at the root.
    parent_type: Option<NodeType>,
}

/// A node newly reached during the traversal, kept for post-traversal
/// timer creation.
struct ReachedNode {
    node: Node,
    node_instance: NodeInstance,
    candidates: Vec<String>,
}

pub struct NodeRouter<'a> {
    service: &'a FlowService,
    execer: &'a dyn Execer,
    opts: RouterOptions,
    cancel: CancellationToken,
    input_data: String,
    flow_instance: FlowInstance,
    start: Frame,
}

impl<'a> NodeRouter<'a> {
    /// Resolve a node instance id into a root traversal frame.
    pub async fn init(
        service: &'a FlowService,
        execer: &'a dyn Execer,
        node_instance_id: &str,
        input_data: &str,
        cancel: CancellationToken,
        opts: RouterOptions,
    ) -> Result<NodeRouter<'a>, FlowError> {
        let node_instance = service.get_node_instance(node_instance_id).await?;
        let flow_instance = service
            .get_flow_instance(&node_instance.flow_instance_id)
            .await?;
        let node = service.get_node(&node_instance.node_id).await?;
        Ok(Self {
            service,
            execer,
            opts,
            cancel,
            input_data: input_data.to_string(),
            flow_instance,
            start: Frame {
                node,
                node_instance,
                parent_type: None,
            },
        })
    }

    pub fn flow_instance(&self) -> &FlowInstance {
        &self.flow_instance
    }

    /// Drive the traversal from the root frame, then create timers for
    /// every node reached (best effort).
    pub async fn next(&self, processor: &str) -> Result<(), FlowError> {
        let mut reached = Vec::new();
        let root = Frame {
            node: self.start.node.clone(),
            node_instance: self.start.node_instance.clone(),
            parent_type: None,
        };
        self.step(root, processor, &mut reached).await?;
        self.create_timings(&reached).await;
        Ok(())
    }

    /// Advance one frame. Returns `true` when the flow ended here, which
    /// stops the caller from processing remaining sibling frames.
    fn step<'s>(
        &'s self,
        frame: Frame,
        processor: &'s str,
        reached: &'s mut Vec<ReachedNode>,
    ) -> BoxFuture<'s, Result<bool, FlowError>> {
        Box::pin(async move {
            let node_type = frame.node.node_type;
            debug!(
                node = %frame.node.code,
                node_type = %node_type,
                instance = %frame.node_instance.record_id,
                "routing"
            );

            // Join suppression: a user task reached through routing stays
            // pending unless it directly follows an auto-started start
            // event. Report it and leave the frame untouched.
            if node_type == NodeType::UserTask {
                if let Some(parent_type) = frame.parent_type {
                    if !(parent_type == NodeType::Start && self.opts.auto_start) {
                        if let Some(on_next) = &self.opts.on_next_node {
                            let candidates = self
                                .service
                                .query_node_candidates(&frame.node_instance.record_id)
                                .await?;
                            on_next(&frame.node, &frame.node_instance, &candidates);
                        }
                        return Ok(false);
                    }
                }
            }

            self.service
                .done_node_instance(&frame.node_instance.record_id, processor, &self.input_data)
                .await?;

            // Parallel-join guard: completing a root user task whose
            // outgoing edges feed a parallel gateway only advances once no
            // sibling branch is still pending.
            if node_type == NodeType::UserTask && frame.parent_type.is_none() {
                let gateway_ahead = self
                    .next_node_type_is(&frame, NodeType::ParallelGateway)
                    .await?;
                if gateway_ahead
                    && self
                        .service
                        .check_flow_instance_todo(&self.flow_instance.record_id)
                        .await?
                {
                    return Ok(false);
                }
            }

            if matches!(node_type, NodeType::End | NodeType::Terminate) {
                let is_end = node_type == NodeType::Terminate
                    || !self
                        .service
                        .check_flow_instance_todo(&self.flow_instance.record_id)
                        .await?;
                if is_end {
                    self.service
                        .done_flow_instance(&self.flow_instance.record_id)
                        .await?;
                    if let Some(on_end) = &self.opts.on_flow_end {
                        on_end(&self.flow_instance);
                    }
                    return Ok(true);
                }
                // A non-terminating branch join: other branches are still
                // pending, end silently.
                return Ok(false);
            }

            let child_ids = self.add_next_node_instances(&frame, reached).await?;
            for child_id in child_ids {
                let child = self.load_frame(&child_id, Some(node_type)).await?;
                if self.step(child, processor, reached).await? {
                    break;
                }
            }
            Ok(false)
        })
    }

    /// Evaluate the outgoing transitions of the frame's node and create a
    /// node instance plus candidate set for every satisfied target.
    async fn add_next_node_instances(
        &self,
        frame: &Frame,
        reached: &mut Vec<ReachedNode>,
    ) -> Result<Vec<String>, FlowError> {
        let transitions = self.service.query_transitions(&frame.node.record_id).await?;
        if transitions.is_empty() {
            return Ok(Vec::new());
        }

        let ctx = build_exp_context(&self.input_data, &self.flow_instance, &frame.node_instance);

        // Evaluate every guard before creating anything: a guard fault
        // aborts the fan-out with no successor instance written for any
        // sibling transition.
        let mut satisfied = Vec::new();
        for transition in transitions {
            if !transition.expression.is_empty() {
                let allow = self
                    .execer
                    .exec_bool(&transition.expression, &ctx, &self.cancel)
                    .await?;
                if !allow {
                    continue;
                }
            }
            satisfied.push(transition);
        }

        let mut instance_ids = Vec::new();
        for transition in satisfied {
            let assignments = self
                .service
                .query_assignments(&transition.target_node_id)
                .await?;
            let mut candidates = Vec::new();
            for assignment in assignments {
                let resolved = self
                    .execer
                    .exec_strings(&assignment.expression, &ctx, &self.cancel)
                    .await?;
                candidates.extend(resolved);
            }

            let node_instance = self
                .service
                .create_node_instance(
                    &self.flow_instance.record_id,
                    &transition.target_node_id,
                    &self.input_data,
                    &candidates,
                )
                .await?;
            let node = self.service.get_node(&transition.target_node_id).await?;
            instance_ids.push(node_instance.record_id.clone());
            reached.push(ReachedNode {
                node,
                node_instance,
                candidates,
            });
        }
        Ok(instance_ids)
    }

    /// Whether any satisfied outgoing transition of the frame's node leads
    /// to a node of the given type.
    async fn next_node_type_is(
        &self,
        frame: &Frame,
        node_type: NodeType,
    ) -> Result<bool, FlowError> {
        let transitions = self.service.query_transitions(&frame.node.record_id).await?;
        if transitions.is_empty() {
            return Ok(false);
        }

        let ctx = build_exp_context(&self.input_data, &self.flow_instance, &frame.node_instance);
        for transition in transitions {
            if !transition.expression.is_empty() {
                let allow = self
                    .execer
                    .exec_bool(&transition.expression, &ctx, &self.cancel)
                    .await?;
                if !allow {
                    continue;
                }
            }
            match self.service.get_node(&transition.target_node_id).await {
                Ok(node) if node.node_type == node_type => return Ok(true),
                Ok(_) => {}
                Err(FlowError::NodeNotFound(_)) => return Ok(false),
                Err(e) => return Err(e),
            }
        }
        Ok(false)
    }

    async fn load_frame(
        &self,
        node_instance_id: &str,
        parent_type: Option<NodeType>,
    ) -> Result<Frame, FlowError> {
        let node_instance = self.service.get_node_instance(node_instance_id).await?;
        let node = self.service.get_node(&node_instance.node_id).await?;
        Ok(Frame {
            node,
            node_instance,
            parent_type,
        })
    }

    /// Create timer records for reached nodes declaring a `timing`
    /// property. Failures are logged, never fatal: the traversal already
    /// succeeded.
    async fn create_timings(&self, reached: &[ReachedNode]) {
        for item in reached {
            let props = match self.service.get_node_properties(&item.node.record_id).await {
                Ok(props) => props,
                Err(e) => {
                    warn!(node = %item.node.code, error = %e, "failed to read node properties for timer");
                    continue;
                }
            };
            let minutes = props
                .get(PROP_TIMING)
                .and_then(|raw| raw.trim().parse::<i64>().ok())
                .unwrap_or(0);
            if minutes <= 0 {
                continue;
            }

            let now = self.service.runtime().now();
            let timing = NodeTiming {
                node_instance_id: item.node_instance.record_id.clone(),
                processor: item.candidates.first().cloned().unwrap_or_default(),
                input: props.get(PROP_TIMING_INPUT).cloned().unwrap_or_default(),
                expired_at: now + minutes * 60,
                created: now,
            };
            if let Err(e) = self.service.create_node_timing(timing).await {
                warn!(node = %item.node.code, error = %e, "failed to create node timer");
            }
        }
    }
}
