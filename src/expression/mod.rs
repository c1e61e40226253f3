//! Expression evaluation contract and data-context binding.
//!
//! Transition guards and candidate-assignment expressions are evaluated
//! through the [`Execer`] trait against a JSON data context built from the
//! raw input payload plus the current flow and node instances. The engine
//! only depends on the trait; [`BasicExecer`] is the bundled
//! implementation.

mod basic;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::error::FlowError;
use crate::model::{FlowInstance, NodeInstance};

pub use basic::BasicExecer;

/// Evaluates a scripted expression string against a JSON-like context.
///
/// Implementations must race evaluation against the cancellation token:
/// a fired token yields [`FlowError::ExpressionCancelled`], never a result.
#[async_trait]
pub trait Execer: Send + Sync {
    /// Evaluate to a boolean (transition guards).
    async fn exec_bool(
        &self,
        expression: &str,
        ctx: &Value,
        cancel: &CancellationToken,
    ) -> Result<bool, FlowError>;

    /// Evaluate to a string list (candidate assignment).
    async fn exec_strings(
        &self,
        expression: &str,
        ctx: &Value,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, FlowError>;
}

/// Build the routing data context: the parsed input payload under `input`,
/// plus the current flow and node instance snapshots.
///
/// A payload that is not a JSON object still binds (scripts just see the
/// value as-is); unparseable input binds as `null`.
pub fn build_exp_context(input_data: &str, flow: &FlowInstance, node: &NodeInstance) -> Value {
    let input: Value = serde_json::from_str(input_data).unwrap_or(Value::Null);
    json!({
        "input": input,
        "flow": flow,
        "node": node,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FlowInstanceStatus, NodeInstanceStatus};

    fn sample_flow() -> FlowInstance {
        FlowInstance {
            record_id: "fi-1".into(),
            flow_id: "f-1".into(),
            status: FlowInstanceStatus::InProgress,
            launcher: "F001".into(),
            launch_time: 100,
            created: 100,
        }
    }

    fn sample_node() -> NodeInstance {
        NodeInstance {
            record_id: "ni-1".into(),
            flow_instance_id: "fi-1".into(),
            node_id: "n-1".into(),
            processor: String::new(),
            process_time: 0,
            input_data: String::new(),
            out_data: String::new(),
            status: NodeInstanceStatus::Pending,
            created: 100,
        }
    }

    #[test]
    fn test_context_shape() {
        let ctx = build_exp_context(r#"{"day":1}"#, &sample_flow(), &sample_node());
        assert_eq!(ctx["input"]["day"], 1);
        assert_eq!(ctx["flow"]["launcher"], "F001");
        assert_eq!(ctx["node"]["record_id"], "ni-1");
    }

    #[test]
    fn test_context_bad_input() {
        let ctx = build_exp_context("not json", &sample_flow(), &sample_node());
        assert!(ctx["input"].is_null());
    }
}
