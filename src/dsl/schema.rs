//! Parsed definition shape consumed by the deployment manager.

use serde::{Deserialize, Serialize};

use crate::model::NodeType;

fn default_true() -> bool {
    true
}

/// A full parsed process definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSchema {
    /// Flow business key.
    pub code: String,
    #[serde(default)]
    pub name: String,
    /// Monotonically increasing deployment version.
    pub version: i64,
    /// Whether the deployed flow is enabled for execution.
    #[serde(default = "default_true")]
    pub executable: bool,
    pub nodes: Vec<NodeSchema>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSchema {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Candidate-assignment expressions, each yielding a string list.
    #[serde(default)]
    pub candidates: Vec<String>,
    #[serde(default)]
    pub properties: Vec<PropertySchema>,
    #[serde(default)]
    pub form: Option<FormSchema>,
    /// Outgoing edges.
    #[serde(default)]
    pub transitions: Vec<TransitionSchema>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionSchema {
    /// Business code of the target node.
    pub target: String,
    /// Boolean guard script; empty means the edge is always taken.
    #[serde(default)]
    pub expression: String,
    #[serde(default)]
    pub explain: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySchema {
    pub name: String,
    pub value: String,
}

/// Form referenced by a node. A reference with an empty field list borrows
/// the schema of an earlier node in the same deployment using the same id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSchema {
    pub id: String,
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSchema {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default)]
    pub default_value: String,
    #[serde(default)]
    pub options: Vec<FieldOptionSchema>,
    #[serde(default)]
    pub properties: Vec<PropertySchema>,
    #[serde(default)]
    pub validations: Vec<FieldValidationSchema>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldOptionSchema {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldValidationSchema {
    pub name: String,
    #[serde(default)]
    pub config: String,
}
