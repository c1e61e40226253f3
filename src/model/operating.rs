//! Batch shapes for the atomic deployment write.

use super::flow::{Node, NodeAssignment, NodeProperty, Transition};
use super::form::{FieldOption, FieldProperty, FieldValidation, Form, FormField};

/// Every node-side record produced by one deployment, persisted as a unit.
#[derive(Debug, Clone, Default)]
pub struct NodeBatch {
    pub nodes: Vec<Node>,
    pub transitions: Vec<Transition>,
    pub assignments: Vec<NodeAssignment>,
    pub properties: Vec<NodeProperty>,
}

/// Every form-side record produced by one deployment.
#[derive(Debug, Clone, Default)]
pub struct FormBatch {
    pub forms: Vec<Form>,
    pub fields: Vec<FormField>,
    pub options: Vec<FieldOption>,
    pub properties: Vec<FieldProperty>,
    pub validations: Vec<FieldValidation>,
}

impl FormBatch {
    /// Record id of the form with the given business key, if already built
    /// in this deployment.
    pub fn form_id_by_code(&self, code: &str) -> Option<String> {
        self.forms
            .iter()
            .find(|f| f.code == code)
            .map(|f| f.record_id.clone())
    }
}
