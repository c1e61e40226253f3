//! Form metadata records: input schema bound to a node.

use serde::{Deserialize, Serialize};

/// Input schema attached to nodes; deduplicated by business key within a
/// deployment so several nodes may share one form record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form {
    pub record_id: String,
    pub flow_id: String,
    /// Form business key.
    pub code: String,
    /// Serialized field list, for consumers that render the whole schema.
    pub data: String,
    pub created: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormField {
    pub record_id: String,
    pub form_id: String,
    pub code: String,
    pub label: String,
    pub field_type: String,
    pub default_value: String,
    pub created: i64,
}

/// One selectable option of a field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldOption {
    pub record_id: String,
    pub field_id: String,
    pub value_id: String,
    pub value_name: String,
    pub created: i64,
}

/// Free-form key/value configuration on a field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldProperty {
    pub record_id: String,
    pub field_id: String,
    pub code: String,
    pub value: String,
    pub created: i64,
}

/// Validation constraint on a field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldValidation {
    pub record_id: String,
    pub field_id: String,
    pub constraint_name: String,
    pub constraint_config: String,
    pub created: i64,
}
