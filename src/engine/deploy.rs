//! Deployment manager: turning a parsed definition into persistent records.
//!
//! Deployment is append-only: a new version of a flow code produces a
//! complete new record set and never touches the previous one, so running
//! instances keep executing against the graph they started on.

use crate::dsl::{FieldSchema, FlowSchema, FormSchema};
use crate::error::FlowError;
use crate::model::{
    FieldOption, FieldProperty, FieldValidation, Flow, FlowFlag, FlowStatus, Form, FormBatch,
    FormField, Node, NodeAssignment, NodeBatch, NodeProperty, Transition,
};
use crate::runtime::RuntimeContext;

/// Build every record of one deployment from a validated schema.
///
/// Transitions reference target nodes by business code; they are resolved
/// to the record ids generated here, so the returned batches are
/// self-contained and can be written as one unit.
pub(crate) fn build_graph(
    schema: &FlowSchema,
    source: &str,
    runtime: &RuntimeContext,
) -> Result<(Flow, NodeBatch, FormBatch), FlowError> {
    let now = runtime.now();
    let flow = Flow {
        record_id: runtime.next_id(),
        code: schema.code.clone(),
        name: schema.name.clone(),
        version: schema.version,
        status: if schema.executable {
            FlowStatus::Enabled
        } else {
            FlowStatus::Disabled
        },
        flag: FlowFlag::Primary,
        source: source.to_string(),
        created: now,
    };

    let mut node_batch = NodeBatch::default();
    let mut form_batch = FormBatch::default();

    // First pass: node records and the forms that define fields inline.
    // Forms are deduplicated by business key, so several nodes can share
    // one record.
    for (index, node_schema) in schema.nodes.iter().enumerate() {
        if let Some(form_schema) = &node_schema.form {
            if !form_schema.fields.is_empty()
                && form_batch.form_id_by_code(&form_schema.id).is_none()
            {
                build_form(form_schema, &flow.record_id, runtime, now, &mut form_batch)?;
            }
        }

        let node = Node {
            record_id: runtime.next_id(),
            flow_id: flow.record_id.clone(),
            code: node_schema.code.clone(),
            name: node_schema.name.clone(),
            node_type: node_schema.node_type,
            order_num: ((index + 1) * 10).to_string(),
            // Resolved for every node below, once all forms exist; a
            // reference without inline fields borrows an earlier node's
            // form by business key.
            form_id: None,
            created: now,
        };

        for expression in &node_schema.candidates {
            node_batch.assignments.push(NodeAssignment {
                record_id: runtime.next_id(),
                node_id: node.record_id.clone(),
                expression: expression.clone(),
                created: now,
            });
        }
        for property in &node_schema.properties {
            node_batch.properties.push(NodeProperty {
                record_id: runtime.next_id(),
                node_id: node.record_id.clone(),
                name: property.name.clone(),
                value: property.value.clone(),
                created: now,
            });
        }

        node_batch.nodes.push(node);
    }

    // Second pass: resolve form references and transition targets, now
    // that every node and form record id is known.
    for (node_schema, node) in schema.nodes.iter().zip(node_batch.nodes.iter_mut()) {
        if let Some(form_schema) = &node_schema.form {
            node.form_id = form_batch.form_id_by_code(&form_schema.id);
        }
    }
    let source_ids: Vec<String> = node_batch.nodes.iter().map(|n| n.record_id.clone()).collect();
    for (node_schema, source_id) in schema.nodes.iter().zip(source_ids) {
        for transition_schema in &node_schema.transitions {
            let target_id = node_batch
                .nodes
                .iter()
                .find(|n| n.code == transition_schema.target)
                .map(|n| n.record_id.clone())
                .ok_or_else(|| {
                    FlowError::DefinitionInvalid(format!(
                        "transition target '{}' does not exist",
                        transition_schema.target
                    ))
                })?;
            node_batch.transitions.push(Transition {
                record_id: runtime.next_id(),
                source_node_id: source_id.clone(),
                target_node_id: target_id,
                expression: transition_schema.expression.clone(),
                explain: transition_schema.explain.clone(),
                created: now,
            });
        }
    }

    Ok((flow, node_batch, form_batch))
}

/// Build one form record set: the form itself, its fields, and each
/// field's options, properties, and validations.
fn build_form(
    form_schema: &FormSchema,
    flow_id: &str,
    runtime: &RuntimeContext,
    now: i64,
    batch: &mut FormBatch,
) -> Result<(), FlowError> {
    let data = serde_json::to_string(&form_schema.fields)
        .map_err(|e| FlowError::DefinitionInvalid(format!("unserializable form fields: {e}")))?;
    let form = Form {
        record_id: runtime.next_id(),
        flow_id: flow_id.to_string(),
        code: form_schema.id.clone(),
        data,
        created: now,
    };

    for field_schema in &form_schema.fields {
        build_field(field_schema, &form.record_id, runtime, now, batch);
    }
    batch.forms.push(form);
    Ok(())
}

fn build_field(
    field_schema: &FieldSchema,
    form_id: &str,
    runtime: &RuntimeContext,
    now: i64,
    batch: &mut FormBatch,
) {
    let field = FormField {
        record_id: runtime.next_id(),
        form_id: form_id.to_string(),
        code: field_schema.id.clone(),
        label: field_schema.label.clone(),
        field_type: field_schema.field_type.clone(),
        default_value: field_schema.default_value.clone(),
        created: now,
    };

    for option in &field_schema.options {
        batch.options.push(FieldOption {
            record_id: runtime.next_id(),
            field_id: field.record_id.clone(),
            value_id: option.id.clone(),
            value_name: option.name.clone(),
            created: now,
        });
    }
    for property in &field_schema.properties {
        batch.properties.push(FieldProperty {
            record_id: runtime.next_id(),
            field_id: field.record_id.clone(),
            code: property.name.clone(),
            value: property.value.clone(),
            created: now,
        });
    }
    for validation in &field_schema.validations {
        batch.validations.push(FieldValidation {
            record_id: runtime.next_id(),
            field_id: field.record_id.clone(),
            constraint_name: validation.name.clone(),
            constraint_config: validation.config.clone(),
            created: now,
        });
    }
    batch.fields.push(field);
}
