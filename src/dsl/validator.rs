//! Structural validation of a parsed definition, run before deployment.

use std::collections::HashSet;

use super::schema::FlowSchema;
use crate::error::FlowError;
use crate::model::NodeType;

/// Check a parsed schema for structural defects: duplicate node codes,
/// transitions to unknown codes, and a missing start node.
pub fn validate_schema(schema: &FlowSchema) -> Result<(), FlowError> {
    if schema.nodes.is_empty() {
        return Err(FlowError::DefinitionInvalid(format!(
            "flow `{}` has no nodes",
            schema.code
        )));
    }

    let mut codes: HashSet<&str> = HashSet::new();
    for node in &schema.nodes {
        if !codes.insert(node.code.as_str()) {
            return Err(FlowError::DefinitionInvalid(format!(
                "duplicate node code `{}`",
                node.code
            )));
        }
    }

    if !schema
        .nodes
        .iter()
        .any(|n| n.node_type == NodeType::Start)
    {
        return Err(FlowError::DefinitionInvalid(format!(
            "flow `{}` has no start node",
            schema.code
        )));
    }

    for node in &schema.nodes {
        for transition in &node.transitions {
            if !codes.contains(transition.target.as_str()) {
                return Err(FlowError::DefinitionInvalid(format!(
                    "node `{}` has a transition to unknown code `{}`",
                    node.code, transition.target
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{parse_definition, DslFormat};

    fn parse(yaml: &str) -> FlowSchema {
        parse_definition(yaml, DslFormat::Yaml).unwrap()
    }

    #[test]
    fn test_valid_schema() {
        let schema = parse(
            r#"
code: ok
version: 1
nodes:
  - code: s
    type: start
    transitions:
      - target: e
  - code: e
    type: end
"#,
        );
        assert!(validate_schema(&schema).is_ok());
    }

    #[test]
    fn test_duplicate_node_code() {
        let schema = parse(
            r#"
code: dup
version: 1
nodes:
  - code: s
    type: start
  - code: s
    type: end
"#,
        );
        let err = validate_schema(&schema).unwrap_err();
        assert!(err.to_string().contains("duplicate node code"));
    }

    #[test]
    fn test_unknown_transition_target() {
        let schema = parse(
            r#"
code: dangling
version: 1
nodes:
  - code: s
    type: start
    transitions:
      - target: missing
"#,
        );
        let err = validate_schema(&schema).unwrap_err();
        assert!(err.to_string().contains("unknown code `missing`"));
    }

    #[test]
    fn test_missing_start() {
        let schema = parse(
            r#"
code: nostart
version: 1
nodes:
  - code: e
    type: end
"#,
        );
        let err = validate_schema(&schema).unwrap_err();
        assert!(err.to_string().contains("no start node"));
    }
}
