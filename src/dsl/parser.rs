//! Definition parser: converts raw YAML/JSON text into [`FlowSchema`].

use super::schema::FlowSchema;
use crate::error::FlowError;

/// Supported definition input formats.
#[derive(Debug, Clone, Copy)]
pub enum DslFormat {
    /// YAML format (`.yaml` / `.yml`).
    Yaml,
    /// JSON format (`.json`).
    Json,
}

/// Parse definition content into a [`FlowSchema`].
pub fn parse_definition(content: &str, format: DslFormat) -> Result<FlowSchema, FlowError> {
    match format {
        DslFormat::Yaml => serde_saphyr::from_str(content)
            .map_err(|e| FlowError::DefinitionParse(e.to_string())),
        DslFormat::Json => serde_json::from_str(content)
            .map_err(|e| FlowError::DefinitionParse(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeType;

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
code: process_leave
name: Leave Request
version: 1
nodes:
  - code: node_start
    name: Start
    type: start
    transitions:
      - target: node_approve
  - code: node_approve
    name: Approve
    type: user_task
    candidates: ["[input.bzr]"]
    transitions:
      - target: node_end
        expression: "input.action == \"pass\""
        explain: approved
  - code: node_end
    name: End
    type: end
"#;
        let schema = parse_definition(yaml, DslFormat::Yaml).unwrap();
        assert_eq!(schema.code, "process_leave");
        assert_eq!(schema.version, 1);
        assert!(schema.executable);
        assert_eq!(schema.nodes.len(), 3);
        assert_eq!(schema.nodes[1].node_type, NodeType::UserTask);
        assert_eq!(schema.nodes[1].candidates, vec!["[input.bzr]"]);
        assert_eq!(schema.nodes[1].transitions[0].target, "node_end");
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{
            "code": "p1",
            "version": 2,
            "nodes": [
                {"code": "s", "type": "start", "transitions": [{"target": "e"}]},
                {"code": "e", "type": "end"}
            ]
        }"#;
        let schema = parse_definition(json, DslFormat::Json).unwrap();
        assert_eq!(schema.code, "p1");
        assert_eq!(schema.nodes[0].transitions[0].expression, "");
    }

    #[test]
    fn test_parse_form() {
        let yaml = r#"
code: p2
version: 1
nodes:
  - code: s
    type: start
  - code: fill
    type: user_task
    form:
      id: leave_form
      fields:
        - id: day
          label: Days
          type: number
          validations:
            - name: required
        - id: kind
          type: select
          options:
            - id: annual
              name: Annual
            - id: sick
              name: Sick
"#;
        let schema = parse_definition(yaml, DslFormat::Yaml).unwrap();
        let form = schema.nodes[1].form.as_ref().unwrap();
        assert_eq!(form.id, "leave_form");
        assert_eq!(form.fields.len(), 2);
        assert_eq!(form.fields[1].options.len(), 2);
        assert_eq!(form.fields[0].validations[0].name, "required");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_definition("{{{invalid", DslFormat::Json).is_err());
        assert!(parse_definition("code: only", DslFormat::Yaml).is_err());
    }
}
