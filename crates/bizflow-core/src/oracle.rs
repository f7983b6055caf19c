//! Validation of node descriptions returned by the AI generator.
//!
//! The generator is untrusted. Its answers are plain JSON and only become
//! [`GeneratedNode`]s after the node type has been checked against
//! [`NodeKind`].

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::NodeKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("AI response did not match the required schema: {0}")]
    Schema(String),
    #[error("Unknown node type: {0}")]
    UnknownType(String),
    #[error("AI response is not a valid array.")]
    NotAnArray,
    #[error("AI response contained invalid node types.")]
    NoValidNodes,
    #[error("AI response contained no workflow steps.")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedNode {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub label: String,
}

impl GeneratedNode {
    /// Accept `{ "type": <known kind>, "label": <string> }`.
    pub fn from_value(value: &Value) -> Result<Self, OracleError> {
        let Some(object) = value.as_object() else {
            return Err(OracleError::Schema("expected an object".to_string()));
        };
        let Some(kind) = object.get("type").and_then(Value::as_str) else {
            return Err(OracleError::Schema("missing 'type'".to_string()));
        };
        let Some(label) = object.get("label").and_then(Value::as_str) else {
            return Err(OracleError::Schema("missing 'label'".to_string()));
        };
        let kind = kind
            .parse::<NodeKind>()
            .map_err(|e| OracleError::UnknownType(e.0))?;
        Ok(Self {
            kind,
            label: label.to_string(),
        })
    }
}

/// Validate a single-node answer.
pub fn validate_node(value: &Value) -> Result<GeneratedNode, OracleError> {
    GeneratedNode::from_value(value)
}

/// Validate a workflow answer. Invalid entries are dropped; the answer is
/// rejected only when nothing valid remains.
pub fn validate_workflow(value: &Value) -> Result<Vec<GeneratedNode>, OracleError> {
    let Some(items) = value.as_array() else {
        return Err(OracleError::NotAnArray);
    };
    if items.is_empty() {
        return Err(OracleError::Empty);
    }

    let mut nodes = Vec::with_capacity(items.len());
    for item in items {
        match GeneratedNode::from_value(item) {
            Ok(node) => nodes.push(node),
            Err(e) => warn!("Dropping generated step: {}", e),
        }
    }
    if nodes.is_empty() {
        return Err(OracleError::NoValidNodes);
    }
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_known_types() {
        let node = validate_node(&json!({ "type": "SEND_EMAIL", "label": "Welcome" })).unwrap();
        assert_eq!(node.kind, NodeKind::SendEmail);
        assert_eq!(node.label, "Welcome");
    }

    #[test]
    fn rejects_unknown_type_and_bad_shape() {
        assert_eq!(
            validate_node(&json!({ "type": "TELEPORT", "label": "x" })),
            Err(OracleError::UnknownType("TELEPORT".into()))
        );
        assert!(matches!(
            validate_node(&json!({ "label": "x" })),
            Err(OracleError::Schema(_))
        ));
        assert!(matches!(validate_node(&json!([])), Err(OracleError::Schema(_))));
    }

    #[test]
    fn workflow_filters_invalid_entries() {
        let nodes = validate_workflow(&json!([
            { "type": "TRIGGER", "label": "Start" },
            { "type": "TELEPORT", "label": "Nope" },
            { "type": "LOGGER", "label": "Log it" },
        ]))
        .unwrap();
        assert_eq!(
            nodes.iter().map(|n| n.kind).collect::<Vec<_>>(),
            vec![NodeKind::Trigger, NodeKind::Logger]
        );
    }

    #[test]
    fn workflow_rejected_when_nothing_valid() {
        assert_eq!(
            validate_workflow(&json!([{ "type": "TELEPORT", "label": "x" }])),
            Err(OracleError::NoValidNodes)
        );
        assert_eq!(validate_workflow(&json!([])), Err(OracleError::Empty));
        assert_eq!(
            validate_workflow(&json!({ "type": "TRIGGER" })),
            Err(OracleError::NotAnArray)
        );
    }
}
