//! Workflow and credential documents: import, export and the human summary.

use serde_json::Value;
use thiserror::Error;

use crate::credentials::Credential;
use crate::{NodeKind, Workflow};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid workflow file structure: '{0}' must be an array")]
    MissingArray(&'static str),
    #[error("Credential document must be a JSON array")]
    NotAnArray,
}

/// Parse a `{ nodes, edges, groups? }` document. `nodes` and `edges` must
/// both be arrays; a missing `groups` means no groups.
pub fn parse_document(text: &str) -> Result<Workflow, DocumentError> {
    let value: Value = serde_json::from_str(text)?;
    for key in ["nodes", "edges"] {
        if !value.get(key).is_some_and(Value::is_array) {
            return Err(DocumentError::MissingArray(key));
        }
    }
    Ok(serde_json::from_value(value)?)
}

/// Pretty-printed document for the current graph.
pub fn to_document(workflow: &Workflow) -> Result<String, DocumentError> {
    Ok(serde_json::to_string_pretty(workflow)?)
}

/// Multi-line summary: node kinds with counts in first-appearance order,
/// then node, edge and group totals.
pub fn workflow_summary(workflow: &Workflow) -> String {
    let mut counts: Vec<(NodeKind, usize)> = Vec::new();
    for node in &workflow.nodes {
        match counts.iter_mut().find(|(kind, _)| *kind == node.kind) {
            Some((_, count)) => *count += 1,
            None => counts.push((node.kind, 1)),
        }
    }
    let kinds = if counts.is_empty() {
        "None".to_string()
    } else {
        counts
            .iter()
            .map(|(kind, count)| format!("{kind}: {count}"))
            .collect::<Vec<_>>()
            .join(", ")
    };

    [
        format!("Workflow Summary: {kinds}"),
        format!("Node Count: {}", workflow.nodes.len()),
        format!("Edge Count: {}", workflow.edges.len()),
        format!("Group Count: {}", workflow.groups.len()),
    ]
    .join("\n")
}

pub fn parse_credentials(text: &str) -> Result<Vec<Credential>, DocumentError> {
    let value: Value = serde_json::from_str(text)?;
    if !value.is_array() {
        return Err(DocumentError::NotAnArray);
    }
    Ok(serde_json::from_value(value)?)
}

pub fn credentials_to_json(credentials: &[Credential]) -> Result<String, DocumentError> {
    Ok(serde_json::to_string_pretty(credentials)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Edge, Position};

    #[test]
    fn export_then_import_preserves_graph() {
        let mut w = Workflow::new();
        let a = w.add_node(NodeKind::Trigger, None, Position::new(10.0, 20.0));
        let b = w.add_node(NodeKind::Logger, None, Position::new(300.0, 20.0));
        w.add_edge(Edge::new(&a, &b, None));

        let text = to_document(&w).unwrap();
        assert!(text.contains("\"type\": \"TRIGGER\""));
        assert_eq!(parse_document(&text).unwrap(), w);
    }

    #[test]
    fn groups_are_optional_on_import() {
        let w = parse_document(r#"{"nodes": [], "edges": []}"#).unwrap();
        assert!(w.is_empty());
        assert!(w.groups.is_empty());
    }

    #[test]
    fn rejects_missing_or_non_array_collections() {
        assert!(matches!(
            parse_document(r#"{"nodes": []}"#),
            Err(DocumentError::MissingArray("edges"))
        ));
        assert!(matches!(
            parse_document(r#"{"nodes": {}, "edges": []}"#),
            Err(DocumentError::MissingArray("nodes"))
        ));
        assert!(matches!(parse_document("not json"), Err(DocumentError::Json(_))));
    }

    #[test]
    fn rejects_unknown_node_types() {
        let text = r#"{"nodes": [{"id": "n1", "type": "TELEPORT", "label": "x",
            "position": {"x": 0, "y": 0}, "data": {}}], "edges": []}"#;
        assert!(matches!(parse_document(text), Err(DocumentError::Json(_))));
    }

    #[test]
    fn summary_counts_kinds_in_order() {
        let mut w = Workflow::new();
        w.add_node(NodeKind::Trigger, None, Position::default());
        w.add_node(NodeKind::Logger, None, Position::default());
        w.add_node(NodeKind::Logger, None, Position::default());

        assert_eq!(
            workflow_summary(&w),
            "Workflow Summary: TRIGGER: 1, LOGGER: 2\nNode Count: 3\nEdge Count: 0\nGroup Count: 0"
        );
        assert!(workflow_summary(&Workflow::new()).starts_with("Workflow Summary: None\n"));
    }

    #[test]
    fn credential_documents_must_be_arrays() {
        assert!(matches!(parse_credentials("{}"), Err(DocumentError::NotAnArray)));
        let parsed = parse_credentials(
            r#"[{"id": "cred_1", "name": "CRM", "type": "API_KEY", "data": {"apiKey": "k"}}]"#,
        )
        .unwrap();
        assert_eq!(parsed[0].data["apiKey"], "k");
        assert_eq!(
            parse_credentials(&credentials_to_json(&parsed).unwrap()).unwrap(),
            parsed
        );
    }
}
