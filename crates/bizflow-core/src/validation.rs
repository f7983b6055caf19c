//! Advisory per-node warnings.
//!
//! Warnings never block editing or execution. They are derived from the
//! graph alone, so recomputing them is idempotent.

use serde_json::Value;

use crate::{Node, NodeKind, Workflow};

pub const NO_INPUT: &str = "Node has no input connection.";
pub const NO_OUTPUT: &str = "Node has no output connection.";
pub const NO_CREDENTIAL: &str = "Credential not selected.";

/// Warnings for a single node, in a stable order: connectivity first, then
/// field checks, then the credential check.
pub fn node_warnings(workflow: &Workflow, node: &Node) -> Vec<String> {
    let mut warnings = Vec::new();

    if node.kind != NodeKind::Trigger && !workflow.has_incoming(&node.id) {
        warnings.push(NO_INPUT.to_string());
    }
    if !node.kind.is_terminal() && !workflow.has_outgoing(&node.id) {
        warnings.push(NO_OUTPUT.to_string());
    }

    if let Some(message) = missing_field_message(node) {
        warnings.push(message.to_string());
    }

    if node.kind.requires_credential() && is_missing(node.data.get("credentialId")) {
        warnings.push(NO_CREDENTIAL.to_string());
    }

    warnings
}

fn missing_field_message(node: &Node) -> Option<&'static str> {
    let missing = |key: &str| is_missing(node.data.get(key));
    match node.kind {
        NodeKind::SendEmail if missing("to") => Some("'To' field in email is missing."),
        NodeKind::ConnectApi if missing("url") => Some("'URL' field in API connection is missing."),
        NodeKind::BrowsingAgent if missing("url") => {
            Some("'URL' field for browsing agent is missing.")
        }
        NodeKind::RegisterBusiness if missing("businessName") => {
            Some("'Business Name' field is missing.")
        }
        NodeKind::CreateWebsite if missing("siteName") => Some("'Site Name' field is missing."),
        NodeKind::ManageInvoices if missing("client") || is_missing_amount(node.data.get("amount")) => {
            Some("'Client' and 'Amount' fields are missing.")
        }
        NodeKind::MarketResearch if missing("topic") => Some("'Topic' field is missing."),
        NodeKind::ComplianceCheck if missing("checkType") => Some("'Check Type' field is missing."),
        NodeKind::HireEmployee if missing("role") => Some("'Role' field is missing."),
        _ => None,
    }
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// Text is judged like any other field, so "0" typed into the form counts
/// as an amount. Only a numeric zero or `false` is treated as blank.
fn is_missing_amount(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Number(n)) => n.as_f64().is_none_or(|n| n == 0.0),
        Some(Value::Bool(b)) => !b,
        other => is_missing(other),
    }
}

/// Warnings for every node, in node order.
pub fn compute_warnings(workflow: &Workflow) -> Vec<Vec<String>> {
    workflow
        .nodes
        .iter()
        .map(|node| node_warnings(workflow, node))
        .collect()
}

/// Returns a copy with refreshed warnings, or `None` when nothing changed.
pub fn refresh_warnings(workflow: &Workflow) -> Option<Workflow> {
    let fresh = compute_warnings(workflow);
    let unchanged = workflow
        .nodes
        .iter()
        .zip(&fresh)
        .all(|(node, warnings)| &node.warnings == warnings);
    if unchanged {
        return None;
    }

    let mut next = workflow.clone();
    for (node, warnings) in next.nodes.iter_mut().zip(fresh) {
        node.warnings = warnings;
    }
    Some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Edge, NodeData, NodeUpdate, Position};
    use serde_json::json;

    fn set(workflow: &mut Workflow, id: &str, key: &str, value: Value) {
        let mut data = NodeData::new();
        data.insert(key.to_string(), value);
        workflow.update_node(id, NodeUpdate::data(data));
    }

    #[test]
    fn trigger_needs_no_input_and_terminals_need_no_output() {
        let mut w = Workflow::new();
        let t = w.add_node(NodeKind::Trigger, None, Position::default());
        let l = w.add_node(NodeKind::Logger, None, Position::default());
        w.add_edge(Edge::new(&t, &l, None));

        assert!(compute_warnings(&w).iter().all(Vec::is_empty));
    }

    #[test]
    fn isolated_step_warns_both_ways() {
        let mut w = Workflow::new();
        let id = w.add_node(NodeKind::Wait, None, Position::default());
        let node = w.find_node(&id).unwrap();
        assert_eq!(node_warnings(&w, node), vec![NO_INPUT, NO_OUTPUT]);
    }

    #[test]
    fn required_fields() {
        let mut w = Workflow::new();
        let email = w.add_node(NodeKind::SendEmail, None, Position::default());
        set(&mut w, &email, "to", json!("   "));
        let site = w.add_node(NodeKind::CreateWebsite, None, Position::default());
        set(&mut w, &site, "siteName", Value::Null);
        let invoice = w.add_node(NodeKind::ManageInvoices, None, Position::default());
        set(&mut w, &invoice, "amount", json!(0));

        let warnings = compute_warnings(&w);
        assert!(warnings[0].contains(&"'To' field in email is missing.".to_string()));
        assert!(warnings[1].contains(&"'Site Name' field is missing.".to_string()));
        assert!(warnings[2].contains(&"'Client' and 'Amount' fields are missing.".to_string()));
    }

    #[test]
    fn invoice_amount_text_counts_as_present() {
        const MISSING: &str = "'Client' and 'Amount' fields are missing.";
        let mut w = Workflow::new();
        let invoice = w.add_node(NodeKind::ManageInvoices, None, Position::default());
        let has_warning = |w: &Workflow| {
            let node = w.find_node(&invoice).unwrap();
            node_warnings(w, node).contains(&MISSING.to_string())
        };

        set(&mut w, &invoice, "amount", json!("0"));
        assert!(!has_warning(&w));
        set(&mut w, &invoice, "amount", json!("0.00"));
        assert!(!has_warning(&w));

        set(&mut w, &invoice, "amount", json!(""));
        assert!(has_warning(&w));
        set(&mut w, &invoice, "amount", json!(false));
        assert!(has_warning(&w));
        set(&mut w, &invoice, "amount", json!(250));
        assert!(!has_warning(&w));
    }

    #[test]
    fn defaults_satisfy_field_checks_but_not_credentials() {
        let mut w = Workflow::new();
        let api = w.add_node(NodeKind::ConnectApi, None, Position::default());
        let node = w.find_node(&api).unwrap();
        let warnings = node_warnings(&w, node);
        assert_eq!(warnings.last().map(String::as_str), Some(NO_CREDENTIAL));
        assert!(!warnings.iter().any(|m| m.contains("URL")));

        set(&mut w, &api, "credentialId", json!("cred_1"));
        let node = w.find_node(&api).unwrap();
        assert!(!node_warnings(&w, node).contains(&NO_CREDENTIAL.to_string()));
    }

    #[test]
    fn refresh_is_idempotent() {
        let mut w = Workflow::new();
        w.add_node(NodeKind::Wait, None, Position::default());

        let refreshed = refresh_warnings(&w).expect("warnings changed");
        assert_eq!(refreshed.nodes[0].warnings.len(), 2);
        assert!(refresh_warnings(&refreshed).is_none());
    }
}
