//! Mock handlers, one per node kind. Nothing here has real side effects:
//! every handler fabricates a plausible output from the resolved node data.

use std::time::Duration;

use bizflow_core::expr::{self, ProgramOutput};
use bizflow_core::runtime::{ExecutionContext, display_value};
use bizflow_core::{Credential, Node, NodeData, NodeKind, SourceHandle};
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};

use super::{ExecutionError, LogKind};

/// What a single step produced.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StepOutcome {
    pub output: Value,
    /// Output handle chosen by branching nodes.
    pub handle: Option<SourceHandle>,
    pub logs: Vec<(LogKind, String)>,
    /// Time the walk must be suspended before moving on.
    pub wait: Option<Duration>,
}

impl StepOutcome {
    fn new(output: Value) -> Self {
        Self {
            output,
            handle: None,
            logs: Vec::new(),
            wait: None,
        }
    }

    fn log(mut self, kind: LogKind, message: impl Into<String>) -> Self {
        self.logs.push((kind, message.into()));
        self
    }
}

pub(crate) fn execute_node(
    node: &Node,
    resolved: &NodeData,
    context: &ExecutionContext,
    credentials: &[Credential],
) -> Result<StepOutcome, ExecutionError> {
    let field = |key: &str| resolved.get(key).map(display_value).unwrap_or_default();

    let outcome = match node.kind {
        NodeKind::Trigger => StepOutcome::new(json!({
            "message": "Workflow triggered",
            "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            "user": {
                "name": "John Doe",
                "email": "john.doe@example.com",
                "isSubscribed": true,
            },
        }))
        .log(LogKind::Info, "Trigger activated with mock data."),

        NodeKind::Wait => {
            let (amount, unit, duration) = wait_duration(resolved)?;
            StepOutcome {
                wait: Some(duration),
                ..StepOutcome::new(json!({ "waited": format!("{amount} {unit}") }))
            }
            .log(LogKind::Info, format!("Waiting for {amount} {unit}..."))
        }

        NodeKind::SendEmail => {
            let to = field("to");
            StepOutcome::new(json!({ "status": "sent", "recipient": to })).log(
                LogKind::Info,
                format!(
                    "Simulating sending email to: {} with subject: {}",
                    to,
                    field("subject")
                ),
            )
        }

        NodeKind::Logger => {
            let message = field("message");
            StepOutcome::new(json!({ "loggedMessage": message })).log(LogKind::Log, message)
        }

        NodeKind::Code => {
            let source = node
                .data
                .get("code")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let ProgramOutput { value, logs } =
                expr::run_program(source, context).map_err(ExecutionError::Code)?;
            let mut outcome = StepOutcome::new(value.clone());
            for line in logs {
                outcome = outcome.log(LogKind::Log, line);
            }
            outcome.log(
                LogKind::Info,
                format!("Code executed successfully. Output: {value}"),
            )
        }

        NodeKind::IfCondition => {
            // Placeholders are evaluated as typed values, not as spliced text.
            let raw = node
                .data
                .get("condition")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let result =
                expr::evaluate_condition(raw, context).map_err(ExecutionError::Condition)?;
            StepOutcome {
                handle: Some(if result {
                    SourceHandle::True
                } else {
                    SourceHandle::False
                }),
                ..StepOutcome::new(json!({ "result": result }))
            }
            .log(
                LogKind::Info,
                format!("Condition \"{}\" evaluated to: {}", field("condition"), result),
            )
        }

        NodeKind::LoopStart => StepOutcome {
            handle: Some(SourceHandle::AfterLoop),
            ..StepOutcome::new(json!({ "status": "skipped" }))
        }
        .log(LogKind::Info, "Looping is not yet supported in execution."),

        NodeKind::LoopEnd => StepOutcome::new(json!({ "status": "no_op" })),

        NodeKind::QueryDatabase | NodeKind::ConnectApi => {
            let mut outcome = StepOutcome::new(json!({ "status": "simulated_success" }));
            let credential_id = field("credentialId");
            if !credential_id.trim().is_empty() {
                let credential = credentials
                    .iter()
                    .find(|c| c.id == credential_id)
                    .ok_or_else(|| ExecutionError::MissingCredential(credential_id.clone()))?;
                outcome = outcome.log(
                    LogKind::Info,
                    format!("Using credential: {}", credential.name),
                );
            }
            outcome.log(
                LogKind::Info,
                format!("Simulating action for {}.", node.kind),
            )
        }

        NodeKind::GenerateDocument
        | NodeKind::FileTaxes
        | NodeKind::UpdateCrm
        | NodeKind::SocialPost
        | NodeKind::BrowsingAgent
        | NodeKind::RegisterBusiness
        | NodeKind::ExpandBusiness
        | NodeKind::Dashboard
        | NodeKind::CreateWebsite
        | NodeKind::ManageInvoices
        | NodeKind::MarketResearch
        | NodeKind::ComplianceCheck
        | NodeKind::HireEmployee => StepOutcome::new(json!({ "status": "simulated_success" }))
            .log(
                LogKind::Info,
                format!("Simulating action for {}.", node.kind),
            ),
    };

    Ok(outcome)
}

/// Parse `duration` and `unit` into a sleep. Missing duration means one,
/// missing or unknown unit means seconds.
fn wait_duration(resolved: &NodeData) -> Result<(String, String, Duration), ExecutionError> {
    let raw = match resolved.get("duration") {
        None | Some(Value::Null) => Value::from(1),
        Some(Value::String(s)) if s.trim().is_empty() => Value::from(1),
        Some(other) => other.clone(),
    };
    let amount = match &raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite() && *n >= 0.0)
    .ok_or_else(|| ExecutionError::InvalidDuration(display_value(&raw)))?;

    let unit = resolved
        .get("unit")
        .and_then(Value::as_str)
        .filter(|u| !u.trim().is_empty())
        .unwrap_or("seconds")
        .to_string();
    let seconds = match unit.as_str() {
        "minutes" => amount * 60.0,
        "hours" => amount * 60.0 * 60.0,
        "days" => amount * 60.0 * 60.0 * 24.0,
        _ => amount,
    };

    let duration = Duration::try_from_secs_f64(seconds)
        .map_err(|_| ExecutionError::InvalidDuration(display_value(&raw)))?;

    Ok((display_value(&Value::from(amount)), unit, duration))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizflow_core::{CredentialKind, Position, Workflow};
    use std::collections::HashMap;

    fn node(kind: NodeKind) -> Node {
        let mut w = Workflow::new();
        let id = w.add_node(kind, None, Position::default());
        w.find_node(&id).cloned().unwrap()
    }

    fn run(node: &Node) -> Result<StepOutcome, ExecutionError> {
        execute_node(node, &node.data, &ExecutionContext::new(), &[])
    }

    #[test]
    fn wait_converts_units() {
        let mut wait = node(NodeKind::Wait);
        let outcome = run(&wait).unwrap();
        assert_eq!(outcome.wait, Some(Duration::from_secs(86_400)));
        assert_eq!(outcome.output, json!({ "waited": "1 days" }));

        wait.data.insert("duration".into(), json!("1.5"));
        wait.data.insert("unit".into(), json!("minutes"));
        let outcome = run(&wait).unwrap();
        assert_eq!(outcome.wait, Some(Duration::from_secs(90)));
        assert_eq!(outcome.logs[0].1, "Waiting for 1.5 minutes...");
    }

    #[test]
    fn wait_rejects_garbage_duration() {
        let mut wait = node(NodeKind::Wait);
        wait.data.insert("duration".into(), json!("soon"));
        assert!(matches!(run(&wait), Err(ExecutionError::InvalidDuration(_))));
    }

    #[test]
    fn wait_rejects_durations_too_long_to_represent() {
        let mut wait = node(NodeKind::Wait);
        wait.data.insert("duration".into(), json!("1e300"));
        wait.data.insert("unit".into(), json!("seconds"));
        assert!(matches!(
            run(&wait),
            Err(ExecutionError::InvalidDuration(d)) if d == "1e300"
        ));

        wait.data.insert("duration".into(), json!(1e15));
        wait.data.insert("unit".into(), json!("days"));
        assert!(matches!(run(&wait), Err(ExecutionError::InvalidDuration(_))));
    }

    #[test]
    fn loop_start_always_exits() {
        let outcome = run(&node(NodeKind::LoopStart)).unwrap();
        assert_eq!(outcome.handle, Some(SourceHandle::AfterLoop));
        assert_eq!(outcome.output, json!({ "status": "skipped" }));
    }

    #[test]
    fn generic_kinds_simulate_success() {
        let outcome = run(&node(NodeKind::MarketResearch)).unwrap();
        assert_eq!(outcome.output, json!({ "status": "simulated_success" }));
        assert_eq!(outcome.logs[0].1, "Simulating action for MARKET_RESEARCH.");
        assert!(outcome.handle.is_none());
    }

    #[test]
    fn api_nodes_check_credentials() {
        let mut api = node(NodeKind::ConnectApi);
        assert!(run(&api).is_ok());

        api.data.insert("credentialId".into(), json!("cred_gone"));
        assert!(matches!(
            run(&api),
            Err(ExecutionError::MissingCredential(id)) if id == "cred_gone"
        ));

        let credentials = [Credential {
            id: "cred_gone".into(),
            name: "CRM key".into(),
            kind: CredentialKind::ApiKey,
            data: HashMap::from([("apiKey".to_string(), "secret".to_string())]),
        }];
        let outcome = execute_node(&api, &api.data, &ExecutionContext::new(), &credentials).unwrap();
        assert!(outcome.logs.iter().any(|(_, m)| m == "Using credential: CRM key"));
        assert!(!outcome.logs.iter().any(|(_, m)| m.contains("secret")));
    }

    #[test]
    fn code_node_runs_sandboxed_program() {
        let outcome = run(&node(NodeKind::Code)).unwrap();
        assert_eq!(outcome.output, json!({ "success": true }));
        assert_eq!(outcome.logs[0], (LogKind::Log, "Hello, World!".to_string()));

        let mut code = node(NodeKind::Code);
        code.data.insert("code".into(), json!("return missing_thing"));
        let err = run(&code).unwrap_err();
        assert_eq!(err.to_string(), "Error in CODE node: missing_thing is not defined");
    }
}
