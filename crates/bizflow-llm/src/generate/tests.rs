use super::*;
use crate::{ChatResponse, Choice};
use bizflow_core::NodeKind;
use bizflow_core::oracle::OracleError;
use std::sync::Mutex;

/// Mock backend that replays scripted replies in order.
struct MockBackend {
    responses: Mutex<Vec<String>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl MockBackend {
    fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn single(response: &str) -> Self {
        Self::new(vec![response])
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl ChatBackend for MockBackend {
    fn model_name(&self) -> &str {
        "mock"
    }

    async fn chat(&self, messages: Vec<Message>) -> anyhow::Result<ChatResponse> {
        self.calls.lock().unwrap().push(messages);
        let mut responses = self.responses.lock().unwrap();
        let text = if responses.is_empty() {
            "[]".to_string()
        } else {
            responses.remove(0)
        };
        Ok(ChatResponse {
            id: "mock".to_string(),
            choices: vec![Choice {
                index: 0,
                message: Message::assistant(text),
                finish_reason: Some("stop".to_string()),
            }],
            usage: None,
        })
    }
}

#[test]
fn extract_json_strips_fences() {
    assert_eq!(extract_json("```json\n[1]\n```"), "[1]");
    assert_eq!(extract_json("Sure:\n```\n{\"a\": 1}\n```\nDone."), "{\"a\": 1}");
    assert_eq!(extract_json("  {\"a\": 1}  "), "{\"a\": 1}");
}

#[test]
fn prompts_list_every_node_type() {
    let text = prompt::workflow_prompt("onboard a client");
    for kind in NodeKind::ALL {
        assert!(text.contains(kind.as_str()), "missing {kind}");
    }
    assert!(text.contains("User Request: \"onboard a client\""));
}

#[tokio::test]
async fn node_generation_accepts_known_type() {
    let backend = MockBackend::single(r#"{"type": "HIRE_EMPLOYEE", "label": "Hire a designer"}"#);
    let node = generate_node(&backend, "we need a designer").await.unwrap();
    assert_eq!(node.kind, NodeKind::HireEmployee);
    assert_eq!(node.label, "Hire a designer");
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn unknown_type_is_repaired_once() {
    let backend = MockBackend::new(vec![
        r#"{"type": "TELEPORT", "label": "Beam up"}"#,
        r#"```json
{"type": "SEND_EMAIL", "label": "Email the team"}
```"#,
    ]);
    let node = generate_node(&backend, "tell the team").await.unwrap();
    assert_eq!(node.kind, NodeKind::SendEmail);
    assert_eq!(backend.call_count(), 2);

    let calls = backend.calls.lock().unwrap();
    let feedback = calls[1].last().unwrap().content.as_deref().unwrap();
    assert!(feedback.contains("Unknown node type: TELEPORT"));
}

#[tokio::test]
async fn persistent_unknown_type_surfaces_oracle_error() {
    let backend = MockBackend::new(vec![
        r#"{"type": "TELEPORT", "label": "a"}"#,
        r#"{"type": "TELEPORT", "label": "b"}"#,
    ]);
    let err = generate_node(&backend, "beam me up").await.unwrap_err();
    assert_eq!(
        err.downcast_ref::<OracleError>(),
        Some(&OracleError::UnknownType("TELEPORT".to_string()))
    );
}

#[tokio::test]
async fn workflow_generation_drops_unknown_entries() {
    let backend = MockBackend::single(
        r#"[
            {"type": "TRIGGER", "label": "New signup"},
            {"type": "TELEPORT", "label": "Nope"},
            {"type": "SEND_EMAIL", "label": "Welcome mail"}
        ]"#,
    );
    let steps = generate_workflow(&backend, "welcome new users").await.unwrap();
    let kinds: Vec<_> = steps.iter().map(|s| s.kind).collect();
    assert_eq!(kinds, vec![NodeKind::Trigger, NodeKind::SendEmail]);
}

#[tokio::test]
async fn workflow_with_only_unknown_types_is_rejected() {
    let backend = MockBackend::new(vec![
        r#"[{"type": "TELEPORT", "label": "x"}]"#,
        r#"[{"type": "WARP", "label": "y"}]"#,
    ]);
    let err = generate_workflow(&backend, "go fast").await.unwrap_err();
    assert_eq!(
        err.downcast_ref::<OracleError>(),
        Some(&OracleError::NoValidNodes)
    );
    assert_eq!(backend.call_count(), 2);
}

#[tokio::test]
async fn non_json_reply_fails_after_repair() {
    let backend = MockBackend::new(vec!["I cannot help with that.", "Still no."]);
    let err = generate_workflow(&backend, "anything").await.unwrap_err();
    assert!(format!("{:#}", err).contains("Reply is not valid JSON"));
}
