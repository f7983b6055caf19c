mod parse;
mod prompt;
mod retry;

#[cfg(test)]
mod tests;

use crate::{ChatBackend, Message};
use anyhow::{Context, Result};
use bizflow_core::oracle::{self, GeneratedNode};
use serde_json::Value;
use tracing::info;

use parse::extract_json;
use retry::ask_with_retry;

fn parse_reply(text: &str) -> Result<Value> {
    serde_json::from_str(extract_json(text)).context("Reply is not valid JSON")
}

/// Ask the model for the single node type that best fits `request`.
pub async fn generate_node(backend: &impl ChatBackend, request: &str) -> Result<GeneratedNode> {
    let messages = vec![
        Message::system(prompt::system_prompt()),
        Message::user(prompt::node_prompt(request)),
    ];
    let node = ask_with_retry(backend, "Node generator", messages, |text| {
        Ok(oracle::validate_node(&parse_reply(text)?)?)
    })
    .await?;
    info!(kind = %node.kind, label = %node.label, "Generated node");
    Ok(node)
}

/// Ask the model for a sequence of steps implementing `request`. Entries
/// with unknown types are dropped; a reply with no usable entry is an error.
pub async fn generate_workflow(
    backend: &impl ChatBackend,
    request: &str,
) -> Result<Vec<GeneratedNode>> {
    let messages = vec![
        Message::system(prompt::system_prompt()),
        Message::user(prompt::workflow_prompt(request)),
    ];
    let steps = ask_with_retry(backend, "Workflow generator", messages, |text| {
        Ok(oracle::validate_workflow(&parse_reply(text)?)?)
    })
    .await?;
    info!(steps = steps.len(), "Generated workflow");
    Ok(steps)
}
