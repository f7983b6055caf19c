use crate::{ChatBackend, Message};
use anyhow::{Context, Result, anyhow};
use tracing::{debug, info};

/// Send `messages` and hand the reply to `accept`. A rejected reply gets
/// exactly one correction round; the second rejection is returned as is.
pub(crate) async fn ask_with_retry<T>(
    backend: &impl ChatBackend,
    task: &str,
    mut messages: Vec<Message>,
    mut accept: impl FnMut(&str) -> Result<T>,
) -> Result<T> {
    let first = reply_text(backend, task, &messages).await?;
    let rejection = match accept(&first) {
        Ok(value) => return Ok(value),
        Err(e) => format!("{e:#}"),
    };

    info!(task, %rejection, "Asking the model to correct its reply");
    messages.push(Message::assistant(first));
    messages.push(Message::user(correction(&rejection)));

    let second = reply_text(backend, task, &messages).await?;
    accept(&second)
}

async fn reply_text(
    backend: &impl ChatBackend,
    task: &str,
    messages: &[Message],
) -> Result<String> {
    let response = backend
        .chat(messages.to_vec())
        .await
        .with_context(|| format!("{task} request to {} failed", backend.model_name()))?;
    let text = response
        .choices
        .first()
        .and_then(|choice| choice.message.text_content())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("{task} got an empty reply"))?;
    debug!(task, reply = %text, "Model reply");
    Ok(text)
}

fn correction(rejection: &str) -> String {
    format!(
        "That reply was rejected: {rejection}\n\n\
         Answer again using only the node types listed above. \
         Reply with the JSON alone, without commentary."
    )
}
