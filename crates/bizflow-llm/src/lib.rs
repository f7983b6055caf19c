//! Boundary to the language model that turns free-text requests into node
//! suggestions. The model itself is external; this crate builds prompts,
//! pulls JSON out of the reply and checks it against the known node types.

mod generate;
mod types;

pub use generate::{generate_node, generate_workflow};
pub use types::*;

/// Anything that can answer a chat completion request.
pub trait ChatBackend: Send + Sync {
    fn model_name(&self) -> &str;

    fn chat(
        &self,
        messages: Vec<Message>,
    ) -> impl Future<Output = anyhow::Result<ChatResponse>> + Send;
}
