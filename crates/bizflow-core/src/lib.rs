pub mod clipboard;
mod config;
pub mod credentials;
pub mod document;
pub mod editor;
pub mod expr;
pub mod history;
pub mod layout;
mod mutate;
mod node_kind;
pub mod oracle;
pub mod persistence;
pub mod runtime;
mod validation;
mod workflow;

pub use config::EditorConfig;
pub use credentials::{Credential, CredentialKind, CredentialStore};
pub use document::DocumentError;
pub use editor::Editor;
pub use mutate::NodeUpdate;
pub use node_kind::*;
pub use runtime::ExecutionContext;
pub use validation::*;
pub use workflow::*;
