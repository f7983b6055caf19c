mod handlers;
mod run_loop;
mod trace;


use bizflow_core::expr::ExprError;
use bizflow_core::runtime::ExecutionContext;
use bizflow_core::{Credential, NodeId, Workflow};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::{Receiver, Sender};

use crate::EngineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Idle,
    Running,
    Success,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Error,
    Success,
    /// Output of LOGGER nodes and `log()` calls in CODE nodes.
    Log,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLog {
    /// RFC 3339 wall-clock time.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: LogKind,
}

/// Events sent from the executor to whoever renders the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutorEvent {
    Log(ExecutionLog),
    StatusChanged(ExecutionStatus),
    /// The node currently executing; `None` once the walk is over.
    ActiveNode(Option<NodeId>),
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("No TRIGGER node found to start the workflow.")]
    MissingTrigger,
    #[error("Node with ID {0} not found.")]
    MissingNode(NodeId),
    #[error("Credential {0} referenced by node is not available.")]
    MissingCredential(String),
    #[error("Invalid wait duration: {0}")]
    InvalidDuration(String),
    #[error("Error in CODE node: {0}")]
    Code(ExprError),
    #[error("Error in condition: {0}")]
    Condition(ExprError),
    #[error("Step limit of {0} exceeded; the workflow may contain a cycle.")]
    StepLimit(usize),
}

/// Bounded channel sized from the engine config.
pub fn event_channel(config: &EngineConfig) -> (Sender<ExecutorEvent>, Receiver<ExecutorEvent>) {
    tokio::sync::mpsc::channel(config.event_capacity.max(1))
}

/// Walks one workflow snapshot from its trigger node, simulating each step.
///
/// The executor owns its copy of the graph and credentials, so editing can
/// continue while a run is in flight.
pub struct WorkflowExecutor {
    workflow: Workflow,
    credentials: Vec<Credential>,
    config: EngineConfig,
    event_tx: Sender<ExecutorEvent>,
    context: ExecutionContext,
    status: ExecutionStatus,
}

impl WorkflowExecutor {
    pub fn new(
        workflow: Workflow,
        credentials: Vec<Credential>,
        config: EngineConfig,
        event_tx: Sender<ExecutorEvent>,
    ) -> Self {
        Self {
            workflow,
            credentials,
            config,
            event_tx,
            context: ExecutionContext::new(),
            status: ExecutionStatus::Idle,
        }
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    /// Outputs recorded so far, keyed by node id.
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }
}
