mod config;
mod executor;

pub use config::EngineConfig;
pub use executor::{
    ExecutionError, ExecutionLog, ExecutionStatus, ExecutorEvent, LogKind, WorkflowExecutor,
    event_channel,
};
