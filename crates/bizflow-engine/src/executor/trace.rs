use super::{ExecutionLog, ExecutionStatus, ExecutorEvent, LogKind, WorkflowExecutor};
use chrono::{SecondsFormat, Utc};
use tracing::{debug, error, info};

impl WorkflowExecutor {
    pub(crate) async fn emit(&self, event: ExecutorEvent) {
        if let Err(e) = self.event_tx.send(event).await {
            debug!("Executor event dropped, receiver closed: {:?}", e.0);
        }
    }

    /// Record a log entry in `tracing` and deliver it to the event channel.
    pub(crate) async fn log(&self, node_id: Option<&str>, message: impl Into<String>, kind: LogKind) {
        let message = message.into();
        match kind {
            LogKind::Error => error!(node_id, "{}", message),
            _ => info!(node_id, "{}", message),
        }
        let entry = ExecutionLog {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            node_id: node_id.map(str::to_string),
            message,
            kind,
        };
        self.emit(ExecutorEvent::Log(entry)).await;
    }

    pub(crate) async fn set_status(&mut self, status: ExecutionStatus) {
        self.status = status;
        self.emit(ExecutorEvent::StatusChanged(status)).await;
    }

    pub(crate) async fn set_active(&self, node_id: Option<&str>) {
        self.emit(ExecutorEvent::ActiveNode(node_id.map(str::to_string)))
            .await;
    }
}
