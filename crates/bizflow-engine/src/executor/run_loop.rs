use super::handlers::execute_node;
use super::{ExecutionError, ExecutionStatus, LogKind, WorkflowExecutor};
use bizflow_core::runtime::ExecutionContext;
use bizflow_core::{NodeId, NodeKind, SourceHandle};
use std::time::Duration;
use tracing::debug;

impl WorkflowExecutor {
    /// Follow a labeled output, falling back to the default output for
    /// nodes that do not branch.
    pub(crate) fn next_node(
        &self,
        from: &str,
        kind: NodeKind,
        handle: Option<SourceHandle>,
    ) -> Option<NodeId> {
        if let Some(edge) = self.workflow.follow_edge(from, handle) {
            return Some(edge.target.clone());
        }
        if handle.is_some() && matches!(kind, NodeKind::IfCondition | NodeKind::LoopStart) {
            return None;
        }
        self.workflow
            .follow_edge(from, None)
            .map(|edge| edge.target.clone())
    }

    /// Walk the workflow from its first trigger until a node has no
    /// successor or a step fails. Returns the final status.
    pub async fn run(&mut self) -> ExecutionStatus {
        self.context = ExecutionContext::new();
        self.set_status(ExecutionStatus::Running).await;
        self.log(None, "Workflow execution started.", LogKind::Info)
            .await;

        let mut activated = false;
        let result = self.walk(&mut activated).await;

        let status = match result {
            Ok(()) => {
                self.log(
                    None,
                    "Workflow execution finished successfully.",
                    LogKind::Success,
                )
                .await;
                ExecutionStatus::Success
            }
            Err(e) => {
                self.log(None, format!("Workflow execution failed: {}", e), LogKind::Error)
                    .await;
                ExecutionStatus::Failed
            }
        };

        if activated {
            self.set_active(None).await;
        }
        self.set_status(status).await;
        status
    }

    async fn walk(&mut self, activated: &mut bool) -> Result<(), ExecutionError> {
        let mut current = self
            .workflow
            .first_of_kind(NodeKind::Trigger)
            .map(|n| n.id.clone())
            .ok_or(ExecutionError::MissingTrigger)?;

        let mut steps = 0usize;
        loop {
            steps += 1;
            if steps > self.config.max_steps {
                return Err(ExecutionError::StepLimit(self.config.max_steps));
            }

            self.set_active(Some(&current)).await;
            *activated = true;

            let node = self
                .workflow
                .find_node(&current)
                .cloned()
                .ok_or_else(|| ExecutionError::MissingNode(current.clone()))?;

            self.log(
                Some(&node.id),
                format!("Executing node: {} ({})", node.label, node.kind),
                LogKind::Info,
            )
            .await;

            let resolved = self.context.resolve_data(&node.data);
            let outcome = execute_node(&node, &resolved, &self.context, &self.credentials)?;

            for (kind, message) in &outcome.logs {
                self.log(Some(&node.id), message.clone(), *kind).await;
            }
            if let Some(wait) = outcome.wait {
                debug!(node_id = %node.id, ?wait, "Suspending for wait node");
                tokio::time::sleep(wait).await;
            }
            self.context.record(&node.id, outcome.output);

            match self.next_node(&node.id, node.kind, outcome.handle) {
                Some(next) => {
                    tokio::time::sleep(Duration::from_millis(self.config.step_pause_ms)).await;
                    current = next;
                }
                None => {
                    debug!(node_id = %node.id, "No outgoing edge, walk complete");
                    return Ok(());
                }
            }
        }
    }
}
