//! Snapshot-based undo/redo for the workflow graph.
//!
//! Every committed edit produces a whole new [`Workflow`] snapshot. Appending
//! discards any redo tail; overwriting replaces the snapshot at the cursor so
//! continuous operations (drag in progress, warning refresh) do not create
//! undo steps of their own.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::Workflow;
use crate::persistence::PersistencePort;

/// How a new snapshot enters the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// Truncate the redo tail, push, and move the cursor to the new tip.
    Append,
    /// Replace the snapshot at the cursor in place.
    Overwrite,
}

pub struct History {
    snapshots: VecDeque<Workflow>,
    index: usize,
    max_snapshots: usize,
    port: Option<Box<dyn PersistencePort<Workflow>>>,
}

impl History {
    pub fn new(initial: Workflow, max_snapshots: usize) -> Self {
        Self {
            snapshots: VecDeque::from([initial]),
            index: 0,
            max_snapshots: max_snapshots.max(1),
            port: None,
        }
    }

    /// Start from whatever the port holds; an unreadable or empty port yields
    /// an empty workflow.
    pub fn with_port(port: Box<dyn PersistencePort<Workflow>>, max_snapshots: usize) -> Self {
        let initial = match port.load() {
            Ok(Some(workflow)) => workflow,
            Ok(None) => Workflow::default(),
            Err(e) => {
                warn!("Failed to load saved workflow, starting empty: {:#}", e);
                Workflow::default()
            }
        };
        let mut history = Self::new(initial, max_snapshots);
        history.port = Some(port);
        history
    }

    pub fn current(&self) -> &Workflow {
        &self.snapshots[self.index]
    }

    pub fn set(&mut self, next: Workflow, commit: Commit) {
        match commit {
            Commit::Overwrite => {
                self.snapshots[self.index] = next;
            }
            Commit::Append => {
                self.snapshots.truncate(self.index + 1);
                self.snapshots.push_back(next);
                self.index = self.snapshots.len() - 1;

                while self.snapshots.len() > self.max_snapshots {
                    self.snapshots.pop_front();
                    self.index = self.index.saturating_sub(1);
                }
            }
        }
        debug!(
            index = self.index,
            len = self.snapshots.len(),
            ?commit,
            "History updated"
        );
        self.persist();
    }

    /// Derive the next snapshot from a copy of the current one.
    pub fn update(&mut self, commit: Commit, edit: impl FnOnce(&mut Workflow)) {
        let mut next = self.current().clone();
        edit(&mut next);
        self.set(next, commit);
    }

    /// Returns `false` when already at the oldest snapshot.
    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.index -= 1;
        self.persist();
        true
    }

    /// Returns `false` when already at the newest snapshot.
    pub fn redo(&mut self) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.index += 1;
        self.persist();
        true
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.snapshots.len()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    fn persist(&self) {
        if let Some(port) = &self.port
            && let Err(e) = port.save(self.current())
        {
            warn!("Failed to save workflow: {:#}", e);
        }
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(Workflow::default(), 200)
    }
}
