//! Persistence ports for the graph and credential stores.
//!
//! Stores hold only in-memory state and call a port on every committed
//! transition. Port failures are logged by the store and never surface to the
//! editing operations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub trait PersistencePort<T>: Send {
    /// Returns `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<T>>;

    fn save(&self, value: &T) -> Result<()>;
}

/// Stores the value as pretty-printed JSON in a single file.
#[derive(Debug, Clone)]
pub struct JsonFilePort {
    path: PathBuf,
}

impl JsonFilePort {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T: Serialize + DeserializeOwned> PersistencePort<T> for JsonFilePort {
    fn load(&self) -> Result<Option<T>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let value = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        Ok(Some(value))
    }

    fn save(&self, value: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create storage directory")?;
        }
        let json = serde_json::to_string_pretty(value).context("Failed to serialize value")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}

/// In-memory port. Clones share the same slot, so a test can keep one handle
/// and inspect what the store saved through the other.
#[derive(Debug)]
pub struct MemoryPort<T> {
    slot: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for MemoryPort<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Default for MemoryPort<T> {
    fn default() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }
}

impl<T: Clone> MemoryPort<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: T) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(value))),
        }
    }

    pub fn saved(&self) -> Option<T> {
        self.slot.lock().clone()
    }
}

impl<T: Clone + Send> PersistencePort<T> for MemoryPort<T> {
    fn load(&self) -> Result<Option<T>> {
        Ok(self.slot.lock().clone())
    }

    fn save(&self, value: &T) -> Result<()> {
        *self.slot.lock() = Some(value.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NodeKind, Workflow};

    #[test]
    fn json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let port = JsonFilePort::new(dir.path().join("nested").join("workflow.json"));

        let loaded: Option<Workflow> = port.load().unwrap();
        assert!(loaded.is_none());

        let mut workflow = Workflow::new();
        workflow.add_node(NodeKind::Trigger, None, Default::default());
        port.save(&workflow).unwrap();

        let loaded: Workflow = port.load().unwrap().unwrap();
        assert_eq!(loaded, workflow);
    }

    #[test]
    fn json_file_reports_corrupt_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workflow.json");
        std::fs::write(&path, "{not json").unwrap();

        let port = JsonFilePort::new(&path);
        let result: Result<Option<Workflow>> = port.load();
        assert!(result.is_err());
    }

    #[test]
    fn memory_port_clones_share_state() {
        let port: MemoryPort<Vec<u32>> = MemoryPort::new();
        let observer = port.clone();
        port.save(&vec![1, 2]).unwrap();
        assert_eq!(observer.saved(), Some(vec![1, 2]));
    }
}
