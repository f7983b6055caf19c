use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Pause between consecutive steps so observers can follow the active node.
    pub step_pause_ms: u64,
    /// A run that visits more nodes than this fails. Guards against cycles.
    pub max_steps: usize,
    /// Capacity of the executor event channel.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            step_pause_ms: 300,
            max_steps: 1000,
            event_capacity: 256,
        }
    }
}
