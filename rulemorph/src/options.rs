use serde::{Deserialize, Serialize};

/// Options fixed when an engine is built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Maximum number of segments in any configured path
    /// Real usage: ~4 segments, Limit: 64
    pub max_path_depth: usize,

    /// Snapshot the record before each action and restore it when the
    /// action fails
    pub snapshot_actions: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_path_depth: 64,
            snapshot_actions: true,
        }
    }
}

impl EngineOptions {
    pub fn new() -> Self {
        Self::default()
    }
}
