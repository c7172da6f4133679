use serde::{Deserialize, Serialize};

use super::source::SourceConfig;

/// Configuration for the monitor loop.
///
/// Supplied by the embedding host and replaceable at runtime; a change
/// marks the registry dirty rather than rebuilding inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Poll interval in milliseconds (default: 100). Must be non-zero.
    #[serde(default = "default_update_interval")]
    pub update_interval_ms: u64,

    /// Sources to meter, in display order.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

fn default_update_interval() -> u64 {
    100
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.update_interval_ms == 0 {
            return Err("update interval must be non-zero, 100 ms or more is a good number".into());
        }
        Ok(())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: default_update_interval(),
            sources: Vec::new(),
        }
    }
}
