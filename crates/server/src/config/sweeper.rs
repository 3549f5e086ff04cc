use std::time::Duration;

use serde::Deserialize;

use ferry_registry::SweeperConfig;

/// Configuration for the eviction sweeper.
#[derive(Debug, Deserialize)]
pub struct SweeperServerConfig {
    /// Whether the sweeper runs at all.
    #[serde(default = "default_sweeper_enabled")]
    pub enabled: bool,
    /// Pause between sweep passes (seconds).
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    /// Records evicted in parallel within a pass.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for SweeperServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_sweeper_enabled(),
            interval_seconds: default_interval_seconds(),
            concurrency: default_concurrency(),
        }
    }
}

impl SweeperServerConfig {
    pub fn to_sweeper_config(&self) -> SweeperConfig {
        SweeperConfig {
            interval: Duration::from_secs(self.interval_seconds),
            concurrency: self.concurrency,
        }
    }
}

fn default_sweeper_enabled() -> bool {
    true
}

fn default_interval_seconds() -> u64 {
    60
}

fn default_concurrency() -> usize {
    8
}
