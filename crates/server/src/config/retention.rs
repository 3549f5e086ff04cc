use std::time::Duration;

use serde::Deserialize;

/// How long file records live after creation.
#[derive(Debug, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_retention_hours")]
    pub hours: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            hours: default_retention_hours(),
        }
    }
}

impl RetentionConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.hours.saturating_mul(3600))
    }
}

fn default_retention_hours() -> u64 {
    24
}
