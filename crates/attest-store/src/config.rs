use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Record store settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Lifetime of an uncommitted record.
    pub grace_period_secs: u64,
    /// Upload size limit.
    pub max_content_bytes: usize,
}

impl StoreConfig {
    pub fn grace_period(&self) -> Duration {
        let max_secs = (i64::MAX / 1000) as u64;
        Duration::seconds(self.grace_period_secs.min(max_secs) as i64)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: 3600,
            max_content_bytes: 25 * 1024 * 1024,
        }
    }
}
