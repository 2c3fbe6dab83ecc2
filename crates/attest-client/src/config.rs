use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Confirmation-wait settings for ledger writes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// How long to wait for a submitted write to become final.
    pub confirmation_timeout_ms: u64,
    /// Delay between finality polls.
    pub poll_interval_ms: u64,
}

impl ClientConfig {
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.confirmation_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout_ms: 30_000,
            poll_interval_ms: 250,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ClientConfig::default();
        assert_eq!(c.confirmation_timeout(), Duration::from_secs(30));
        assert_eq!(c.poll_interval(), Duration::from_millis(250));
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let c: ClientConfig = toml::from_str("confirmation_timeout_ms = 500").unwrap();
        assert_eq!(c.confirmation_timeout_ms, 500);
        assert_eq!(c.poll_interval_ms, 250);
    }

    #[test]
    fn zero_poll_interval_is_clamped() {
        let c = ClientConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(c.poll_interval(), Duration::from_millis(1));
    }
}
