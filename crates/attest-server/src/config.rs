use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use attest_sdk::AttestConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Seconds between expiry sweeps. `0` disables the scheduler.
    pub sweep_interval_secs: u64,
    /// Upload body limit enforced by the router.
    pub max_body_bytes: usize,
    pub attest: AttestConfig,
}

impl ServerConfig {
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        let attest = AttestConfig::default();
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 7070)),
            sweep_interval_secs: 60,
            max_body_bytes: attest.store.max_content_bytes,
            attest,
        }
    }
}
