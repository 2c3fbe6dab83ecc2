use std::path::{Path, PathBuf};

use attest_client::ClientConfig;
use attest_crypto::SigningKey;
use attest_store::StoreConfig;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Top-level configuration for an [`Attest`](crate::Attest) instance.
///
/// ```toml
/// data_dir = "/var/lib/attest"
/// writer_key = "<64 hex chars>"
///
/// [store]
/// grace_period_secs = 3600
///
/// [client]
/// confirmation_timeout_ms = 30000
/// ```
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttestConfig {
    /// Directory for the file record backend and the ledger journal. In
    /// memory when unset.
    pub data_dir: Option<PathBuf>,
    /// Hex-encoded Ed25519 seed of the single ledger writer. Required with
    /// `data_dir`; otherwise a fresh key is generated per process when unset.
    pub writer_key: Option<String>,
    pub store: StoreConfig,
    pub client: ClientConfig,
}

impl AttestConfig {
    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        toml::from_str(s).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string_pretty(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    /// The configured writer credential, or a freshly generated one.
    ///
    /// Persisted records outlive the process, so with `data_dir` set the
    /// key must be configured: a generated one could never write to the
    /// ledger those records were committed to.
    pub fn signing_key(&self) -> SdkResult<SigningKey> {
        match (&self.writer_key, &self.data_dir) {
            (Some(hex), _) => SigningKey::from_hex(hex)
                .map_err(|_| SdkError::Config("writer_key must be 32 hex-encoded bytes".into())),
            (None, Some(_)) => Err(SdkError::Config(
                "writer_key is required when data_dir is set".into(),
            )),
            (None, None) => Ok(SigningKey::generate()),
        }
    }

    /// Where records live under `data_dir`.
    pub fn records_dir(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join("records"))
    }

    /// Where the ledger journal lives under `data_dir`.
    pub fn ledger_journal_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join("ledger.journal"))
    }
}

impl std::fmt::Debug for AttestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttestConfig")
            .field("data_dir", &self.data_dir)
            .field("writer_key", &self.writer_key.as_ref().map(|_| "[REDACTED]"))
            .field("store", &self.store)
            .field("client", &self.client)
            .finish()
    }
}
