use attest_ledger::AccessRecord;
use attest_types::{ContentHash, LedgerRef, RecordId};
use serde::{Deserialize, Serialize};

/// Outcome of an integrity check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Stored bytes match their hash and the ledger agrees.
    Verified,
    /// Stored bytes no longer match the hash taken at upload.
    LocalTamperDetected,
    /// The ledger holds a different hash, or none at all.
    LedgerMismatch,
}

impl Verdict {
    pub fn is_verified(self) -> bool {
        self == Self::Verified
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Verified => "verified",
            Self::LocalTamperDetected => "local tamper detected",
            Self::LedgerMismatch => "ledger mismatch",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub record_id: RecordId,
    pub verdict: Verdict,
    /// Hash recomputed over the stored bytes.
    pub local_hash: ContentHash,
    /// Hash in the ledger's creation record. `None` when the ledger was not
    /// consulted or holds no record.
    pub ledger_hash: Option<ContentHash>,
}

/// Result of logging one access and reading the history back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessReport {
    pub write_ref: LedgerRef,
    /// Full ordered history, including the entry just written.
    pub history: Vec<AccessRecord>,
    /// Set when the write succeeded but the history could not be read back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Display-only view of a record's access history.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryView {
    pub entries: Vec<AccessRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl HistoryView {
    pub fn degraded(warning: impl Into<String>) -> Self {
        Self {
            entries: Vec::new(),
            warning: Some(warning.into()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.warning.is_some()
    }
}
