use attest_store::Record;
use attest_types::{ContentHash, LedgerRef, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Returned by [`Attest::upload`](crate::Attest::upload).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub id: RecordId,
    pub content_hash: ContentHash,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&Record> for UploadReceipt {
    fn from(record: &Record) -> Self {
        Self {
            id: record.id(),
            content_hash: record.content_hash(),
            expires_at: record.expires_at(),
        }
    }
}

/// Returned by [`Attest::commit`](crate::Attest::commit).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitOutcome {
    pub id: RecordId,
    pub content_hash: ContentHash,
    pub ledger_ref: LedgerRef,
}
