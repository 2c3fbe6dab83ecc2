use std::sync::Arc;

use attest_store::RecordStore;
use attest_types::{PrincipalId, RecordId};
use tracing::{debug, info, warn};

use crate::error::VerifyResult;
use crate::report::{AccessReport, HistoryView, VerificationResult, Verdict};

/// Checks committed records against their hash and the ledger, and keeps
/// their access audit trail.
#[derive(Debug, Clone)]
pub struct VerificationService {
    store: Arc<RecordStore>,
}

impl VerificationService {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// Verify a committed record.
    ///
    /// Local tampering is decided without a ledger call. The record is
    /// reloaded after the ledger read, so a record deleted while this runs
    /// reads as `NotFound`.
    pub async fn verify(&self, id: RecordId, owner: &PrincipalId) -> VerifyResult<VerificationResult> {
        let record = self.store.load_committed(id, owner)?;
        let local_hash = self.store.hasher().hash(record.content());

        if local_hash != record.content_hash() {
            warn!(
                id = %id,
                expected = %record.content_hash().short_hex(),
                actual = %local_hash.short_hex(),
                "stored bytes do not match their hash"
            );
            return Ok(VerificationResult {
                record_id: id,
                verdict: Verdict::LocalTamperDetected,
                local_hash,
                ledger_hash: None,
            });
        }

        let entry = self.store.ledger().document_record(&record.content_hash()).await?;
        // A delete that landed during the ledger read wins.
        self.store.load_committed(id, owner)?;
        let ledger_hash = entry.is_recorded().then_some(entry.content_hash);
        let verdict = if ledger_hash == Some(local_hash) {
            Verdict::Verified
        } else {
            Verdict::LedgerMismatch
        };

        match verdict {
            Verdict::Verified => debug!(id = %id, hash = %local_hash.short_hex(), "record verified"),
            _ => warn!(
                id = %id,
                local = %local_hash.short_hex(),
                ledger = ?ledger_hash.map(|h| h.short_hex()),
                "ledger disagrees with local record"
            ),
        }

        Ok(VerificationResult {
            record_id: id,
            verdict,
            local_hash,
            ledger_hash,
        })
    }

    /// Log one access by `accessor`, then read back the full history.
    ///
    /// The append always happens first, so the returned history contains it.
    /// If the write succeeds but the read-back fails, the report carries the
    /// write reference with an empty history and a warning.
    pub async fn log_and_fetch_access(
        &self,
        id: RecordId,
        owner: &PrincipalId,
        accessor: PrincipalId,
    ) -> VerifyResult<AccessReport> {
        let logged = self.store.log_access(id, owner, accessor.clone()).await?;
        let write_ref = logged.receipt.ledger_ref;
        info!(id = %id, accessor = %accessor, at = %write_ref, "access logged");

        let hash = logged.record.content_hash();
        match self.store.ledger().access_history(&hash).await {
            Ok(history) => Ok(AccessReport {
                write_ref,
                history,
                warning: None,
            }),
            Err(err) => {
                warn!(id = %id, at = %write_ref, error = %err, "access logged but history read failed");
                Ok(AccessReport {
                    write_ref,
                    history: Vec::new(),
                    warning: Some(format!("access history unavailable: {err}")),
                })
            }
        }
    }

    /// Read the access history of a committed record for display.
    ///
    /// Ledger read failures degrade to an empty list with a warning.
    pub async fn access_history(&self, id: RecordId, owner: &PrincipalId) -> VerifyResult<HistoryView> {
        let record = self.store.load_committed(id, owner)?;
        match self.store.ledger().access_history(&record.content_hash()).await {
            Ok(entries) => Ok(HistoryView {
                entries,
                warning: None,
            }),
            Err(err) => {
                warn!(id = %id, error = %err, "access history unavailable");
                Ok(HistoryView::degraded(format!(
                    "access history unavailable: {err}"
                )))
            }
        }
    }
}
