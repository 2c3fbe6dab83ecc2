use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use attest_crypto::SigningKey;
use attest_ledger::{
    AccessRecord, Call, ChannelError, DocumentRecord, QueryChannel, SignedTransaction,
    TransactionChannel, TxReceipt, TxStatus,
};
use attest_types::{ContentHash, LedgerRef, PrincipalId, TxHash};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientResult, LedgerClientError};

/// Outcome of a confirmed ledger write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteReceipt {
    pub ledger_ref: LedgerRef,
    /// `true` when finality was never observed directly and the write was
    /// confirmed by reading ledger state after the timeout.
    pub reconciled: bool,
}

impl WriteReceipt {
    fn confirmed(receipt: &TxReceipt) -> Self {
        Self {
            ledger_ref: receipt.ledger_ref(),
            reconciled: false,
        }
    }

    fn reconciled(ledger_ref: LedgerRef) -> Self {
        Self {
            ledger_ref,
            reconciled: true,
        }
    }
}

/// Signs, submits and confirms writes to the ledger program.
pub struct LedgerClient {
    key: SigningKey,
    writer: PrincipalId,
    transactions: Arc<dyn TransactionChannel>,
    queries: Arc<dyn QueryChannel>,
    config: ClientConfig,
    /// Last nonce handed out. Held across sign + submit so submission order
    /// always matches nonce order.
    last_nonce: Mutex<u64>,
}

impl LedgerClient {
    pub fn new(
        key: SigningKey,
        transactions: Arc<dyn TransactionChannel>,
        queries: Arc<dyn QueryChannel>,
        config: ClientConfig,
    ) -> Self {
        let writer = key.verifying_key().to_principal();
        Self {
            key,
            writer,
            transactions,
            queries,
            config,
            last_nonce: Mutex::new(0),
        }
    }

    /// The principal this client writes as.
    pub fn writer(&self) -> &PrincipalId {
        &self.writer
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Write the creation record for `content_hash` and wait for finality.
    ///
    /// If confirmation does not arrive in time, the document record is read
    /// back: a record created by this writer counts as success.
    pub async fn log_new_document(&self, content_hash: ContentHash) -> ClientResult<WriteReceipt> {
        match self
            .submit_and_confirm(Call::LogNewDocument { content_hash })
            .await
        {
            Ok(receipt) => {
                info!(hash = %content_hash.short_hex(), at = %receipt.ledger_ref(), "document logged");
                Ok(WriteReceipt::confirmed(&receipt))
            }
            Err(LedgerClientError::Unavailable {
                reason,
                pending_tx: Some(tx_hash),
            }) => self.reconcile_creation(content_hash, tx_hash, reason).await,
            Err(err) => Err(err),
        }
    }

    /// Append one access record for `content_hash` and wait for finality.
    ///
    /// On timeout the access history is searched for the pending transaction
    /// before failure is reported.
    pub async fn log_access(
        &self,
        content_hash: ContentHash,
        accessor: PrincipalId,
    ) -> ClientResult<WriteReceipt> {
        match self
            .submit_and_confirm(Call::LogAccess {
                content_hash,
                accessor,
            })
            .await
        {
            Ok(receipt) => {
                debug!(hash = %content_hash.short_hex(), at = %receipt.ledger_ref(), "access logged");
                Ok(WriteReceipt::confirmed(&receipt))
            }
            Err(LedgerClientError::Unavailable {
                reason,
                pending_tx: Some(tx_hash),
            }) => self.reconcile_access(content_hash, tx_hash, reason).await,
            Err(err) => Err(err),
        }
    }

    pub async fn document_record(&self, content_hash: &ContentHash) -> ClientResult<DocumentRecord> {
        Ok(self.queries.document_record(content_hash).await?)
    }

    pub async fn access_history(&self, content_hash: &ContentHash) -> ClientResult<Vec<AccessRecord>> {
        Ok(self.queries.access_history(content_hash).await?)
    }

    async fn submit_and_confirm(&self, call: Call) -> ClientResult<TxReceipt> {
        let tx_hash = {
            let mut last = self.last_nonce.lock().await;
            let nonce = next_nonce(*last);
            *last = nonce;

            let signed = SignedTransaction::sign(call, nonce, &self.key)?;
            let tx_hash = signed.tx_hash()?;
            match self.transactions.submit(&signed).await {
                Ok(_) => tx_hash,
                // The node may have accepted the transaction before the
                // response was lost.
                Err(ChannelError::Timeout) => {
                    return Err(LedgerClientError::Unavailable {
                        reason: ChannelError::Timeout.to_string(),
                        pending_tx: Some(tx_hash),
                    })
                }
                Err(err) => return Err(err.into()),
            }
        };

        let timeout = self.config.confirmation_timeout();
        match tokio::time::timeout(timeout, self.await_finality(&tx_hash)).await {
            Ok(result) => result,
            Err(_) => Err(LedgerClientError::Unavailable {
                reason: format!("no confirmation within {}ms", timeout.as_millis()),
                pending_tx: Some(tx_hash),
            }),
        }
    }

    async fn await_finality(&self, tx_hash: &TxHash) -> ClientResult<TxReceipt> {
        loop {
            match self.transactions.status(tx_hash).await {
                Ok(TxStatus::Finalized(receipt)) => return Ok(receipt),
                Ok(TxStatus::Reverted(err)) => {
                    debug!(tx = %tx_hash, error = %err, "transaction reverted");
                    return Err(err.into());
                }
                Ok(TxStatus::Pending) => {}
                Err(err) => debug!(tx = %tx_hash, error = %err, "status poll failed"),
            }
            tokio::time::sleep(self.config.poll_interval()).await;
        }
    }

    async fn reconcile_creation(
        &self,
        content_hash: ContentHash,
        tx_hash: TxHash,
        reason: String,
    ) -> ClientResult<WriteReceipt> {
        warn!(tx = %tx_hash, hash = %content_hash.short_hex(), %reason, "creation unconfirmed, reconciling");
        match self.queries.document_record(&content_hash).await {
            Ok(record) => match record.created_in {
                Some(at) if record.creator.as_ref() == Some(&self.writer) => {
                    info!(tx = %tx_hash, at = %at, "creation confirmed by reconciliation");
                    Ok(WriteReceipt::reconciled(at))
                }
                _ => Err(LedgerClientError::Unavailable {
                    reason,
                    pending_tx: Some(tx_hash),
                }),
            },
            Err(err) => Err(LedgerClientError::Unavailable {
                reason: format!("{reason}; reconciliation read failed: {err}"),
                pending_tx: Some(tx_hash),
            }),
        }
    }

    async fn reconcile_access(
        &self,
        content_hash: ContentHash,
        tx_hash: TxHash,
        reason: String,
    ) -> ClientResult<WriteReceipt> {
        warn!(tx = %tx_hash, hash = %content_hash.short_hex(), %reason, "access unconfirmed, reconciling");
        match self.queries.access_history(&content_hash).await {
            Ok(history) => history
                .iter()
                .find(|entry| entry.logged_in.tx_hash == tx_hash)
                .map(|entry| WriteReceipt::reconciled(entry.logged_in))
                .ok_or(LedgerClientError::Unavailable {
                    reason,
                    pending_tx: Some(tx_hash),
                }),
            Err(err) => Err(LedgerClientError::Unavailable {
                reason: format!("{reason}; reconciliation read failed: {err}"),
                pending_tx: Some(tx_hash),
            }),
        }
    }
}

impl std::fmt::Debug for LedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerClient")
            .field("writer", &self.writer)
            .field("config", &self.config)
            .finish()
    }
}

/// Wall-clock microseconds, bumped past `last` so nonces stay strictly
/// increasing across restarts and within one process.
fn next_nonce(last: u64) -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64;
    now.max(last.saturating_add(1))
}
