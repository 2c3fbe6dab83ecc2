use async_trait::async_trait;
use attest_types::{ContentHash, TxHash};

use crate::error::ChannelError;
use crate::records::{AccessRecord, DocumentRecord, SignedTransaction, TxStatus};

/// Signed-transaction submission channel to the ledger.
///
/// `submit` only hands the transaction to the network; it is not applied
/// until `status` reports it final. Resubmitting an identical transaction
/// returns the same hash and does not apply it twice.
#[async_trait]
pub trait TransactionChannel: Send + Sync {
    async fn submit(&self, tx: &SignedTransaction) -> Result<TxHash, ChannelError>;

    async fn status(&self, tx_hash: &TxHash) -> Result<TxStatus, ChannelError>;
}

/// Read-only query channel to the ledger. Reads are unrestricted.
#[async_trait]
pub trait QueryChannel: Send + Sync {
    async fn document_record(&self, content_hash: &ContentHash)
        -> Result<DocumentRecord, ChannelError>;

    async fn access_history(
        &self,
        content_hash: &ContentHash,
    ) -> Result<Vec<AccessRecord>, ChannelError>;
}
