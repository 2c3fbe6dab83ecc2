use attest_client::LedgerClientError;
use attest_store::StoreError;
use attest_types::RecordId;

/// Errors from verification and access auditing.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// Missing, not owned by the caller, or not committed.
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// A ledger read or write failed.
    #[error(transparent)]
    Ledger(LedgerClientError),

    #[error("store error: {0}")]
    Store(StoreError),
}

impl VerifyError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Ledger(err) if err.is_retryable())
    }
}

impl From<StoreError> for VerifyError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::LedgerWriteFailed(err) => Self::Ledger(err),
            other => Self::Store(other),
        }
    }
}

impl From<LedgerClientError> for VerifyError {
    fn from(err: LedgerClientError) -> Self {
        Self::Ledger(err)
    }
}

/// Result alias for verification operations.
pub type VerifyResult<T> = Result<T, VerifyError>;
