use attest_client::LedgerClientError;
use attest_types::RecordId;

/// Errors from record store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No such record, the caller does not own it, or the operation needs a
    /// committed record and this one is not.
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// Commit was already performed; nothing new happened.
    #[error("record {0} is already committed")]
    AlreadyCommitted(RecordId),

    #[error("content of {size} bytes exceeds the {limit} byte limit")]
    ContentTooLarge { size: usize, limit: usize },

    /// A ledger write failed; the record was left unchanged.
    #[error("ledger write failed: {0}")]
    LedgerWriteFailed(#[source] LedgerClientError),

    /// The storage backend is unavailable.
    #[error("storage backend unavailable: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// The ledger failure behind a write error, if any.
    pub fn ledger_error(&self) -> Option<&LedgerClientError> {
        match self {
            Self::LedgerWriteFailed(err) => Some(err),
            _ => None,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
