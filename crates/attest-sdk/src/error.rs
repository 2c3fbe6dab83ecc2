use attest_client::LedgerClientError;
use attest_ledger::{JournalError, ProgramError};
use attest_store::StoreError;
use attest_types::{RecordId, TxHash};
use attest_verify::VerifyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    /// No such record, not owned by the caller, or not committed where a
    /// committed record is required.
    #[error("record not found: {0}")]
    NotFound(RecordId),

    #[error("record {0} is already committed")]
    AlreadyCommitted(RecordId),

    #[error("content of {size} bytes exceeds the {limit} byte limit")]
    ContentTooLarge { size: usize, limit: usize },

    /// Transient ledger failure; the caller may retry.
    #[error("ledger unavailable: {reason}")]
    LedgerUnavailable {
        reason: String,
        pending_tx: Option<TxHash>,
    },

    /// The ledger program refused the call. Not retryable.
    #[error("ledger rejected the call: {0}")]
    LedgerRejected(ProgramError),

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted ledger state could not be opened or replayed.
    #[error("ledger journal: {0}")]
    LedgerJournal(#[from] JournalError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl SdkError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LedgerUnavailable { .. })
    }
}

impl From<LedgerClientError> for SdkError {
    fn from(err: LedgerClientError) -> Self {
        match err {
            LedgerClientError::Unavailable { reason, pending_tx } => {
                Self::LedgerUnavailable { reason, pending_tx }
            }
            LedgerClientError::Rejected(rejection) => Self::LedgerRejected(rejection),
            LedgerClientError::Encoding(reason) => Self::Internal(reason),
        }
    }
}

impl From<StoreError> for SdkError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::AlreadyCommitted(id) => Self::AlreadyCommitted(id),
            StoreError::ContentTooLarge { size, limit } => Self::ContentTooLarge { size, limit },
            StoreError::LedgerWriteFailed(err) => err.into(),
            other => Self::Store(other),
        }
    }
}

impl From<VerifyError> for SdkError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::NotFound(id) => Self::NotFound(id),
            VerifyError::Ledger(err) => err.into(),
            VerifyError::Store(err) => err.into(),
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
