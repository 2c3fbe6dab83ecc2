use attest_ledger::{ChannelError, ProgramError};
use attest_types::TxHash;

/// Ledger failures as seen by the rest of the system.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerClientError {
    /// Network fault or confirmation timeout. `pending_tx` is set when a
    /// write was submitted but its outcome is unknown.
    #[error("ledger unavailable: {reason}")]
    Unavailable {
        reason: String,
        pending_tx: Option<TxHash>,
    },

    /// The ledger program rejected the call.
    #[error("ledger rejected the call: {0}")]
    Rejected(ProgramError),

    #[error("failed to encode transaction: {0}")]
    Encoding(String),
}

impl LedgerClientError {
    /// Whether a caller may reasonably retry. The client never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    pub fn rejection(&self) -> Option<&ProgramError> {
        match self {
            Self::Rejected(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ChannelError> for LedgerClientError {
    fn from(err: ChannelError) -> Self {
        Self::Unavailable {
            reason: err.to_string(),
            pending_tx: None,
        }
    }
}

impl From<ProgramError> for LedgerClientError {
    fn from(err: ProgramError) -> Self {
        match err {
            ProgramError::Encoding(reason) => Self::Encoding(reason),
            other => Self::Rejected(other),
        }
    }
}

/// Result alias for client operations.
pub type ClientResult<T> = Result<T, LedgerClientError>;
