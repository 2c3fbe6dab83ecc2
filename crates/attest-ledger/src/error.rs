use attest_types::{ContentHash, PrincipalId};
use serde::{Deserialize, Serialize};

/// Rejections raised by the ledger program itself.
///
/// These are final: resubmitting the same call yields the same rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ProgramError {
    #[error("caller {caller} is not the authorized writer")]
    Unauthorized { caller: PrincipalId },

    #[error("transaction signature does not verify")]
    InvalidSignature,

    #[error("document {0} is already recorded")]
    DuplicateDocument(ContentHash),

    #[error("document {0} has not been recorded")]
    DocumentNotRecorded(ContentHash),

    #[error("stale nonce {nonce}; last accepted was {last}")]
    StaleNonce { nonce: u64, last: u64 },

    #[error("transaction encoding failed: {0}")]
    Encoding(String),
}

/// Transport-level failures talking to a ledger node.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("ledger node unavailable: {0}")]
    Unavailable(String),

    #[error("ledger request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),
}

/// Failures persisting or replaying the ledger journal.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("journal I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("journal serialization error: {0}")]
    Serialization(String),

    /// A journaled transaction no longer applies, e.g. the node was opened
    /// with a different writer key than the one that wrote the journal.
    #[error("journal entry at sequence {sequence} does not replay: {reason}")]
    Replay { sequence: u64, reason: String },
}
