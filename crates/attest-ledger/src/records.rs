use attest_crypto::{ContentHasher, Signature, SigningKey, VerifyingKey};
use attest_types::{ContentHash, LedgerRef, PrincipalId, TxHash};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProgramError;

/// Creation record for one content hash.
///
/// Reading an unrecorded hash yields [`DocumentRecord::empty`]: zero hash,
/// no creator, epoch timestamp.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub content_hash: ContentHash,
    pub creator: Option<PrincipalId>,
    pub timestamp: DateTime<Utc>,
    pub created_in: Option<LedgerRef>,
}

impl DocumentRecord {
    pub fn empty() -> Self {
        Self {
            content_hash: ContentHash::zero(),
            creator: None,
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            created_in: None,
        }
    }

    pub fn is_recorded(&self) -> bool {
        self.created_in.is_some()
    }
}

/// One entry of a document's access history. Never mutated once appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRecord {
    pub accessor: PrincipalId,
    pub timestamp: DateTime<Utc>,
    pub logged_in: LedgerRef,
}

/// Mutating program entry points.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Call {
    LogNewDocument {
        content_hash: ContentHash,
    },
    LogAccess {
        content_hash: ContentHash,
        accessor: PrincipalId,
    },
}

impl Call {
    pub fn content_hash(&self) -> ContentHash {
        match self {
            Self::LogNewDocument { content_hash } | Self::LogAccess { content_hash, .. } => {
                *content_hash
            }
        }
    }
}

/// Unsigned transaction body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub call: Call,
    pub signer: VerifyingKey,
    pub nonce: u64,
}

impl Transaction {
    /// Canonical bytes covered by the signature.
    pub fn signing_payload(&self) -> Result<Vec<u8>, ProgramError> {
        serde_json::to_vec(self).map_err(|e| ProgramError::Encoding(e.to_string()))
    }
}

/// A transaction together with the writer's signature over it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signature: Signature,
}

impl SignedTransaction {
    /// Build and sign a transaction with `key`.
    pub fn sign(call: Call, nonce: u64, key: &SigningKey) -> Result<Self, ProgramError> {
        let transaction = Transaction {
            call,
            signer: key.verifying_key(),
            nonce,
        };
        let signature = key.sign(&transaction.signing_payload()?);
        Ok(Self {
            transaction,
            signature,
        })
    }

    /// Check the signature against the embedded signer key.
    pub fn verify_signature(&self) -> Result<(), ProgramError> {
        let payload = self.transaction.signing_payload()?;
        self.transaction
            .signer
            .verify(&payload, &self.signature)
            .map_err(|_| ProgramError::InvalidSignature)
    }

    /// Deterministic transaction hash (Ed25519 signatures are deterministic).
    pub fn tx_hash(&self) -> Result<TxHash, ProgramError> {
        ContentHasher::TRANSACTION
            .hash_json(self)
            .map_err(|e| ProgramError::Encoding(e.to_string()))
    }
}

/// Events emitted by successful program calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    DocumentLogged {
        content_hash: ContentHash,
        creator: PrincipalId,
        timestamp: DateTime<Utc>,
        at: LedgerRef,
    },
    AccessLogged {
        content_hash: ContentHash,
        accessor: PrincipalId,
        timestamp: DateTime<Utc>,
        at: LedgerRef,
    },
}

impl LedgerEvent {
    pub fn ledger_ref(&self) -> LedgerRef {
        match self {
            Self::DocumentLogged { at, .. } | Self::AccessLogged { at, .. } => *at,
        }
    }

    pub fn content_hash(&self) -> ContentHash {
        match self {
            Self::DocumentLogged { content_hash, .. } | Self::AccessLogged { content_hash, .. } => {
                *content_hash
            }
        }
    }
}

/// Proof of a finalized transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub event: LedgerEvent,
}

impl TxReceipt {
    pub fn ledger_ref(&self) -> LedgerRef {
        self.event.ledger_ref()
    }
}

/// Finality status of a submitted transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum TxStatus {
    Pending,
    Finalized(TxReceipt),
    Reverted(ProgramError),
}

impl TxStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}
