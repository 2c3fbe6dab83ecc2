use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use attest_crypto::VerifyingKey;
use attest_types::{ContentHash, PrincipalId, TxHash};
use chrono::Utc;

use crate::error::{ChannelError, JournalError};
use crate::journal::{JournalEntry, LedgerJournal};
use crate::program::{ExecutionContext, LedgerProgram};
use crate::records::{
    AccessRecord, DocumentRecord, LedgerEvent, SignedTransaction, TxReceipt, TxStatus,
};
use crate::traits::{QueryChannel, TransactionChannel};

/// In-memory ledger node for tests, local demos, and embedding.
///
/// Transactions are applied in submission order. By default a transaction
/// is final as soon as it is submitted; [`hold_finality`] keeps new
/// submissions `Pending` until [`finalize_pending`] is called, which is how
/// tests reproduce a confirmation that arrives after the client gave up.
///
/// A node built with [`open`] also appends every finalized transaction to a
/// [`LedgerJournal`] and replays it on the next open, so ledger state lasts
/// as long as the records that point at it.
///
/// [`hold_finality`]: InMemoryLedgerNode::hold_finality
/// [`finalize_pending`]: InMemoryLedgerNode::finalize_pending
/// [`open`]: InMemoryLedgerNode::open
pub struct InMemoryLedgerNode {
    inner: RwLock<NodeState>,
    offline: AtomicBool,
    holding: AtomicBool,
}

struct NodeState {
    program: LedgerProgram,
    sequence: u64,
    transactions: HashMap<TxHash, TxStatus>,
    pending: Vec<(TxHash, SignedTransaction)>,
    journal: Option<LedgerJournal>,
}

impl NodeState {
    fn new(writer: VerifyingKey) -> Self {
        Self {
            program: LedgerProgram::new(writer),
            sequence: 0,
            transactions: HashMap::new(),
            pending: Vec::new(),
            journal: None,
        }
    }

    /// Execute one transaction and record its status. A journal write
    /// failure is reported after the status is recorded; the transaction
    /// is then applied in memory only.
    fn apply(&mut self, tx_hash: TxHash, signed: &SignedTransaction) -> Result<TxStatus, ChannelError> {
        let ctx = ExecutionContext {
            tx_hash,
            sequence: self.sequence + 1,
            timestamp: Utc::now(),
        };
        let mut journal_result = Ok(());
        let status = match self.program.execute(signed, &ctx) {
            Ok(event) => {
                self.sequence += 1;
                if let Some(journal) = self.journal.as_mut() {
                    journal_result = journal.append(&JournalEntry {
                        sequence: ctx.sequence,
                        timestamp: ctx.timestamp,
                        transaction: signed.clone(),
                    });
                }
                TxStatus::Finalized(TxReceipt { tx_hash, event })
            }
            Err(err) => {
                tracing::debug!(tx = %tx_hash, error = %err, "transaction reverted");
                TxStatus::Reverted(err)
            }
        };
        self.transactions.insert(tx_hash, status.clone());
        journal_result.map_err(|e| {
            tracing::error!(tx = %tx_hash, error = %e, "ledger journal write failed");
            ChannelError::Transport(format!("ledger journal write failed: {e}"))
        })?;
        Ok(status)
    }

    fn replay(&mut self, entry: JournalEntry) -> Result<(), JournalError> {
        let sequence = entry.sequence;
        let replay_err = |reason: String| JournalError::Replay { sequence, reason };
        if sequence != self.sequence + 1 {
            return Err(replay_err(format!("expected sequence {}", self.sequence + 1)));
        }
        let tx_hash = entry
            .transaction
            .tx_hash()
            .map_err(|e| replay_err(e.to_string()))?;
        let ctx = ExecutionContext {
            tx_hash,
            sequence,
            timestamp: entry.timestamp,
        };
        let event = self
            .program
            .execute(&entry.transaction, &ctx)
            .map_err(|e| replay_err(e.to_string()))?;
        self.sequence = sequence;
        self.transactions
            .insert(tx_hash, TxStatus::Finalized(TxReceipt { tx_hash, event }));
        Ok(())
    }
}

impl InMemoryLedgerNode {
    pub fn new(writer: VerifyingKey) -> Self {
        Self::from_state(NodeState::new(writer))
    }

    /// Open a node whose state is journaled at `journal_path`, replaying
    /// whatever an earlier node left there.
    ///
    /// Fails with [`JournalError::Replay`] if a journaled transaction no
    /// longer applies, which is what a changed writer key looks like.
    pub fn open(writer: VerifyingKey, journal_path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let (journal, entries) = LedgerJournal::open(journal_path)?;
        let mut state = NodeState::new(writer);
        let replayed = entries.len();
        for entry in entries {
            state.replay(entry)?;
        }
        tracing::info!(
            path = %journal.path().display(),
            replayed,
            sequence = state.sequence,
            "ledger state restored"
        );
        state.journal = Some(journal);
        Ok(Self::from_state(state))
    }

    fn from_state(state: NodeState) -> Self {
        Self {
            inner: RwLock::new(state),
            offline: AtomicBool::new(false),
            holding: AtomicBool::new(false),
        }
    }

    /// Make every channel call fail with [`ChannelError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Keep newly submitted transactions pending until released.
    pub fn hold_finality(&self, hold: bool) {
        self.holding.store(hold, Ordering::SeqCst);
    }

    /// Apply every pending transaction in submission order. Returns how many
    /// were applied.
    pub fn finalize_pending(&self) -> Result<usize, ChannelError> {
        let mut state = self.write()?;
        let pending = std::mem::take(&mut state.pending);
        let mut first_err = None;
        for (tx_hash, signed) in &pending {
            if let Err(e) = state.apply(*tx_hash, signed) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(pending.len()),
        }
    }

    pub fn pending_count(&self) -> Result<usize, ChannelError> {
        Ok(self.read()?.pending.len())
    }

    /// Overwrite the hash stored in the creation record kept under `key`.
    /// Returns `false` if `key` is not recorded.
    pub fn tamper_document(
        &self,
        key: &ContentHash,
        stored: ContentHash,
    ) -> Result<bool, ChannelError> {
        Ok(self.write()?.program.force_document_hash(key, stored))
    }

    pub fn writer(&self) -> Result<PrincipalId, ChannelError> {
        Ok(self.read()?.program.writer().clone())
    }

    pub fn events(&self) -> Result<Vec<LedgerEvent>, ChannelError> {
        Ok(self.read()?.program.events().to_vec())
    }

    pub fn document_count(&self) -> Result<usize, ChannelError> {
        Ok(self.read()?.program.document_count())
    }

    fn ensure_online(&self) -> Result<(), ChannelError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ChannelError::Unavailable("node is offline".into()));
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, NodeState>, ChannelError> {
        self.inner
            .read()
            .map_err(|_| ChannelError::Transport("ledger read lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, NodeState>, ChannelError> {
        self.inner
            .write()
            .map_err(|_| ChannelError::Transport("ledger write lock poisoned".into()))
    }
}

#[async_trait]
impl TransactionChannel for InMemoryLedgerNode {
    async fn submit(&self, tx: &SignedTransaction) -> Result<TxHash, ChannelError> {
        self.ensure_online()?;
        let tx_hash = tx
            .tx_hash()
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        let mut state = self.write()?;
        if state.transactions.contains_key(&tx_hash) {
            return Ok(tx_hash);
        }

        if self.holding.load(Ordering::SeqCst) {
            state.transactions.insert(tx_hash, TxStatus::Pending);
            state.pending.push((tx_hash, tx.clone()));
        } else {
            state.apply(tx_hash, tx)?;
        }
        Ok(tx_hash)
    }

    async fn status(&self, tx_hash: &TxHash) -> Result<TxStatus, ChannelError> {
        self.ensure_online()?;
        self.read()?
            .transactions
            .get(tx_hash)
            .cloned()
            .ok_or_else(|| ChannelError::Transport(format!("unknown transaction {tx_hash}")))
    }
}

#[async_trait]
impl QueryChannel for InMemoryLedgerNode {
    async fn document_record(
        &self,
        content_hash: &ContentHash,
    ) -> Result<DocumentRecord, ChannelError> {
        self.ensure_online()?;
        Ok(self.read()?.program.document_record(content_hash))
    }

    async fn access_history(
        &self,
        content_hash: &ContentHash,
    ) -> Result<Vec<AccessRecord>, ChannelError> {
        self.ensure_online()?;
        Ok(self.read()?.program.access_history(content_hash))
    }
}

impl std::fmt::Debug for InMemoryLedgerNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLedgerNode")
            .field("offline", &self.offline.load(Ordering::SeqCst))
            .field("holding", &self.holding.load(Ordering::SeqCst))
            .finish()
    }
}
