use std::sync::Arc;

use attest_client::LedgerClient;
use attest_ledger::{AccessRecord, InMemoryLedgerNode};
use attest_store::{
    FileRecordBackend, InMemoryRecordBackend, Record, RecordBackend, RecordStore, SweepReport,
};
use attest_types::{ContentHash, PrincipalId, RecordId};
use attest_verify::{AccessReport, HistoryView, VerificationResult, VerificationService};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::AttestConfig;
use crate::error::{SdkError, SdkResult};
use crate::outcome::{CommitOutcome, UploadReceipt};

/// High-level Attest API.
///
/// Cheap to clone; clones share the same store and ledger.
#[derive(Clone, Debug)]
pub struct Attest {
    store: Arc<RecordStore>,
    verifier: VerificationService,
    node: Option<Arc<InMemoryLedgerNode>>,
}

impl Attest {
    /// Build an instance backed by an in-process ledger node.
    ///
    /// With `config.data_dir` set, records and the ledger journal both live
    /// there, so committed records still verify after a restart. Otherwise
    /// everything is in memory.
    pub fn open(config: AttestConfig) -> SdkResult<Self> {
        let key = config.signing_key()?;
        let node = Arc::new(match config.ledger_journal_path() {
            Some(path) => InMemoryLedgerNode::open(key.verifying_key(), path)?,
            None => InMemoryLedgerNode::new(key.verifying_key()),
        });
        let backend: Arc<dyn RecordBackend> = match config.records_dir() {
            Some(dir) => Arc::new(FileRecordBackend::open(dir)?),
            None => Arc::new(InMemoryRecordBackend::new()),
        };
        let client = LedgerClient::new(key, node.clone(), node.clone(), config.client.clone());
        info!(
            writer = %client.writer(),
            data_dir = ?config.data_dir,
            "attest instance opened"
        );

        let store = Arc::new(RecordStore::new(backend, Arc::new(client), config.store));
        let mut attest = Self::with_store(store);
        attest.node = Some(node);
        Ok(attest)
    }

    /// In-memory records and ledger with default settings.
    pub fn in_memory() -> SdkResult<Self> {
        Self::open(AttestConfig::default())
    }

    /// Wrap an existing store, e.g. one wired to a remote ledger.
    pub fn with_store(store: Arc<RecordStore>) -> Self {
        Self {
            verifier: VerificationService::new(store.clone()),
            store,
            node: None,
        }
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// The in-process ledger node, when this instance owns one.
    pub fn ledger_node(&self) -> Option<&Arc<InMemoryLedgerNode>> {
        self.node.as_ref()
    }

    /// The principal all ledger writes are signed as.
    pub fn writer(&self) -> &PrincipalId {
        self.store.ledger().writer()
    }

    // ---- Record lifecycle ----

    pub fn upload(&self, owner: PrincipalId, content: Vec<u8>) -> SdkResult<UploadReceipt> {
        let record = self.store.create(owner, content)?;
        Ok(UploadReceipt::from(&record))
    }

    pub fn get(&self, id: RecordId, owner: &PrincipalId) -> SdkResult<Record> {
        Ok(self.store.get(id, owner)?)
    }

    pub fn list(&self, owner: &PrincipalId) -> SdkResult<Vec<Record>> {
        Ok(self.store.list(owner)?)
    }

    pub async fn commit(&self, id: RecordId, owner: &PrincipalId) -> SdkResult<CommitOutcome> {
        let record = self.store.commit(id, owner).await?;
        let ledger_ref = record
            .ledger_tx()
            .ok_or_else(|| SdkError::Internal(format!("committed record {id} has no ledger ref")))?;
        Ok(CommitOutcome {
            id,
            content_hash: record.content_hash(),
            ledger_ref,
        })
    }

    pub async fn delete(&self, id: RecordId, owner: &PrincipalId) -> SdkResult<()> {
        Ok(self.store.delete(id, owner).await?)
    }

    /// Remove expired ephemeral records. Meant to be driven by a scheduler.
    pub async fn sweep(&self, now: DateTime<Utc>) -> SdkResult<SweepReport> {
        Ok(self.store.expire_sweep(now).await?)
    }

    // ---- Verification and audit ----

    pub async fn verify(&self, id: RecordId, owner: &PrincipalId) -> SdkResult<VerificationResult> {
        Ok(self.verifier.verify(id, owner).await?)
    }

    pub async fn log_access(
        &self,
        id: RecordId,
        owner: &PrincipalId,
        accessor: PrincipalId,
    ) -> SdkResult<AccessReport> {
        Ok(self.verifier.log_and_fetch_access(id, owner, accessor).await?)
    }

    pub async fn history(&self, id: RecordId, owner: &PrincipalId) -> SdkResult<HistoryView> {
        Ok(self.verifier.access_history(id, owner).await?)
    }

    /// Access history straight from the ledger, by content hash. Works after
    /// the local record is gone.
    pub async fn ledger_history(&self, content_hash: &ContentHash) -> SdkResult<Vec<AccessRecord>> {
        Ok(self.store.ledger().access_history(content_hash).await?)
    }
}
