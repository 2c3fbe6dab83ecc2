use std::sync::Arc;

use attest_client::{LedgerClient, LedgerClientError, WriteReceipt};
use attest_crypto::ContentHasher;
use attest_ledger::ProgramError;
use attest_types::{LedgerRef, PrincipalId, RecordId};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::backend::RecordBackend;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::locks::RecordLocks;
use crate::record::Record;

/// Outcome of one [`RecordStore::expire_sweep`] pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Candidates returned by the expiry index.
    pub examined: usize,
    /// Records deleted.
    pub reaped: usize,
    /// Candidates that were committed by the time their lock was taken.
    pub skipped: usize,
    /// Candidates that could not be read.
    pub failed: usize,
}

/// A confirmed access-log write and the record it was attached to.
#[derive(Clone, Debug)]
pub struct AccessLogged {
    pub record: Record,
    pub receipt: WriteReceipt,
}

/// Owns records and their ephemeral → committed transition.
///
/// Every state change on a record happens under that record's lock, and
/// every ledger write is confirmed before the record is touched.
pub struct RecordStore {
    backend: Arc<dyn RecordBackend>,
    ledger: Arc<LedgerClient>,
    hasher: ContentHasher,
    locks: RecordLocks,
    config: StoreConfig,
}

impl RecordStore {
    pub fn new(
        backend: Arc<dyn RecordBackend>,
        ledger: Arc<LedgerClient>,
        config: StoreConfig,
    ) -> Self {
        Self {
            backend,
            ledger,
            hasher: ContentHasher::CONTENT,
            locks: RecordLocks::new(),
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<LedgerClient> {
        &self.ledger
    }

    pub fn hasher(&self) -> &ContentHasher {
        &self.hasher
    }

    /// Store `content` as a new ephemeral record owned by `owner`.
    pub fn create(&self, owner: PrincipalId, content: Vec<u8>) -> StoreResult<Record> {
        self.create_at(owner, content, Utc::now())
    }

    /// [`create`](Self::create) with an explicit clock reading.
    pub fn create_at(
        &self,
        owner: PrincipalId,
        content: Vec<u8>,
        now: DateTime<Utc>,
    ) -> StoreResult<Record> {
        let limit = self.config.max_content_bytes;
        if content.len() > limit {
            return Err(StoreError::ContentTooLarge {
                size: content.len(),
                limit,
            });
        }

        let content_hash = self.hasher.hash(&content);
        let expires_at = now
            .checked_add_signed(self.config.grace_period())
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let record = Record::ephemeral(owner, content, content_hash, now, expires_at);
        self.backend.save(&record)?;

        info!(
            id = %record.id(),
            owner = %record.owner(),
            hash = %content_hash.short_hex(),
            bytes = record.content().len(),
            %expires_at,
            "record created"
        );
        Ok(record)
    }

    /// Read a live record owned by `owner`.
    ///
    /// Records past their deadline read as `NotFound` even before the sweep
    /// has removed them.
    pub fn get(&self, id: RecordId, owner: &PrincipalId) -> StoreResult<Record> {
        self.load_live(id, owner, Utc::now())
    }

    /// Commit a record: write its creation entry to the ledger, then make it
    /// permanent.
    ///
    /// `NotFound` and `AlreadyCommitted` are decided before any ledger call.
    /// A duplicate-creation rejection for a hash this writer already recorded
    /// (an earlier write that was confirmed too late, or a second upload of
    /// identical bytes) completes the commit against the existing entry.
    pub async fn commit(&self, id: RecordId, owner: &PrincipalId) -> StoreResult<Record> {
        let _guard = self.locks.acquire(id).await;
        let mut record = self.load_live(id, owner, Utc::now())?;
        if record.is_committed() {
            debug!(id = %id, "commit rejected: already committed");
            return Err(StoreError::AlreadyCommitted(id));
        }

        let content_hash = record.content_hash();
        let ledger_ref = match self.ledger.log_new_document(content_hash).await {
            Ok(receipt) => receipt.ledger_ref,
            Err(err) => match err.rejection() {
                Some(ProgramError::DuplicateDocument(_)) => {
                    self.adopt_prior_creation(&record, err).await?
                }
                _ => {
                    warn!(id = %id, hash = %content_hash.short_hex(), error = %err, "commit aborted");
                    return Err(StoreError::LedgerWriteFailed(err));
                }
            },
        };

        record.mark_committed(ledger_ref);
        self.backend.save(&record)?;
        info!(id = %id, hash = %content_hash.short_hex(), at = %ledger_ref, "record committed");
        Ok(record)
    }

    /// Delete every ephemeral record whose deadline is at or before `now`.
    ///
    /// Each candidate is reloaded under its lock, so a commit that won the
    /// race is seen and the record is left alone.
    pub async fn expire_sweep(&self, now: DateTime<Utc>) -> StoreResult<SweepReport> {
        let candidates = self.backend.expired_before(now)?;
        let mut report = SweepReport {
            examined: candidates.len(),
            ..SweepReport::default()
        };

        for id in candidates {
            let _guard = self.locks.acquire(id).await;
            match self.backend.load(&id) {
                Ok(Some(record)) if record.is_expired(now) => {
                    self.backend.remove(&id)?;
                    debug!(id = %id, owner = %record.owner(), "expired record reaped");
                    report.reaped += 1;
                }
                Ok(Some(_)) => report.skipped += 1,
                Ok(None) => {}
                Err(e) => {
                    warn!(id = %id, error = %e, "sweep could not read record");
                    report.failed += 1;
                }
            }
        }

        if report.examined > 0 {
            info!(
                examined = report.examined,
                reaped = report.reaped,
                skipped = report.skipped,
                failed = report.failed,
                "expiry sweep finished"
            );
        }
        Ok(report)
    }

    /// Delete a record and its bytes. Ledger entries are left as they are.
    pub async fn delete(&self, id: RecordId, owner: &PrincipalId) -> StoreResult<()> {
        let _guard = self.locks.acquire(id).await;
        let record = self.load_owned(id, owner)?;
        if !self.backend.remove(&id)? {
            return Err(StoreError::NotFound(id));
        }
        info!(id = %id, committed = record.is_committed(), "record deleted");
        Ok(())
    }

    /// Append one access entry for a committed record to the ledger and
    /// remember its reference on the record.
    ///
    /// Uncommitted records have no ledger entry and read as `NotFound`. A
    /// failed write leaves the record unchanged.
    pub async fn log_access(
        &self,
        id: RecordId,
        owner: &PrincipalId,
        accessor: PrincipalId,
    ) -> StoreResult<AccessLogged> {
        let _guard = self.locks.acquire(id).await;
        let mut record = self.load_committed(id, owner)?;

        let receipt = self
            .ledger
            .log_access(record.content_hash(), accessor)
            .await
            .map_err(StoreError::LedgerWriteFailed)?;
        record.push_access(receipt.ledger_ref);
        self.backend.save(&record)?;
        Ok(AccessLogged { record, receipt })
    }

    /// Read a committed record owned by `owner`.
    pub fn load_committed(&self, id: RecordId, owner: &PrincipalId) -> StoreResult<Record> {
        let record = self.load_owned(id, owner)?;
        if !record.is_committed() {
            return Err(StoreError::NotFound(id));
        }
        Ok(record)
    }

    /// Live records owned by `owner`, oldest first.
    pub fn list(&self, owner: &PrincipalId) -> StoreResult<Vec<Record>> {
        let now = Utc::now();
        let mut records = Vec::new();
        for id in self.backend.list_by_owner(owner)? {
            if let Some(record) = self.backend.load(&id)? {
                if !record.is_expired(now) {
                    records.push(record);
                }
            }
        }
        records.sort_by_key(Record::created_at);
        Ok(records)
    }

    pub fn len(&self) -> StoreResult<usize> {
        self.backend.len()
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        self.backend.is_empty()
    }

    fn load_owned(&self, id: RecordId, owner: &PrincipalId) -> StoreResult<Record> {
        match self.backend.load(&id)? {
            Some(record) if record.is_owned_by(owner) => Ok(record),
            _ => Err(StoreError::NotFound(id)),
        }
    }

    fn load_live(
        &self,
        id: RecordId,
        owner: &PrincipalId,
        now: DateTime<Utc>,
    ) -> StoreResult<Record> {
        let record = self.load_owned(id, owner)?;
        if record.is_expired(now) {
            return Err(StoreError::NotFound(id));
        }
        Ok(record)
    }

    async fn adopt_prior_creation(
        &self,
        record: &Record,
        rejection: LedgerClientError,
    ) -> StoreResult<LedgerRef> {
        let content_hash = record.content_hash();
        let existing = self
            .ledger
            .document_record(&content_hash)
            .await
            .map_err(StoreError::LedgerWriteFailed)?;

        match existing.created_in {
            Some(at)
                if existing.content_hash == content_hash
                    && existing.creator.as_ref() == Some(self.ledger.writer()) =>
            {
                info!(
                    id = %record.id(),
                    hash = %content_hash.short_hex(),
                    at = %at,
                    "hash already on ledger, adopting prior creation"
                );
                Ok(at)
            }
            _ => {
                warn!(id = %record.id(), hash = %content_hash.short_hex(), "duplicate creation not attributable to this writer");
                Err(StoreError::LedgerWriteFailed(rejection))
            }
        }
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("ledger", &self.ledger)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRecordBackend;
    use attest_client::ClientConfig;
    use attest_crypto::SigningKey;
    use attest_ledger::InMemoryLedgerNode;
    use attest_types::TxHash;
    use chrono::Duration;
    use proptest::prelude::*;

    struct Harness {
        node: Arc<InMemoryLedgerNode>,
        backend: Arc<InMemoryRecordBackend>,
        store: RecordStore,
    }

    fn harness() -> Harness {
        let key = SigningKey::from_bytes([3; 32]);
        let node = Arc::new(InMemoryLedgerNode::new(key.verifying_key()));
        let client = LedgerClient::new(
            key,
            node.clone(),
            node.clone(),
            ClientConfig {
                confirmation_timeout_ms: 60,
                poll_interval_ms: 5,
            },
        );
        let backend = Arc::new(InMemoryRecordBackend::new());
        let store = RecordStore::new(
            backend.clone(),
            Arc::new(client),
            StoreConfig {
                grace_period_secs: 60,
                ..StoreConfig::default()
            },
        );
        Harness {
            node,
            backend,
            store,
        }
    }

    fn alice() -> PrincipalId {
        PrincipalId::new("alice").unwrap()
    }

    fn bob() -> PrincipalId {
        PrincipalId::new("bob").unwrap()
    }

    #[test]
    fn create_sets_deadline_and_hash() {
        let h = harness();
        let now = Utc::now();
        let record = h.store.create_at(alice(), b"doc".to_vec(), now).unwrap();

        assert!(!record.is_committed());
        assert_eq!(record.expires_at(), Some(now + Duration::seconds(60)));
        assert_eq!(record.content_hash(), ContentHasher::CONTENT.hash(b"doc"));
        assert!(record.invariants_hold());
        assert_eq!(h.store.get(record.id(), &alice()).unwrap(), record);
    }

    #[test]
    fn create_rejects_oversized_content() {
        let key = SigningKey::from_bytes([3; 32]);
        let node = Arc::new(InMemoryLedgerNode::new(key.verifying_key()));
        let client = LedgerClient::new(key, node.clone(), node, ClientConfig::default());
        let store = RecordStore::new(
            Arc::new(InMemoryRecordBackend::new()),
            Arc::new(client),
            StoreConfig {
                max_content_bytes: 4,
                ..StoreConfig::default()
            },
        );
        assert!(matches!(
            store.create(alice(), b"too long".to_vec()),
            Err(StoreError::ContentTooLarge { size: 8, limit: 4 })
        ));
    }

    #[test]
    fn create_surfaces_backend_failure() {
        let h = harness();
        h.backend.set_unavailable(true);
        assert!(matches!(
            h.store.create(alice(), b"x".to_vec()),
            Err(StoreError::Backend(_))
        ));
    }

    #[test]
    fn foreign_owner_reads_not_found() {
        let h = harness();
        let record = h.store.create(alice(), b"x".to_vec()).unwrap();
        assert!(matches!(
            h.store.get(record.id(), &bob()),
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn commit_once_then_already_committed() {
        let h = harness();
        let record = h.store.create(alice(), b"contract".to_vec()).unwrap();

        let committed = h.store.commit(record.id(), &alice()).await.unwrap();
        assert!(committed.is_committed());
        assert!(committed.expires_at().is_none());
        assert!(committed.invariants_hold());
        let first_ref = committed.ledger_tx().unwrap();

        let doc = h.store.ledger().document_record(&record.content_hash()).await.unwrap();
        assert_eq!(doc.created_in, Some(first_ref));

        let second = h.store.commit(record.id(), &alice()).await;
        assert!(matches!(second, Err(StoreError::AlreadyCommitted(id)) if id == record.id()));

        let stored = h.store.get(record.id(), &alice()).unwrap();
        assert_eq!(stored.ledger_tx(), Some(first_ref));
        assert_eq!(stored.content_hash(), record.content_hash());
        assert_eq!(h.node.events().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn commit_unknown_or_foreign_is_not_found_without_ledger_call() {
        let h = harness();
        let record = h.store.create(alice(), b"x".to_vec()).unwrap();

        assert!(matches!(
            h.store.commit(RecordId::new(), &alice()).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            h.store.commit(record.id(), &bob()).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(h.node.events().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_ledger_write_leaves_record_unchanged() {
        let h = harness();
        let record = h.store.create(alice(), b"x".to_vec()).unwrap();
        h.node.set_offline(true);

        let err = h.store.commit(record.id(), &alice()).await.unwrap_err();
        assert!(err.ledger_error().is_some_and(LedgerClientError::is_retryable));
        assert_eq!(h.store.get(record.id(), &alice()).unwrap(), record);

        h.node.set_offline(false);
        let committed = h.store.commit(record.id(), &alice()).await.unwrap();
        assert!(committed.is_committed());
    }

    #[tokio::test]
    async fn late_confirmation_is_adopted_on_retry() {
        let h = harness();
        let record = h.store.create(alice(), b"slow".to_vec()).unwrap();

        h.node.hold_finality(true);
        let err = h.store.commit(record.id(), &alice()).await.unwrap_err();
        assert!(matches!(err, StoreError::LedgerWriteFailed(_)));
        assert!(!h.store.get(record.id(), &alice()).unwrap().is_committed());

        // The write lands after the client gave up.
        h.node.hold_finality(false);
        assert_eq!(h.node.finalize_pending().unwrap(), 1);

        let committed = h.store.commit(record.id(), &alice()).await.unwrap();
        let doc = h.store.ledger().document_record(&record.content_hash()).await.unwrap();
        assert_eq!(committed.ledger_tx(), doc.created_in);
        assert_eq!(h.node.document_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn identical_uploads_share_one_creation_entry() {
        let h = harness();
        let first = h.store.create(alice(), b"same".to_vec()).unwrap();
        let second = h.store.create(bob(), b"same".to_vec()).unwrap();

        let a = h.store.commit(first.id(), &alice()).await.unwrap();
        let b = h.store.commit(second.id(), &bob()).await.unwrap();
        assert_eq!(a.ledger_tx(), b.ledger_tx());
        assert_eq!(h.node.document_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn sweep_reaps_only_expired_ephemeral_records() {
        let h = harness();
        let now = Utc::now();
        let old = h.store.create_at(alice(), b"old".to_vec(), now - Duration::seconds(120)).unwrap();
        let fresh = h.store.create_at(alice(), b"fresh".to_vec(), now).unwrap();
        let kept = h.store.create_at(alice(), b"kept".to_vec(), now - Duration::seconds(120)).unwrap();
        h.backend.save(&{
            let mut r = kept.clone();
            r.mark_committed(LedgerRef::new(attest_types::TxHash::from_digest([9; 32]), 1));
            r
        }).unwrap();

        let report = h.store.expire_sweep(now).await.unwrap();
        assert_eq!(report.examined, 1);
        assert_eq!(report.reaped, 1);

        assert!(h.backend.load(&old.id()).unwrap().is_none());
        assert!(h.backend.load(&fresh.id()).unwrap().is_some());
        assert!(h.backend.load(&kept.id()).unwrap().is_some());

        let far_future = now + Duration::days(3650);
        let report = h.store.expire_sweep(far_future).await.unwrap();
        assert_eq!(report.reaped, 1);
        assert!(h.backend.load(&kept.id()).unwrap().is_some());
    }

    #[tokio::test]
    async fn expired_record_cannot_be_committed() {
        let h = harness();
        let now = Utc::now();
        let stale = h.store.create_at(alice(), b"late".to_vec(), now - Duration::seconds(61)).unwrap();
        assert!(matches!(
            h.store.commit(stale.id(), &alice()).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(h.node.events().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn commit_and_sweep_race_never_loses_a_committed_record() {
        let h = Arc::new(harness());
        let now = Utc::now();
        let mut ids = Vec::new();
        for i in 0..16u8 {
            ids.push(h.store.create_at(alice(), vec![i], now).unwrap().id());
        }
        let sweep_at = now + Duration::seconds(60);

        let committer = {
            let h = h.clone();
            let ids = ids.clone();
            tokio::spawn(async move {
                let mut committed = Vec::new();
                for id in ids {
                    if h.store.commit(id, &alice()).await.is_ok() {
                        committed.push(id);
                    }
                }
                committed
            })
        };
        let sweeper = {
            let h = h.clone();
            tokio::spawn(async move { h.store.expire_sweep(sweep_at).await.unwrap() })
        };

        let committed = committer.await.unwrap();
        sweeper.await.unwrap();
        for id in committed {
            let record = h.backend.load(&id).unwrap().unwrap();
            assert!(record.is_committed());
            assert!(record.invariants_hold());
        }
    }

    #[tokio::test]
    async fn sweep_skips_record_committed_while_it_waited() {
        let h = harness();
        let record = h.store.create(alice(), b"late".to_vec()).unwrap();
        let deadline = record.expires_at().unwrap();

        let guard = h.store.locks.acquire(record.id()).await;
        let commit_wins = async {
            // Let the sweep collect its candidates and park on the lock.
            tokio::task::yield_now().await;
            let mut won = h.backend.load(&record.id()).unwrap().unwrap();
            won.mark_committed(LedgerRef::new(TxHash::from_digest([1; 32]), 1));
            h.backend.save(&won).unwrap();
            drop(guard);
        };
        let (report, ()) = tokio::join!(h.store.expire_sweep(deadline), commit_wins);

        let report = report.unwrap();
        assert_eq!(report.examined, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.reaped, 0);
        assert!(h.store.get(record.id(), &alice()).unwrap().is_committed());
    }

    #[tokio::test]
    async fn delete_is_local_only() {
        let h = harness();
        let record = h.store.create(alice(), b"gone".to_vec()).unwrap();
        h.store.commit(record.id(), &alice()).await.unwrap();

        assert!(matches!(
            h.store.delete(record.id(), &bob()).await,
            Err(StoreError::NotFound(_))
        ));
        h.store.delete(record.id(), &alice()).await.unwrap();
        assert!(matches!(
            h.store.get(record.id(), &alice()),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            h.store.delete(record.id(), &alice()).await,
            Err(StoreError::NotFound(_))
        ));

        let doc = h.store.ledger().document_record(&record.content_hash()).await.unwrap();
        assert!(doc.is_recorded());
    }

    #[tokio::test]
    async fn log_access_requires_commit_and_appends_refs() {
        let h = harness();
        let record = h.store.create(alice(), b"audited".to_vec()).unwrap();
        assert!(matches!(
            h.store.log_access(record.id(), &alice(), bob()).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(h.node.events().unwrap().is_empty());

        h.store.commit(record.id(), &alice()).await.unwrap();
        let first = h.store.log_access(record.id(), &alice(), bob()).await.unwrap();
        let second = h.store.log_access(record.id(), &alice(), alice()).await.unwrap();

        assert_eq!(second.record.access_refs().len(), 2);
        assert_eq!(
            second.record.access_refs(),
            &[first.receipt.ledger_ref, second.receipt.ledger_ref]
        );
    }

    #[tokio::test]
    async fn failed_access_write_leaves_record_unchanged() {
        let h = harness();
        let record = h.store.create(alice(), b"x".to_vec()).unwrap();
        let committed = h.store.commit(record.id(), &alice()).await.unwrap();

        h.node.set_offline(true);
        assert!(matches!(
            h.store.log_access(record.id(), &alice(), bob()).await,
            Err(StoreError::LedgerWriteFailed(_))
        ));
        assert_eq!(h.backend.load(&record.id()).unwrap().unwrap(), committed);
    }

    #[test]
    fn list_returns_live_records_for_owner() {
        let h = harness();
        let now = Utc::now();
        let a = h.store.create_at(alice(), b"a".to_vec(), now).unwrap();
        h.store.create_at(alice(), b"stale".to_vec(), now - Duration::seconds(90)).unwrap();
        h.store.create_at(bob(), b"b".to_vec(), now).unwrap();

        let listed = h.store.list(&alice()).unwrap();
        assert_eq!(listed.iter().map(Record::id).collect::<Vec<_>>(), vec![a.id()]);
        assert_eq!(h.store.len().unwrap(), 3);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Whatever mix of commits and sweep times, committed records
        /// survive and every record keeps `committed <=> no deadline`.
        #[test]
        fn sweep_never_removes_committed(
            plan in proptest::collection::vec((any::<bool>(), 0i64..240), 1..12),
            sweep_offsets in proptest::collection::vec(0i64..100_000, 1..4),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let h = harness();
                let base = Utc::now();
                let mut committed = Vec::new();
                for (i, (commit, age)) in plan.iter().enumerate() {
                    let mut content = vec![i as u8];
                    content.extend_from_slice(&age.to_le_bytes());
                    let created = base - Duration::seconds(*age);
                    let record = h.store.create_at(alice(), content, created).unwrap();
                    if *commit && !record.is_expired(Utc::now()) {
                        h.store.commit(record.id(), &alice()).await.unwrap();
                        committed.push(record.id());
                    }
                }

                for offset in &sweep_offsets {
                    h.store.expire_sweep(base + Duration::seconds(*offset)).await.unwrap();
                }

                for id in &committed {
                    let record = h.backend.load(id).unwrap().unwrap();
                    prop_assert!(record.is_committed());
                }
                for record in h.store.list(&alice()).unwrap() {
                    prop_assert!(record.invariants_hold());
                }
                Ok(())
            })?;
        }
    }
}
