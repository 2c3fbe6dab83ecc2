use attest_types::{ContentHash, LedgerRef, PrincipalId, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One uploaded artifact.
///
/// Fields are private: state only changes through [`RecordStore`], which
/// keeps `expires_at.is_some() == !committed` at every point in time.
/// The serialized form is the record's metadata; content bytes are stored
/// alongside it by the backend.
///
/// [`RecordStore`]: crate::RecordStore
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    id: RecordId,
    owner: PrincipalId,
    #[serde(skip)]
    content: Vec<u8>,
    content_hash: ContentHash,
    committed: bool,
    ledger_tx: Option<LedgerRef>,
    expires_at: Option<DateTime<Utc>>,
    access_refs: Vec<LedgerRef>,
    created_at: DateTime<Utc>,
}

impl Record {
    pub(crate) fn ephemeral(
        owner: PrincipalId,
        content: Vec<u8>,
        content_hash: ContentHash,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RecordId::new(),
            owner,
            content,
            content_hash,
            committed: false,
            ledger_tx: None,
            expires_at: Some(expires_at),
            access_refs: Vec::new(),
            created_at,
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn owner(&self) -> &PrincipalId {
        &self.owner
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Digest of the content taken at creation. Never recomputed in place.
    pub fn content_hash(&self) -> ContentHash {
        self.content_hash
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    pub fn ledger_tx(&self) -> Option<LedgerRef> {
        self.ledger_tx
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// References to access-log writes, oldest first.
    pub fn access_refs(&self) -> &[LedgerRef] {
        &self.access_refs
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_owned_by(&self, principal: &PrincipalId) -> bool {
        self.owner == *principal
    }

    /// Uncommitted and past its deadline.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        !self.committed && self.expires_at.is_some_and(|deadline| deadline <= now)
    }

    /// `committed` and `expires_at` agree, and only committed records carry a
    /// ledger ref.
    pub fn invariants_hold(&self) -> bool {
        self.committed == self.expires_at.is_none() && self.committed == self.ledger_tx.is_some()
    }

    pub(crate) fn mark_committed(&mut self, ledger_tx: LedgerRef) {
        debug_assert!(!self.committed, "commit transition happens once");
        self.committed = true;
        self.expires_at = None;
        self.ledger_tx = Some(ledger_tx);
    }

    pub(crate) fn push_access(&mut self, access: LedgerRef) {
        self.access_refs.push(access);
    }

    pub(crate) fn set_content(&mut self, content: Vec<u8>) {
        self.content = content;
    }
}
