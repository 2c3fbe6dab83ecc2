use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use attest_types::{PrincipalId, RecordId};
use chrono::{DateTime, Utc};

use crate::backend::RecordBackend;
use crate::error::{StoreError, StoreResult};
use crate::record::Record;

/// In-memory, HashMap-based record backend.
///
/// Intended for tests and embedding. Records and the expiry index share one
/// `RwLock`, so the index is never observed out of step with the records.
pub struct InMemoryRecordBackend {
    state: RwLock<MemoryState>,
    unavailable: AtomicBool,
}

#[derive(Default)]
struct MemoryState {
    records: HashMap<RecordId, Record>,
    expiry: BTreeSet<(DateTime<Utc>, RecordId)>,
}

impl InMemoryRecordBackend {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every call fail with [`StoreError::Backend`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Replace stored content bytes without touching the recorded hash.
    /// Fault injection: models on-disk corruption or tampering.
    pub fn tamper_content(&self, id: &RecordId, content: Vec<u8>) -> StoreResult<bool> {
        let mut state = self.write()?;
        Ok(match state.records.get_mut(id) {
            Some(record) => {
                record.set_content(content);
                true
            }
            None => false,
        })
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, MemoryState>> {
        self.ensure_available()?;
        self.state
            .read()
            .map_err(|_| StoreError::Backend("record store lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, MemoryState>> {
        self.ensure_available()?;
        self.state
            .write()
            .map_err(|_| StoreError::Backend("record store lock poisoned".into()))
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("in-memory backend marked unavailable".into()));
        }
        Ok(())
    }
}

impl Default for InMemoryRecordBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordBackend for InMemoryRecordBackend {
    fn load(&self, id: &RecordId) -> StoreResult<Option<Record>> {
        Ok(self.read()?.records.get(id).cloned())
    }

    fn save(&self, record: &Record) -> StoreResult<()> {
        let mut state = self.write()?;
        if let Some(deadline) = state.records.get(&record.id()).and_then(Record::expires_at) {
            state.expiry.remove(&(deadline, record.id()));
        }
        if let Some(deadline) = record.expires_at() {
            state.expiry.insert((deadline, record.id()));
        }
        state.records.insert(record.id(), record.clone());
        Ok(())
    }

    fn remove(&self, id: &RecordId) -> StoreResult<bool> {
        let mut state = self.write()?;
        match state.records.remove(id) {
            Some(record) => {
                if let Some(deadline) = record.expires_at() {
                    state.expiry.remove(&(deadline, *id));
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn expired_before(&self, now: DateTime<Utc>) -> StoreResult<Vec<RecordId>> {
        let state = self.read()?;
        Ok(state
            .expiry
            .iter()
            .take_while(|(deadline, _)| *deadline <= now)
            .map(|(_, id)| *id)
            .collect())
    }

    fn list_by_owner(&self, owner: &PrincipalId) -> StoreResult<Vec<RecordId>> {
        let state = self.read()?;
        let mut ids: Vec<RecordId> = state
            .records
            .values()
            .filter(|record| record.is_owned_by(owner))
            .map(Record::id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.records.len())
    }
}

impl std::fmt::Debug for InMemoryRecordBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len().unwrap_or_default();
        f.debug_struct("InMemoryRecordBackend")
            .field("record_count", &count)
            .finish()
    }
}
