use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use attest_types::RecordId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slot = Arc<AsyncMutex<()>>;

/// Per-record async locks.
///
/// Holding a [`RecordGuard`] for an id excludes every other operation on
/// that record, including across `.await` points such as a ledger write.
/// Operations on different records never contend. Entries are dropped
/// once nobody holds or waits on them, so the table stays proportional to
/// in-flight work rather than to the number of records.
#[derive(Default)]
pub struct RecordLocks {
    slots: Arc<Mutex<HashMap<RecordId, Slot>>>,
}

/// Exclusive access to one record. Released on drop.
pub struct RecordGuard {
    id: RecordId,
    slot: Slot,
    guard: Option<OwnedMutexGuard<()>>,
    slots: Arc<Mutex<HashMap<RecordId, Slot>>>,
}

impl RecordLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`.
    pub async fn acquire(&self, id: RecordId) -> RecordGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots.entry(id).or_default().clone()
        };
        let guard = slot.clone().lock_owned().await;
        RecordGuard {
            id,
            slot,
            guard: Some(guard),
            slots: self.slots.clone(),
        }
    }

    /// Number of records currently locked or awaited.
    pub fn active(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl RecordGuard {
    pub fn id(&self) -> RecordId {
        self.id
    }
}

impl Drop for RecordGuard {
    fn drop(&mut self) {
        self.guard.take();
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        // Only the table and this guard still reference the slot.
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.id);
        }
    }
}

impl std::fmt::Debug for RecordLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordLocks")
            .field("active", &self.active())
            .finish()
    }
}
