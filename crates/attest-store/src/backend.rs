use attest_types::{PrincipalId, RecordId};
use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use crate::record::Record;

/// Durable persistence for records.
///
/// Backends are plain key-value storage plus two secondary indexes. They
/// never interpret record state: the commit/expiry rules live in
/// [`RecordStore`](crate::RecordStore), which is the only writer.
///
/// All implementations must satisfy these invariants:
/// - `save` replaces the whole record (metadata and content) atomically
///   with respect to `load`.
/// - The expiry index reflects the last saved `expires_at`; a committed
///   record (no deadline) is never returned by `expired_before`.
/// - A `load` racing a `remove` returns either the full record or `None`.
pub trait RecordBackend: Send + Sync {
    /// Load a record with its content. `Ok(None)` if it does not exist.
    fn load(&self, id: &RecordId) -> StoreResult<Option<Record>>;

    /// Insert or replace a record.
    fn save(&self, record: &Record) -> StoreResult<()>;

    /// Remove a record and its content. Returns `true` if it existed.
    fn remove(&self, id: &RecordId) -> StoreResult<bool>;

    /// Ids of every record whose `expires_at <= now`, earliest first.
    fn expired_before(&self, now: DateTime<Utc>) -> StoreResult<Vec<RecordId>>;

    /// Ids of every record owned by `owner`.
    fn list_by_owner(&self, owner: &PrincipalId) -> StoreResult<Vec<RecordId>>;

    /// Number of stored records.
    fn len(&self) -> StoreResult<usize>;

    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}
