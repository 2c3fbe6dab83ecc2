//! Record storage for Attest.
//!
//! A [`Record`] starts ephemeral, with an expiry deadline, and may be
//! committed exactly once. Committing writes the record's content hash to
//! the ledger and clears the deadline for good.
//!
//! # Design Rules
//!
//! 1. `expires_at` is present iff the record is not committed.
//! 2. The ledger write is confirmed before any local state changes; a failed
//!    write leaves the record untouched.
//! 3. Commit, sweep, delete and access logging on one record are serialized
//!    by a per-record lock; `committed` is re-read under that lock.
//! 4. The expiry sweep never removes a committed record.
//! 5. Deletion is local only. Ledger entries outlive the record.
//!
//! # Storage Backends
//!
//! All backends implement [`RecordBackend`]:
//!
//! - [`InMemoryRecordBackend`] — `HashMap` + expiry index, for tests and embedding
//! - [`FileRecordBackend`] — one CRC-framed metadata file plus one content file per record

pub mod backend;
pub mod config;
pub mod error;
pub mod file;
pub mod locks;
pub mod memory;
pub mod record;
pub mod store;

pub use backend::RecordBackend;
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use file::FileRecordBackend;
pub use locks::RecordLocks;
pub use memory::InMemoryRecordBackend;
pub use record::Record;
pub use store::{AccessLogged, RecordStore, SweepReport};
