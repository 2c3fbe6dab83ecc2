//! High-level SDK for Attest.
//!
//! [`Attest`] ties the record store, the ledger client and the
//! verification service together behind the operations an application
//! actually calls: upload, commit, verify, log access, delete and sweep.

pub mod attest;
pub mod config;
pub mod error;
pub mod outcome;

pub use attest::Attest;
pub use config::AttestConfig;
pub use error::{SdkError, SdkResult};
pub use outcome::{CommitOutcome, UploadReceipt};

// Re-export key types
pub use attest_ledger::{AccessRecord, InMemoryLedgerNode, JournalError, ProgramError};
pub use attest_store::{Record, SweepReport};
pub use attest_types::{ContentHash, LedgerRef, PrincipalId, RecordId};
pub use attest_verify::{AccessReport, HistoryView, VerificationResult, Verdict};
