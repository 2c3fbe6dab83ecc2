//! Integrity verification and access auditing for committed records.
//!
//! Verification is a two-step check. The stored bytes are rehashed first;
//! a mismatch there is reported as local tampering without contacting the
//! ledger. Only when the local copy is intact is the ledger's creation
//! record consulted.
//!
//! ```text
//! stored bytes ──hash──▶ local_hash ──≠ record.content_hash──▶ LocalTamperDetected
//!                                   └─= ──▶ ledger record ──≠──▶ LedgerMismatch
//!                                                         └─=──▶ Verified
//! ```

pub mod error;
pub mod report;
pub mod service;

pub use error::{VerifyError, VerifyResult};
pub use report::{AccessReport, HistoryView, VerificationResult, Verdict};
pub use service::VerificationService;
