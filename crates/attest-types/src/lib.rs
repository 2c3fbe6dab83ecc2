//! Foundation types for Attest.
//!
//! Every other Attest crate depends on `attest-types`. The types here are
//! plain values: they carry no storage or ledger behavior of their own.
//!
//! # Key Types
//!
//! - [`ContentHash`] — 256-bit content digest, used as the ledger key
//! - [`TxHash`] — identifier of a submitted ledger transaction
//! - [`LedgerRef`] — reference to a confirmed ledger write
//! - [`RecordId`] — UUID v7 record identifier
//! - [`PrincipalId`] — owner / accessor / writer identity

pub mod error;
pub mod hash;
pub mod ids;
pub mod ledger_ref;

pub use error::TypeError;
pub use hash::{ContentHash, TxHash};
pub use ids::{PrincipalId, RecordId};
pub use ledger_ref::LedgerRef;
