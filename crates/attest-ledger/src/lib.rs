//! Append-only document ledger for Attest.
//!
//! The ledger is an external, trusted, single-writer program. This crate
//! models it precisely at its interface so the rest of the system can be
//! built and tested against exact semantics:
//! - [`LedgerProgram`]: per-content-hash state machine (`Unrecorded` →
//!   `Recorded`), duplicate-creation rejection, append-only access history
//! - Signed [`Transaction`]s gated to one authorized writer key
//! - [`TransactionChannel`] / [`QueryChannel`]: the two capabilities a
//!   client is given (submit-write, query-read)
//! - [`InMemoryLedgerNode`]: channel implementation for tests, demos and
//!   embedding, with fault injection; optionally backed by a
//!   [`LedgerJournal`] so its state survives a restart

pub mod error;
pub mod journal;
pub mod node;
pub mod program;
pub mod records;
pub mod traits;

pub use error::{ChannelError, JournalError, ProgramError};
pub use journal::{JournalEntry, LedgerJournal};
pub use node::InMemoryLedgerNode;
pub use program::{ExecutionContext, LedgerProgram};
pub use records::{
    AccessRecord, Call, DocumentRecord, LedgerEvent, SignedTransaction, Transaction, TxReceipt,
    TxStatus,
};
pub use traits::{QueryChannel, TransactionChannel};
