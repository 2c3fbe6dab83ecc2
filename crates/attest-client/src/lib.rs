//! Ledger client for Attest.
//!
//! [`LedgerClient`] is the only holder of the writer credential. It signs
//! calls, submits them over a [`TransactionChannel`], and waits until the
//! ledger reports them final. Reads go over a [`QueryChannel`].
//!
//! Nothing is retried here. Transport faults surface as
//! [`LedgerClientError::Unavailable`] (retryable by caller policy), program
//! rejections as [`LedgerClientError::Rejected`] (never retryable).
//!
//! [`TransactionChannel`]: attest_ledger::TransactionChannel
//! [`QueryChannel`]: attest_ledger::QueryChannel

pub mod client;
pub mod config;
pub mod error;

pub use client::{LedgerClient, WriteReceipt};
pub use config::ClientConfig;
pub use error::{ClientResult, LedgerClientError};
