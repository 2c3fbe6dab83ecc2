//! Cryptographic primitives for Attest.
//!
//! Provides the content hash engine (BLAKE3-256) and the Ed25519 keys the
//! single privileged ledger writer signs transactions with.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod hasher;
pub mod signer;

pub use hasher::{ContentHasher, HasherError};
pub use signer::{Signature, SignatureError, SigningKey, VerifyingKey};
