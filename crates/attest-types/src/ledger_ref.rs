use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hash::TxHash;

/// Reference to a confirmed ledger write.
///
/// `sequence` is the ledger-wide position at which the transaction was
/// applied (1-based, monotonic). Two refs from the same ledger compare in
/// application order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerRef {
    pub tx_hash: TxHash,
    pub sequence: u64,
}

impl LedgerRef {
    pub fn new(tx_hash: TxHash, sequence: u64) -> Self {
        Self { tx_hash, sequence }
    }
}

impl PartialOrd for LedgerRef {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LedgerRef {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sequence
            .cmp(&other.sequence)
            .then(self.tx_hash.cmp(&other.tx_hash))
    }
}

impl fmt::Display for LedgerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} [{}]", self.sequence, self.tx_hash.short_hex())
    }
}
