use attest_types::{ContentHash, TxHash};

/// BLAKE3 hasher with an optional domain tag.
///
/// [`ContentHasher::CONTENT`] is the plain digest of a record's bytes: it
/// carries no tag so that anyone holding the bytes can reproduce the ledger
/// key with a stock BLAKE3 implementation. Every other hasher prepends its
/// tag, so a transaction payload can never collide with a content digest.
pub struct ContentHasher {
    domain: Option<&'static str>,
}

impl ContentHasher {
    /// Hasher for record content. No domain tag.
    pub const CONTENT: Self = Self { domain: None };
    /// Hasher for signed ledger transaction payloads.
    pub const TRANSACTION: Self = Self {
        domain: Some("attest-tx-v1"),
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self {
            domain: Some(domain),
        }
    }

    /// Raw 32-byte digest of `data` under this hasher's domain.
    pub fn digest(&self, data: &[u8]) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        if let Some(domain) = self.domain {
            hasher.update(domain.as_bytes());
            hasher.update(b":");
        }
        hasher.update(data);
        *hasher.finalize().as_bytes()
    }

    /// Hash bytes into a [`ContentHash`].
    pub fn hash(&self, data: &[u8]) -> ContentHash {
        ContentHash::from_digest(self.digest(data))
    }

    /// Hash a serializable value as JSON into a [`TxHash`].
    pub fn hash_json<T: serde::Serialize>(&self, value: &T) -> Result<TxHash, HasherError> {
        let data =
            serde_json::to_vec(value).map_err(|e| HasherError::Serialization(e.to_string()))?;
        Ok(TxHash::from_digest(self.digest(&data)))
    }

    /// Verify that data produces the expected content hash.
    pub fn verify(&self, data: &[u8], expected: &ContentHash) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher, if any.
    pub fn domain(&self) -> Option<&str> {
        self.domain
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),
}
