use std::collections::HashMap;

use attest_crypto::VerifyingKey;
use attest_types::{ContentHash, LedgerRef, PrincipalId, TxHash};
use chrono::{DateTime, Utc};

use crate::error::ProgramError;
use crate::records::{AccessRecord, Call, DocumentRecord, LedgerEvent, SignedTransaction};

/// Where in the ledger a call is being applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionContext {
    pub tx_hash: TxHash,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionContext {
    pub fn ledger_ref(&self) -> LedgerRef {
        LedgerRef::new(self.tx_hash, self.sequence)
    }
}

#[derive(Default)]
struct DocumentState {
    record: Option<DocumentRecord>,
    accesses: Vec<AccessRecord>,
}

/// The ledger program: one creation record plus an append-only access
/// history per content hash, writable only by one authorized key.
///
/// A hash moves `Unrecorded → Recorded` exactly once. Every mutating call is
/// checked against the writer before any state is touched, and a failing
/// call leaves the state exactly as it was.
pub struct LedgerProgram {
    writer: VerifyingKey,
    writer_principal: PrincipalId,
    last_nonce: u64,
    documents: HashMap<ContentHash, DocumentState>,
    events: Vec<LedgerEvent>,
}

impl LedgerProgram {
    pub fn new(writer: VerifyingKey) -> Self {
        let writer_principal = writer.to_principal();
        Self {
            writer,
            writer_principal,
            last_nonce: 0,
            documents: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// The single principal allowed to mutate the ledger.
    pub fn writer(&self) -> &PrincipalId {
        &self.writer_principal
    }

    pub fn writer_key(&self) -> &VerifyingKey {
        &self.writer
    }

    /// Authenticate and apply a signed transaction.
    ///
    /// Checks, in order: signature, authorized signer, nonce freshness. The
    /// nonce is consumed only when the call itself succeeds.
    pub fn execute(
        &mut self,
        signed: &SignedTransaction,
        ctx: &ExecutionContext,
    ) -> Result<LedgerEvent, ProgramError> {
        signed.verify_signature()?;
        let tx = &signed.transaction;
        let caller = tx.signer.to_principal();
        self.authorize(&caller)?;
        if tx.nonce <= self.last_nonce {
            return Err(ProgramError::StaleNonce {
                nonce: tx.nonce,
                last: self.last_nonce,
            });
        }

        let event = match &tx.call {
            Call::LogNewDocument { content_hash } => {
                self.log_new_document(&caller, *content_hash, ctx)?
            }
            Call::LogAccess {
                content_hash,
                accessor,
            } => self.log_access(&caller, *content_hash, accessor.clone(), ctx)?,
        };
        self.last_nonce = tx.nonce;
        Ok(event)
    }

    /// Record the creation of a document. Fails if the hash is already
    /// recorded; the existing record is never overwritten.
    pub fn log_new_document(
        &mut self,
        caller: &PrincipalId,
        content_hash: ContentHash,
        ctx: &ExecutionContext,
    ) -> Result<LedgerEvent, ProgramError> {
        self.authorize(caller)?;
        let state = self.documents.entry(content_hash).or_default();
        if state.record.is_some() {
            return Err(ProgramError::DuplicateDocument(content_hash));
        }

        let at = ctx.ledger_ref();
        state.record = Some(DocumentRecord {
            content_hash,
            creator: Some(caller.clone()),
            timestamp: ctx.timestamp,
            created_in: Some(at),
        });

        let event = LedgerEvent::DocumentLogged {
            content_hash,
            creator: caller.clone(),
            timestamp: ctx.timestamp,
            at,
        };
        self.events.push(event.clone());
        tracing::debug!(hash = %content_hash.short_hex(), seq = at.sequence, "document logged");
        Ok(event)
    }

    /// Append one access record to a recorded document's history.
    pub fn log_access(
        &mut self,
        caller: &PrincipalId,
        content_hash: ContentHash,
        accessor: PrincipalId,
        ctx: &ExecutionContext,
    ) -> Result<LedgerEvent, ProgramError> {
        self.authorize(caller)?;
        let state = match self.documents.get_mut(&content_hash) {
            Some(state) if state.record.is_some() => state,
            _ => return Err(ProgramError::DocumentNotRecorded(content_hash)),
        };

        let at = ctx.ledger_ref();
        state.accesses.push(AccessRecord {
            accessor: accessor.clone(),
            timestamp: ctx.timestamp,
            logged_in: at,
        });

        let event = LedgerEvent::AccessLogged {
            content_hash,
            accessor,
            timestamp: ctx.timestamp,
            at,
        };
        self.events.push(event.clone());
        tracing::debug!(hash = %content_hash.short_hex(), seq = at.sequence, "access logged");
        Ok(event)
    }

    /// Creation record for `content_hash`, or [`DocumentRecord::empty`].
    pub fn document_record(&self, content_hash: &ContentHash) -> DocumentRecord {
        self.documents
            .get(content_hash)
            .and_then(|state| state.record.clone())
            .unwrap_or_else(DocumentRecord::empty)
    }

    /// Full access history for `content_hash`, oldest first.
    pub fn access_history(&self, content_hash: &ContentHash) -> Vec<AccessRecord> {
        self.documents
            .get(content_hash)
            .map(|state| state.accesses.clone())
            .unwrap_or_default()
    }

    /// Every event emitted so far, in application order.
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn document_count(&self) -> usize {
        self.documents
            .values()
            .filter(|state| state.record.is_some())
            .count()
    }

    /// Rewrite the hash stored in a creation record. Fault injection only:
    /// models a ledger entry that disagrees with the key it is stored under.
    pub(crate) fn force_document_hash(&mut self, key: &ContentHash, stored: ContentHash) -> bool {
        match self.documents.get_mut(key).and_then(|s| s.record.as_mut()) {
            Some(record) => {
                record.content_hash = stored;
                true
            }
            None => false,
        }
    }

    fn authorize(&self, caller: &PrincipalId) -> Result<(), ProgramError> {
        if *caller != self.writer_principal {
            return Err(ProgramError::Unauthorized {
                caller: caller.clone(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for LedgerProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerProgram")
            .field("writer", &self.writer_principal)
            .field("documents", &self.document_count())
            .field("events", &self.events.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attest_crypto::SigningKey;
    use proptest::prelude::*;

    fn writer_key() -> SigningKey {
        SigningKey::from_bytes([7; 32])
    }

    fn program() -> (LedgerProgram, PrincipalId) {
        let key = writer_key();
        let program = LedgerProgram::new(key.verifying_key());
        let writer = program.writer().clone();
        (program, writer)
    }

    fn ctx(sequence: u64) -> ExecutionContext {
        ExecutionContext {
            tx_hash: TxHash::from_digest([sequence as u8; 32]),
            sequence,
            timestamp: Utc::now(),
        }
    }

    fn hash(seed: u8) -> ContentHash {
        ContentHash::from_digest([seed; 32])
    }

    fn principal(name: &str) -> PrincipalId {
        PrincipalId::new(name).unwrap()
    }

    #[test]
    fn log_new_document_records_creation() {
        let (mut program, writer) = program();
        let event = program.log_new_document(&writer, hash(1), &ctx(1)).unwrap();
        assert!(matches!(event, LedgerEvent::DocumentLogged { .. }));

        let record = program.document_record(&hash(1));
        assert!(record.is_recorded());
        assert_eq!(record.content_hash, hash(1));
        assert_eq!(record.creator.as_ref(), Some(&writer));
        assert_eq!(record.created_in.unwrap().sequence, 1);
    }

    #[test]
    fn duplicate_creation_is_rejected_and_first_record_kept() {
        let (mut program, writer) = program();
        program.log_new_document(&writer, hash(1), &ctx(1)).unwrap();
        let before = program.document_record(&hash(1));

        let err = program
            .log_new_document(&writer, hash(1), &ctx(2))
            .unwrap_err();
        assert_eq!(err, ProgramError::DuplicateDocument(hash(1)));
        assert_eq!(program.document_record(&hash(1)), before);
        assert_eq!(program.events().len(), 1);
    }

    #[test]
    fn access_on_unrecorded_hash_fails() {
        let (mut program, writer) = program();
        let err = program
            .log_access(&writer, hash(9), principal("auditor"), &ctx(1))
            .unwrap_err();
        assert_eq!(err, ProgramError::DocumentNotRecorded(hash(9)));
        assert!(program.access_history(&hash(9)).is_empty());
    }

    #[test]
    fn non_writer_is_unauthorized() {
        let (mut program, _) = program();
        let intruder = principal("mallory");
        let err = program
            .log_new_document(&intruder, hash(1), &ctx(1))
            .unwrap_err();
        assert_eq!(err, ProgramError::Unauthorized { caller: intruder });
        assert!(!program.document_record(&hash(1)).is_recorded());
    }

    #[test]
    fn reads_of_unrecorded_hash_are_empty() {
        let (program, _) = program();
        assert_eq!(program.document_record(&hash(3)), DocumentRecord::empty());
        assert!(program.access_history(&hash(3)).is_empty());
    }

    #[test]
    fn histories_are_per_hash() {
        let (mut program, writer) = program();
        program.log_new_document(&writer, hash(1), &ctx(1)).unwrap();
        program.log_new_document(&writer, hash(2), &ctx(2)).unwrap();
        program
            .log_access(&writer, hash(1), principal("a"), &ctx(3))
            .unwrap();
        program
            .log_access(&writer, hash(2), principal("b"), &ctx(4))
            .unwrap();
        program
            .log_access(&writer, hash(1), principal("c"), &ctx(5))
            .unwrap();

        let names: Vec<_> = program
            .access_history(&hash(1))
            .into_iter()
            .map(|a| a.accessor.to_string())
            .collect();
        assert_eq!(names, vec!["a", "c"]);
        assert_eq!(program.access_history(&hash(2)).len(), 1);
        assert_eq!(program.document_count(), 2);
    }

    #[test]
    fn execute_checks_signature_signer_and_nonce() {
        let key = writer_key();
        let (mut program, _) = program();
        let call = Call::LogNewDocument {
            content_hash: hash(1),
        };

        let outsider = SigningKey::from_bytes([8; 32]);
        let foreign = SignedTransaction::sign(call.clone(), 1, &outsider).unwrap();
        assert!(matches!(
            program.execute(&foreign, &ctx(1)),
            Err(ProgramError::Unauthorized { .. })
        ));

        let mut forged = SignedTransaction::sign(call.clone(), 1, &outsider).unwrap();
        forged.transaction.signer = key.verifying_key();
        assert_eq!(
            program.execute(&forged, &ctx(1)),
            Err(ProgramError::InvalidSignature)
        );

        let good = SignedTransaction::sign(call.clone(), 5, &key).unwrap();
        program.execute(&good, &ctx(1)).unwrap();

        let replay = SignedTransaction::sign(
            Call::LogNewDocument {
                content_hash: hash(2),
            },
            5,
            &key,
        )
        .unwrap();
        assert_eq!(
            program.execute(&replay, &ctx(2)),
            Err(ProgramError::StaleNonce { nonce: 5, last: 5 })
        );
    }

    #[test]
    fn rejected_call_does_not_consume_nonce() {
        let key = writer_key();
        let (mut program, _) = program();
        let access = SignedTransaction::sign(
            Call::LogAccess {
                content_hash: hash(1),
                accessor: principal("a"),
            },
            3,
            &key,
        )
        .unwrap();
        assert!(program.execute(&access, &ctx(1)).is_err());

        let create = SignedTransaction::sign(
            Call::LogNewDocument {
                content_hash: hash(1),
            },
            3,
            &key,
        )
        .unwrap();
        assert!(program.execute(&create, &ctx(1)).is_ok());
    }

    proptest! {
        #[test]
        fn access_history_is_append_only(accessors in proptest::collection::vec("[a-z]{1,8}", 1..20)) {
            let (mut program, writer) = program();
            program.log_new_document(&writer, hash(1), &ctx(1)).unwrap();

            let mut previous: Vec<AccessRecord> = Vec::new();
            for (i, name) in accessors.iter().enumerate() {
                program
                    .log_access(&writer, hash(1), principal(name), &ctx(i as u64 + 2))
                    .unwrap();
                let history = program.access_history(&hash(1));
                prop_assert_eq!(history.len(), previous.len() + 1);
                prop_assert_eq!(&history[..previous.len()], &previous[..]);
                prop_assert_eq!(history.last().unwrap().accessor.as_str(), name.as_str());
                previous = history;
            }
        }
    }
}
