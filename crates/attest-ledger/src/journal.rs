use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::JournalError;
use crate::records::SignedTransaction;

/// Frame header: `[length: u32 LE] [crc32: u32 LE]`.
const HEADER_SIZE: usize = 8;

/// One applied transaction, with the position and time it was applied at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub transaction: SignedTransaction,
}

/// Append-only log of finalized ledger transactions.
///
/// Only transactions the program accepted are written, in application
/// order, so replaying the log through a fresh program rebuilds the same
/// state. Reverted transactions leave no trace.
pub struct LedgerJournal {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl LedgerJournal {
    /// Open (or create) the journal at `path` and return every intact entry.
    ///
    /// A torn or corrupt tail, as left by a crash mid-append, is cut off so
    /// later appends follow the last good frame.
    pub fn open(path: impl AsRef<Path>) -> Result<(Self, Vec<JournalEntry>), JournalError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let (entries, good_len) = if path.exists() {
            read_frames(&path)?
        } else {
            (Vec::new(), 0)
        };

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;
        let file_len = file.metadata()?.len();
        if file_len > good_len {
            warn!(
                path = %path.display(),
                kept = good_len,
                dropped = file_len - good_len,
                "truncating damaged ledger journal tail"
            );
            file.set_len(good_len)?;
        }
        file.seek(SeekFrom::End(0))?;

        debug!(path = %path.display(), entries = entries.len(), "ledger journal opened");
        Ok((
            Self {
                path,
                writer: BufWriter::new(file),
            },
            entries,
        ))
    }

    /// Append one entry and sync it to disk.
    pub fn append(&mut self, entry: &JournalEntry) -> Result<(), JournalError> {
        let payload =
            serde_json::to_vec(entry).map_err(|e| JournalError::Serialization(e.to_string()))?;
        let length = u32::try_from(payload.len())
            .map_err(|_| JournalError::Serialization("journal entry too large".into()))?;
        let crc = crc32fast::hash(&payload);

        self.writer.write_all(&length.to_le_bytes())?;
        self.writer.write_all(&crc.to_le_bytes())?;
        self.writer.write_all(&payload)?;
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for LedgerJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerJournal")
            .field("path", &self.path)
            .finish()
    }
}

/// Read frames front to back. Stops at the first frame that is short, fails
/// its checksum, or does not decode; returns the entries before it and the
/// byte length they cover.
fn read_frames(path: &Path) -> Result<(Vec<JournalEntry>, u64), JournalError> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let mut reader = BufReader::new(file);
    let mut entries = Vec::new();
    let mut offset: u64 = 0;

    loop {
        let mut header = [0u8; HEADER_SIZE];
        match reader.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }
        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if offset + (HEADER_SIZE as u64) + u64::from(length) > file_len {
            warn!(offset, length, file_len, "ledger journal frame runs past end of file");
            break;
        }

        let mut payload = vec![0u8; length as usize];
        match reader.read_exact(&mut payload) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                warn!(offset, "truncated ledger journal frame");
                break;
            }
            Err(e) => return Err(e.into()),
        }

        if crc32fast::hash(&payload) != expected_crc {
            warn!(offset, "ledger journal checksum mismatch");
            break;
        }
        match serde_json::from_slice::<JournalEntry>(&payload) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                warn!(offset, error = %e, "undecodable ledger journal frame");
                break;
            }
        }
        offset += (HEADER_SIZE + payload.len()) as u64;
    }

    Ok((entries, offset))
}
