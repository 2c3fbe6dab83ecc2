use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use attest_types::{PrincipalId, RecordId};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::backend::RecordBackend;
use crate::error::{StoreError, StoreResult};
use crate::record::Record;

const META_EXT: &str = "meta";
const CONTENT_EXT: &str = "bin";
const TMP_EXT: &str = "tmp";
const CRC_SIZE: usize = 4;

/// Directory-backed record backend.
///
/// Each record is two files under the root: `<id>.meta` holds the metadata
/// as `[crc32: u32 LE][bincode]`, `<id>.bin` holds the raw content. Both
/// are written to a temp file and renamed into place, content first, so a
/// crash never leaves metadata pointing at missing content.
///
/// The expiry and owner indexes live in memory and are rebuilt by
/// [`open`](Self::open).
pub struct FileRecordBackend {
    root: PathBuf,
    index: RwLock<FileIndex>,
}

#[derive(Default)]
struct FileIndex {
    owners: HashMap<RecordId, PrincipalId>,
    deadlines: HashMap<RecordId, DateTime<Utc>>,
    expiry: BTreeSet<(DateTime<Utc>, RecordId)>,
}

impl FileIndex {
    fn insert(&mut self, record: &Record) {
        self.forget(&record.id());
        self.owners.insert(record.id(), record.owner().clone());
        if let Some(deadline) = record.expires_at() {
            self.deadlines.insert(record.id(), deadline);
            self.expiry.insert((deadline, record.id()));
        }
    }

    fn forget(&mut self, id: &RecordId) {
        self.owners.remove(id);
        if let Some(deadline) = self.deadlines.remove(id) {
            self.expiry.remove(&(deadline, *id));
        }
    }
}

impl FileRecordBackend {
    /// Open (or create) a record directory and rebuild its indexes.
    ///
    /// Leftover temp files from interrupted writes are removed. Metadata
    /// files that fail their checksum are logged and skipped.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let backend = Self {
            root,
            index: RwLock::new(FileIndex::default()),
        };

        let mut index = FileIndex::default();
        for entry in fs::read_dir(&backend.root)? {
            let path = entry?.path();
            match path.extension().and_then(|e| e.to_str()) {
                Some(TMP_EXT) => {
                    debug!(path = %path.display(), "removing interrupted write");
                    fs::remove_file(&path)?;
                }
                Some(META_EXT) => {
                    let Some(id) = path
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .and_then(|s| s.parse::<RecordId>().ok())
                    else {
                        warn!(path = %path.display(), "ignoring unrecognised metadata file");
                        continue;
                    };
                    match backend.read_meta(&id) {
                        Ok(Some(record)) => index.insert(&record),
                        Ok(None) => {}
                        Err(e) => warn!(id = %id, error = %e, "skipping unreadable record"),
                    }
                }
                _ => {}
            }
        }

        debug!(
            root = %backend.root.display(),
            records = index.owners.len(),
            "record directory opened"
        );
        *backend.write_index()? = index;
        Ok(backend)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the content file for `id`.
    pub fn content_path(&self, id: &RecordId) -> PathBuf {
        self.root.join(format!("{id}.{CONTENT_EXT}"))
    }

    fn meta_path(&self, id: &RecordId) -> PathBuf {
        self.root.join(format!("{id}.{META_EXT}"))
    }

    fn read_meta(&self, id: &RecordId) -> StoreResult<Option<Record>> {
        let bytes = match fs::read(self.meta_path(id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        decode_meta(id, &bytes).map(Some)
    }

    fn write_index(&self) -> StoreResult<RwLockWriteGuard<'_, FileIndex>> {
        self.index
            .write()
            .map_err(|_| StoreError::Backend("record index lock poisoned".into()))
    }

    fn read_index(&self) -> StoreResult<RwLockReadGuard<'_, FileIndex>> {
        self.index
            .read()
            .map_err(|_| StoreError::Backend("record index lock poisoned".into()))
    }
}

fn encode_meta(record: &Record) -> StoreResult<Vec<u8>> {
    let payload =
        bincode::serialize(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let mut framed = Vec::with_capacity(CRC_SIZE + payload.len());
    framed.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    framed.extend_from_slice(&payload);
    Ok(framed)
}

fn decode_meta(id: &RecordId, bytes: &[u8]) -> StoreResult<Record> {
    let corrupt = |reason: String| StoreError::Corrupt {
        id: id.to_string(),
        reason,
    };
    if bytes.len() < CRC_SIZE {
        return Err(corrupt(format!("metadata truncated to {} bytes", bytes.len())));
    }
    let (header, payload) = bytes.split_at(CRC_SIZE);
    let expected = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let actual = crc32fast::hash(payload);
    if expected != actual {
        return Err(corrupt(format!(
            "metadata checksum mismatch (expected {expected:#010x}, got {actual:#010x})"
        )));
    }
    let record: Record =
        bincode::deserialize(payload).map_err(|e| corrupt(format!("metadata decode: {e}")))?;
    if record.id() != *id {
        return Err(corrupt(format!("metadata belongs to {}", record.id())));
    }
    Ok(record)
}

/// Write `bytes` next to `path`, sync, then rename over it.
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    let tmp = path.with_extension(format!("{ext}.{TMP_EXT}"));
    let mut file = fs::File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(&tmp, path)
}

fn remove_if_present(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

impl RecordBackend for FileRecordBackend {
    fn load(&self, id: &RecordId) -> StoreResult<Option<Record>> {
        let Some(mut record) = self.read_meta(id)? else {
            return Ok(None);
        };
        let content = match fs::read(self.content_path(id)) {
            Ok(content) => content,
            // Removed between the two reads.
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        record.set_content(content);
        Ok(Some(record))
    }

    fn save(&self, record: &Record) -> StoreResult<()> {
        let meta = encode_meta(record)?;
        let mut index = self.write_index()?;
        write_atomic(&self.content_path(&record.id()), record.content())?;
        write_atomic(&self.meta_path(&record.id()), &meta)?;
        index.insert(record);
        debug!(id = %record.id(), bytes = record.content().len(), "record saved");
        Ok(())
    }

    fn remove(&self, id: &RecordId) -> StoreResult<bool> {
        let mut index = self.write_index()?;
        let existed = remove_if_present(&self.meta_path(id))?;
        remove_if_present(&self.content_path(id))?;
        index.forget(id);
        Ok(existed)
    }

    fn expired_before(&self, now: DateTime<Utc>) -> StoreResult<Vec<RecordId>> {
        let index = self.read_index()?;
        Ok(index
            .expiry
            .iter()
            .take_while(|(deadline, _)| *deadline <= now)
            .map(|(_, id)| *id)
            .collect())
    }

    fn list_by_owner(&self, owner: &PrincipalId) -> StoreResult<Vec<RecordId>> {
        let index = self.read_index()?;
        let mut ids: Vec<RecordId> = index
            .owners
            .iter()
            .filter(|(_, o)| *o == owner)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.read_index()?.owners.len())
    }
}

impl std::fmt::Debug for FileRecordBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileRecordBackend")
            .field("root", &self.root)
            .finish()
    }
}
