//! Durable blob store backed by a redb database.
//!
//! Every generation of every key lives in one table. The table key is the
//! length-prefixed [`BlobKey`] encoding followed by the big-endian generation,
//! so one key's generations form a contiguous, ascending range.

use crate::error::{Result, VellumError};
use crate::types::{BlobKey, StoredBlob, VersionSelector};
use crate::{system_time_millis, BlobStore, TimeProvider};
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Store schema version for migration support.
pub const STORE_SCHEMA_VERSION: u64 = 2;

/// Default zstd level for stored payloads.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Maximum size of a single stored payload (100 MB).
const MAX_PAYLOAD_SIZE: usize = 100 * 1024 * 1024;

const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("meta");
const BLOBS_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("blobs");

const SCHEMA_KEY: &str = "schema_version";
const NEXT_GENERATION_KEY: &str = "next_generation";

/// What is persisted for one generation.
#[derive(Serialize, Deserialize)]
struct Envelope {
    created_at: i64,
    checksum: [u8; 32],
    payload: Vec<u8>,
}

/// Maps a redb error into a storage failure, keeping its message.
fn db_err<E: std::fmt::Display>(context: &'static str) -> impl FnOnce(E) -> VellumError {
    move |e| VellumError::Storage(format!("{}: {}", context, e))
}

fn row_key(prefix: &[u8], generation: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 8);
    key.extend_from_slice(prefix);
    key.extend_from_slice(&generation.to_be_bytes());
    key
}

fn generation_of(row: &[u8]) -> i64 {
    let mut suffix = [0u8; 8];
    suffix.copy_from_slice(&row[row.len() - 8..]);
    u64::from_be_bytes(suffix) as i64
}

/// Durable generation-versioned store.
///
/// # Examples
///
/// ```
/// use vellum_core::{BlobKey, BlobStore, RedbBlobStore, VersionSelector};
/// use tempfile::TempDir;
///
/// let tmp = TempDir::new().unwrap();
/// let store = RedbBlobStore::open(tmp.path().join("docs.redb")).unwrap();
///
/// let key = BlobKey::file("project", "chapter-1");
/// let generation = store.put(&key, b"It was a dark and stormy night").unwrap();
///
/// let blob = store.get(&key, VersionSelector::Generation(generation)).unwrap().unwrap();
/// assert_eq!(blob.bytes, b"It was a dark and stormy night");
/// ```
pub struct RedbBlobStore {
    db: Database,
    path: PathBuf,
    compression_level: i32,
    clock: Arc<dyn TimeProvider>,
}

impl RedbBlobStore {
    /// Opens the database at `path`, creating it and its parent directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database can't be opened or has a schema version mismatch.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(&path).map_err(db_err("failed to open database"))?;

        let write_txn = db.begin_write().map_err(db_err("failed to begin write"))?;
        {
            let mut meta = write_txn
                .open_table(META_TABLE)
                .map_err(db_err("failed to open meta table"))?;
            let found = meta
                .get(SCHEMA_KEY)
                .map_err(db_err("failed to read schema version"))?
                .map(|v| v.value());
            match found {
                Some(version) if version != STORE_SCHEMA_VERSION => {
                    return Err(VellumError::Storage(format!(
                        "store schema version mismatch: found {}, expected {}",
                        version, STORE_SCHEMA_VERSION
                    )));
                }
                Some(_) => {}
                None => {
                    meta.insert(SCHEMA_KEY, STORE_SCHEMA_VERSION)
                        .map_err(db_err("failed to write schema version"))?;
                    meta.insert(NEXT_GENERATION_KEY, 1u64)
                        .map_err(db_err("failed to seed generation counter"))?;
                }
            }
            // Create the table so read transactions can open it.
            write_txn
                .open_table(BLOBS_TABLE)
                .map_err(db_err("failed to open blobs table"))?;
        }
        write_txn.commit().map_err(db_err("failed to commit"))?;

        Ok(Self {
            db,
            path,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            clock: Arc::new(system_time_millis),
        })
    }

    /// Sets the zstd level used for new writes.
    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    /// Stamps new generations with `clock` instead of the system time.
    pub fn with_time_provider(mut self, clock: impl TimeProvider + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Returns the path to the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn seal(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        if bytes.len() > MAX_PAYLOAD_SIZE {
            return Err(VellumError::Storage(format!(
                "payload too large: {} bytes exceeds limit of {} bytes",
                bytes.len(),
                MAX_PAYLOAD_SIZE
            )));
        }

        let payload = zstd::encode_all(bytes, self.compression_level)
            .map_err(|e| VellumError::Compression(e.to_string()))?;
        let envelope = Envelope {
            created_at: self.clock.now(),
            checksum: *blake3::hash(bytes).as_bytes(),
            payload,
        };
        postcard::to_allocvec(&envelope).map_err(|e| VellumError::Serialization(e.to_string()))
    }

    fn unseal(&self, key: &BlobKey, generation: i64, raw: &[u8]) -> Result<StoredBlob> {
        let corrupted = |reason: String| VellumError::CorruptedBlob {
            key: key.to_string(),
            generation,
            reason,
        };

        let envelope: Envelope =
            postcard::from_bytes(raw).map_err(|e| corrupted(format!("bad envelope: {}", e)))?;
        let bytes = zstd::decode_all(envelope.payload.as_slice())
            .map_err(|e| corrupted(format!("decompression failed: {}", e)))?;

        let actual = blake3::hash(&bytes);
        if actual.as_bytes() != &envelope.checksum {
            return Err(corrupted(format!(
                "checksum mismatch: expected {}, got {}",
                hex::encode(envelope.checksum),
                actual.to_hex()
            )));
        }

        Ok(StoredBlob {
            generation,
            created_at: envelope.created_at,
            bytes,
        })
    }

    /// Inserts a sealed row under the next generation, optionally checking the
    /// key's current latest generation first. Runs in one write transaction.
    fn write(&self, key: &BlobKey, bytes: &[u8], expected: Option<Option<i64>>) -> Result<i64> {
        let sealed = self.seal(bytes)?;
        let prefix = key.encode();

        let write_txn = self.db.begin_write().map_err(db_err("failed to begin write"))?;
        let generation = {
            let mut blobs = write_txn
                .open_table(BLOBS_TABLE)
                .map_err(db_err("failed to open blobs table"))?;

            if let Some(expected) = expected {
                let start = row_key(&prefix, 0);
                let end = row_key(&prefix, u64::MAX);
                let actual = blobs
                    .range(start.as_slice()..=end.as_slice())
                    .map_err(db_err("failed to scan generations"))?
                    .next_back()
                    .transpose()
                    .map_err(db_err("failed to read generation"))?
                    .map(|(row, _)| generation_of(row.value()));
                if actual != expected {
                    return Err(VellumError::GenerationConflict {
                        key: key.to_string(),
                        expected,
                        actual,
                    });
                }
            }

            let mut meta = write_txn
                .open_table(META_TABLE)
                .map_err(db_err("failed to open meta table"))?;
            let generation = meta
                .get(NEXT_GENERATION_KEY)
                .map_err(db_err("failed to read generation counter"))?
                .map(|v| v.value())
                .unwrap_or(1);
            meta.insert(NEXT_GENERATION_KEY, generation + 1)
                .map_err(db_err("failed to advance generation counter"))?;

            let row = row_key(&prefix, generation);
            blobs
                .insert(row.as_slice(), sealed.as_slice())
                .map_err(db_err("failed to insert blob"))?;
            generation as i64
        };
        write_txn.commit().map_err(db_err("failed to commit"))?;

        Ok(generation)
    }
}

impl BlobStore for RedbBlobStore {
    fn put(&self, key: &BlobKey, bytes: &[u8]) -> Result<i64> {
        self.write(key, bytes, None)
    }

    fn put_if_latest(&self, key: &BlobKey, bytes: &[u8], expected: Option<i64>) -> Result<i64> {
        self.write(key, bytes, Some(expected))
    }

    fn get(&self, key: &BlobKey, selector: VersionSelector) -> Result<Option<StoredBlob>> {
        let read_txn = self.db.begin_read().map_err(db_err("failed to begin read"))?;
        let blobs = read_txn
            .open_table(BLOBS_TABLE)
            .map_err(db_err("failed to open blobs table"))?;
        let prefix = key.encode();

        match selector {
            VersionSelector::Latest => {
                let start = row_key(&prefix, 0);
                let end = row_key(&prefix, u64::MAX);
                let last = blobs
                    .range(start.as_slice()..=end.as_slice())
                    .map_err(db_err("failed to scan generations"))?
                    .next_back()
                    .transpose()
                    .map_err(db_err("failed to read blob"))?;
                match last {
                    Some((row, value)) => {
                        let generation = generation_of(row.value());
                        self.unseal(key, generation, value.value()).map(Some)
                    }
                    None => Ok(None),
                }
            }
            VersionSelector::Generation(generation) => {
                if generation < 0 {
                    return Ok(None);
                }
                let row = row_key(&prefix, generation as u64);
                match blobs
                    .get(row.as_slice())
                    .map_err(db_err("failed to read blob"))?
                {
                    Some(value) => self.unseal(key, generation, value.value()).map(Some),
                    None => Ok(None),
                }
            }
        }
    }

    fn list(&self, key: &BlobKey) -> Result<Vec<StoredBlob>> {
        let read_txn = self.db.begin_read().map_err(db_err("failed to begin read"))?;
        let blobs = read_txn
            .open_table(BLOBS_TABLE)
            .map_err(db_err("failed to open blobs table"))?;

        let prefix = key.encode();
        let start = row_key(&prefix, 0);
        let end = row_key(&prefix, u64::MAX);

        let mut out = Vec::new();
        for entry in blobs
            .range(start.as_slice()..=end.as_slice())
            .map_err(db_err("failed to scan generations"))?
        {
            let (row, value) = entry.map_err(db_err("failed to read blob"))?;
            let generation = generation_of(row.value());
            out.push(self.unseal(key, generation, value.value())?);
        }
        Ok(out)
    }

    fn backend_name(&self) -> &'static str {
        "redb"
    }
}
