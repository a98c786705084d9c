//! Generation-versioned blob storage capability and its in-memory backend.

use crate::error::{Result, VellumError};
use crate::types::{BlobKey, StoredBlob, VersionSelector};
use crate::{system_time_millis, TimeProvider};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// Generation-versioned key/value store.
///
/// Every write creates a new immutable generation. Generations are assigned by
/// the store and increase monotonically across all keys, so sorting one key's
/// generations ascending yields its write order.
///
/// Implementations report every failure; nothing above this layer retries.
pub trait BlobStore: Send + Sync {
    /// Writes a new generation and returns it.
    fn put(&self, key: &BlobKey, bytes: &[u8]) -> Result<i64>;

    /// Writes a new generation only if the key's latest generation is still
    /// `expected` (`None` meaning the key has never been written).
    ///
    /// # Errors
    ///
    /// Returns `GenerationConflict` when another writer got there first.
    fn put_if_latest(&self, key: &BlobKey, bytes: &[u8], expected: Option<i64>) -> Result<i64>;

    /// Reads one generation. `Ok(None)` when the key or generation is absent.
    fn get(&self, key: &BlobKey, selector: VersionSelector) -> Result<Option<StoredBlob>>;

    /// Lists every generation of a key. Order is unspecified.
    fn list(&self, key: &BlobKey) -> Result<Vec<StoredBlob>>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}

struct MemoryInner {
    blobs: HashMap<BlobKey, Vec<StoredBlob>>,
    next_generation: i64,
}

/// Volatile blob store, used in tests and for the `memory` backend.
///
/// # Examples
///
/// ```
/// use vellum_core::{BlobKey, BlobStore, InMemoryBlobStore, VersionSelector};
///
/// let store = InMemoryBlobStore::new();
/// let key = BlobKey::file("project", "file");
///
/// let first = store.put(&key, b"one").unwrap();
/// let second = store.put(&key, b"two").unwrap();
/// assert!(second > first);
///
/// let latest = store.get(&key, VersionSelector::Latest).unwrap().unwrap();
/// assert_eq!(latest.bytes, b"two");
/// ```
pub struct InMemoryBlobStore {
    inner: RwLock<MemoryInner>,
    write_failure: Mutex<Option<String>>,
    clock: Arc<dyn TimeProvider>,
}

impl InMemoryBlobStore {
    /// Creates an empty store stamped by the system clock.
    pub fn new() -> Self {
        Self::with_time_provider(system_time_millis)
    }

    /// Creates an empty store stamped by `clock`.
    pub fn with_time_provider(clock: impl TimeProvider + 'static) -> Self {
        Self {
            inner: RwLock::new(MemoryInner {
                blobs: HashMap::new(),
                next_generation: 1,
            }),
            write_failure: Mutex::new(None),
            clock: Arc::new(clock),
        }
    }

    /// Makes every subsequent write fail with `message` until cleared.
    pub fn fail_writes(&self, message: impl Into<String>) {
        *self.write_failure.lock() = Some(message.into());
    }

    /// Lets writes succeed again.
    pub fn clear_write_failure(&self) {
        *self.write_failure.lock() = None;
    }

    /// Total number of stored generations across all keys.
    pub fn generation_count(&self) -> usize {
        self.inner.read().blobs.values().map(Vec::len).sum()
    }

    fn check_writable(&self) -> Result<()> {
        match self.write_failure.lock().as_ref() {
            Some(message) => Err(VellumError::Storage(message.clone())),
            None => Ok(()),
        }
    }

    fn insert_locked(&self, inner: &mut MemoryInner, key: &BlobKey, bytes: &[u8]) -> i64 {
        let generation = inner.next_generation;
        inner.next_generation += 1;
        inner.blobs.entry(key.clone()).or_default().push(StoredBlob {
            generation,
            created_at: self.clock.now(),
            bytes: bytes.to_vec(),
        });
        generation
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn put(&self, key: &BlobKey, bytes: &[u8]) -> Result<i64> {
        self.check_writable()?;
        let mut inner = self.inner.write();
        Ok(self.insert_locked(&mut inner, key, bytes))
    }

    fn put_if_latest(&self, key: &BlobKey, bytes: &[u8], expected: Option<i64>) -> Result<i64> {
        self.check_writable()?;
        let mut inner = self.inner.write();

        let actual = inner
            .blobs
            .get(key)
            .and_then(|gens| gens.iter().map(|b| b.generation).max());
        if actual != expected {
            return Err(VellumError::GenerationConflict {
                key: key.to_string(),
                expected,
                actual,
            });
        }

        Ok(self.insert_locked(&mut inner, key, bytes))
    }

    fn get(&self, key: &BlobKey, selector: VersionSelector) -> Result<Option<StoredBlob>> {
        let inner = self.inner.read();
        let Some(gens) = inner.blobs.get(key) else {
            return Ok(None);
        };

        let found = match selector {
            VersionSelector::Latest => gens.iter().max_by_key(|b| b.generation),
            VersionSelector::Generation(g) => gens.iter().find(|b| b.generation == g),
        };
        Ok(found.cloned())
    }

    fn list(&self, key: &BlobKey) -> Result<Vec<StoredBlob>> {
        let inner = self.inner.read();
        Ok(inner.blobs.get(key).cloned().unwrap_or_default())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
