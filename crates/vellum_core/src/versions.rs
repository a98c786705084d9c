//! Committed version history.

use crate::drafts::DraftBuffer;
use crate::error::{Result, VellumError};
use crate::types::{BlobKey, FileKey, Patch, RecordBody, StoredBlob, VersionRecord, VersionSelector};
use crate::{system_time_millis, BlobStore, TimeProvider};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Borrowed form of [`RecordBody`], encoded without copying the draft.
#[derive(Serialize)]
struct RecordBodyRef<'a> {
    content: &'a [u8],
    patches: &'a [Patch],
    created_at: i64,
}

/// Commits drafts as new generations and serves reads over them.
pub struct VersionStore {
    store: Arc<dyn BlobStore>,
    clock: Arc<dyn TimeProvider>,
}

impl VersionStore {
    /// Creates a version store over `store`, stamped by the system clock.
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            clock: Arc::new(system_time_millis),
        }
    }

    /// Stamps commits with `clock` instead of the system time.
    pub fn with_time_provider(mut self, clock: Arc<dyn TimeProvider>) -> Self {
        self.clock = clock;
        self
    }

    /// Commits the open draft of `key` and returns the new generation.
    ///
    /// The draft's lock is held across the durable write, and the draft is
    /// cleared only after the write succeeded. A failed write leaves the draft
    /// exactly as it was so the commit can be retried.
    ///
    /// # Errors
    ///
    /// Returns `NothingToCommit` if no draft is open, or the blob store's error.
    pub fn commit(&self, drafts: &DraftBuffer, key: &FileKey) -> Result<i64> {
        let outcome = self.commit_locked(drafts, key);
        drafts.prune(key);
        outcome
    }

    fn commit_locked(&self, drafts: &DraftBuffer, key: &FileKey) -> Result<i64> {
        let slot = drafts.slot(key);
        let mut guard = slot.lock();
        let draft = guard.as_ref().ok_or_else(|| VellumError::NothingToCommit {
            target: key.to_string(),
        })?;

        let body = RecordBodyRef {
            content: &draft.content,
            patches: &draft.patches,
            created_at: self.clock.now(),
        };
        let bytes =
            postcard::to_allocvec(&body).map_err(|e| VellumError::Serialization(e.to_string()))?;
        let patch_count = draft.patches.len();

        let generation = self.store.put(&BlobKey::File(key.clone()), &bytes)?;
        *guard = None;

        info!(file = %key, generation, patches = patch_count, "version committed");
        Ok(generation)
    }

    /// Content of one committed generation, verbatim.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` or `GenerationNotFound` when absent.
    pub fn get_version(&self, key: &FileKey, selector: VersionSelector) -> Result<Vec<u8>> {
        self.get_record(key, selector).map(|r| r.content)
    }

    /// Full record of one committed generation.
    pub fn get_record(&self, key: &FileKey, selector: VersionSelector) -> Result<VersionRecord> {
        let blob_key = BlobKey::File(key.clone());
        match self.store.get(&blob_key, selector)? {
            Some(blob) => decode_record(key, blob),
            None => Err(self.missing(key, &blob_key, selector)?),
        }
    }

    /// Generations of `key`, ascending. Empty when the file was never committed.
    pub fn list_generations(&self, key: &FileKey) -> Result<Vec<i64>> {
        let mut generations: Vec<i64> = self
            .store
            .list(&BlobKey::File(key.clone()))?
            .into_iter()
            .map(|b| b.generation)
            .collect();
        generations.sort_unstable();
        Ok(generations)
    }

    /// Every record of `key`, ascending by generation.
    ///
    /// Storage iteration order is never trusted; the sort here is what the
    /// reconstructor relies on.
    pub fn list_records(&self, key: &FileKey) -> Result<Vec<VersionRecord>> {
        let mut records = self
            .store
            .list(&BlobKey::File(key.clone()))?
            .into_iter()
            .map(|blob| decode_record(key, blob))
            .collect::<Result<Vec<_>>>()?;
        records.sort_by_key(|r| r.generation);
        Ok(records)
    }

    /// Builds the right not-found error for a failed lookup.
    fn missing(
        &self,
        key: &FileKey,
        blob_key: &BlobKey,
        selector: VersionSelector,
    ) -> Result<VellumError> {
        let file_missing = || VellumError::FileNotFound {
            project_id: key.project_id.clone(),
            file_id: key.file_id.clone(),
        };
        match selector {
            VersionSelector::Latest => Ok(file_missing()),
            VersionSelector::Generation(generation) => {
                if self.store.get(blob_key, VersionSelector::Latest)?.is_none() {
                    Ok(file_missing())
                } else {
                    Ok(VellumError::GenerationNotFound {
                        project_id: key.project_id.clone(),
                        file_id: key.file_id.clone(),
                        generation,
                    })
                }
            }
        }
    }
}

fn decode_record(key: &FileKey, blob: StoredBlob) -> Result<VersionRecord> {
    let body: RecordBody = postcard::from_bytes(&blob.bytes).map_err(|e| {
        VellumError::Deserialization(format!(
            "version {} of {}: {}",
            blob.generation, key, e
        ))
    })?;
    Ok(VersionRecord {
        project_id: key.project_id.clone(),
        file_id: key.file_id.clone(),
        generation: blob.generation,
        content: body.content,
        patches: body.patches,
        created_at: body.created_at,
    })
}
