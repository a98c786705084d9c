//! Per-project soft-delete ledger.

use crate::error::{Result, VellumError};
use crate::locks::KeyedLocks;
use crate::types::{BlobKey, Cemetery, Coffin, VersionSelector};
use crate::BlobStore;
use std::sync::Arc;
use tracing::info;

/// Appends tombstones to each project's cemetery record.
///
/// The record is rewritten whole on every append. Writers to one project are
/// serialized in-process, and the write itself is conditional on the
/// generation that was read, so a writer in another process cannot erase a
/// coffin either.
pub struct CemeteryLedger {
    store: Arc<dyn BlobStore>,
    projects: KeyedLocks<String, ()>,
}

impl CemeteryLedger {
    /// Creates a ledger over `store`.
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            projects: KeyedLocks::new(),
        }
    }

    /// Records that `file_id` was deleted and returns the ledger's new
    /// generation. Version records of the file are left untouched.
    ///
    /// # Errors
    ///
    /// Returns the blob store's error on read or write, including
    /// `GenerationConflict` if the record changed underneath this writer.
    pub fn delete_file(
        &self,
        project_id: &str,
        file_id: &str,
        file_name: &str,
        removal_timestamp: i64,
    ) -> Result<i64> {
        let outcome = self.append(project_id, file_id, file_name, removal_timestamp);
        self.projects.remove_if(&project_id.to_string(), |_| true);
        outcome
    }

    fn append(
        &self,
        project_id: &str,
        file_id: &str,
        file_name: &str,
        removal_timestamp: i64,
    ) -> Result<i64> {
        let slot = self.projects.slot(&project_id.to_string());
        let _serialized = slot.lock();

        let key = BlobKey::cemetery(project_id);
        let (mut cemetery, read_generation) = self.read(&key, project_id)?;
        cemetery.coffins.push(Coffin {
            project_id: project_id.to_string(),
            file_id: file_id.to_string(),
            file_name: file_name.to_string(),
            removal_timestamp,
        });

        let bytes = postcard::to_allocvec(&cemetery)
            .map_err(|e| VellumError::Serialization(e.to_string()))?;
        let generation = self.store.put_if_latest(&key, &bytes, read_generation)?;

        info!(
            project = project_id,
            file = file_id,
            coffins = cemetery.coffins.len(),
            "file tombstoned"
        );
        Ok(generation)
    }

    /// Coffins of `project_id` in the order they were recorded.
    pub fn coffins(&self, project_id: &str) -> Result<Vec<Coffin>> {
        let key = BlobKey::cemetery(project_id);
        Ok(self.read(&key, project_id)?.0.coffins)
    }

    fn read(&self, key: &BlobKey, project_id: &str) -> Result<(Cemetery, Option<i64>)> {
        match self.store.get(key, VersionSelector::Latest)? {
            Some(blob) => {
                let cemetery = postcard::from_bytes(&blob.bytes).map_err(|e| {
                    VellumError::Deserialization(format!("{} ledger: {}", key, e))
                })?;
                Ok((cemetery, Some(blob.generation)))
            }
            None => Ok((
                Cemetery {
                    project_id: project_id.to_string(),
                    coffins: Vec::new(),
                },
                None,
            )),
        }
    }
}
