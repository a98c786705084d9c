//! In-memory staging of uncommitted content and patches.

use crate::error::{Result, VellumError};
use crate::locks::KeyedLocks;
use crate::types::{Draft, FileKey, Patch};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Per-file draft storage.
///
/// Each file has its own mutex, so at most one mutation of a given draft is in
/// flight while drafts of other files proceed independently. A slot holding
/// `None` means no draft is open.
pub struct DraftBuffer {
    slots: KeyedLocks<FileKey, Option<Draft>>,
}

impl DraftBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self {
            slots: KeyedLocks::new(),
        }
    }

    /// Opens a draft with `content` and no patches, discarding any open draft.
    pub fn create_version(&self, key: &FileKey, content: Vec<u8>) {
        let slot = self.slots.slot(key);
        let mut draft = slot.lock();
        if let Some(old) = draft.as_ref() {
            debug!(file = %key, discarded_patches = old.patches.len(), "draft overwritten");
        }
        *draft = Some(Draft::new(content));
    }

    /// Appends `patch` to the open draft.
    ///
    /// # Errors
    ///
    /// Returns `DraftNotFound` if no draft is open for the file.
    pub fn create_patch(&self, key: &FileKey, patch: Patch) -> Result<()> {
        let slot = self.slots.slot(key);
        let mut guard = slot.lock();
        let draft = guard.as_mut().ok_or_else(|| VellumError::DraftNotFound {
            project_id: key.project_id.clone(),
            file_id: key.file_id.clone(),
        })?;
        debug!(file = %key, timestamp = patch.timestamp, "patch buffered");
        draft.patches.push(patch);
        Ok(())
    }

    /// Patches of the open draft, or `None` when no draft is open.
    ///
    /// `Some(vec![])` is a draft that has no patches yet.
    pub fn peek_patches(&self, key: &FileKey) -> Option<Vec<Patch>> {
        let slot = self.slots.existing(key)?;
        let guard = slot.lock();
        guard.as_ref().map(|d| d.patches.clone())
    }

    /// Copy of the open draft, if any.
    pub fn draft(&self, key: &FileKey) -> Option<Draft> {
        let slot = self.slots.existing(key)?;
        let guard = slot.lock();
        guard.clone()
    }

    /// Files of `project_id` that currently have an open draft, sorted.
    pub fn open_files(&self, project_id: &str) -> Vec<FileKey> {
        let mut keys: Vec<FileKey> = self
            .slots
            .keys_where(|k| k.project_id == project_id)
            .into_iter()
            .filter(|k| {
                self.slots
                    .existing(k)
                    .is_some_and(|slot| slot.lock().is_some())
            })
            .collect();
        keys.sort();
        keys
    }

    /// Forgets the file's slot when no draft is open and nobody holds it.
    pub(crate) fn prune(&self, key: &FileKey) {
        self.slots.remove_if(key, Option::is_none);
    }

    #[cfg(test)]
    pub(crate) fn tracked_files(&self) -> usize {
        self.slots.len()
    }

    /// The lock guarding one file's draft. Committers hold it across the
    /// durable write so no patch can slip in between read and clear.
    pub(crate) fn slot(&self, key: &FileKey) -> Arc<Mutex<Option<Draft>>> {
        self.slots.slot(key)
    }
}

impl Default for DraftBuffer {
    fn default() -> Self {
        Self::new()
    }
}
