//! Document service: the operation surface over drafts, versions and tombstones.

use crate::cemetery::CemeteryLedger;
use crate::codec::{DmpCodec, PatchCodec};
use crate::config::Config;
use crate::drafts::DraftBuffer;
use crate::error::{Result, VellumError};
use crate::reconstruct::Reconstructor;
use crate::types::{Coffin, FileKey, Patch, VersionRecord, VersionSelector};
use crate::versions::VersionStore;
use crate::{BlobStore, InMemoryBlobStore, TimeProvider};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Versioned document storage for one process.
///
/// Drafts live in memory and are lost on exit; everything committed goes
/// through the [`BlobStore`] the service was built with.
///
/// # Examples
///
/// ```
/// use vellum_core::{DocumentService, Patch, VersionSelector};
///
/// let service = DocumentService::in_memory();
/// service.create_version("p", "f", "Hello");
/// let patch = service.make_patch("Hello", "Hello world").unwrap();
/// service.create_patch("p", "f", Patch::new("alice", patch, 1)).unwrap();
/// let generation = service.commit_version("p", "f").unwrap();
///
/// assert_eq!(service.get_version("p", "f", VersionSelector::Latest).unwrap(), b"Hello");
/// assert_eq!(service.file_version_list("p", "f").unwrap(), vec![generation]);
/// assert_eq!(service.get_patch_list("p", "f"), None);
/// ```
pub struct DocumentService {
    store: Arc<dyn BlobStore>,
    drafts: DraftBuffer,
    versions: VersionStore,
    cemetery: CemeteryLedger,
    codec: Arc<dyn PatchCodec>,
}

impl DocumentService {
    /// Creates a service over `store` using the diff-match-patch codec.
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            drafts: DraftBuffer::new(),
            versions: VersionStore::new(Arc::clone(&store)),
            cemetery: CemeteryLedger::new(Arc::clone(&store)),
            codec: Arc::new(DmpCodec::new()),
            store,
        }
    }

    /// Creates a service backed by a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBlobStore::new()))
    }

    /// Opens the backend configured for `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;
        Self::from_config(&config, data_dir)
    }

    /// Opens the backend selected by `config`.
    pub fn from_config(config: &Config, data_dir: &Path) -> Result<Self> {
        let store = config.open_store(data_dir)?;
        info!(backend = store.backend_name(), "document service ready");
        Ok(Self::new(store))
    }

    /// Replaces the patch codec.
    pub fn with_codec(mut self, codec: Arc<dyn PatchCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Stamps commits with `clock` instead of the system time.
    pub fn with_time_provider(mut self, clock: Arc<dyn TimeProvider>) -> Self {
        self.versions = self.versions.with_time_provider(clock);
        self
    }

    /// Name of the blob store backend in use.
    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Opens or overwrites the draft of a file with `content` and no patches.
    pub fn create_version(&self, project_id: &str, file_id: &str, content: impl Into<Vec<u8>>) {
        self.drafts
            .create_version(&FileKey::new(project_id, file_id), content.into());
    }

    /// Appends a patch to the file's open draft.
    pub fn create_patch(&self, project_id: &str, file_id: &str, patch: Patch) -> Result<()> {
        self.drafts
            .create_patch(&FileKey::new(project_id, file_id), patch)
    }

    /// Commits the file's draft and returns the new generation.
    pub fn commit_version(&self, project_id: &str, file_id: &str) -> Result<i64> {
        self.versions
            .commit(&self.drafts, &FileKey::new(project_id, file_id))
    }

    /// Commits every open draft of a project in file id order.
    ///
    /// Stops at the first failure. Files committed before it stay committed;
    /// the failing draft and all later ones are left open.
    ///
    /// # Errors
    ///
    /// Returns `NothingToCommit` when the project has no open drafts.
    pub fn commit_project(&self, project_id: &str) -> Result<Vec<(String, i64)>> {
        let open = self.drafts.open_files(project_id);
        self.commit_files(project_id, open)
    }

    /// Commits `keys` in order. Drafts that vanished after listing are
    /// skipped; if none is left the project had nothing to commit.
    fn commit_files(&self, project_id: &str, keys: Vec<FileKey>) -> Result<Vec<(String, i64)>> {
        let mut committed = Vec::with_capacity(keys.len());
        for key in keys {
            match self.versions.commit(&self.drafts, &key) {
                Ok(generation) => committed.push((key.file_id, generation)),
                // Committed by someone else between listing and locking.
                Err(VellumError::NothingToCommit { .. }) => continue,
                Err(e) => {
                    warn!(
                        file = %key,
                        committed = committed.len(),
                        error = %e,
                        "project commit stopped"
                    );
                    return Err(e);
                }
            }
        }
        if committed.is_empty() {
            return Err(VellumError::NothingToCommit {
                target: format!("project {}", project_id),
            });
        }
        Ok(committed)
    }

    /// Content of a committed generation, verbatim.
    pub fn get_version(
        &self,
        project_id: &str,
        file_id: &str,
        selector: VersionSelector,
    ) -> Result<Vec<u8>> {
        self.versions
            .get_version(&FileKey::new(project_id, file_id), selector)
    }

    /// Full record of a committed generation, patches included.
    pub fn get_version_record(
        &self,
        project_id: &str,
        file_id: &str,
        selector: VersionSelector,
    ) -> Result<VersionRecord> {
        self.versions
            .get_record(&FileKey::new(project_id, file_id), selector)
    }

    /// Committed generations of a file, ascending.
    pub fn file_version_list(&self, project_id: &str, file_id: &str) -> Result<Vec<i64>> {
        self.versions
            .list_generations(&FileKey::new(project_id, file_id))
    }

    /// Patches buffered in the open draft, or `None` when no draft is open.
    pub fn get_patch_list(&self, project_id: &str, file_id: &str) -> Option<Vec<Patch>> {
        self.drafts.peek_patches(&FileKey::new(project_id, file_id))
    }

    /// Patches stored with one committed generation.
    pub fn get_committed_patches(
        &self,
        project_id: &str,
        file_id: &str,
        generation: i64,
    ) -> Result<Vec<Patch>> {
        self.get_version_record(project_id, file_id, generation.into())
            .map(|r| r.patches)
    }

    /// Text of the file at `generation` with the patch stamped
    /// `patch_timestamp` left out. Nothing is written.
    pub fn delete_patch(
        &self,
        project_id: &str,
        file_id: &str,
        generation: i64,
        patch_timestamp: i64,
    ) -> Result<String> {
        Reconstructor::new(&self.versions, self.codec.as_ref()).reconstruct(
            &FileKey::new(project_id, file_id),
            generation,
            Some(patch_timestamp),
        )
    }

    /// Tombstones a file in its project's cemetery.
    pub fn delete_file(
        &self,
        project_id: &str,
        file_id: &str,
        file_name: &str,
        removal_timestamp: i64,
    ) -> Result<()> {
        self.cemetery
            .delete_file(project_id, file_id, file_name, removal_timestamp)
            .map(|_| ())
    }

    /// Tombstones recorded for a project, oldest first.
    pub fn list_coffins(&self, project_id: &str) -> Result<Vec<Coffin>> {
        self.cemetery.coffins(project_id)
    }

    /// Serialized patch turning `old` into `new`.
    pub fn make_patch(&self, old: &str, new: &str) -> Result<String> {
        self.codec.diff(old, new)
    }
}
