//! Vellum Core Library
//!
//! Versioned document storage for a collaborative text editor:
//! - Per-file drafts that buffer edit patches between commits
//! - An immutable, generation-indexed commit log over a pluggable blob store
//! - Reconstruction of a historical text with one patch surgically removed
//! - A per-project tombstone ledger for soft-deleted files
//!
//! # Quick Start
//!
//! ```
//! use vellum_core::{DocumentService, Patch};
//!
//! let service = DocumentService::in_memory();
//!
//! // Baseline
//! service.create_version("project", "file", "Hello");
//! service.commit_version("project", "file").unwrap();
//!
//! // Three edits bundled into one commit
//! let steps = [
//!     ("Hello", "Hello world", 1),
//!     ("Hello world", "Hello beautiful world", 2),
//!     ("Hello beautiful world", "Hello beautiful life", 3),
//! ];
//! service.create_version("project", "file", "Hello beautiful life");
//! for (old, new, ts) in steps {
//!     let text = service.make_patch(old, new).unwrap();
//!     service.create_patch("project", "file", Patch::new("alice", text, ts)).unwrap();
//! }
//! let generation = service.commit_version("project", "file").unwrap();
//!
//! // The same history without the second edit
//! let text = service.delete_patch("project", "file", generation, 2).unwrap();
//! assert_eq!(text, "Hello life");
//! ```
//!
//! # Durable Storage
//!
//! Generations survive restarts with the redb backend:
//!
//! ```
//! use std::sync::Arc;
//! use vellum_core::{DocumentService, RedbBlobStore, VersionSelector};
//! use tempfile::TempDir;
//!
//! let tmp = TempDir::new().unwrap();
//! let path = tmp.path().join("bucket.redb");
//!
//! let generation = {
//!     let service = DocumentService::new(Arc::new(RedbBlobStore::open(&path).unwrap()));
//!     service.create_version("p", "f", "persisted");
//!     service.commit_version("p", "f").unwrap()
//! };
//!
//! let service = DocumentService::new(Arc::new(RedbBlobStore::open(&path).unwrap()));
//! let content = service.get_version("p", "f", generation.into()).unwrap();
//! assert_eq!(content, b"persisted");
//! assert!(service.get_version("p", "f", VersionSelector::Latest).is_ok());
//! ```

mod blob_store;
mod cemetery;
mod codec;
mod config;
mod drafts;
mod error;
mod locks;
mod reconstruct;
mod redb_store;
mod service;
mod types;
mod versions;

pub use blob_store::{BlobStore, InMemoryBlobStore};
pub use cemetery::CemeteryLedger;
pub use codec::{Applied, DmpCodec, PatchCodec};
pub use config::{Backend, Config, ServerConfig, StorageConfig, CONFIG_FILE};
pub use drafts::DraftBuffer;
pub use error::{ErrorKind, Result, VellumError};
pub use reconstruct::Reconstructor;
pub use redb_store::{RedbBlobStore, DEFAULT_COMPRESSION_LEVEL, STORE_SCHEMA_VERSION};
pub use service::DocumentService;
pub use types::*;
pub use versions::VersionStore;

/// Time provider trait for testing.
///
/// Commit timestamps and blob creation times come from here, so tests can
/// pin them.
pub trait TimeProvider: Send + Sync {
    /// Returns the current Unix timestamp in milliseconds.
    fn now(&self) -> i64;
}

impl<F> TimeProvider for F
where
    F: Fn() -> i64 + Send + Sync,
{
    fn now(&self) -> i64 {
        self()
    }
}

/// Milliseconds since the Unix epoch from the system clock.
pub fn system_time_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
