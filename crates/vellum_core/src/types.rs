//! Core data types for vellum.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One edit, serialized by the patch codec.
///
/// `timestamp` is supplied by the editor session and identifies the patch
/// within its file's history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Patch {
    /// Author of the edit.
    pub user_id: String,
    /// Serialized diff from the preceding document state.
    pub text: String,
    /// Caller-supplied identifier, distinct per file.
    pub timestamp: i64,
}

impl Patch {
    /// Creates a patch.
    pub fn new(user_id: impl Into<String>, text: impl Into<String>, timestamp: i64) -> Self {
        Self {
            user_id: user_id.into(),
            text: text.into(),
            timestamp,
        }
    }
}

/// Identifies one file within one project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileKey {
    /// Project identifier.
    pub project_id: String,
    /// File identifier, unique within the project.
    pub file_id: String,
}

impl FileKey {
    /// Creates a key.
    pub fn new(project_id: impl Into<String>, file_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            file_id: file_id.into(),
        }
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project_id, self.file_id)
    }
}

/// Key of a record in the blob store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlobKey {
    /// Version history of one file.
    File(FileKey),
    /// Tombstone ledger of one project.
    Cemetery {
        /// Project identifier.
        project_id: String,
    },
}

impl BlobKey {
    /// Key of a file's version history.
    pub fn file(project_id: &str, file_id: &str) -> Self {
        Self::File(FileKey::new(project_id, file_id))
    }

    /// Key of a project's cemetery.
    pub fn cemetery(project_id: &str) -> Self {
        Self::Cemetery {
            project_id: project_id.to_string(),
        }
    }

    /// Length-prefixed binary encoding, used as the durable key prefix.
    ///
    /// Layout: tag byte, then each component as `u64` length + UTF-8 bytes.
    /// No encoding is a prefix of another.
    pub fn encode(&self) -> Vec<u8> {
        fn push_part(out: &mut Vec<u8>, part: &str) {
            out.extend_from_slice(&(part.len() as u64).to_be_bytes());
            out.extend_from_slice(part.as_bytes());
        }

        let mut out = Vec::new();
        match self {
            Self::File(key) => {
                out.push(0);
                push_part(&mut out, &key.project_id);
                push_part(&mut out, &key.file_id);
            }
            Self::Cemetery { project_id } => {
                out.push(1);
                push_part(&mut out, project_id);
            }
        }
        out
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(key) => write!(f, "files/{}", key),
            Self::Cemetery { project_id } => write!(f, "cemetery/{}", project_id),
        }
    }
}

/// Selects a committed generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VersionSelector {
    /// The most recently committed generation.
    #[default]
    Latest,
    /// One explicit generation.
    Generation(i64),
}

impl From<i64> for VersionSelector {
    fn from(generation: i64) -> Self {
        Self::Generation(generation)
    }
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Generation(g) => write!(f, "{}", g),
        }
    }
}

/// One stored generation as returned by a blob store listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Generation assigned by the store.
    pub generation: i64,
    /// Store-side creation time, milliseconds since the Unix epoch.
    pub created_at: i64,
    /// Raw record bytes.
    pub bytes: Vec<u8>,
}

/// Uncommitted staging state for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    /// Baseline content set by the last `create_version`.
    pub content: Vec<u8>,
    /// Patches recorded since, in call order.
    pub patches: Vec<Patch>,
}

impl Draft {
    /// Opens a draft with no patches.
    pub fn new(content: Vec<u8>) -> Self {
        Self {
            content,
            patches: Vec::new(),
        }
    }
}

/// Body of a committed version, as encoded in the blob store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RecordBody {
    pub content: Vec<u8>,
    pub patches: Vec<Patch>,
    pub created_at: i64,
}

/// A committed, immutable version of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    /// Project identifier.
    pub project_id: String,
    /// File identifier.
    pub file_id: String,
    /// Generation assigned at commit.
    pub generation: i64,
    /// Full snapshot of the file.
    pub content: Vec<u8>,
    /// Patches applied since the previous committed version.
    pub patches: Vec<Patch>,
    /// Commit time, milliseconds since the Unix epoch.
    pub created_at: i64,
}

/// Tombstone for one soft-deleted file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coffin {
    /// Project identifier.
    pub project_id: String,
    /// File identifier.
    pub file_id: String,
    /// Human-readable name at deletion time.
    pub file_name: String,
    /// Caller-supplied removal time.
    pub removal_timestamp: i64,
}

/// Append-only tombstone ledger of one project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cemetery {
    /// Project identifier.
    pub project_id: String,
    /// Tombstones in the order they were recorded.
    pub coffins: Vec<Coffin>,
}
