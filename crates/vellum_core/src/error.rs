//! Error types for vellum_core operations.

use thiserror::Error;

/// Failure kinds a caller has to tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Requested file, generation, or draft does not exist.
    NotFound,
    /// Commit requested with no open draft.
    NothingToCommit,
    /// The blob store failed (I/O, permissions, corruption, conflicting write).
    BackingStore,
    /// A serialized patch could not be applied, not even approximately.
    MalformedPatch,
    /// Process configuration is invalid.
    Config,
}

impl ErrorKind {
    /// Stable lowercase name, used on the wire by the session protocol.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::NothingToCommit => "nothing_to_commit",
            Self::BackingStore => "backing_store",
            Self::MalformedPatch => "malformed_patch",
            Self::Config => "config",
        }
    }
}

/// Core error type for vellum_core operations.
#[derive(Error, Debug)]
pub enum VellumError {
    /// No open draft for the file.
    #[error("no open draft for {project_id}/{file_id}")]
    DraftNotFound {
        /// Project identifier
        project_id: String,
        /// File identifier
        file_id: String,
    },

    /// The file has no committed generations.
    #[error("file not found: {project_id}/{file_id}")]
    FileNotFound {
        /// Project identifier
        project_id: String,
        /// File identifier
        file_id: String,
    },

    /// The file exists but the requested generation does not.
    #[error("generation {generation} not found for {project_id}/{file_id}")]
    GenerationNotFound {
        /// Project identifier
        project_id: String,
        /// File identifier
        file_id: String,
        /// The generation that was asked for
        generation: i64,
    },

    /// Commit called without an open draft.
    #[error("nothing to commit for {target}")]
    NothingToCommit {
        /// `project/file` or `project` for project-wide commits
        target: String,
    },

    /// Failure reported by the blob store. The message is the store's own.
    #[error("{0}")]
    Storage(String),

    /// I/O error from a durable backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A conditional write lost against a concurrent writer.
    #[error("generation conflict on {key}: expected {expected:?}, found {actual:?}")]
    GenerationConflict {
        /// Blob key the write targeted
        key: String,
        /// Latest generation the writer had read
        expected: Option<i64>,
        /// Latest generation actually present
        actual: Option<i64>,
    },

    /// Stored bytes failed integrity verification.
    #[error("corrupted blob {key}@{generation}: {reason}")]
    CorruptedBlob {
        /// Blob key
        key: String,
        /// Generation that failed verification
        generation: i64,
        /// Description of the corruption
        reason: String,
    },

    /// Serialization error while encoding a record.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error while decoding a stored record.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Compression or decompression failed.
    #[error("compression error: {0}")]
    Compression(String),

    /// The patch codec could not apply a serialized patch.
    #[error("malformed patch: {0}")]
    MalformedPatch(String),

    /// Configuration error (loading, parsing, invalid values).
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl VellumError {
    /// Classifies the error into one of the caller-visible kinds.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DraftNotFound { .. } | Self::FileNotFound { .. } | Self::GenerationNotFound { .. } => {
                ErrorKind::NotFound
            }
            Self::NothingToCommit { .. } => ErrorKind::NothingToCommit,
            Self::Storage(_)
            | Self::Io(_)
            | Self::GenerationConflict { .. }
            | Self::CorruptedBlob { .. }
            | Self::Serialization(_)
            | Self::Deserialization(_)
            | Self::Compression(_) => ErrorKind::BackingStore,
            Self::MalformedPatch(_) => ErrorKind::MalformedPatch,
            Self::ConfigError(_) => ErrorKind::Config,
        }
    }

    /// Returns `true` for any of the not-found variants.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Returns a user-friendly recovery suggestion for the error, if available.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Self::DraftNotFound { .. } => {
                Some("Open a draft with 'create_version' before recording patches.")
            }
            Self::NothingToCommit { .. } => {
                Some("Nothing is buffered; call 'create_version' first.")
            }
            Self::GenerationConflict { .. } => {
                Some("Another writer updated the record; re-read and retry the request.")
            }
            Self::CorruptedBlob { .. } => {
                Some("The stored generation is damaged; read an earlier generation or restore the database.")
            }
            Self::Storage(_) | Self::Io(_) => {
                Some("The draft was left intact; the request can be retried once storage recovers.")
            }
            Self::ConfigError(_) => Some("Check vellum.toml and the command-line flags."),
            _ => None,
        }
    }
}

/// Convenience Result type for vellum_core operations.
pub type Result<T> = std::result::Result<T, VellumError>;
