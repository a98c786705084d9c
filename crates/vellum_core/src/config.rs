//! Configuration for a vellum data directory.

use crate::error::{Result, VellumError};
use crate::redb_store::{RedbBlobStore, DEFAULT_COMPRESSION_LEVEL};
use crate::{BlobStore, InMemoryBlobStore};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of the configuration file inside the data directory.
pub const CONFIG_FILE: &str = "vellum.toml";

/// Complete configuration of a data directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Service endpoint settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Blob storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from `data_dir`, or defaults if no file exists.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| VellumError::ConfigError(format!("failed to read config: {}", e)))?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| VellumError::ConfigError(format!("failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to `data_dir`.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        self.validate()?;
        let path = data_dir.join(CONFIG_FILE);
        let content = toml::to_string_pretty(self)
            .map_err(|e| VellumError::ConfigError(format!("failed to serialize config: {}", e)))?;
        fs::write(&path, content)
            .map_err(|e| VellumError::ConfigError(format!("failed to write config: {}", e)))?;
        Ok(())
    }

    /// Rejects settings no backend could run with.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(VellumError::ConfigError("server.port must be non-zero".into()));
        }
        if self.server.cert.is_some() != self.server.key.is_some() {
            return Err(VellumError::ConfigError(
                "server.cert and server.key must be given together".into(),
            ));
        }
        if !(1..=22).contains(&self.storage.compression_level) {
            return Err(VellumError::ConfigError(format!(
                "storage.compression_level must be within 1-22, got {}",
                self.storage.compression_level
            )));
        }
        if self.storage.backend == Backend::Durable {
            let bucket = &self.storage.bucket;
            if bucket.is_empty() || bucket.contains(['/', '\\']) || bucket.starts_with('.') {
                return Err(VellumError::ConfigError(format!(
                    "storage.bucket {:?} is not a usable file name",
                    bucket
                )));
            }
        }
        Ok(())
    }

    /// Opens the blob store selected by `storage.backend`.
    ///
    /// The durable bucket lives at `<data_dir>/<bucket>.redb`.
    pub fn open_store(&self, data_dir: &Path) -> Result<Arc<dyn BlobStore>> {
        self.validate()?;
        match self.storage.backend {
            Backend::Memory => Ok(Arc::new(InMemoryBlobStore::new())),
            Backend::Durable => {
                let store = RedbBlobStore::open(self.storage.bucket_path(data_dir))?
                    .with_compression_level(self.storage.compression_level);
                Ok(Arc::new(store))
            }
        }
    }
}

/// Service endpoint configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen port (default: 50051).
    pub port: u16,

    /// TLS certificate chain, PEM.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert: Option<PathBuf>,

    /// TLS private key, PEM.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<PathBuf>,
}

impl ServerConfig {
    /// Certificate and key paths when TLS is configured.
    pub fn tls(&self) -> Option<(&Path, &Path)> {
        match (&self.cert, &self.key) {
            (Some(cert), Some(key)) => Some((cert.as_path(), key.as_path())),
            _ => None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 50051,
            cert: None,
            key: None,
        }
    }
}

/// Which blob store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Process-local, lost on exit.
    Memory,
    /// redb database file in the data directory.
    Durable,
}

impl std::str::FromStr for Backend {
    type Err = VellumError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "memory" => Ok(Backend::Memory),
            "durable" => Ok(Backend::Durable),
            other => Err(VellumError::ConfigError(format!(
                "unknown backend {:?} (expected memory or durable)",
                other
            ))),
        }
    }
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend selection (default: durable).
    pub backend: Backend,

    /// Bucket name; the durable database file is named after it.
    pub bucket: String,

    /// Compression level for zstd (1-22, default: 3).
    pub compression_level: i32,
}

impl StorageConfig {
    /// Location of the durable bucket under `data_dir`.
    pub fn bucket_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(format!("{}.redb", self.bucket))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Durable,
            bucket: "vellum-documents".to_string(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}
