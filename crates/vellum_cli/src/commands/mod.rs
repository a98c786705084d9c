//! CLI commands.

pub mod cemetery;
pub mod config;
pub mod delete_file;
pub mod delete_patch;
pub mod diff;
pub mod init;
pub mod patches;
pub mod session;
pub mod show;
pub mod versions;

use anyhow::{Context, Result};
use console::style;
use std::path::PathBuf;
use vellum_core::{Backend, Config, DocumentService, VellumError};

/// Flags shared by every command.
pub struct Globals {
    pub data_dir: PathBuf,
    pub backend: Option<String>,
}

impl Globals {
    /// Configuration from the data directory with flag overrides applied.
    pub fn config(&self) -> Result<Config> {
        let mut config = Config::load(&self.data_dir).map_err(explain)?;
        if let Some(backend) = &self.backend {
            config.storage.backend = backend.parse::<Backend>().map_err(explain)?;
        }
        config.validate().map_err(explain)?;
        Ok(config)
    }

    /// Opens the configured backend.
    pub fn open_service(&self) -> Result<DocumentService> {
        let config = self.config()?;
        DocumentService::from_config(&config, &self.data_dir)
            .map_err(explain)
            .with_context(|| format!("failed to open store in {}", self.data_dir.display()))
    }
}

/// Attaches the error's recovery hint, if it has one.
pub fn explain(err: VellumError) -> anyhow::Error {
    match err.recovery_suggestion() {
        Some(hint) => anyhow::anyhow!("{}\n  {} {}", err, style("hint:").cyan(), hint),
        None => anyhow::Error::new(err),
    }
}

/// Formats a millisecond timestamp for humans.
pub fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}
