//! Initialize a vellum data directory.

use super::{explain, Globals};
use anyhow::{bail, Context, Result};
use console::style;
use std::fs;
use std::path::PathBuf;
use vellum_core::{Backend, Config, CONFIG_FILE};

/// Values written into the new configuration.
pub struct InitOptions {
    pub bucket: Option<String>,
    pub port: Option<u16>,
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
}

/// Write a configuration file and open the selected backend once.
pub fn run(globals: &Globals, options: InitOptions) -> Result<()> {
    let config_path = globals.data_dir.join(CONFIG_FILE);
    if config_path.exists() {
        bail!("{} already exists", config_path.display());
    }
    fs::create_dir_all(&globals.data_dir)
        .with_context(|| format!("failed to create {}", globals.data_dir.display()))?;

    let mut config = Config::default();
    if let Some(backend) = &globals.backend {
        config.storage.backend = backend.parse::<Backend>().map_err(explain)?;
    }
    if let Some(bucket) = options.bucket {
        config.storage.bucket = bucket;
    }
    if let Some(port) = options.port {
        config.server.port = port;
    }
    config.server.cert = options.cert;
    config.server.key = options.key;

    config.save(&globals.data_dir).map_err(explain)?;
    // Creates the bucket file so a bad path fails now rather than on first commit.
    config
        .open_store(&globals.data_dir)
        .map_err(explain)
        .context("failed to open the configured backend")?;

    println!(
        "{} Initialized vellum data directory in {}",
        style("✓").green(),
        globals.data_dir.display()
    );
    println!();
    println!("  Configuration: {}", config_path.display());
    match config.storage.backend {
        Backend::Durable => println!(
            "  Bucket:        {}",
            config.storage.bucket_path(&globals.data_dir).display()
        ),
        Backend::Memory => println!("  Bucket:        in-memory (discarded on exit)"),
    }
    println!("  Port:          {}", config.server.port);

    Ok(())
}
