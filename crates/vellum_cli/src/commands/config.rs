//! Show the effective configuration.

use super::Globals;
use anyhow::Result;
use console::style;
use vellum_core::{Backend, CONFIG_FILE};

/// Print configuration after flag overrides.
pub fn run(globals: &Globals) -> Result<()> {
    let config = globals.config()?;
    let path = globals.data_dir.join(CONFIG_FILE);

    println!("{}", style("Configuration:").bold());
    if path.exists() {
        println!("  Source:            {}", path.display());
    } else {
        println!("  Source:            {}", style("defaults (no vellum.toml)").dim());
    }
    println!();
    println!("{}", style("[server]").cyan());
    println!("  port:              {}", config.server.port);
    match config.server.tls() {
        Some((cert, key)) => {
            println!("  cert:              {}", cert.display());
            println!("  key:               {}", key.display());
        }
        None => println!("  tls:               {}", style("disabled").dim()),
    }
    println!();
    println!("{}", style("[storage]").cyan());
    match config.storage.backend {
        Backend::Memory => println!("  backend:           memory"),
        Backend::Durable => {
            println!("  backend:           durable");
            println!("  bucket:            {}", config.storage.bucket);
            println!(
                "  path:              {}",
                config.storage.bucket_path(&globals.data_dir).display()
            );
        }
    }
    println!("  compression_level: {}", config.storage.compression_level);

    Ok(())
}
