//! Print committed content.

use super::{explain, Globals};
use anyhow::Result;
use std::io::{self, Write};
use vellum_core::VersionSelector;

/// Write a generation's content to stdout, byte for byte.
pub fn run(globals: &Globals, project: &str, file: &str, generation: Option<i64>) -> Result<()> {
    let service = globals.open_service()?;
    let selector = generation.map_or(VersionSelector::Latest, VersionSelector::Generation);
    let content = service.get_version(project, file, selector).map_err(explain)?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(&content)?;
    stdout.flush()?;
    Ok(())
}
