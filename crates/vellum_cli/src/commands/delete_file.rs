//! Soft-delete a file.

use super::{explain, Globals};
use anyhow::Result;
use console::style;
use vellum_core::system_time_millis;

/// Append a coffin for the file; its versions stay readable.
pub fn run(
    globals: &Globals,
    project: &str,
    file: &str,
    name: &str,
    timestamp: Option<i64>,
) -> Result<()> {
    let service = globals.open_service()?;
    let removal_timestamp = timestamp.unwrap_or_else(system_time_millis);
    service
        .delete_file(project, file, name, removal_timestamp)
        .map_err(explain)?;

    println!(
        "{} Tombstoned {} ({}/{})",
        style("✓").green(),
        name,
        project,
        file
    );
    Ok(())
}
