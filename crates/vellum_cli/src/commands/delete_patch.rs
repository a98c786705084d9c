//! Reconstruct a file without one patch.

use super::{explain, Globals};
use anyhow::Result;

/// Print the reconstructed text. Stored history is not modified.
pub fn run(
    globals: &Globals,
    project: &str,
    file: &str,
    generation: i64,
    timestamp: i64,
) -> Result<()> {
    let service = globals.open_service()?;
    let text = service
        .delete_patch(project, file, generation, timestamp)
        .map_err(explain)?;
    println!("{}", text);
    Ok(())
}
