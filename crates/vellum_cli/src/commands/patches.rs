//! Inspect the patches stored with a generation.

use super::{explain, Globals};
use anyhow::Result;
use console::style;

/// Print each patch of one committed generation.
pub fn run(globals: &Globals, project: &str, file: &str, generation: i64) -> Result<()> {
    let service = globals.open_service()?;
    let patches = service
        .get_committed_patches(project, file, generation)
        .map_err(explain)?;

    if patches.is_empty() {
        println!("Generation {} carries no patches", generation);
        return Ok(());
    }

    for patch in &patches {
        println!(
            "{} {}  by {}",
            style("patch").bold(),
            style(patch.timestamp).yellow(),
            patch.user_id
        );
        for line in patch.text.lines() {
            let styled = match line.chars().next() {
                Some('+') => style(line).green(),
                Some('-') => style(line).red(),
                Some('@') => style(line).cyan(),
                _ => style(line).dim(),
            };
            println!("    {}", styled);
        }
    }

    Ok(())
}
