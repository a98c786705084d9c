//! List a project's tombstones.

use super::{explain, format_millis, Globals};
use anyhow::Result;
use console::style;

pub fn run(globals: &Globals, project: &str) -> Result<()> {
    let service = globals.open_service()?;
    let coffins = service.list_coffins(project).map_err(explain)?;

    if coffins.is_empty() {
        println!("No deleted files in {}", project);
        return Ok(());
    }

    println!("{}", style(format!("Cemetery of {}:", project)).bold());
    for coffin in &coffins {
        println!(
            "  {} {}  {}  {}",
            style("†").dim(),
            coffin.file_name,
            style(&coffin.file_id).dim(),
            format_millis(coffin.removal_timestamp)
        );
    }
    println!();
    println!("  Total: {}", style(coffins.len()).cyan());

    Ok(())
}
