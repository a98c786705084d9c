//! List committed generations of a file.

use super::{explain, format_millis, Globals};
use anyhow::Result;
use console::style;
use vellum_core::VersionSelector;

/// Print one line per generation, oldest first.
pub fn run(globals: &Globals, project: &str, file: &str) -> Result<()> {
    let service = globals.open_service()?;
    let generations = service.file_version_list(project, file).map_err(explain)?;

    if generations.is_empty() {
        println!("No committed versions for {}/{}", project, file);
        return Ok(());
    }

    println!(
        "{} {} version(s) of {}/{}",
        style("→").cyan(),
        generations.len(),
        project,
        file
    );
    for generation in generations {
        let record = service
            .get_version_record(project, file, VersionSelector::Generation(generation))
            .map_err(explain)?;
        println!(
            "  {}  {}  {} bytes, {} patch(es)",
            style(generation).yellow(),
            format_millis(record.created_at),
            record.content.len(),
            record.patches.len()
        );
    }

    Ok(())
}
