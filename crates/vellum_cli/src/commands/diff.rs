//! Compute a serialized patch between two files.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use vellum_core::{DmpCodec, PatchCodec};

/// Print the patch text turning `old` into `new`, ready for `create_patch`.
pub fn run(old: &Path, new: &Path) -> Result<()> {
    let old_text =
        fs::read_to_string(old).with_context(|| format!("failed to read {}", old.display()))?;
    let new_text =
        fs::read_to_string(new).with_context(|| format!("failed to read {}", new.display()))?;

    let patch = DmpCodec::new().diff(&old_text, &new_text)?;
    print!("{}", patch);
    Ok(())
}
