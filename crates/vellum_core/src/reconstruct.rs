//! Patch chain reconstruction.
//!
//! Rebuilds a historical view of a file by replaying its committed patches
//! from the earliest snapshot, optionally skipping every patch that carries
//! one timestamp. Later patches still land because the codec places hunks by
//! fuzzy context matching rather than by exact offsets.

use crate::codec::PatchCodec;
use crate::error::{Result, VellumError};
use crate::types::{FileKey, VersionRecord};
use crate::versions::VersionStore;
use tracing::debug;

/// Replays patch history over a [`VersionStore`].
pub struct Reconstructor<'a> {
    versions: &'a VersionStore,
    codec: &'a dyn PatchCodec,
}

impl<'a> Reconstructor<'a> {
    /// Creates a reconstructor reading from `versions` and applying with `codec`.
    pub fn new(versions: &'a VersionStore, codec: &'a dyn PatchCodec) -> Self {
        Self { versions, codec }
    }

    /// Text of `key` at `target_generation` as if the patch stamped
    /// `exclude_timestamp` had never been applied.
    ///
    /// Timestamps identify patches per file: every patch in the walked
    /// history with that timestamp is skipped. A timestamp that matches
    /// nothing yields the ordinary replay.
    ///
    /// # Errors
    ///
    /// - `FileNotFound` if nothing was ever committed for `key`
    /// - `GenerationNotFound` if `target_generation` is not one of its records
    /// - `MalformedPatch` if a patch cannot be applied at all
    pub fn reconstruct(
        &self,
        key: &FileKey,
        target_generation: i64,
        exclude_timestamp: Option<i64>,
    ) -> Result<String> {
        let records = self.versions.list_records(key)?;
        if records.is_empty() {
            return Err(VellumError::FileNotFound {
                project_id: key.project_id.clone(),
                file_id: key.file_id.clone(),
            });
        }
        if !records.iter().any(|r| r.generation == target_generation) {
            return Err(VellumError::GenerationNotFound {
                project_id: key.project_id.clone(),
                file_id: key.file_id.clone(),
                generation: target_generation,
            });
        }

        replay(&records, target_generation, exclude_timestamp, self.codec)
    }
}

/// Replays `records`, which must be sorted ascending by generation.
///
/// The earliest record is the seed; only patches of the records after it are
/// applied.
fn replay(
    records: &[VersionRecord],
    target_generation: i64,
    exclude_timestamp: Option<i64>,
    codec: &dyn PatchCodec,
) -> Result<String> {
    let Some(baseline) = records.first() else {
        return Ok(String::new());
    };
    let mut current = String::from_utf8_lossy(&baseline.content).into_owned();
    let mut applied = 0usize;
    let mut skipped = 0usize;

    // The baseline snapshot already contains the patches committed with it.
    let later = if baseline.generation == target_generation {
        &[][..]
    } else {
        &records[1..]
    };

    for record in later {
        for patch in &record.patches {
            if Some(patch.timestamp) == exclude_timestamp {
                skipped += 1;
                continue;
            }
            current = codec.apply(&patch.text, &current).map_err(|e| match e {
                VellumError::MalformedPatch(reason) => VellumError::MalformedPatch(format!(
                    "patch {} in generation {}: {}",
                    patch.timestamp, record.generation, reason
                )),
                other => other,
            })?;
            applied += 1;
        }
        if record.generation == target_generation {
            break;
        }
    }

    debug!(target_generation, applied, skipped, "history replayed");
    Ok(current)
}
