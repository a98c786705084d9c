//! Text patch codec.
//!
//! Patches are diff-match-patch "patch text". Application is approximate: each
//! hunk is located by fuzzy matching of its context, so a patch still applies
//! after the surrounding text has drifted from what it was computed against.
//!
//! Hunk offsets count Unicode scalar values, not bytes, so a hunk placed by
//! fuzzy matching always starts and ends on a character boundary.

use crate::error::{Result, VellumError};
use diff_match_patch_rs::{Compat, DiffMatchPatch, PatchInput};
use tracing::warn;

/// Computes and applies serialized text patches.
pub trait PatchCodec: Send + Sync {
    /// Serialized patch turning `old` into `new`.
    fn diff(&self, old: &str, new: &str) -> Result<String>;

    /// Applies a serialized patch to `text`, best effort.
    ///
    /// # Errors
    ///
    /// Returns `MalformedPatch` if the patch cannot be parsed, or if none of
    /// its hunks can be placed in `text`.
    fn apply(&self, patch: &str, text: &str) -> Result<String>;
}

/// Outcome of applying one patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    /// Resulting text.
    pub text: String,
    /// Per-hunk success flags, in patch order.
    pub hunks: Vec<bool>,
}

impl Applied {
    /// Number of hunks that could not be placed.
    pub fn rejected(&self) -> usize {
        self.hunks.iter().filter(|ok| !**ok).count()
    }
}

/// diff-match-patch codec with the library's default match tolerances.
///
/// # Examples
///
/// ```
/// use vellum_core::{DmpCodec, PatchCodec};
///
/// let codec = DmpCodec::new();
/// let patch = codec.diff("Hello", "Hello world").unwrap();
/// assert_eq!(codec.apply(&patch, "Hello").unwrap(), "Hello world");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DmpCodec;

impl DmpCodec {
    /// Creates a codec.
    pub fn new() -> Self {
        Self
    }

    /// Applies a patch and reports which hunks landed.
    pub fn apply_detailed(&self, patch: &str, text: &str) -> Result<Applied> {
        let dmp = DiffMatchPatch::new();
        let patches = dmp
            .patch_from_text::<Compat>(patch)
            .map_err(|e| VellumError::MalformedPatch(format!("unparseable patch: {:?}", e)))?;
        let (applied, hunks) = dmp
            .patch_apply(&patches, text)
            .map_err(|e| VellumError::MalformedPatch(format!("patch apply failed: {:?}", e)))?;

        let stray = stray_chars(text, &applied);
        if !stray.is_empty() {
            warn!(?stray, "patch introduced characters absent from the document");
        }
        Ok(Applied {
            text: applied,
            hunks,
        })
    }
}

/// Control characters and replacement characters present in `after` but not
/// in `before`. An editor never types these, so they mark a misplaced hunk.
fn stray_chars(before: &str, after: &str) -> Vec<char> {
    let suspicious = |c: &char| {
        *c == char::REPLACEMENT_CHARACTER || (c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
    };
    let mut stray: Vec<char> = after
        .chars()
        .filter(suspicious)
        .filter(|c| !before.contains(*c))
        .collect();
    stray.sort_unstable();
    stray.dedup();
    stray
}

impl PatchCodec for DmpCodec {
    fn diff(&self, old: &str, new: &str) -> Result<String> {
        let dmp = DiffMatchPatch::new();
        let diffs = dmp
            .diff_main::<Compat>(old, new)
            .map_err(|e| VellumError::MalformedPatch(format!("diff failed: {:?}", e)))?;
        let patches = dmp
            .patch_make(PatchInput::new_diffs(&diffs))
            .map_err(|e| VellumError::MalformedPatch(format!("patch make failed: {:?}", e)))?;
        Ok(dmp.patch_to_text(&patches))
    }

    fn apply(&self, patch: &str, text: &str) -> Result<String> {
        let applied = self.apply_detailed(patch, text)?;
        let rejected = applied.rejected();

        if rejected > 0 && rejected == applied.hunks.len() {
            return Err(VellumError::MalformedPatch(format!(
                "none of {} hunks matched the document",
                rejected
            )));
        }
        if rejected > 0 {
            warn!(
                rejected,
                total = applied.hunks.len(),
                "patch applied partially"
            );
        }

        Ok(applied.text)
    }
}
