//! The release gate: assert the promised files actually exist
//!
//! This is presence-only. Package contents are the packaging tool's problem;
//! what we guarantee downstream is that the strict artifact path and its
//! sidecar are both on disk. On failure the error carries a listing of what
//! the release dir really holds, since "the file isn't there" is useless
//! without "here's what is".

use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use crate::errors::{DistError, DistResult};

/// The precomputed assertion step
#[derive(Debug, Clone)]
pub struct AssertStep {
    /// The release dir the files were promised in
    pub release_dir: Utf8PathBuf,
    /// Every file that must exist
    pub expected: Vec<Utf8PathBuf>,
}

/// Check every promised file exists, or fail with the release dir's contents
pub fn assert_released(step: &AssertStep) -> DistResult<()> {
    let missing: Vec<&Utf8PathBuf> = step.expected.iter().filter(|f| !f.is_file()).collect();
    if missing.is_empty() {
        for file in &step.expected {
            info!("verified {file}");
        }
        return Ok(());
    }
    let missing = missing
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    Err(DistError::AssertFailed {
        release_dir: step.release_dir.clone(),
        missing,
        listing: release_listing(&step.release_dir),
    })
}

/// What the release dir actually holds, one file per line with sizes
///
/// Diagnostic output only, so it never errors: an unreadable or absent dir
/// becomes a line saying so.
pub fn release_listing(release_dir: &Utf8Path) -> String {
    if !release_dir.is_dir() {
        return format!("{release_dir} does not exist");
    }
    match crate::backend::walk_files(release_dir) {
        Ok(files) if files.is_empty() => format!("{release_dir} is empty"),
        Ok(files) => files
            .iter()
            .map(|file| {
                let size = file.metadata().map(|m| m.len()).unwrap_or(0);
                format!("  {file} ({size} bytes)")
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Err(_) => format!("{release_dir} could not be read"),
    }
}
