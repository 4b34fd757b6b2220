//! The Binary Builder: pressing the app into one self-contained executable
//!
//! Whatever layout the bundler chooses (single file, or a directory with the
//! binary inside), the rest of the pipeline only ever sees `expected_exe`.
//! There is no partial success: a bundler run that leaves no executable behind
//! aborts the whole release.

pub mod pyinstaller;

use axoasset::LocalAsset;
use camino::Utf8PathBuf;
use tracing::{info, warn};

use crate::config::BundleMode;
use crate::errors::{DistError, DistResult};
use crate::stage::set_unix_mode;
use crate::tasks::ReleaseGraph;

pub use pyinstaller::BuildStrategy;

/// The precomputed bundle step
#[derive(Debug, Clone)]
pub struct BundleStep {
    /// How to drive the bundler
    pub strategy: BuildStrategy,
    /// Real bundler, or a stub executable for exercising the pipeline
    pub mode: BundleMode,
    /// File name of the executable ("ecli", "ecli.exe")
    pub exe_name: String,
    /// Where every later step relies on finding the executable
    pub expected_exe: Utf8PathBuf,
}

/// Produce the executable at `expected_exe`, with its exec bit set
pub fn run_bundle(graph: &ReleaseGraph, step: &BundleStep) -> DistResult<()> {
    match step.mode {
        BundleMode::Real => {
            pyinstaller::bundle(graph, &step.strategy)?;
            normalize_bundle_exe(graph, step)?;
        }
        BundleMode::Fake => write_stub_exe(step)?,
    }
    set_unix_mode(&step.expected_exe, 0o755)?;
    Ok(())
}

/// Find the executable in whichever layout the bundler chose
///
/// A onefile build puts it straight in the dist dir; a onedir build (which a
/// checked-in spec is free to ask for) nests it under a directory named after
/// the app. Either way it ends up at `expected_exe`.
fn normalize_bundle_exe(graph: &ReleaseGraph, step: &BundleStep) -> DistResult<()> {
    if step.expected_exe.is_file() {
        info!("bundler produced a single-file build");
        return Ok(());
    }
    let onedir_exe = graph
        .dirs
        .bundle_dir
        .join(&graph.app.name)
        .join(&step.exe_name);
    if onedir_exe.is_file() {
        warn!("bundler produced a directory build; taking {onedir_exe}");
        LocalAsset::copy_file_to_file(&onedir_exe, &step.expected_exe)?;
        return Ok(());
    }
    Err(DistError::BundleMissing {
        candidates: format!("{}\n{onedir_exe}", step.expected_exe),
    })
}

/// Write a shell stub in place of the real executable
fn write_stub_exe(step: &BundleStep) -> DistResult<()> {
    let contents = format!("#!/bin/sh\necho '{} (stubbed bundle)'\n", step.exe_name);
    LocalAsset::write_new_all(&contents, &step.expected_exe)?;
    Ok(())
}
