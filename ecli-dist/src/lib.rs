#![deny(missing_docs)]
#![allow(clippy::result_large_err)]

//! # ecli-dist
//!
//! This is the library at the core of the `ecli-dist` CLI: the release
//! pipeline that turns the ecli editor's source tree into installable
//! platform packages. It exists for the CLI's sake (and for internal
//! docs/tests); it happily writes to stderr as it works, so treat it as a
//! tool, not a general-purpose library.
//!
//! The pipeline, in order: resolve the app version from pyproject.toml,
//! bundle the app into one executable with PyInstaller, stage it into the
//! target platform's filesystem convention, drive the platform packaging tool
//! over the staged tree, move the tool's output to the strict release name,
//! write the checksum sidecar, and assert the whole set exists on disk.

use axoasset::LocalAsset;
use camino::Utf8Path;
use ecli_dist_schema::ReleaseManifest;
use tracing::info;

use config::Config;
use errors::*;

pub mod backend;
pub mod build;
pub mod checksum;
pub mod config;
pub mod errors;
pub mod manifest;
pub mod platform;
pub mod project;
pub mod publish;
pub mod stage;
pub mod tasks;
pub mod tools;
pub mod verify;
#[cfg(test)]
mod tests;

pub use tasks::*;

/// ecli-dist package -- run the whole pipeline and release one artifact
pub fn do_package(cfg: &Config) -> DistResult<ReleaseManifest> {
    let graph = tasks::gather_work(cfg)?;

    if !graph.dirs.release_dir.exists() {
        LocalAsset::create_dir_all(&graph.dirs.release_dir)?;
    }

    eprintln!(
        "releasing {} {} as {}:",
        graph.app.name, graph.app.version, graph.artifact.file_name
    );
    for step in &graph.steps {
        run_pipeline_step(&graph, step)?;
    }

    let manifest = manifest::build_manifest(&graph);
    manifest::save_manifest(&graph.dirs.manifest_path, &manifest)?;
    eprintln!("released {}", graph.artifact.path);
    Ok(manifest)
}

/// ecli-dist plan -- resolve everything and report, building nothing
pub fn do_plan(cfg: &Config) -> DistResult<ReleaseManifest> {
    let graph = tasks::gather_work(cfg)?;
    Ok(manifest::build_manifest(&graph))
}

/// ecli-dist verify -- re-check that the released files are on disk
pub fn do_verify(cfg: &Config) -> DistResult<ReleaseManifest> {
    let graph = tasks::gather_work(cfg)?;
    verify::assert_released(&graph.assert_step())?;
    Ok(manifest::build_manifest(&graph))
}

/// ecli-dist publish -- tag, create the release object, upload the assets
pub fn do_publish(cfg: &Config) -> DistResult<ReleaseManifest> {
    let graph = tasks::gather_work(cfg)?;
    publish::publish(&graph)?;
    Ok(manifest::build_manifest(&graph))
}

/// ecli-dist show -- what the release dir currently holds
pub fn do_show(cfg: &Config) -> DistResult<String> {
    let graph = tasks::gather_work(cfg)?;
    let listing = verify::release_listing(&graph.dirs.release_dir);
    Ok(format!("{}:\n{listing}", graph.dirs.release_dir))
}

/// ecli-dist clean -- remove the scratch dir (releases/ is left alone)
pub fn do_clean(project_dir: &Utf8Path) -> DistResult<()> {
    let project_dir = tasks::absolutize(project_dir)?;
    let scratch_dir = project_dir.join(tasks::SCRATCH_DIR);
    info!("removing {scratch_dir}");
    LocalAsset::remove_dir_all(&scratch_dir)?;
    Ok(())
}

/// Run a single step of the pipeline
fn run_pipeline_step(graph: &ReleaseGraph, step: &PipelineStep) -> DistResult<()> {
    match step {
        PipelineStep::Bundle(step) => build::run_bundle(graph, step),
        PipelineStep::Stage(step) => stage::run_stage(graph, step),
        PipelineStep::Package(step) => {
            let native = step.backend.build(graph)?;
            checksum::normalize_artifact(&native, &step.dest, &graph.artifact.sidecar_path)
        }
        PipelineStep::Checksum(step) => {
            checksum::generate_and_write_checksum(step.style, &step.src, &step.dest)?;
            Ok(())
        }
        PipelineStep::Assert(step) => verify::assert_released(step),
    }
}
