//! Publishing a verified release: git tag, github release, asset upload
//!
//! Everything here is re-runnable: tagging is skipped when the tag already
//! exists, the release object is only created when absent, and uploads pass
//! --clobber so re-publishing a rebuilt artifact replaces the old asset.

use tracing::info;

use crate::errors::DistResult;
use crate::tasks::ReleaseGraph;
use crate::verify::assert_released;

/// Tag the repo, ensure the release exists, and upload artifact + sidecar
pub fn publish(graph: &ReleaseGraph) -> DistResult<()> {
    // never upload files we haven't verified are on disk
    assert_released(&graph.assert_step())?;

    let tag = graph.app.release_tag();
    ensure_tag(graph, &tag)?;
    ensure_release(graph, &tag)?;
    upload_assets(graph, &tag)?;
    Ok(())
}

/// Create and push the release tag, unless it already exists
fn ensure_tag(graph: &ReleaseGraph, tag: &str) -> DistResult<()> {
    let git = graph.tools.git()?;

    let mut check = git.cmd("check for the release tag");
    check
        .arg("rev-parse")
        .arg("--verify")
        .arg("--quiet")
        .arg(format!("refs/tags/{tag}"))
        .current_dir(&graph.dirs.project_dir);
    if check.check(false).output()?.status.success() {
        info!("tag {tag} already exists");
        return Ok(());
    }

    let mut create = git.cmd("tag the release");
    create.arg("tag").arg(tag).current_dir(&graph.dirs.project_dir);
    create.stdout_to_stderr().run()?;

    let mut push = git.cmd("push the release tag");
    push.arg("push")
        .arg("origin")
        .arg(tag)
        .current_dir(&graph.dirs.project_dir);
    push.stdout_to_stderr().run()?;
    Ok(())
}

/// Create the github release object, unless it already exists
fn ensure_release(graph: &ReleaseGraph, tag: &str) -> DistResult<()> {
    let gh = graph.tools.gh()?;

    let mut view = gh.cmd("check for the github release");
    view.arg("release").arg("view").arg(tag);
    add_repo_flag(graph, &mut view);
    view.current_dir(&graph.dirs.project_dir);
    if view.check(false).output()?.status.success() {
        info!("release {tag} already exists");
        return Ok(());
    }

    let title = format!("{} {}", graph.app.name, graph.app.version);
    let mut create = gh.cmd("create the github release");
    create
        .arg("release")
        .arg("create")
        .arg(tag)
        .arg("--title")
        .arg(title)
        .arg("--generate-notes");
    add_repo_flag(graph, &mut create);
    create.current_dir(&graph.dirs.project_dir);
    create.stdout_to_stderr().run()?;
    Ok(())
}

/// Upload the artifact and its sidecar, clobbering stale assets
fn upload_assets(graph: &ReleaseGraph, tag: &str) -> DistResult<()> {
    let gh = graph.tools.gh()?;

    let mut upload = gh.cmd("upload the release assets");
    upload
        .arg("release")
        .arg("upload")
        .arg(tag)
        .arg(&graph.artifact.path)
        .arg(&graph.artifact.sidecar_path)
        .arg("--clobber");
    add_repo_flag(graph, &mut upload);
    upload.current_dir(&graph.dirs.project_dir);
    upload.stdout_to_stderr().run()?;
    info!("uploaded {} and its sidecar to {tag}", graph.artifact.file_name);
    Ok(())
}

/// Point gh at the configured repo; without one it uses the project's origin
fn add_repo_flag(graph: &ReleaseGraph, cmd: &mut axoprocess::Cmd) {
    if let Some(repo) = &graph.app.metadata.repo {
        cmd.arg("--repo").arg(repo);
    }
}
