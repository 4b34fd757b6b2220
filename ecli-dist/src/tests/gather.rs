//! Tests for the planned graph: names, paths, and step order, before anything runs

use camino::Utf8Path;

use crate::backend::BackendImpl;
use crate::config::BackendKind;
use crate::platform;
use crate::tasks::{self, PackageStep, PipelineStep, ReleaseGraph};
use crate::tests::mock::{mock_config, mock_project, mock_project_with, APP_NAME, APP_VERSION};

fn package_step(graph: &ReleaseGraph) -> &PackageStep {
    graph
        .steps
        .iter()
        .find_map(|step| match step {
            PipelineStep::Package(step) => Some(step),
            _ => None,
        })
        .expect("no package step planned")
}

fn native_output(backend: &BackendImpl) -> &Utf8Path {
    match backend {
        BackendImpl::Deb(info) => &info.expected_artifact,
        BackendImpl::Rpm(info) => &info.expected_artifact,
        BackendImpl::FreebsdPkg(info) => &info.expected_artifact,
        BackendImpl::Nsis(info) => &info.expected_artifact,
        BackendImpl::Dmg(info) => &info.expected_artifact,
    }
}

#[test]
fn plan_resolves_version_and_strict_paths() {
    let (_tmp, root) = mock_project();
    let graph = tasks::gather_work(&mock_config(&root, BackendKind::Deb)).unwrap();

    assert_eq!(graph.app.name, APP_NAME);
    assert_eq!(graph.app.version.to_string(), APP_VERSION);

    let tag = platform::platform_tag(BackendKind::Deb, graph.arch);
    assert_eq!(graph.artifact.file_name, format!("ecli_0.1.0_{tag}.deb"));
    assert_eq!(
        graph.artifact.sidecar_name,
        format!("{}.sha256", graph.artifact.file_name)
    );
    assert!(graph.dirs.release_dir.ends_with("releases/0.1.0"));
    assert_eq!(
        graph.artifact.path,
        graph.dirs.release_dir.join(&graph.artifact.file_name)
    );
    assert_eq!(
        graph.artifact.sidecar_path,
        graph.dirs.release_dir.join(&graph.artifact.sidecar_name)
    );
}

#[test]
fn steps_run_in_pipeline_order() {
    let (_tmp, root) = mock_project();
    let graph = tasks::gather_work(&mock_config(&root, BackendKind::Deb)).unwrap();

    assert_eq!(graph.steps.len(), 5);
    assert!(matches!(graph.steps[0], PipelineStep::Bundle(_)));
    assert!(matches!(graph.steps[1], PipelineStep::Stage(_)));
    assert!(matches!(graph.steps[2], PipelineStep::Package(_)));
    assert!(matches!(graph.steps[3], PipelineStep::Checksum(_)));
    let PipelineStep::Assert(check) = &graph.steps[4] else {
        panic!("last step must be the presence check");
    };
    assert_eq!(
        check.expected,
        vec![graph.artifact.path.clone(), graph.artifact.sidecar_path.clone()]
    );
}

#[test]
fn rpm_native_output_is_precomputed() {
    let (_tmp, root) = mock_project();
    let graph = tasks::gather_work(&mock_config(&root, BackendKind::Rpm)).unwrap();

    let step = package_step(&graph);
    let rpm_arch = graph.arch.rpm_arch();
    assert!(
        matches!(step.backend, BackendImpl::Rpm(_)),
        "rpm plan picked the wrong backend"
    );
    let native = native_output(&step.backend);
    assert!(
        native.ends_with(format!("RPMS/{rpm_arch}/ecli-0.1.0-1.{rpm_arch}.rpm")),
        "{native}"
    );
    assert_eq!(step.dest, graph.artifact.path);
}

#[test]
fn every_backend_precomputes_its_tool_output() {
    let (_tmp, root) = mock_project();
    let cases = [
        (BackendKind::Deb, None),
        (BackendKind::Rpm, None),
        (BackendKind::FreebsdPkg, Some("ecli-0.1.0.pkg")),
        (BackendKind::Nsis, Some("ecli-setup-0.1.0.exe")),
        (BackendKind::Dmg, Some("ecli-0.1.0.dmg")),
    ];
    for (backend, expected_name) in cases {
        let graph = tasks::gather_work(&mock_config(&root, backend)).unwrap();
        let native = native_output(&package_step(&graph).backend);
        // the arch-tagged names vary by host, the rest are fixed
        let expected_name = match (backend, expected_name) {
            (_, Some(name)) => name.to_owned(),
            (BackendKind::Deb, None) => {
                format!("ecli_0.1.0_{}.deb", graph.arch.linux_tag())
            }
            (BackendKind::Rpm, None) => {
                format!("ecli-0.1.0-1.{}.rpm", graph.arch.rpm_arch())
            }
            _ => unreachable!(),
        };
        assert_eq!(native.file_name(), Some(expected_name.as_str()), "{backend:?}");
        assert!(
            native.starts_with(&graph.dirs.package_dir),
            "{backend:?} output {native} is outside the packaging scratch"
        );
    }
}

#[test]
fn fake_bundle_feeds_staging() {
    let (_tmp, root) = mock_project();
    let graph = tasks::gather_work(&mock_config(&root, BackendKind::Deb)).unwrap();

    // run just the stub bundle and the staging step
    for step in &graph.steps[..2] {
        crate::run_pipeline_step(&graph, step).unwrap();
    }

    let exe = graph.dirs.stage_dir.join("usr/bin").join(graph.app.exe_name());
    assert!(exe.is_file(), "{exe} missing");
    let man = graph.dirs.stage_dir.join("usr/share/man/man1/ecli.1.gz");
    assert!(man.is_file(), "{man} missing");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&exe).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755, "{exe} has the wrong mode");
    }
}

#[test]
fn custom_release_dir_is_honored() {
    let (_tmp, root) = mock_project_with(
        r#"[project]
name = "ecli"
version = "0.1.0"

[tool.ecli-dist]
release-dir = "out"
"#,
    );
    let graph = tasks::gather_work(&mock_config(&root, BackendKind::Deb)).unwrap();
    assert!(graph.dirs.release_dir.ends_with("out/0.1.0"), "{}", graph.dirs.release_dir);
}
