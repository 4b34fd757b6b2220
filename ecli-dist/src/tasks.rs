//! Planning a release
//!
//! The graph of all work ecli-dist will do on this invocation is resolved up
//! front: the version, the host arch, the tools, the build strategy, and every
//! path any step will touch. Discovering facts in the middle of building is a
//! mess, and precomputing also lets `plan` report what would happen without
//! doing any of it.

use axoasset::LocalAsset;
use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use crate::backend::templates::Templates;
use crate::backend::BackendImpl;
use crate::build::{pyinstaller, BundleStep};
use crate::checksum::ChecksumStep;
use crate::config::{BackendKind, Config};
use crate::errors::DistResult;
use crate::platform::{self, Arch};
use crate::project::{self, PythonApp};
use crate::stage::StageStep;
use crate::tools::Tools;
use crate::verify::AssertStep;

/// Dir under the project where finished artifacts land, keyed by version
pub const RELEASES_DIR: &str = "releases";
/// Scratch dir for bundle/stage/package intermediates, under the project
pub const SCRATCH_DIR: &str = "build/ecli-dist";

/// A map where the order matters
pub type SortedMap<K, V> = std::collections::BTreeMap<K, V>;

/// Every directory the pipeline touches, resolved once
#[derive(Debug, Clone)]
pub struct WorkDirs {
    /// The project root (the dir that holds pyproject.toml)
    pub project_dir: Utf8PathBuf,
    /// Scratch root, wiped by `clean`
    pub scratch_dir: Utf8PathBuf,
    /// Where the bundler's dist output goes
    pub bundle_dir: Utf8PathBuf,
    /// The bundler's own work dir
    pub bundle_work_dir: Utf8PathBuf,
    /// The staging tree
    pub stage_dir: Utf8PathBuf,
    /// Per-backend packaging scratch
    pub package_dir: Utf8PathBuf,
    /// `releases/{version}/`, where artifacts land
    pub release_dir: Utf8PathBuf,
    /// Where the release manifest is written
    pub manifest_path: Utf8PathBuf,
}

/// The strict names and paths of the artifact this run produces
#[derive(Debug, Clone)]
pub struct ArtifactPlan {
    /// `{name}_{version}_{tag}.{ext}`
    pub file_name: String,
    /// The artifact's path under the release dir
    pub path: Utf8PathBuf,
    /// `{file_name}.sha256` (or .sha512)
    pub sidecar_name: String,
    /// The sidecar's path under the release dir
    pub sidecar_path: Utf8PathBuf,
    /// The platform tag baked into the name ("amd64", "win_x64", ...)
    pub platform_tag: &'static str,
}

/// One step of the pipeline, in execution order
#[derive(Debug, Clone)]
pub enum PipelineStep {
    /// Produce the executable
    Bundle(BundleStep),
    /// Wipe and repopulate the staging tree
    Stage(StageStep),
    /// Run the packaging tool, then move its output to the strict path
    Package(PackageStep),
    /// Digest the artifact and write its sidecar
    Checksum(ChecksumStep),
    /// Check the promised files exist
    Assert(AssertStep),
}

/// Run the packaging backend and normalize its output
#[derive(Debug, Clone)]
pub struct PackageStep {
    /// The planned backend
    pub backend: BackendImpl,
    /// The strict path the tool-native artifact is moved to
    pub dest: Utf8PathBuf,
}

/// The graph of all work this invocation will do
#[derive(Debug)]
pub struct ReleaseGraph {
    /// Everything we resolved about the app
    pub app: PythonApp,
    /// The host arch the artifact name is tagged with
    pub arch: Arch,
    /// The backend this run drives
    pub backend: BackendKind,
    /// The tools we probed
    pub tools: Tools,
    /// The embedded packaging templates
    pub templates: Templates,
    /// Every dir the pipeline touches
    pub dirs: WorkDirs,
    /// The strict artifact names
    pub artifact: ArtifactPlan,
    /// The steps, in execution order
    pub steps: Vec<PipelineStep>,
}

impl ReleaseGraph {
    /// The file-presence gate for this run's artifact and sidecar
    pub fn assert_step(&self) -> AssertStep {
        AssertStep {
            release_dir: self.dirs.release_dir.clone(),
            expected: vec![
                self.artifact.path.clone(),
                self.artifact.sidecar_path.clone(),
            ],
        }
    }
}

/// Resolve all the facts and plan the pipeline
pub fn gather_work(config: &Config) -> DistResult<ReleaseGraph> {
    let project_dir = absolutize(&config.project_dir)?;
    let app = project::load_app(&project_dir)?;
    info!("planning a release of {} {}", app.name, app.version);

    let arch = Arch::host()?;
    let tools = Tools::probe();
    let templates = Templates::new()?;

    let release_root = app
        .metadata
        .release_dir
        .clone()
        .unwrap_or_else(|| RELEASES_DIR.into());
    let scratch_dir = project_dir.join(SCRATCH_DIR);
    let dirs = WorkDirs {
        bundle_dir: scratch_dir.join("bundle"),
        bundle_work_dir: scratch_dir.join("bundle-work"),
        stage_dir: scratch_dir.join("stage"),
        package_dir: scratch_dir.join("pkg"),
        release_dir: project_dir
            .join(release_root)
            .join(app.version.to_string()),
        manifest_path: scratch_dir.join(ecli_dist_schema::MANIFEST_FILE_NAME),
        project_dir,
        scratch_dir,
    };

    let file_name = platform::artifact_file_name(&app.name, &app.version, config.backend, arch);
    let sidecar_name = format!("{file_name}.{}", config.checksum.ext());
    let artifact = ArtifactPlan {
        path: dirs.release_dir.join(&file_name),
        sidecar_path: dirs.release_dir.join(&sidecar_name),
        platform_tag: platform::platform_tag(config.backend, arch),
        file_name,
        sidecar_name,
    };

    let exe_name = app.exe_name();
    let bundle = BundleStep {
        strategy: pyinstaller::resolve_strategy(&app, &dirs.project_dir),
        mode: config.bundle_mode,
        expected_exe: dirs.bundle_dir.join(&exe_name),
        exe_name,
    };
    let stage = StageStep {
        layout: config.backend.layout(),
        exe_source: bundle.expected_exe.clone(),
    };
    let package = PackageStep {
        backend: BackendImpl::plan(config.backend, &app, &dirs, arch),
        dest: artifact.path.clone(),
    };
    let check = ChecksumStep {
        style: config.checksum,
        src: artifact.path.clone(),
        dest: artifact.sidecar_path.clone(),
    };

    let mut graph = ReleaseGraph {
        app,
        arch,
        backend: config.backend,
        tools,
        templates,
        dirs,
        artifact,
        steps: vec![],
    };
    graph.steps = vec![
        PipelineStep::Bundle(bundle),
        PipelineStep::Stage(stage),
        PipelineStep::Package(package),
        PipelineStep::Checksum(check),
        PipelineStep::Assert(graph.assert_step()),
    ];
    Ok(graph)
}

/// Make a possibly-relative dir absolute against the current dir
pub(crate) fn absolutize(dir: &Utf8Path) -> DistResult<Utf8PathBuf> {
    if dir.is_absolute() {
        Ok(dir.to_owned())
    } else {
        Ok(LocalAsset::current_dir()?.join(dir))
    }
}
