//! All the clap stuff for parsing/documenting the cli

use camino::Utf8PathBuf;
use clap::{
    builder::{PossibleValuesParser, TypedValueParser},
    Args, Parser, Subcommand, ValueEnum,
};
use tracing::level_filters::LevelFilter;

#[derive(Parser, Clone, Debug)]
#[clap(version, about, long_about = None)]
#[clap(propagate_version = true)]
#[clap(bin_name = "ecli-dist")]
/// Native installer packaging for the ecli editor.
///
/// `ecli-dist package` runs the whole pipeline for one packaging backend:
/// PyInstaller bundle, platform staging tree, native packaging tool, and a
/// normalized artifact + checksum sidecar under releases/<version>/.
pub struct Cli {
    /// Subcommands
    #[clap(subcommand)]
    pub command: Commands,

    /// How verbose logging should be (log level)
    #[clap(long, short)]
    #[clap(default_value_t = LevelFilter::WARN)]
    #[clap(value_parser = PossibleValuesParser::new(["off", "error", "warn", "info", "debug", "trace"]).map(|s| s.parse::<LevelFilter>().expect("possible values are valid")))]
    #[clap(help_heading = "GLOBAL OPTIONS", global = true)]
    pub verbose: LevelFilter,

    /// The format of the output
    #[clap(long, short, value_enum)]
    #[clap(default_value_t = OutputFormat::Human)]
    #[clap(help_heading = "GLOBAL OPTIONS", global = true)]
    pub output_format: OutputFormat,

    /// The ecli checkout to package (the dir with pyproject.toml)
    #[clap(long)]
    #[clap(default_value = ".")]
    #[clap(help_heading = "GLOBAL OPTIONS", global = true)]
    pub project_dir: Utf8PathBuf,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Build and release one installable package for this machine
    #[clap(disable_version_flag = true)]
    Package(PackageArgs),
    /// Report what `package` would produce, building nothing
    ///
    /// Everything is computed from what ecli-dist *expects* the pipeline to
    /// produce, so the reported paths may not exist yet.
    #[clap(disable_version_flag = true)]
    Plan(PlanArgs),
    /// Check that a prior release's files are still on disk
    #[clap(disable_version_flag = true)]
    Verify(VerifyArgs),
    /// Tag the repo and upload the released files to a GitHub Release
    ///
    /// The tag and the release object are only created when absent; uploads
    /// always clobber, so re-running after a partial publish is safe.
    #[clap(disable_version_flag = true)]
    Publish(PublishArgs),
    /// List what the release dir currently holds
    #[clap(disable_version_flag = true)]
    Show(ShowArgs),
    /// Remove the build scratch dir (releases/ is left alone)
    #[clap(disable_version_flag = true)]
    Clean(CleanArgs),
}

#[derive(Args, Clone, Debug)]
pub struct SelectArgs {
    /// Which packaging backend to run
    #[clap(long, short, value_enum)]
    pub backend: BackendArg,

    /// Which checksum to write alongside the artifact
    #[clap(long, value_enum)]
    #[clap(default_value_t = ChecksumArg::Sha256)]
    pub checksum: ChecksumArg,
}

#[derive(Args, Clone, Debug)]
pub struct PackageArgs {
    // Backend/checksum selection shared with the read-only commands
    #[clap(flatten)]
    pub select: SelectArgs,

    /// Skip PyInstaller and stage a stub executable instead
    ///
    /// This keeps every later step honest (staging, the native packaging
    /// tool, checksums) while making test runs fast.
    #[clap(long)]
    pub fake_bundle: bool,
}

#[derive(Args, Clone, Debug)]
pub struct PlanArgs {
    #[clap(flatten)]
    pub select: SelectArgs,
}

#[derive(Args, Clone, Debug)]
pub struct VerifyArgs {
    #[clap(flatten)]
    pub select: SelectArgs,
}

#[derive(Args, Clone, Debug)]
pub struct PublishArgs {
    #[clap(flatten)]
    pub select: SelectArgs,
}

#[derive(Args, Clone, Debug)]
pub struct ShowArgs {
    #[clap(flatten)]
    pub select: SelectArgs,
}

#[derive(Args, Clone, Debug)]
pub struct CleanArgs {}

/// A packaging backend ecli-dist can drive
#[derive(ValueEnum, Copy, Clone, Debug)]
pub enum BackendArg {
    /// Debian/Ubuntu `.deb` via dpkg-deb
    Deb,
    /// Fedora/RHEL `.rpm` via rpmbuild
    Rpm,
    /// FreeBSD `.pkg` via pkg create
    Pkg,
    /// Windows installer `.exe` via makensis
    Nsis,
    /// macOS `.dmg` via hdiutil
    Dmg,
}

impl BackendArg {
    /// Convert the application version of this enum to the library version
    pub fn to_lib(self) -> ecli_dist::config::BackendKind {
        match self {
            BackendArg::Deb => ecli_dist::config::BackendKind::Deb,
            BackendArg::Rpm => ecli_dist::config::BackendKind::Rpm,
            BackendArg::Pkg => ecli_dist::config::BackendKind::FreebsdPkg,
            BackendArg::Nsis => ecli_dist::config::BackendKind::Nsis,
            BackendArg::Dmg => ecli_dist::config::BackendKind::Dmg,
        }
    }
}

/// A checksum style for the artifact's sidecar file
#[derive(ValueEnum, Copy, Clone, Debug)]
pub enum ChecksumArg {
    /// SHA-256, the default
    Sha256,
    /// SHA-512
    Sha512,
}

impl ChecksumArg {
    /// Convert the application version of this enum to the library version
    pub fn to_lib(self) -> ecli_dist::config::ChecksumStyle {
        match self {
            ChecksumArg::Sha256 => ecli_dist::config::ChecksumStyle::Sha256,
            ChecksumArg::Sha512 => ecli_dist::config::ChecksumStyle::Sha512,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}
