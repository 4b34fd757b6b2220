//! Errors!

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// A Result returned by ecli-dist
pub type DistResult<T> = std::result::Result<T, DistError>;

/// An Error/Diagnostic returned by ecli-dist
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum DistError {
    /// Axoasset returned an error (I/O error)
    #[error(transparent)]
    #[diagnostic(transparent)]
    Axoasset(#[from] axoasset::AxoassetError),

    /// Axoprocess returned an error (command failed to spawn or exited non-zero)
    #[error(transparent)]
    #[diagnostic(transparent)]
    Axoprocess(#[from] axoprocess::AxoprocessError),

    /// An error rendering one of our embedded templates
    #[error("failed to render template {template}")]
    Jinja {
        /// Path of the template inside the templates dir
        template: String,
        /// The underlying issue
        #[source]
        details: minijinja::Error,
    },

    /// A raw I/O error with the path we were touching
    #[error("failed to access {path}")]
    Io {
        /// The path we were working with
        path: Utf8PathBuf,
        /// The underlying issue
        #[source]
        details: std::io::Error,
    },

    /// We couldn't find the project manifest at all
    #[error("couldn't find a pyproject.toml at {manifest_path}")]
    #[diagnostic(help("run ecli-dist from the project root, or point at it with --project-dir"))]
    ManifestMissing {
        /// Where we looked
        manifest_path: Utf8PathBuf,
    },

    /// The manifest exists but never names the project
    #[error("your project doesn't have a name: {manifest_path}")]
    #[diagnostic(help("set name under [project] (or [tool.poetry])"))]
    MissingName {
        /// Path to the pyproject.toml
        manifest_path: Utf8PathBuf,
    },

    /// The manifest exists but has no usable version
    #[error("no version set in {manifest_path}")]
    #[diagnostic(help("set version under [project] (or [tool.poetry]); it must be non-empty"))]
    MissingVersion {
        /// Path to the pyproject.toml
        manifest_path: Utf8PathBuf,
    },

    /// The version string in the manifest isn't a semver version
    #[error("couldn't parse version '{version}' in {manifest_path}")]
    VersionParse {
        /// The string we found
        version: String,
        /// Path to the pyproject.toml
        manifest_path: Utf8PathBuf,
        /// The underlying issue
        #[source]
        details: semver::Error,
    },

    /// Running on a CPU we have no platform tags for
    #[error("unsupported host architecture: {arch}")]
    #[diagnostic(help("ecli packages are only built for x86_64 and aarch64 hosts"))]
    UnsupportedHostArch {
        /// value of std::env::consts::ARCH
        arch: String,
    },

    /// A tool we needed wasn't installed
    #[error("failed to find {tool} on this system")]
    #[diagnostic(help("{tool} is needed to {reason}; get it via {install_hint}"))]
    ToolMissing {
        /// Name of the tool
        tool: String,
        /// What we wanted it for
        reason: String,
        /// How to get it
        install_hint: String,
    },

    /// The bundler claimed success but we can't find the executable it made
    #[error("the bundler completed but produced no executable")]
    #[diagnostic(help("looked for:\n{candidates}"))]
    BundleMissing {
        /// The output layouts we probed, one path per line
        candidates: String,
    },

    /// The packaging tool claimed success but its output isn't where it should be
    #[error("{tool} did not produce {expected}")]
    PackageMissing {
        /// Name of the packaging tool
        tool: String,
        /// Where we expected its output
        expected: Utf8PathBuf,
    },

    /// The released files we promised aren't all on disk
    #[error("release verification failed: missing {missing}")]
    #[diagnostic(help("contents of {release_dir}:\n{listing}"))]
    AssertFailed {
        /// The release directory we checked
        release_dir: Utf8PathBuf,
        /// The files that should exist but don't, one per line
        missing: String,
        /// A listing of what the release directory actually holds
        listing: String,
    },
}
