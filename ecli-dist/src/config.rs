//! Config types for ecli-dist
//!
//! Runtime settings arrive through [`Config`][], which the CLI builds explicitly and
//! threads into [`crate::tasks::gather_work`][] (no ambient globals, no chdir games).
//! Project-level settings live in the `[tool.ecli-dist]` table of the app's
//! pyproject.toml and deserialize into [`DistMetadata`][].

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Runtime config for one ecli-dist invocation
#[derive(Debug, Clone)]
pub struct Config {
    /// The root of the python project (the dir that holds pyproject.toml)
    pub project_dir: Utf8PathBuf,
    /// Which packaging backend to drive
    pub backend: BackendKind,
    /// The checksum style for the artifact's sidecar
    pub checksum: ChecksumStyle,
    /// Whether to really run the bundler or write a stub executable
    pub bundle_mode: BundleMode,
}

/// A packaging backend we know how to drive
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Debian/Ubuntu packages via dpkg-deb
    Deb,
    /// RHEL-family packages via rpmbuild
    Rpm,
    /// FreeBSD packages via pkg create
    FreebsdPkg,
    /// Windows installers via makensis
    Nsis,
    /// macOS disk images via hdiutil
    Dmg,
}

impl BackendKind {
    /// The extension of the artifact this backend produces
    pub fn ext(self) -> &'static str {
        match self {
            BackendKind::Deb => "deb",
            BackendKind::Rpm => "rpm",
            BackendKind::FreebsdPkg => "pkg",
            BackendKind::Nsis => "exe",
            BackendKind::Dmg => "dmg",
        }
    }

    /// The staging layout this backend's packaging tool consumes
    pub fn layout(self) -> Layout {
        match self {
            BackendKind::Deb | BackendKind::Rpm => Layout::FhsUsr,
            BackendKind::FreebsdPkg => Layout::FhsUsrLocal,
            BackendKind::Nsis => Layout::Flat,
            BackendKind::Dmg => Layout::AppBundle,
        }
    }

    /// The external tool that does the actual packaging
    pub fn tool_name(self) -> &'static str {
        match self {
            BackendKind::Deb => "dpkg-deb",
            BackendKind::Rpm => "rpmbuild",
            BackendKind::FreebsdPkg => "pkg",
            BackendKind::Nsis => "makensis",
            BackendKind::Dmg => "hdiutil",
        }
    }
}

/// How the staging tree is arranged before packaging
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Layout {
    /// FHS tree rooted at usr/ (deb, rpm)
    FhsUsr,
    /// FHS tree rooted at usr/local/ (freebsd)
    FhsUsrLocal,
    /// Everything in one flat dir (windows installer payload)
    Flat,
    /// A macOS Name.app bundle
    AppBundle,
}

/// How to checksum artifacts
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumStyle {
    /// sha256
    Sha256,
    /// sha512
    Sha512,
}

impl ChecksumStyle {
    /// Get the extension of a checksum sidecar
    pub fn ext(self) -> &'static str {
        match self {
            ChecksumStyle::Sha256 => "sha256",
            ChecksumStyle::Sha512 => "sha512",
        }
    }
}

/// Whether the Binary Builder stage really runs the bundler
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BundleMode {
    /// Run PyInstaller for real
    Real,
    /// Write a stub executable so the rest of the pipeline can be exercised
    /// without a python toolchain on hand
    Fake,
}

/// Contents of the `[tool.ecli-dist]` table in pyproject.toml
///
/// Everything is optional; paths are relative to the project root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DistMetadata {
    /// Contact put in package metadata (`Name <email>`)
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintainer: Option<String>,

    /// Project homepage put in package metadata
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,

    /// License identifier put in package metadata (e.g. "MIT")
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    /// One-line description override (defaults to [project] description)
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Debian section / package category (defaults to "editors")
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,

    /// Vendor put in the rpm spec, when the project wants one
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,

    /// Human-facing app name for installers and app bundles (defaults to the app name)
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// macOS bundle identifier (defaults to "dev.ecli.{name}")
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    /// Runtime Depends for the .deb (replaces the default list)
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deb_depends: Option<Vec<String>>,

    /// Runtime Requires for the .rpm (replaces the default list)
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpm_requires: Option<Vec<String>>,

    /// The app's entry point module, for enumerated builds (defaults to "main.py")
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<Utf8PathBuf>,

    /// A PyInstaller .spec file to prefer over enumerated flags
    /// (defaults to "packaging/pyinstaller/{name}.spec" if that exists)
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pyinstaller_spec: Option<Utf8PathBuf>,

    /// Extra --hidden-import modules for enumerated builds (extends the defaults)
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden_imports: Option<Vec<String>>,

    /// A png icon staged for linux desktop environments
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Utf8PathBuf>,

    /// An ico icon bundled into the windows installer payload
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ico: Option<Utf8PathBuf>,

    /// An icns icon for the macOS app bundle
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icns: Option<Utf8PathBuf>,

    /// A prewritten roff man page (one is synthesized if unset)
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub man_page: Option<Utf8PathBuf>,

    /// A prewritten .desktop entry (one is synthesized if unset)
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desktop_file: Option<Utf8PathBuf>,

    /// The license file to stage (defaults to "LICENSE" if that exists)
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_file: Option<Utf8PathBuf>,

    /// The readme to stage (defaults to "README.md" if that exists)
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readme: Option<Utf8PathBuf>,

    /// Where finished artifacts land (defaults to "releases")
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_dir: Option<Utf8PathBuf>,

    /// The github repo slug ("owner/name") to publish releases to
    ///
    /// When unset, `gh` falls back to the repo the project dir is a clone of.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
}
