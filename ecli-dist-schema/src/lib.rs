#![deny(missing_docs)]

//! # ecli-dist-schema
//!
//! This crate exists to serialize and deserialize the release-manifest.json produced
//! by ecli-dist. Ideally it should be reasonably forward and backward compatible
//! with different versions of this format, so that release automation written against
//! an older ecli-dist keeps working.
//!
//! The root type of the schema is [`ReleaseManifest`][].

use camino::Utf8PathBuf;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The name of the manifest file ecli-dist writes into its scratch dir
pub const MANIFEST_FILE_NAME: &str = "release-manifest.json";

/// A report of the release artifacts that ecli-dist produced (or would produce)
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReleaseManifest {
    /// The version of ecli-dist that generated this
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dist_version: Option<String>,
    /// The name of the app being released
    pub app_name: String,
    /// The version of the app being released
    // FIXME: should be a Version but JsonSchema doesn't support (yet?)
    pub app_version: String,
    /// The git tag this release is (or will be) published under
    pub release_tag: String,
    /// The artifacts for this release (packages and their checksum sidecars)
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
}

/// A file that's part of a Release
///
/// i.e. a platform package or a checksum sidecar
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Artifact {
    /// The unique name of the artifact (e.g. `ecli_0.1.0_amd64.deb`)
    pub name: String,
    /// The kind of artifact this is (e.g. "installable-package")
    #[serde(flatten)]
    pub kind: ArtifactKind,
    /// The platform tag baked into the artifact's name (e.g. "amd64", "win_x64")
    pub target_platform: String,
    /// The location of the artifact on the local system
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub path: Option<Utf8PathBuf>,
    /// The hex digest of the artifact, when one has been computed
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub checksum: Option<String>,
}

/// A kind of Artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind")]
#[non_exhaustive]
pub enum ArtifactKind {
    /// A package a platform's installer tooling can consume (.deb, .rpm, .pkg, .exe, .dmg)
    #[serde(rename = "installable-package")]
    InstallablePackage,
    /// A checksum sidecar for another artifact
    #[serde(rename = "checksum")]
    Checksum,
    /// Unknown to this version of ecli-dist-schema
    ///
    /// This is a fallback for forward/backward-compat
    #[serde(other)]
    #[serde(rename = "unknown")]
    Unknown,
}

impl ReleaseManifest {
    /// Create a new ReleaseManifest for an app
    ///
    /// The release tag is derived from the version (`v{version}`).
    pub fn new(dist_version: Option<String>, app_name: String, app_version: String) -> Self {
        let release_tag = format!("v{app_version}");
        Self {
            dist_version,
            app_name,
            app_version,
            release_tag,
            artifacts: vec![],
        }
    }

    /// Parse the app version as a semver Version
    pub fn parsed_version(&self) -> Result<semver::Version, semver::Error> {
        self.app_version.parse()
    }

    /// Get the JSON Schema for a ReleaseManifest
    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ReleaseManifest)
    }
}
