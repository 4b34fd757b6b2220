//! Reading the app's pyproject.toml
//!
//! The version (and everything else we know about the app) is resolved exactly once,
//! up front, and carried through the rest of the pipeline as a [`PythonApp`][].
//! PEP 621 `[project]` is the source of truth; `[tool.poetry]` is honored as a
//! legacy fallback for projects that haven't migrated.

use axoasset::SourceFile;
use camino::{Utf8Path, Utf8PathBuf};
use semver::Version;
use serde::Deserialize;

use crate::config::DistMetadata;
use crate::errors::{DistError, DistResult};

/// The manifest file every python project carries
pub const PYPROJECT_NAME: &str = "pyproject.toml";

/// Everything we resolved about the app being packaged
#[derive(Debug, Clone)]
pub struct PythonApp {
    /// Path to the pyproject.toml we read
    pub manifest_path: Utf8PathBuf,
    /// The app name ("ecli")
    pub name: String,
    /// The app version, parsed and validated
    pub version: Version,
    /// One-line description, if the manifest has one
    pub description: Option<String>,
    /// The `[tool.ecli-dist]` table (empty defaults if absent)
    pub metadata: DistMetadata,
}

/// Raw layout of the parts of pyproject.toml we care about
#[derive(Deserialize)]
struct PyProject {
    project: Option<ProjectTable>,
    tool: Option<ToolTable>,
}

#[derive(Deserialize)]
struct ProjectTable {
    name: Option<String>,
    version: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct ToolTable {
    poetry: Option<PoetryTable>,
    #[serde(rename = "ecli-dist")]
    ecli_dist: Option<DistMetadata>,
}

#[derive(Deserialize)]
struct PoetryTable {
    name: Option<String>,
    version: Option<String>,
    description: Option<String>,
}

/// Load and resolve the app from the project dir's pyproject.toml
pub fn load_app(project_dir: &Utf8Path) -> DistResult<PythonApp> {
    let manifest_path = project_dir.join(PYPROJECT_NAME);
    if !manifest_path.is_file() {
        return Err(DistError::ManifestMissing { manifest_path });
    }
    let source = SourceFile::load_local(&manifest_path)?;
    let raw: PyProject = source.deserialize_toml()?;

    let project = raw.project;
    let poetry = raw.tool.as_ref().and_then(|t| t.poetry.as_ref());

    let version_field = project
        .as_ref()
        .and_then(|p| p.version.clone())
        .or_else(|| poetry.and_then(|p| p.version.clone()));
    // manifests written by hand sometimes carry stray whitespace
    let version_field = version_field.map(|v| v.trim().to_owned());
    let Some(version_field) = version_field.filter(|v| !v.is_empty()) else {
        return Err(DistError::MissingVersion { manifest_path });
    };
    let version = Version::parse(&version_field).map_err(|details| DistError::VersionParse {
        version: version_field,
        manifest_path: manifest_path.clone(),
        details,
    })?;

    let name = project
        .as_ref()
        .and_then(|p| p.name.clone())
        .or_else(|| poetry.and_then(|p| p.name.clone()))
        .map(|n| n.trim().to_owned())
        .filter(|n| !n.is_empty());
    let Some(name) = name else {
        return Err(DistError::MissingName { manifest_path });
    };

    let description = project
        .as_ref()
        .and_then(|p| p.description.clone())
        .or_else(|| poetry.and_then(|p| p.description.clone()));

    let metadata = raw
        .tool
        .and_then(|t| t.ecli_dist)
        .unwrap_or_default();

    Ok(PythonApp {
        manifest_path,
        name,
        version,
        description,
        metadata,
    })
}

impl PythonApp {
    /// The description, falling back to the metadata override first
    pub fn summary(&self) -> String {
        self.metadata
            .description
            .clone()
            .or_else(|| self.description.clone())
            .unwrap_or_else(|| format!("the {} terminal code editor", self.name))
    }

    /// The human-facing name used by installers and app bundles
    pub fn display_name(&self) -> String {
        self.metadata
            .display_name
            .clone()
            .unwrap_or_else(|| self.name.clone())
    }

    /// The git tag this version releases under
    pub fn release_tag(&self) -> String {
        format!("v{}", self.version)
    }

    /// The contact that goes in package metadata
    pub fn maintainer(&self) -> String {
        self.metadata
            .maintainer
            .clone()
            .unwrap_or_else(|| "ecli maintainers <dev@ecli.dev>".to_owned())
    }

    /// The license identifier that goes in package metadata
    pub fn license(&self) -> String {
        self.metadata
            .license
            .clone()
            .unwrap_or_else(|| "MIT".to_owned())
    }

    /// The macOS bundle identifier
    pub fn identifier(&self) -> String {
        self.metadata
            .identifier
            .clone()
            .unwrap_or_else(|| format!("dev.ecli.{}", self.name))
    }

    /// The file name of the bundled executable on this host
    pub fn exe_name(&self) -> String {
        format!("{}{}", self.name, std::env::consts::EXE_SUFFIX)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use camino::Utf8PathBuf;

    fn write_project(contents: &str) -> (temp_dir::TempDir, Utf8PathBuf) {
        let tmp = temp_dir::TempDir::new().unwrap();
        let dir = Utf8PathBuf::from_path_buf(tmp.path().to_owned()).unwrap();
        std::fs::write(dir.join(PYPROJECT_NAME), contents).unwrap();
        (tmp, dir)
    }

    #[test]
    fn reads_pep621_version_exactly() {
        let (_tmp, dir) = write_project(
            r#"
[project]
name = "ecli"
version = "0.1.0"
description = "Terminal-based code editor"
"#,
        );
        let app = load_app(&dir).unwrap();
        assert_eq!(app.name, "ecli");
        assert_eq!(app.version.to_string(), "0.1.0");
        assert_eq!(app.description.as_deref(), Some("Terminal-based code editor"));
    }

    #[test]
    fn version_whitespace_is_trimmed() {
        let (_tmp, dir) = write_project(
            "[project]\nname = \"ecli\"\nversion = \"  0.1.0\t\"\n",
        );
        let app = load_app(&dir).unwrap();
        assert_eq!(app.version.to_string(), "0.1.0");
    }

    #[test]
    fn poetry_fallback_works() {
        let (_tmp, dir) = write_project(
            r#"
[tool.poetry]
name = "ecli"
version = "0.2.1"
"#,
        );
        let app = load_app(&dir).unwrap();
        assert_eq!(app.version.to_string(), "0.2.1");
    }

    #[test]
    fn missing_version_names_the_manifest() {
        let (_tmp, dir) = write_project("[project]\nname = \"ecli\"\n");
        let err = load_app(&dir).unwrap_err();
        assert!(err.to_string().contains(PYPROJECT_NAME), "{err}");
    }

    #[test]
    fn empty_version_is_missing_too() {
        let (_tmp, dir) = write_project("[project]\nname = \"ecli\"\nversion = \"   \"\n");
        let err = load_app(&dir).unwrap_err();
        assert!(matches!(err, DistError::MissingVersion { .. }), "{err}");
    }

    #[test]
    fn missing_manifest_is_its_own_error() {
        let tmp = temp_dir::TempDir::new().unwrap();
        let dir = Utf8PathBuf::from_path_buf(tmp.path().to_owned()).unwrap();
        let err = load_app(&dir).unwrap_err();
        assert!(matches!(err, DistError::ManifestMissing { .. }), "{err}");
    }

    #[test]
    fn garbled_version_is_a_parse_error() {
        let (_tmp, dir) = write_project("[project]\nname = \"ecli\"\nversion = \"one dot oh\"\n");
        let err = load_app(&dir).unwrap_err();
        assert!(matches!(err, DistError::VersionParse { .. }), "{err}");
    }

    #[test]
    fn metadata_table_is_read() {
        let (_tmp, dir) = write_project(
            r#"
[project]
name = "ecli"
version = "0.1.0"

[tool.ecli-dist]
maintainer = "ecli maintainers <dev@ecli.dev>"
deb-depends = ["libc6"]
"#,
        );
        let app = load_app(&dir).unwrap();
        assert_eq!(
            app.metadata.maintainer.as_deref(),
            Some("ecli maintainers <dev@ecli.dev>")
        );
        assert_eq!(app.metadata.deb_depends.as_deref(), Some(&["libc6".to_owned()][..]));
    }

    #[test]
    fn derived_fields_have_defaults() {
        let (_tmp, dir) = write_project("[project]\nname = \"ecli\"\nversion = \"0.1.0\"\n");
        let app = load_app(&dir).unwrap();
        assert_eq!(app.maintainer(), "ecli maintainers <dev@ecli.dev>");
        assert_eq!(app.license(), "MIT");
        assert_eq!(app.identifier(), "dev.ecli.ecli");
        assert_eq!(app.display_name(), "ecli");
        assert_eq!(app.summary(), "the ecli terminal code editor");
        assert_eq!(app.release_tag(), "v0.1.0");
    }
}
