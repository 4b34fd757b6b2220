//! Mock project fixtures, mostly you want the `mock_*` functions,
//! the consts help you assert the results

use axoasset::LocalAsset;
use camino::{Utf8Path, Utf8PathBuf};
use temp_dir::TempDir;

use crate::config::{BackendKind, BundleMode, ChecksumStyle, Config};
use crate::project::PYPROJECT_NAME;

pub const APP_NAME: &str = "ecli";
pub const APP_VERSION: &str = "0.1.0";

pub const PYPROJECT: &str = r#"[project]
name = "ecli"
version = "0.1.0"
description = "Terminal-based code editor"
"#;

/// Write a minimal ecli checkout into a temp dir
///
/// Keep the TempDir alive as long as you use the path.
pub fn mock_project() -> (TempDir, Utf8PathBuf) {
    mock_project_with(PYPROJECT)
}

/// Same, but with a caller-supplied pyproject.toml
pub fn mock_project_with(pyproject: &str) -> (TempDir, Utf8PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root =
        Utf8PathBuf::from_path_buf(tmp.path().to_owned()).expect("temp_dir made non-utf8 path!?");
    LocalAsset::write_new_all(pyproject, root.join(PYPROJECT_NAME)).unwrap();
    (tmp, root)
}

/// A Config for the mock project, fake-bundled so no python toolchain is needed
pub fn mock_config(root: &Utf8Path, backend: BackendKind) -> Config {
    Config {
        project_dir: root.to_owned(),
        backend,
        checksum: ChecksumStyle::Sha256,
        bundle_mode: BundleMode::Fake,
    }
}
