//! Building FreeBSD .pkg packages with pkg create
//!
//! `pkg create` is driven by a +MANIFEST (we write the UCL dialect, the one
//! `pkg` itself documents) plus a packing list of files relative to the
//! /usr/local prefix. The tool names its output `{name}-{version}.pkg`; the
//! normalize step renames that to the strict release name afterwards.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::errors::{DistError, DistResult};
use crate::platform::Arch;
use crate::project::PythonApp;
use crate::tasks::{ReleaseGraph, WorkDirs};

use super::templates::TEMPLATE_FREEBSD_MANIFEST;

/// Everything needed to run pkg create over the staged tree
#[derive(Debug, Clone)]
pub struct FreebsdPackageInfo {
    /// Package name ("ecli")
    pub pkg_name: String,
    /// Package version ("0.1.0")
    pub version: String,
    /// `Name <email>` for the manifest
    pub maintainer: String,
    /// Homepage for the manifest, if the project has one
    pub homepage: Option<String>,
    /// License identifier for the manifest
    pub license: String,
    /// One-line description
    pub summary: String,
    /// The pkg ABI string ("FreeBSD:14:amd64")
    pub abi: String,
    /// The staged tree (usr/local/... underneath)
    pub stage_dir: Utf8PathBuf,
    /// Scratch dir holding the +MANIFEST, the plist, and pkg's output
    pub work_dir: Utf8PathBuf,
    /// Where pkg create will leave the package (`{name}-{version}.pkg`)
    pub expected_artifact: Utf8PathBuf,
}

#[derive(Serialize)]
struct ManifestContext<'a> {
    name: &'a str,
    version: &'a str,
    summary: &'a str,
    maintainer: &'a str,
    homepage: Option<&'a str>,
    abi: &'a str,
    license: Option<&'a str>,
    description: &'a str,
}

impl FreebsdPackageInfo {
    /// Compute all the FreeBSD pkg info
    pub fn new(app: &PythonApp, dirs: &WorkDirs, arch: Arch) -> Self {
        let work_dir = dirs.package_dir.join("freebsd");
        let native_name = format!("{}-{}.pkg", app.name, app.version);
        let expected_artifact = work_dir.join(native_name);
        Self {
            pkg_name: app.name.clone(),
            version: app.version.to_string(),
            maintainer: app.maintainer(),
            homepage: app.metadata.homepage.clone(),
            license: app.license(),
            summary: app.summary(),
            abi: arch.freebsd_abi(),
            stage_dir: dirs.stage_dir.clone(),
            work_dir,
            expected_artifact,
        }
    }

    /// Write the +MANIFEST and plist, then run pkg create
    pub fn build(&self, graph: &ReleaseGraph) -> DistResult<Utf8PathBuf> {
        let tool = graph.tools.pkg()?;

        let manifest = graph.templates.render_file_to_clean_string(
            TEMPLATE_FREEBSD_MANIFEST,
            &ManifestContext {
                name: &self.pkg_name,
                version: &self.version,
                summary: &self.summary,
                maintainer: &self.maintainer,
                homepage: self.homepage.as_deref(),
                abi: &self.abi,
                license: Some(&self.license),
                description: &self.summary,
            },
        )?;
        let manifest_path = self.work_dir.join("+MANIFEST");
        super::write_rendered(&manifest, &manifest_path)?;

        let plist_path = self.work_dir.join("plist");
        super::write_rendered(&plist_lines(&self.stage_dir)?, &plist_path)?;

        let mut cmd = tool.cmd("build the FreeBSD .pkg");
        cmd.arg("create")
            .arg("-M")
            .arg(&manifest_path)
            .arg("-p")
            .arg(&plist_path)
            .arg("-r")
            .arg(&self.stage_dir)
            .arg("-o")
            .arg(&self.work_dir);
        cmd.stdout_to_stderr().run()?;

        if !self.expected_artifact.is_file() {
            return Err(DistError::PackageMissing {
                tool: "pkg".to_owned(),
                expected: self.expected_artifact.clone(),
            });
        }
        Ok(self.expected_artifact.clone())
    }
}

/// The packing list: every staged file, relative to the /usr/local prefix
fn plist_lines(stage_dir: &Utf8Path) -> DistResult<String> {
    let prefix_dir = stage_dir.join("usr/local");
    let mut lines = vec![];
    for file in super::walk_files(stage_dir)? {
        if let Ok(rel) = file.strip_prefix(&prefix_dir) {
            lines.push(rel.to_string());
        }
    }
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::backend::templates::Templates;

    #[test]
    fn manifest_is_ucl() {
        let templates = Templates::new().unwrap();
        let rendered = templates
            .render_file_to_clean_string(
                TEMPLATE_FREEBSD_MANIFEST,
                &ManifestContext {
                    name: "ecli",
                    version: "0.1.0",
                    summary: "Terminal-based code editor",
                    maintainer: "ecli maintainers <dev@ecli.dev>",
                    homepage: Some("https://ecli.dev"),
                    abi: "FreeBSD:14:amd64",
                    license: Some("MIT"),
                    description: "Terminal-based code editor",
                },
            )
            .unwrap();
        insta::assert_snapshot!(rendered, @r###"
        name: "ecli"
        origin: "editors/ecli"
        version: "0.1.0"
        comment: "Terminal-based code editor"
        maintainer: "ecli maintainers <dev@ecli.dev>"
        www: "https://ecli.dev"
        abi: "FreeBSD:14:amd64"
        prefix: "/usr/local"
        categories: [ "editors" ]
        licenses: [ "MIT" ]
        desc: <<EOD
        Terminal-based code editor
        EOD
        "###);
    }

    #[test]
    fn plist_is_relative_to_the_prefix() {
        let tmp = temp_dir::TempDir::new().unwrap();
        let stage = Utf8PathBuf::from_path_buf(tmp.path().to_owned()).unwrap();
        std::fs::create_dir_all(stage.join("usr/local/bin")).unwrap();
        std::fs::create_dir_all(stage.join("usr/local/share/man/man1")).unwrap();
        std::fs::write(stage.join("usr/local/bin/ecli"), "x").unwrap();
        std::fs::write(stage.join("usr/local/share/man/man1/ecli.1.gz"), "x").unwrap();

        let plist = plist_lines(&stage).unwrap();
        let lines: Vec<_> = plist.lines().collect();
        assert_eq!(lines, vec!["bin/ecli", "share/man/man1/ecli.1.gz"]);
    }
}
