//! Building .deb packages with dpkg-deb

use axoasset::LocalAsset;
use camino::Utf8PathBuf;
use serde::Serialize;

use crate::errors::{DistError, DistResult};
use crate::platform::Arch;
use crate::project::PythonApp;
use crate::stage::set_unix_mode;
use crate::tasks::{ReleaseGraph, WorkDirs};

use super::templates::{
    TEMPLATE_DEB_CONTROL, TEMPLATE_DEB_POSTINST, TEMPLATE_DEB_POSTRM, TEMPLATE_DEB_PRERM,
};

/// Runtime Depends we declare when the project doesn't override them
///
/// The bundler links python and most libraries in statically, so this is just
/// what the unpacked executable still dlopens on a stock system.
pub const DEFAULT_DEB_DEPENDS: &[&str] = &["libc6", "libncursesw6"];

/// Everything needed to run dpkg-deb over the staged tree
#[derive(Debug, Clone)]
pub struct DebPackageInfo {
    /// Package name ("ecli")
    pub pkg_name: String,
    /// Package version ("0.1.0")
    pub version: String,
    /// Debian arch tag ("amd64")
    pub arch: &'static str,
    /// `Name <email>` for the control file
    pub maintainer: String,
    /// Homepage for the control file, if the project has one
    pub homepage: Option<String>,
    /// Debian section ("editors")
    pub section: String,
    /// One-line description
    pub summary: String,
    /// Pre-joined runtime Depends ("libc6, libncursesw6")
    pub depends: String,
    /// The staged FHS tree dpkg-deb packs up
    pub stage_dir: Utf8PathBuf,
    /// Scratch dir dpkg-deb writes into
    pub out_dir: Utf8PathBuf,
    /// Where dpkg-deb will leave the package (it names output
    /// `{package}_{version}_{arch}.deb` from the control fields)
    pub expected_artifact: Utf8PathBuf,
}

#[derive(Serialize)]
struct ControlContext<'a> {
    pkg_name: &'a str,
    version: &'a str,
    arch: &'a str,
    maintainer: &'a str,
    installed_size: u64,
    depends: &'a str,
    section: &'a str,
    homepage: Option<&'a str>,
    summary: &'a str,
}

#[derive(Serialize)]
struct ScriptContext<'a> {
    pkg_name: &'a str,
    version: &'a str,
}

impl DebPackageInfo {
    /// Compute all the deb info
    pub fn new(app: &PythonApp, dirs: &WorkDirs, arch: Arch) -> Self {
        let depends = app
            .metadata
            .deb_depends
            .clone()
            .unwrap_or_else(|| DEFAULT_DEB_DEPENDS.iter().map(|s| s.to_string()).collect())
            .join(", ");
        let section = app
            .metadata
            .section
            .clone()
            .unwrap_or_else(|| "editors".to_owned());
        let out_dir = dirs.package_dir.join("deb");
        let native_name = format!("{}_{}_{}.deb", app.name, app.version, arch.linux_tag());
        let expected_artifact = out_dir.join(native_name);
        Self {
            pkg_name: app.name.clone(),
            version: app.version.to_string(),
            arch: arch.linux_tag(),
            maintainer: app.maintainer(),
            homepage: app.metadata.homepage.clone(),
            section,
            summary: app.summary(),
            depends,
            stage_dir: dirs.stage_dir.clone(),
            out_dir,
            expected_artifact,
        }
    }

    /// Write the DEBIAN/ control files into the staged tree and run dpkg-deb
    pub fn build(&self, graph: &ReleaseGraph) -> DistResult<Utf8PathBuf> {
        let tool = graph.tools.dpkg_deb()?;

        // Installed-Size counts the payload, so take it before DEBIAN/ lands
        let installed_size = super::dir_size_kib(&self.stage_dir)?;

        let debian_dir = self.stage_dir.join("DEBIAN");
        LocalAsset::create_dir_all(&debian_dir)?;

        let control = graph.templates.render_file_to_clean_string(
            TEMPLATE_DEB_CONTROL,
            &ControlContext {
                pkg_name: &self.pkg_name,
                version: &self.version,
                arch: self.arch,
                maintainer: &self.maintainer,
                installed_size,
                depends: &self.depends,
                section: &self.section,
                homepage: self.homepage.as_deref(),
                summary: &self.summary,
            },
        )?;
        super::write_rendered(&control, &debian_dir.join("control"))?;

        let scripts = [
            (TEMPLATE_DEB_POSTINST, "postinst"),
            (TEMPLATE_DEB_PRERM, "prerm"),
            (TEMPLATE_DEB_POSTRM, "postrm"),
        ];
        let script_context = ScriptContext {
            pkg_name: &self.pkg_name,
            version: &self.version,
        };
        for (template, file_name) in scripts {
            let rendered = graph
                .templates
                .render_file_to_clean_string(template, &script_context)?;
            let dest = debian_dir.join(file_name);
            super::write_rendered(&rendered, &dest)?;
            set_unix_mode(&dest, 0o755)?;
        }

        LocalAsset::create_dir_all(&self.out_dir)?;
        let mut cmd = tool.cmd("build the .deb");
        cmd.arg("--build")
            .arg("--root-owner-group")
            .arg(&self.stage_dir)
            .arg(&self.out_dir);
        cmd.stdout_to_stderr().run()?;

        if !self.expected_artifact.is_file() {
            return Err(DistError::PackageMissing {
                tool: "dpkg-deb".to_owned(),
                expected: self.expected_artifact.clone(),
            });
        }
        Ok(self.expected_artifact.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::backend::templates::Templates;

    #[test]
    fn control_file_renders_stably() {
        let templates = Templates::new().unwrap();
        let rendered = templates
            .render_file_to_clean_string(
                TEMPLATE_DEB_CONTROL,
                &ControlContext {
                    pkg_name: "ecli",
                    version: "0.1.0",
                    arch: "amd64",
                    maintainer: "ecli maintainers <dev@ecli.dev>",
                    installed_size: 9,
                    depends: "libc6, libncursesw6",
                    section: "editors",
                    homepage: Some("https://ecli.dev"),
                    summary: "Terminal-based code editor",
                },
            )
            .unwrap();
        insta::assert_snapshot!(rendered, @r###"
        Package: ecli
        Version: 0.1.0
        Architecture: amd64
        Maintainer: ecli maintainers <dev@ecli.dev>
        Installed-Size: 9
        Depends: libc6, libncursesw6
        Section: editors
        Priority: optional
        Homepage: https://ecli.dev
        Description: Terminal-based code editor
        "###);
    }

    #[test]
    fn homepage_is_optional_in_control() {
        let templates = Templates::new().unwrap();
        let rendered = templates
            .render_file_to_clean_string(
                TEMPLATE_DEB_CONTROL,
                &ControlContext {
                    pkg_name: "ecli",
                    version: "0.1.0",
                    arch: "arm64",
                    maintainer: "ecli maintainers <dev@ecli.dev>",
                    installed_size: 12,
                    depends: "libc6",
                    section: "editors",
                    homepage: None,
                    summary: "Terminal-based code editor",
                },
            )
            .unwrap();
        assert!(!rendered.contains("Homepage"), "{rendered}");
        assert!(rendered.contains("Architecture: arm64"), "{rendered}");
    }

    #[test]
    fn maintainer_scripts_are_shell() {
        let templates = Templates::new().unwrap();
        let context = ScriptContext {
            pkg_name: "ecli",
            version: "0.1.0",
        };
        for template in [TEMPLATE_DEB_POSTINST, TEMPLATE_DEB_PRERM, TEMPLATE_DEB_POSTRM] {
            let rendered = templates
                .render_file_to_clean_string(template, &context)
                .unwrap();
            assert!(rendered.starts_with("#!/bin/sh"), "{template}: {rendered}");
            assert!(rendered.contains("ecli 0.1.0"), "{template}: {rendered}");
        }
    }
}
