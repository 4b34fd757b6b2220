//! Building .rpm packages with rpmbuild

use axoasset::LocalAsset;
use camino::Utf8PathBuf;
use serde::Serialize;

use crate::errors::{DistError, DistResult};
use crate::platform::Arch;
use crate::project::PythonApp;
use crate::tasks::{ReleaseGraph, WorkDirs};

use super::templates::TEMPLATE_RPM_SPEC;

/// Runtime Requires we declare when the project doesn't override them
pub const DEFAULT_RPM_REQUIRES: &[&str] = &["glibc", "ncurses-libs"];

/// The rpm Release field
///
/// Deliberately plain (no `%{?dist}`) so the file rpmbuild produces has a name
/// we can compute ahead of time on any build host.
pub const RPM_RELEASE: &str = "1";

/// Everything needed to run rpmbuild over the staged tree
#[derive(Debug, Clone)]
pub struct RpmPackageInfo {
    /// Package name ("ecli")
    pub pkg_name: String,
    /// Package version ("0.1.0")
    pub version: String,
    /// The arch rpmbuild will bake into its output path ("x86_64")
    pub rpm_arch: &'static str,
    /// License identifier for the spec
    pub license: String,
    /// Vendor for the spec, if the project sets one
    pub vendor: Option<String>,
    /// Homepage for the spec, if the project has one
    pub homepage: Option<String>,
    /// One-line description
    pub summary: String,
    /// Pre-joined runtime Requires ("glibc, ncurses-libs")
    pub requires: String,
    /// The staged FHS tree the spec's %install copies from
    pub stage_dir: Utf8PathBuf,
    /// The rpmbuild _topdir we point it at
    pub topdir: Utf8PathBuf,
    /// Where we write the generated spec
    pub spec_path: Utf8PathBuf,
    /// Where rpmbuild will leave the package
    /// (`RPMS/{arch}/{name}-{version}-{release}.{arch}.rpm` under the topdir)
    pub expected_artifact: Utf8PathBuf,
}

#[derive(Serialize)]
struct SpecContext<'a> {
    name: &'a str,
    version: &'a str,
    release: &'a str,
    summary: &'a str,
    license: &'a str,
    url: Option<&'a str>,
    vendor: Option<&'a str>,
    requires: &'a str,
    description: &'a str,
    stage_dir: &'a str,
}

impl RpmPackageInfo {
    /// Compute all the rpm info
    pub fn new(app: &PythonApp, dirs: &WorkDirs, arch: Arch) -> Self {
        let requires = app
            .metadata
            .rpm_requires
            .clone()
            .unwrap_or_else(|| DEFAULT_RPM_REQUIRES.iter().map(|s| s.to_string()).collect())
            .join(", ");
        let topdir = dirs.package_dir.join("rpm");
        let spec_path = topdir.join("SPECS").join(format!("{}.spec", app.name));
        let rpm_arch = arch.rpm_arch();
        let native_name = format!(
            "{}-{}-{}.{}.rpm",
            app.name, app.version, RPM_RELEASE, rpm_arch
        );
        let expected_artifact = topdir.join("RPMS").join(rpm_arch).join(native_name);
        Self {
            pkg_name: app.name.clone(),
            version: app.version.to_string(),
            rpm_arch,
            license: app.license(),
            vendor: app.metadata.vendor.clone(),
            homepage: app.metadata.homepage.clone(),
            summary: app.summary(),
            requires,
            stage_dir: dirs.stage_dir.clone(),
            topdir,
            spec_path,
            expected_artifact,
        }
    }

    /// Write the generated spec and run rpmbuild -bb
    pub fn build(&self, graph: &ReleaseGraph) -> DistResult<Utf8PathBuf> {
        let tool = graph.tools.rpmbuild()?;

        let spec = graph.templates.render_file_to_clean_string(
            TEMPLATE_RPM_SPEC,
            &SpecContext {
                name: &self.pkg_name,
                version: &self.version,
                release: RPM_RELEASE,
                summary: &self.summary,
                license: &self.license,
                url: self.homepage.as_deref(),
                vendor: self.vendor.as_deref(),
                requires: &self.requires,
                description: &self.summary,
                stage_dir: self.stage_dir.as_str(),
            },
        )?;
        super::write_rendered(&spec, &self.spec_path)?;

        // rpmbuild wants its working dirs to exist up front
        for subdir in ["BUILD", "RPMS", "SOURCES", "SPECS", "SRPMS"] {
            LocalAsset::create_dir_all(self.topdir.join(subdir))?;
        }

        let mut cmd = tool.cmd("build the .rpm");
        cmd.arg("-bb")
            .arg("--define")
            .arg(format!("_topdir {}", self.topdir))
            .arg(&self.spec_path);
        cmd.stdout_to_stderr().run()?;

        if !self.expected_artifact.is_file() {
            return Err(DistError::PackageMissing {
                tool: "rpmbuild".to_owned(),
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

    fn render(context: &SpecContext) -> String {
        let templates = Templates::new().unwrap();
        templates
            .render_file_to_clean_string(TEMPLATE_RPM_SPEC, context)
            .unwrap()
    }

    #[test]
    fn spec_has_the_prebuilt_package_shape() {
        let rendered = render(&SpecContext {
            name: "ecli",
            version: "0.1.0",
            release: RPM_RELEASE,
            summary: "Terminal-based code editor",
            license: "MIT",
            url: Some("https://ecli.dev"),
            vendor: None,
            requires: "glibc, ncurses-libs",
            description: "Terminal-based code editor",
            stage_dir: "/tmp/scratch/stage",
        });
        assert!(rendered.contains("Name: ecli"), "{rendered}");
        assert!(rendered.contains("Release: 1"), "{rendered}");
        assert!(rendered.contains("Requires: glibc, ncurses-libs"), "{rendered}");
        // no dependency scan, no debuginfo split, no dist tag in the file name
        assert!(rendered.contains("AutoReqProv: no"), "{rendered}");
        assert!(rendered.contains("%global debug_package %{nil}"), "{rendered}");
        assert!(!rendered.contains("%{?dist}"), "{rendered}");
        assert!(
            rendered.contains("cp -a /tmp/scratch/stage/. %{buildroot}/"),
            "{rendered}"
        );
        assert!(!rendered.contains("Vendor:"), "{rendered}");
    }

    #[test]
    fn vendor_and_url_are_optional() {
        let rendered = render(&SpecContext {
            name: "ecli",
            version: "0.1.0",
            release: RPM_RELEASE,
            summary: "Terminal-based code editor",
            license: "MIT",
            url: None,
            vendor: Some("ecli project"),
            requires: "glibc",
            description: "Terminal-based code editor",
            stage_dir: "/tmp/scratch/stage",
        });
        assert!(!rendered.contains("URL:"), "{rendered}");
        assert!(rendered.contains("Vendor: ecli project"), "{rendered}");
    }
}
