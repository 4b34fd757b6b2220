//! Building windows installers with makensis
//!
//! We generate the whole .nsi script from a template: the staged flat payload
//! becomes File directives, and the installer registers an uninstaller, a start
//! menu shortcut, and the install dir on the machine PATH. The output file name
//! is whatever the script's OutFile says, so the "native" name here is one we
//! pick ourselves (`{name}-setup-{version}.exe`); the normalize step still owns
//! the strict release name.

use axoasset::LocalAsset;
use camino::Utf8PathBuf;
use serde::Serialize;

use crate::errors::{DistError, DistResult};
use crate::project::PythonApp;
use crate::tasks::{ReleaseGraph, WorkDirs};

use super::templates::TEMPLATE_NSIS_INSTALLER;

/// Everything needed to compile the windows installer
#[derive(Debug, Clone)]
pub struct NsisInstallerInfo {
    /// App name ("ecli")
    pub name: String,
    /// Human-facing name for shortcuts and Add/Remove Programs
    pub display_name: String,
    /// App version ("0.1.0")
    pub version: String,
    /// Publisher string for Add/Remove Programs
    pub publisher: String,
    /// Homepage for Add/Remove Programs, if the project has one
    pub homepage: Option<String>,
    /// File name of the payload executable ("ecli.exe")
    pub exe_name: String,
    /// The staged flat payload the installer packs up
    pub stage_dir: Utf8PathBuf,
    /// Scratch dir holding the generated script and makensis output
    pub work_dir: Utf8PathBuf,
    /// Where we write the generated .nsi script
    pub script_path: Utf8PathBuf,
    /// Where the script's OutFile points
    pub expected_artifact: Utf8PathBuf,
}

#[derive(Serialize)]
struct InstallerContext<'a> {
    name: &'a str,
    display_name: &'a str,
    version: &'a str,
    publisher: &'a str,
    homepage: Option<&'a str>,
    exe_name: &'a str,
    out_file: &'a str,
    files: &'a [FileEntry],
}

/// One staged file the installer carries
#[derive(Serialize)]
struct FileEntry {
    /// Absolute path at compile time
    src: String,
    /// Bare file name at install time
    name: String,
}

impl NsisInstallerInfo {
    /// Compute all the nsis info
    pub fn new(app: &PythonApp, dirs: &WorkDirs) -> Self {
        let work_dir = dirs.package_dir.join("nsis");
        let script_path = work_dir.join("installer.nsi");
        let native_name = format!("{}-setup-{}.exe", app.name, app.version);
        let expected_artifact = work_dir.join(native_name);
        Self {
            name: app.name.clone(),
            display_name: app.display_name(),
            version: app.version.to_string(),
            publisher: app.maintainer(),
            homepage: app.metadata.homepage.clone(),
            exe_name: app.exe_name(),
            stage_dir: dirs.stage_dir.clone(),
            work_dir,
            script_path,
            expected_artifact,
        }
    }

    /// Generate the .nsi script and run makensis
    pub fn build(&self, graph: &ReleaseGraph) -> DistResult<Utf8PathBuf> {
        let tool = graph.tools.makensis()?;

        let files: Vec<FileEntry> = super::walk_files(&self.stage_dir)?
            .into_iter()
            .filter_map(|path| {
                let name = path.file_name()?.to_owned();
                Some(FileEntry {
                    src: path.into_string(),
                    name,
                })
            })
            .collect();

        let script = graph.templates.render_file_to_clean_string(
            TEMPLATE_NSIS_INSTALLER,
            &InstallerContext {
                name: &self.name,
                display_name: &self.display_name,
                version: &self.version,
                publisher: &self.publisher,
                homepage: self.homepage.as_deref(),
                exe_name: &self.exe_name,
                out_file: self.expected_artifact.as_str(),
                files: &files,
            },
        )?;
        LocalAsset::create_dir_all(&self.work_dir)?;
        super::write_rendered(&script, &self.script_path)?;

        let mut cmd = tool.cmd("compile the windows installer");
        cmd.arg(&self.script_path);
        cmd.stdout_to_stderr().run()?;

        if !self.expected_artifact.is_file() {
            return Err(DistError::PackageMissing {
                tool: "makensis".to_owned(),
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
    fn script_covers_install_and_uninstall() {
        let templates = Templates::new().unwrap();
        let files = vec![
            FileEntry {
                src: "/scratch/stage/ecli.exe".to_owned(),
                name: "ecli.exe".to_owned(),
            },
            FileEntry {
                src: "/scratch/stage/LICENSE".to_owned(),
                name: "LICENSE".to_owned(),
            },
        ];
        let rendered = templates
            .render_file_to_clean_string(
                TEMPLATE_NSIS_INSTALLER,
                &InstallerContext {
                    name: "ecli",
                    display_name: "ecli",
                    version: "0.1.0",
                    publisher: "ecli maintainers <dev@ecli.dev>",
                    homepage: Some("https://ecli.dev"),
                    exe_name: "ecli.exe",
                    out_file: "/scratch/pkg/nsis/ecli-setup-0.1.0.exe",
                    files: &files,
                },
            )
            .unwrap();
        assert!(
            rendered.contains(r#"OutFile "/scratch/pkg/nsis/ecli-setup-0.1.0.exe""#),
            "{rendered}"
        );
        assert!(rendered.contains(r#"File "/scratch/stage/ecli.exe""#), "{rendered}");
        assert!(rendered.contains(r#"File "/scratch/stage/LICENSE""#), "{rendered}");
        assert!(rendered.contains(r#"Delete "$INSTDIR\LICENSE""#), "{rendered}");
        assert!(rendered.contains("WriteUninstaller"), "{rendered}");
        assert!(
            rendered.contains(r#"CreateShortcut "$SMPROGRAMS\${APP_NAME}.lnk" "$INSTDIR\ecli.exe""#),
            "{rendered}"
        );
        // machine PATH handling, both directions, with the settings broadcast
        assert!(
            rendered.contains("SYSTEM\\CurrentControlSet\\Control\\Session Manager\\Environment"),
            "{rendered}"
        );
        assert!(rendered.contains("WM_WININICHANGE"), "{rendered}");
        // PATH edits go through WordAdd so entries match whole, not by
        // substring, and removal works when the dir is the first or only entry
        assert!(
            rendered.contains(r#"${WordAdd} "$0" ";" "+$INSTDIR" $1"#),
            "{rendered}"
        );
        assert!(
            rendered.contains(r#"${un.WordAdd} "$0" ";" "-$INSTDIR" $1"#),
            "{rendered}"
        );
        assert!(!rendered.contains("$0;$INSTDIR"), "{rendered}");
    }

    #[test]
    fn homepage_is_optional_in_the_registry_block() {
        let templates = Templates::new().unwrap();
        let rendered = templates
            .render_file_to_clean_string(
                TEMPLATE_NSIS_INSTALLER,
                &InstallerContext {
                    name: "ecli",
                    display_name: "ecli",
                    version: "0.1.0",
                    publisher: "ecli maintainers <dev@ecli.dev>",
                    homepage: None,
                    exe_name: "ecli.exe",
                    out_file: "out.exe",
                    files: &[],
                },
            )
            .unwrap();
        assert!(!rendered.contains("URLInfoAbout"), "{rendered}");
    }
}
