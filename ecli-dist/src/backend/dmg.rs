//! Building macOS disk images with hdiutil
//!
//! The Stager already assembled `{DisplayName}.app` in the stage dir; here we
//! add the conventional /Applications symlink next to it and press the whole
//! dir into a compressed image. hdiutil can't write UDZO directly from a
//! folder with our settings, so this goes read-write image first, then a
//! convert pass.

use axoasset::LocalAsset;
use camino::Utf8PathBuf;

use crate::errors::{DistError, DistResult};
use crate::project::PythonApp;
use crate::tasks::{ReleaseGraph, WorkDirs};

/// Everything needed to run hdiutil over the staged bundle
#[derive(Debug, Clone)]
pub struct DmgInfo {
    /// App name ("ecli")
    pub name: String,
    /// App version ("0.1.0")
    pub version: String,
    /// The volume name the mounted image shows
    pub volume_name: String,
    /// The staged dir holding the .app bundle
    pub stage_dir: Utf8PathBuf,
    /// Scratch dir holding the intermediate and final images
    pub work_dir: Utf8PathBuf,
    /// The intermediate read-write image
    pub rw_image: Utf8PathBuf,
    /// Where the convert pass leaves the compressed image
    pub expected_artifact: Utf8PathBuf,
}

impl DmgInfo {
    /// Compute all the dmg info
    pub fn new(app: &PythonApp, dirs: &WorkDirs) -> Self {
        let work_dir = dirs.package_dir.join("dmg");
        let rw_image = work_dir.join(format!("{}-{}-rw.dmg", app.name, app.version));
        let expected_artifact = work_dir.join(format!("{}-{}.dmg", app.name, app.version));
        Self {
            name: app.name.clone(),
            version: app.version.to_string(),
            volume_name: format!("{} {}", app.display_name(), app.version),
            stage_dir: dirs.stage_dir.clone(),
            work_dir,
            rw_image,
            expected_artifact,
        }
    }

    /// Run the create + convert passes
    pub fn build(&self, graph: &ReleaseGraph) -> DistResult<Utf8PathBuf> {
        let tool = graph.tools.hdiutil()?;

        self.add_applications_symlink()?;
        LocalAsset::create_dir_all(&self.work_dir)?;

        let mut create = tool.cmd("create the read-write image");
        create
            .arg("create")
            .arg("-volname")
            .arg(&self.volume_name)
            .arg("-srcfolder")
            .arg(&self.stage_dir)
            .arg("-ov")
            .arg("-format")
            .arg("UDRW")
            .arg(&self.rw_image);
        create.stdout_to_stderr().run()?;

        let mut convert = tool.cmd("compress the image");
        convert
            .arg("convert")
            .arg(&self.rw_image)
            .arg("-format")
            .arg("UDZO")
            .arg("-imagekey")
            .arg("zlib-level=9")
            .arg("-ov")
            .arg("-o")
            .arg(&self.expected_artifact);
        convert.stdout_to_stderr().run()?;

        LocalAsset::remove_file(&self.rw_image)?;

        if !self.expected_artifact.is_file() {
            return Err(DistError::PackageMissing {
                tool: "hdiutil".to_owned(),
                expected: self.expected_artifact.clone(),
            });
        }
        Ok(self.expected_artifact.clone())
    }

    /// Drop the drag-to-install /Applications symlink next to the bundle
    #[cfg(unix)]
    fn add_applications_symlink(&self) -> DistResult<()> {
        let link = self.stage_dir.join("Applications");
        if !link.exists() {
            std::os::unix::fs::symlink("/Applications", &link).map_err(|details| {
                DistError::Io {
                    path: link.clone(),
                    details,
                }
            })?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn add_applications_symlink(&self) -> DistResult<()> {
        Ok(())
    }
}
