//! The packaging backends
//!
//! One module per target format, each exposing an info struct that precomputes
//! everything the build needs (paths, rendered-template inputs, the tool-native
//! output location). [`BackendImpl`][] is the dispatch point: every variant's
//! `build` takes the staged tree the Stager left behind and returns the path of
//! the artifact its packaging tool produced, which the step runner then moves to
//! the strict release path.

pub mod deb;
pub mod dmg;
pub mod freebsd;
pub mod nsis;
pub mod rpm;
pub mod templates;

use axoasset::LocalAsset;
use camino::{Utf8Path, Utf8PathBuf};

use crate::config::BackendKind;
use crate::errors::{DistError, DistResult};
use crate::platform::Arch;
use crate::project::PythonApp;
use crate::tasks::{ReleaseGraph, WorkDirs};

/// A planned packager backend, ready to run
#[derive(Debug, Clone)]
pub enum BackendImpl {
    /// dpkg-deb
    Deb(deb::DebPackageInfo),
    /// rpmbuild
    Rpm(rpm::RpmPackageInfo),
    /// FreeBSD pkg create
    FreebsdPkg(freebsd::FreebsdPackageInfo),
    /// makensis
    Nsis(nsis::NsisInstallerInfo),
    /// hdiutil
    Dmg(dmg::DmgInfo),
}

impl BackendImpl {
    /// Precompute the backend for this kind of package
    pub fn plan(kind: BackendKind, app: &PythonApp, dirs: &WorkDirs, arch: Arch) -> Self {
        match kind {
            BackendKind::Deb => BackendImpl::Deb(deb::DebPackageInfo::new(app, dirs, arch)),
            BackendKind::Rpm => BackendImpl::Rpm(rpm::RpmPackageInfo::new(app, dirs, arch)),
            BackendKind::FreebsdPkg => {
                BackendImpl::FreebsdPkg(freebsd::FreebsdPackageInfo::new(app, dirs, arch))
            }
            BackendKind::Nsis => BackendImpl::Nsis(nsis::NsisInstallerInfo::new(app, dirs)),
            BackendKind::Dmg => BackendImpl::Dmg(dmg::DmgInfo::new(app, dirs)),
        }
    }

    /// Run the packaging tool over the staged tree
    ///
    /// On success, returns the path of the artifact under the tool's own naming,
    /// somewhere in our scratch dir. Any tool failure aborts; there is never a
    /// fallback from one backend to another.
    pub fn build(&self, graph: &ReleaseGraph) -> DistResult<Utf8PathBuf> {
        match self {
            BackendImpl::Deb(info) => info.build(graph),
            BackendImpl::Rpm(info) => info.build(graph),
            BackendImpl::FreebsdPkg(info) => info.build(graph),
            BackendImpl::Nsis(info) => info.build(graph),
            BackendImpl::Dmg(info) => info.build(graph),
        }
    }
}

/// Write a rendered template where the packaging tool expects it
///
/// Guarantees a trailing newline; several of the consumers (dpkg, rpm) are
/// picky about files that end mid-line.
pub(crate) fn write_rendered(contents: &str, dest: &Utf8Path) -> DistResult<()> {
    if contents.ends_with('\n') {
        LocalAsset::write_new_all(contents, dest)?;
    } else {
        let mut contents = contents.to_owned();
        contents.push('\n');
        LocalAsset::write_new_all(&contents, dest)?;
    }
    Ok(())
}

/// All files under a dir, recursively, sorted for deterministic output
pub(crate) fn walk_files(root: &Utf8Path) -> DistResult<Vec<Utf8PathBuf>> {
    fn inner(dir: &Utf8Path, out: &mut Vec<Utf8PathBuf>) -> DistResult<()> {
        let entries = dir.read_dir_utf8().map_err(|details| DistError::Io {
            path: dir.to_owned(),
            details,
        })?;
        for entry in entries {
            let entry = entry.map_err(|details| DistError::Io {
                path: dir.to_owned(),
                details,
            })?;
            let file_type = entry.file_type().map_err(|details| DistError::Io {
                path: entry.path().to_owned(),
                details,
            })?;
            if file_type.is_dir() {
                inner(entry.path(), out)?;
            } else {
                out.push(entry.path().to_owned());
            }
        }
        Ok(())
    }
    let mut out = vec![];
    inner(root, &mut out)?;
    out.sort();
    Ok(out)
}

/// Total size of the files under a dir, in KiB (rounded up), for package metadata
pub(crate) fn dir_size_kib(root: &Utf8Path) -> DistResult<u64> {
    let mut total = 0u64;
    for file in walk_files(root)? {
        let meta = file.metadata().map_err(|details| DistError::Io {
            path: file.clone(),
            details,
        })?;
        total += meta.len();
    }
    Ok(total.div_ceil(1024))
}
