//! The Stager: arranging the executable and assets into the tree the
//! packaging tool consumes
//!
//! Each backend gets the filesystem convention its tool expects: an FHS tree
//! rooted at usr/ for deb and rpm, usr/local/ for FreeBSD, a flat payload dir
//! for the windows installer, and a Name.app bundle for macOS. Executables are
//! staged 755 and data files 644. Missing optional assets (icon, man page,
//! desktop file) never fail the build: we synthesize a minimal man page and
//! desktop entry, and simply skip icons that aren't there. The staging dir is
//! wiped and rebuilt on every run, never reused.

use std::io::Write;

use axoasset::LocalAsset;
use camino::{Utf8Path, Utf8PathBuf};
use flate2::{Compression, GzBuilder};
use serde::Serialize;
use tracing::warn;

use crate::backend::templates::{
    TEMPLATE_LINUX_DESKTOP, TEMPLATE_MACOS_INFO_PLIST, TEMPLATE_MAN_PAGE,
};
use crate::backend::write_rendered;
use crate::config::Layout;
use crate::errors::{DistError, DistResult};
use crate::tasks::ReleaseGraph;

/// The precomputed staging step
#[derive(Debug, Clone)]
pub struct StageStep {
    /// Which filesystem convention to lay out
    pub layout: Layout,
    /// The bundled executable we're staging
    pub exe_source: Utf8PathBuf,
}

#[derive(Serialize)]
struct ManPageContext<'a> {
    name: &'a str,
    version: &'a str,
    summary: &'a str,
    homepage: Option<&'a str>,
}

#[derive(Serialize)]
struct DesktopContext<'a> {
    name: &'a str,
    display_name: &'a str,
    summary: &'a str,
    icon: Option<&'a str>,
}

#[derive(Serialize)]
struct PlistContext<'a> {
    exe_name: &'a str,
    identifier: &'a str,
    display_name: &'a str,
    version: &'a str,
    icon_file: Option<&'a str>,
}

/// Wipe and repopulate the staging tree for this backend's layout
pub fn run_stage(graph: &ReleaseGraph, step: &StageStep) -> DistResult<()> {
    let dirs = &graph.dirs;
    // staging and packaging scratch are never reused across builds
    LocalAsset::remove_dir_all(&dirs.stage_dir)?;
    LocalAsset::remove_dir_all(&dirs.package_dir)?;
    LocalAsset::create_dir_all(&dirs.stage_dir)?;
    LocalAsset::create_dir_all(&dirs.package_dir)?;

    match step.layout {
        Layout::FhsUsr => {
            stage_fhs_core(graph, step, "usr")?;
            stage_linux_extras(graph)?;
        }
        Layout::FhsUsrLocal => {
            stage_fhs_core(graph, step, "usr/local")?;
            stage_freebsd_license(graph)?;
        }
        Layout::Flat => stage_flat(graph, step)?,
        Layout::AppBundle => stage_app_bundle(graph, step)?,
    }
    Ok(())
}

/// The part every FHS layout shares: bin/ and the gzipped man page
fn stage_fhs_core(graph: &ReleaseGraph, step: &StageStep, prefix: &str) -> DistResult<()> {
    let app = &graph.app;
    let root = graph.dirs.stage_dir.join(prefix);

    let bin_dir = root.join("bin");
    LocalAsset::create_dir_all(&bin_dir)?;
    let exe_dest = bin_dir.join(app.exe_name());
    LocalAsset::copy_file_to_file(&step.exe_source, &exe_dest)?;
    set_unix_mode(&exe_dest, 0o755)?;

    let man_dir = root.join("share/man/man1");
    LocalAsset::create_dir_all(&man_dir)?;
    let man_dest = man_dir.join(format!("{}.1.gz", app.name));
    let roff = man_page_roff(graph)?;
    write_gzipped(&roff, &man_dest)?;
    set_unix_mode(&man_dest, 0o644)?;

    Ok(())
}

/// The man page source: the project's own roff if it has one, else synthesized
fn man_page_roff(graph: &ReleaseGraph) -> DistResult<String> {
    let app = &graph.app;
    if let Some(src) = configured_asset(&graph.dirs.project_dir, app.metadata.man_page.as_ref()) {
        return Ok(LocalAsset::load_string(src)?);
    }
    let version = app.version.to_string();
    let summary = app.summary();
    graph.templates.render_file_to_clean_string(
        TEMPLATE_MAN_PAGE,
        &ManPageContext {
            name: &app.name,
            version: &version,
            summary: &summary,
            homepage: app.metadata.homepage.as_deref(),
        },
    )
}

/// Desktop entry, hicolor icon, and doc/copyright under usr/share (deb, rpm)
fn stage_linux_extras(graph: &ReleaseGraph) -> DistResult<()> {
    let app = &graph.app;
    let dirs = &graph.dirs;
    let share = dirs.stage_dir.join("usr/share");

    let icon = configured_asset(&dirs.project_dir, app.metadata.icon.as_ref());

    let desktop = if let Some(src) =
        configured_asset(&dirs.project_dir, app.metadata.desktop_file.as_ref())
    {
        LocalAsset::load_string(src)?
    } else {
        let display_name = app.display_name();
        let summary = app.summary();
        graph.templates.render_file_to_clean_string(
            TEMPLATE_LINUX_DESKTOP,
            &DesktopContext {
                name: &app.name,
                display_name: &display_name,
                summary: &summary,
                icon: icon.is_some().then_some(app.name.as_str()),
            },
        )?
    };
    let desktop_dest = share
        .join("applications")
        .join(format!("{}.desktop", app.name));
    write_rendered(&desktop, &desktop_dest)?;
    set_unix_mode(&desktop_dest, 0o644)?;

    if let Some(icon_src) = icon {
        let icon_dir = share.join("icons/hicolor/256x256/apps");
        LocalAsset::create_dir_all(&icon_dir)?;
        let icon_dest = icon_dir.join(format!("{}.png", app.name));
        LocalAsset::copy_file_to_file(&icon_src, &icon_dest)?;
        set_unix_mode(&icon_dest, 0o644)?;
    }

    if let Some(license_src) =
        default_asset(&dirs.project_dir, app.metadata.license_file.as_ref(), "LICENSE")
    {
        let doc_dir = share.join("doc").join(&app.name);
        LocalAsset::create_dir_all(&doc_dir)?;
        let doc_dest = doc_dir.join("copyright");
        LocalAsset::copy_file_to_file(&license_src, &doc_dest)?;
        set_unix_mode(&doc_dest, 0o644)?;
    }

    Ok(())
}

/// FreeBSD keeps licenses under share/licenses/{name}/
fn stage_freebsd_license(graph: &ReleaseGraph) -> DistResult<()> {
    let app = &graph.app;
    let dirs = &graph.dirs;
    if let Some(license_src) =
        default_asset(&dirs.project_dir, app.metadata.license_file.as_ref(), "LICENSE")
    {
        let license_dir = dirs
            .stage_dir
            .join("usr/local/share/licenses")
            .join(&app.name);
        LocalAsset::create_dir_all(&license_dir)?;
        let dest = license_dir.join("LICENSE");
        LocalAsset::copy_file_to_file(&license_src, &dest)?;
        set_unix_mode(&dest, 0o644)?;
    }
    Ok(())
}

/// Everything in one dir: the payload the windows installer embeds
fn stage_flat(graph: &ReleaseGraph, step: &StageStep) -> DistResult<()> {
    let app = &graph.app;
    let dirs = &graph.dirs;

    let exe_dest = dirs.stage_dir.join(app.exe_name());
    LocalAsset::copy_file_to_file(&step.exe_source, &exe_dest)?;
    set_unix_mode(&exe_dest, 0o755)?;

    if let Some(license_src) =
        default_asset(&dirs.project_dir, app.metadata.license_file.as_ref(), "LICENSE")
    {
        copy_data_file(&license_src, &dirs.stage_dir)?;
    }
    if let Some(readme_src) =
        default_asset(&dirs.project_dir, app.metadata.readme.as_ref(), "README.md")
    {
        copy_data_file(&readme_src, &dirs.stage_dir)?;
    }
    if let Some(ico_src) = configured_asset(&dirs.project_dir, app.metadata.ico.as_ref()) {
        let dest = dirs.stage_dir.join(format!("{}.ico", app.name));
        LocalAsset::copy_file_to_file(&ico_src, &dest)?;
        set_unix_mode(&dest, 0o644)?;
    }

    Ok(())
}

/// A minimal {DisplayName}.app bundle for the disk image
fn stage_app_bundle(graph: &ReleaseGraph, step: &StageStep) -> DistResult<()> {
    let app = &graph.app;
    let dirs = &graph.dirs;
    let exe_name = app.exe_name();
    let display_name = app.display_name();

    let contents = dirs
        .stage_dir
        .join(format!("{display_name}.app"))
        .join("Contents");
    let macos_dir = contents.join("MacOS");
    LocalAsset::create_dir_all(&macos_dir)?;
    let exe_dest = macos_dir.join(&exe_name);
    LocalAsset::copy_file_to_file(&step.exe_source, &exe_dest)?;
    set_unix_mode(&exe_dest, 0o755)?;

    let icns = configured_asset(&dirs.project_dir, app.metadata.icns.as_ref());
    let icon_file = icns.is_some().then(|| format!("{}.icns", app.name));
    if let Some(icns_src) = &icns {
        let resources = contents.join("Resources");
        LocalAsset::create_dir_all(&resources)?;
        let dest = resources.join(format!("{}.icns", app.name));
        LocalAsset::copy_file_to_file(icns_src, &dest)?;
        set_unix_mode(&dest, 0o644)?;
    }

    let version = app.version.to_string();
    let identifier = app.identifier();
    let plist = graph.templates.render_file_to_clean_string(
        TEMPLATE_MACOS_INFO_PLIST,
        &PlistContext {
            exe_name: &exe_name,
            identifier: &identifier,
            display_name: &display_name,
            version: &version,
            icon_file: icon_file.as_deref(),
        },
    )?;
    let plist_dest = contents.join("Info.plist");
    write_rendered(&plist, &plist_dest)?;
    set_unix_mode(&plist_dest, 0o644)?;

    Ok(())
}

/// Copy a data file into a dir, keeping its name, 644
fn copy_data_file(src: &Utf8Path, dest_dir: &Utf8Path) -> DistResult<()> {
    let name = src.file_name().unwrap_or("asset");
    let dest = dest_dir.join(name);
    LocalAsset::copy_file_to_file(src, &dest)?;
    set_unix_mode(&dest, 0o644)?;
    Ok(())
}

/// An asset the project explicitly configured; None (with a warning) if the
/// configured path doesn't exist
fn configured_asset(
    project_dir: &Utf8Path,
    configured: Option<&Utf8PathBuf>,
) -> Option<Utf8PathBuf> {
    let rel = configured?;
    let path = project_dir.join(rel);
    if path.is_file() {
        Some(path)
    } else {
        warn!("configured asset {path} doesn't exist, skipping");
        None
    }
}

/// An asset with a conventional default name ("LICENSE", "README.md")
fn default_asset(
    project_dir: &Utf8Path,
    configured: Option<&Utf8PathBuf>,
    default_name: &str,
) -> Option<Utf8PathBuf> {
    if configured.is_some() {
        return configured_asset(project_dir, configured);
    }
    let path = project_dir.join(default_name);
    path.is_file().then_some(path)
}

/// Gzip a text file to its destination (the man page convention)
fn write_gzipped(contents: &str, dest: &Utf8Path) -> DistResult<()> {
    let io_err = |details: std::io::Error| DistError::Io {
        path: dest.to_owned(),
        details,
    };
    let file = std::fs::File::create(dest).map_err(io_err)?;
    let mut encoder = GzBuilder::new().write(file, Compression::default());
    encoder.write_all(contents.as_bytes()).map_err(io_err)?;
    encoder.finish().map_err(io_err)?;
    Ok(())
}

/// Set the mode bits on a staged path (no-op off unix)
#[cfg(unix)]
pub fn set_unix_mode(path: &Utf8Path, mode: u32) -> DistResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).map_err(|details| {
        DistError::Io {
            path: path.to_owned(),
            details,
        }
    })?;
    Ok(())
}

/// Set the mode bits on a staged path (no-op off unix)
#[cfg(not(unix))]
pub fn set_unix_mode(_path: &Utf8Path, _mode: u32) -> DistResult<()> {
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::backend::templates::Templates;

    #[test]
    fn synthesized_man_page_renders() {
        let templates = Templates::new().unwrap();
        let rendered = templates
            .render_file_to_clean_string(
                TEMPLATE_MAN_PAGE,
                &ManPageContext {
                    name: "ecli",
                    version: "0.1.0",
                    summary: "Terminal-based code editor",
                    homepage: Some("https://ecli.dev"),
                },
            )
            .unwrap();
        insta::assert_snapshot!(rendered, @r###"
        .TH ECLI 1 "" "ecli 0.1.0" "User Commands"
        .SH NAME
        ecli \- Terminal-based code editor
        .SH SYNOPSIS
        .B ecli
        [\fIFILE\fR...]
        .SH DESCRIPTION
        .B ecli
        is a terminal-based code editor. Open it with no arguments to start on an
        empty buffer, or pass one or more files to edit them.
        .SH FILES
        .TP
        .I ~/.config/ecli/
        Per-user configuration, created by the editor on first run.
        .SH SEE ALSO
        Full documentation at https://ecli.dev
        "###);
    }

    #[test]
    fn synthesized_desktop_entry_renders() {
        let templates = Templates::new().unwrap();
        let rendered = templates
            .render_file_to_clean_string(
                TEMPLATE_LINUX_DESKTOP,
                &DesktopContext {
                    name: "ecli",
                    display_name: "ecli",
                    summary: "Terminal-based code editor",
                    icon: Some("ecli"),
                },
            )
            .unwrap();
        insta::assert_snapshot!(rendered, @r###"
        [Desktop Entry]
        Type=Application
        Name=ecli
        Comment=Terminal-based code editor
        Exec=ecli %F
        Icon=ecli
        Terminal=true
        Categories=Development;TextEditor;
        StartupNotify=false
        "###);
    }

    #[test]
    fn desktop_icon_line_is_optional() {
        let templates = Templates::new().unwrap();
        let rendered = templates
            .render_file_to_clean_string(
                TEMPLATE_LINUX_DESKTOP,
                &DesktopContext {
                    name: "ecli",
                    display_name: "ecli",
                    summary: "Terminal-based code editor",
                    icon: None,
                },
            )
            .unwrap();
        assert!(!rendered.contains("Icon="), "{rendered}");
    }

    #[test]
    fn info_plist_names_the_bundle() {
        let templates = Templates::new().unwrap();
        let rendered = templates
            .render_file_to_clean_string(
                TEMPLATE_MACOS_INFO_PLIST,
                &PlistContext {
                    exe_name: "ecli",
                    identifier: "dev.ecli.ecli",
                    display_name: "ecli",
                    version: "0.1.0",
                    icon_file: None,
                },
            )
            .unwrap();
        assert!(rendered.contains("<string>dev.ecli.ecli</string>"), "{rendered}");
        assert!(rendered.contains("<string>0.1.0</string>"), "{rendered}");
        assert!(!rendered.contains("CFBundleIconFile"), "{rendered}");
    }

    #[test]
    fn gzipped_output_roundtrips() {
        use std::io::Read;

        let tmp = temp_dir::TempDir::new().unwrap();
        let dest = Utf8PathBuf::from_path_buf(tmp.path().join("ecli.1.gz")).unwrap();
        write_gzipped(".TH ECLI 1\n", &dest).unwrap();

        let file = std::fs::File::open(&dest).unwrap();
        let mut decoder = flate2::read::GzDecoder::new(file);
        let mut contents = String::new();
        decoder.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, ".TH ECLI 1\n");
    }
}
