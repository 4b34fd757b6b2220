//! Logic for resolving/rendering the embedded packaging templates

use camino::{Utf8Path, Utf8PathBuf};
use include_dir::{include_dir, Dir};
use minijinja::Environment;
use newline_converter::dos2unix;
use serde::Serialize;

use crate::errors::{DistError, DistResult};
use crate::SortedMap;

const TEMPLATE_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/templates");

/// Key used for looking up templates (relative path from the templates dir)
pub type TemplateId = &'static str;
/// Template key for the debian control file
pub const TEMPLATE_DEB_CONTROL: TemplateId = "deb/control";
/// Template key for the debian post-install script
pub const TEMPLATE_DEB_POSTINST: TemplateId = "deb/postinst";
/// Template key for the debian pre-removal script
pub const TEMPLATE_DEB_PRERM: TemplateId = "deb/prerm";
/// Template key for the debian post-removal script
pub const TEMPLATE_DEB_POSTRM: TemplateId = "deb/postrm";
/// Template key for the rpm spec
pub const TEMPLATE_RPM_SPEC: TemplateId = "rpm/package.spec";
/// Template key for the FreeBSD pkg +MANIFEST (UCL dialect)
pub const TEMPLATE_FREEBSD_MANIFEST: TemplateId = "freebsd/manifest.ucl";
/// Template key for the NSIS installer script
pub const TEMPLATE_NSIS_INSTALLER: TemplateId = "nsis/installer.nsi";
/// Template key for the macOS bundle Info.plist
pub const TEMPLATE_MACOS_INFO_PLIST: TemplateId = "macos/Info.plist";
/// Template key for the linux .desktop entry
pub const TEMPLATE_LINUX_DESKTOP: TemplateId = "linux/app.desktop";
/// Template key for the synthesized man page
pub const TEMPLATE_MAN_PAGE: TemplateId = "man/manpage.1";

/// Main templates struct that gets carried around in the release graph
#[derive(Debug)]
pub struct Templates {
    /// Minijinja environment that contains all loaded templates
    env: Environment<'static>,
    /// Traversable/searchable structure of the templates dir
    entries: TemplateDir,
}

/// An entry in the template dir
#[derive(Debug)]
pub enum TemplateEntry {
    /// A directory
    Dir(TemplateDir),
    /// A file
    File(TemplateFile),
}

/// A directory in the template dir
#[derive(Debug)]
pub struct TemplateDir {
    /// relative path of the dir from `TEMPLATE_DIR`
    pub path: Utf8PathBuf,
    /// children
    pub entries: SortedMap<String, TemplateEntry>,
}

/// A file in the template dir
#[derive(Debug)]
pub struct TemplateFile {
    /// name of the file
    pub name: String,
    /// relative path of the file from `TEMPLATE_DIR`
    ///
    /// (This is also the [`TemplateId`][] for this file)
    pub path: Utf8PathBuf,
}

impl Templates {
    /// Load + Parse templates from the binary
    pub fn new() -> DistResult<Self> {
        let mut env = Environment::new();
        env.set_debug(true);

        let mut entries = TemplateDir {
            path: Utf8PathBuf::new(),
            entries: SortedMap::new(),
        };
        // These `expects` should never happen in production, because all of these
        // things are baked into the binary. If this fails at all it should
        // presumably *always* fail, and so they will only show up when someone's
        // editing the templates locally and wrote some malformed jinja2 markup.
        Self::load_files(&mut env, &TEMPLATE_DIR, &mut entries)
            .expect("failed to load jinja2 templates from binary");

        Ok(Self { env, entries })
    }

    /// Get the entry for a template by key (the TEMPLATE_* consts)
    fn get_template_entry(&self, key: TemplateId) -> &TemplateEntry {
        let mut parent = &self.entries;
        let mut result: Option<&TemplateEntry> = None;
        for part in key.split('/') {
            result = parent.entries.get(part);
            if let Some(entry) = result {
                if let TemplateEntry::Dir(dir) = entry {
                    parent = dir;
                }
            } else {
                panic!("invalid jinja2 template key: {key}")
            }
        }

        if let Some(entry) = result {
            entry
        } else {
            panic!("invalid jinja2 template key: {key}");
        }
    }

    /// Get the entry for a template by key (the TEMPLATE_* consts), and require it to be a file
    pub fn get_template_file(&self, key: TemplateId) -> &TemplateFile {
        if let TemplateEntry::File(file) = self.get_template_entry(key) {
            file
        } else {
            panic!("jinja2 template key was not a file: {key}");
        }
    }

    /// Render a template file to a string, cleaning all newlines to be unix-y
    pub fn render_file_to_clean_string(
        &self,
        key: TemplateId,
        val: &impl Serialize,
    ) -> DistResult<String> {
        let file = self.get_template_file(key);
        let jinja_err = |details: minijinja::Error| DistError::Jinja {
            template: file.path.to_string(),
            details,
        };
        let template = self.env.get_template(file.path.as_str()).map_err(jinja_err)?;
        let rendered = template.render(val).map_err(jinja_err)?;
        let cleaned = dos2unix(&rendered).into_owned();
        Ok(cleaned)
    }

    /// load + parse templates from the binary (recursive)
    fn load_files(
        env: &mut Environment<'static>,
        dir: &'static Dir,
        parent: &mut TemplateDir,
    ) -> DistResult<()> {
        for entry in dir.entries() {
            let path = Utf8Path::from_path(entry.path()).expect("non-utf8 jinja2 template path");
            if let Some(file) = entry.as_file() {
                if path.extension().unwrap_or_default() != "j2" {
                    // Skip non-jinja-templates (useful for prototyping)
                    continue;
                }
                // Remove the .j2 extension
                let path = path.with_extension("");
                let name = path
                    .file_name()
                    .expect("jinja2 template didn't have a name!?")
                    .to_owned();
                let contents = file
                    .contents_utf8()
                    .expect("non-utf8 jinja2 template")
                    .to_string();
                env.add_template_owned(path.to_string(), contents)
                    .expect("failed to add jinja2 template");
                parent
                    .entries
                    .insert(name.clone(), TemplateEntry::File(TemplateFile { name, path }));
            }
            if let Some(dir) = entry.as_dir() {
                let name = path
                    .file_name()
                    .expect("jinja2 template didn't have a name!?")
                    .to_owned();
                let mut new_dir = TemplateDir {
                    path: path.to_owned(),
                    entries: SortedMap::new(),
                };
                Self::load_files(env, dir, &mut new_dir)
                    .expect("failed to load jinja2 templates from binary");
                parent.entries.insert(name, TemplateEntry::Dir(new_dir));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ensure_known_templates() {
        let templates = Templates::new().unwrap();

        templates.get_template_file(TEMPLATE_DEB_CONTROL);
        templates.get_template_file(TEMPLATE_DEB_POSTINST);
        templates.get_template_file(TEMPLATE_DEB_PRERM);
        templates.get_template_file(TEMPLATE_DEB_POSTRM);
        templates.get_template_file(TEMPLATE_RPM_SPEC);
        templates.get_template_file(TEMPLATE_FREEBSD_MANIFEST);
        templates.get_template_file(TEMPLATE_NSIS_INSTALLER);
        templates.get_template_file(TEMPLATE_MACOS_INFO_PLIST);
        templates.get_template_file(TEMPLATE_LINUX_DESKTOP);
        templates.get_template_file(TEMPLATE_MAN_PAGE);
    }
}
