//! Driving PyInstaller

use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;
use tracing::info;

use crate::errors::DistResult;
use crate::project::PythonApp;
use crate::tasks::ReleaseGraph;

/// Modules the bundler can't see because the editor loads them dynamically
///
/// A build that misses one of these produces an executable that dies on
/// launch, so they are always enumerated.
pub const DEFAULT_HIDDEN_IMPORTS: &[&str] = &[
    "dotenv",
    "toml",
    "aiohttp",
    "aiosignal",
    "yarl",
    "multidict",
    "frozenlist",
    "chardet",
];

/// Best-effort extras; the bundler warns rather than fails when one is absent
/// from the build environment
pub const DEFAULT_OPTIONAL_IMPORTS: &[&str] = &[
    "aiohappyeyeballs",
    "attrs",
    "idna",
    "charset_normalizer",
];

/// How we're going to drive the bundler, resolved once during planning
#[derive(Debug, Clone)]
pub enum BuildStrategy {
    /// A .spec file checked into the project centralizes the bundling rules;
    /// always preferred when one exists
    SpecDriven {
        /// The .spec file, absolute
        spec_path: Utf8PathBuf,
    },
    /// No .spec file: pass the entry point plus every hidden import on the
    /// command line
    Enumerated {
        /// The app's entry-point module, absolute
        entry_point: Utf8PathBuf,
        /// Every --hidden-import we pass, deduplicated, defaults first
        hidden_imports: Vec<String>,
    },
}

/// Decide how to drive the bundler for this project
pub fn resolve_strategy(app: &PythonApp, project_dir: &Utf8Path) -> BuildStrategy {
    let spec_path = app
        .metadata
        .pyinstaller_spec
        .clone()
        .unwrap_or_else(|| format!("packaging/pyinstaller/{}.spec", app.name).into());
    let spec_path = project_dir.join(spec_path);
    if spec_path.is_file() {
        info!("bundling with the checked-in spec at {spec_path}");
        return BuildStrategy::SpecDriven { spec_path };
    }

    let entry_point = app
        .metadata
        .entry_point
        .clone()
        .unwrap_or_else(|| "main.py".into());
    let entry_point = project_dir.join(entry_point);
    let hidden_imports = DEFAULT_HIDDEN_IMPORTS
        .iter()
        .map(|s| s.to_string())
        .chain(app.metadata.hidden_imports.clone().unwrap_or_default())
        .chain(DEFAULT_OPTIONAL_IMPORTS.iter().map(|s| s.to_string()))
        .unique()
        .collect();
    info!("no bundler spec found, enumerating hidden imports");
    BuildStrategy::Enumerated {
        entry_point,
        hidden_imports,
    }
}

/// Run PyInstaller per the resolved strategy
pub fn bundle(graph: &ReleaseGraph, strategy: &BuildStrategy) -> DistResult<()> {
    let tool = graph.tools.pyinstaller()?;
    let dirs = &graph.dirs;

    let mut cmd = tool.cmd("bundle the app with PyInstaller");
    cmd.arg("--noconfirm")
        .arg("--clean")
        .arg("--distpath")
        .arg(&dirs.bundle_dir)
        .arg("--workpath")
        .arg(&dirs.bundle_work_dir);
    match strategy {
        BuildStrategy::SpecDriven { spec_path } => {
            // onefile/onedir and all hidden imports come from the spec itself
            cmd.arg(spec_path);
        }
        BuildStrategy::Enumerated {
            entry_point,
            hidden_imports,
        } => {
            cmd.arg("--onefile")
                .arg("--name")
                .arg(&graph.app.name)
                .arg("--specpath")
                .arg(&dirs.bundle_work_dir);
            for module in hidden_imports {
                cmd.arg("--hidden-import").arg(module);
            }
            cmd.arg(entry_point);
        }
    }
    cmd.current_dir(&dirs.project_dir);
    cmd.stdout_to_stderr().run()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use camino::Utf8PathBuf;

    fn fake_app() -> PythonApp {
        PythonApp {
            manifest_path: "pyproject.toml".into(),
            name: "ecli".to_owned(),
            version: "0.1.0".parse().unwrap(),
            description: None,
            metadata: Default::default(),
        }
    }

    fn temp_project() -> (temp_dir::TempDir, Utf8PathBuf) {
        let tmp = temp_dir::TempDir::new().unwrap();
        let dir = Utf8PathBuf::from_path_buf(tmp.path().to_owned()).unwrap();
        (tmp, dir)
    }

    #[test]
    fn no_spec_file_means_enumerated() {
        let (_tmp, dir) = temp_project();
        let strategy = resolve_strategy(&fake_app(), &dir);
        let BuildStrategy::Enumerated {
            entry_point,
            hidden_imports,
        } = strategy
        else {
            panic!("expected an enumerated build");
        };
        assert_eq!(entry_point, dir.join("main.py"));
        assert!(hidden_imports.contains(&"dotenv".to_owned()));
        assert!(hidden_imports.contains(&"charset_normalizer".to_owned()));
    }

    #[test]
    fn a_checked_in_spec_wins() {
        let (_tmp, dir) = temp_project();
        let spec = dir.join("packaging/pyinstaller/ecli.spec");
        std::fs::create_dir_all(spec.parent().unwrap()).unwrap();
        std::fs::write(&spec, "# pyinstaller spec").unwrap();

        let strategy = resolve_strategy(&fake_app(), &dir);
        let BuildStrategy::SpecDriven { spec_path } = strategy else {
            panic!("expected a spec-driven build");
        };
        assert_eq!(spec_path, spec);
    }

    #[test]
    fn extra_hidden_imports_extend_and_dedupe() {
        let (_tmp, dir) = temp_project();
        let mut app = fake_app();
        app.metadata.hidden_imports = Some(vec!["rich".to_owned(), "toml".to_owned()]);

        let BuildStrategy::Enumerated { hidden_imports, .. } = resolve_strategy(&app, &dir) else {
            panic!("expected an enumerated build");
        };
        assert!(hidden_imports.contains(&"rich".to_owned()));
        let tomls = hidden_imports.iter().filter(|m| *m == "toml").count();
        assert_eq!(tomls, 1);
    }
}
