//! Project paths and `.engineer/` scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use crate::core::store::RootStore;
use crate::core::stores::{Layout, ProjectStores};
use crate::io::config::{EngineConfig, write_config};
use crate::io::prompt::seed_preprompts;
use crate::io::store_file::write_root;

/// Canonical locations for one project.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub state_dir: PathBuf,
    pub config_path: PathBuf,
    pub store_path: PathBuf,
    /// Where the `workspace` namespace is materialized for execution.
    pub workspace_dir: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let state_dir = root.join(".engineer");
        Self {
            config_path: state_dir.join("config.toml"),
            store_path: state_dir.join("store.json"),
            workspace_dir: root.join("workspace"),
            state_dir,
            root,
        }
    }
}

/// Options for [`init_project`].
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Overwrite an existing config and store.
    pub force: bool,
}

/// Create `.engineer/` with a default config and a store holding the
/// built-in preprompts, so they can be edited per project.
///
/// Fails if `.engineer/` already exists unless `options.force` is set.
pub fn init_project(root: &Path, options: &InitOptions) -> Result<ProjectPaths> {
    let paths = ProjectPaths::new(root);
    if paths.state_dir.exists() && !options.force {
        return Err(anyhow!(
            "engineer init: .engineer already exists (use --force to overwrite)"
        ));
    }
    if paths.state_dir.exists() && !paths.state_dir.is_dir() {
        return Err(anyhow!(
            "engineer init: .engineer exists but is not a directory"
        ));
    }
    fs::create_dir_all(&paths.state_dir)
        .with_context(|| format!("create directory {}", paths.state_dir.display()))?;

    write_config(&paths.config_path, &EngineConfig::default())?;

    let root_store = RootStore::new();
    let stores = ProjectStores::open(&root_store, Layout::Standard);
    seed_preprompts(&stores.preprompts);
    write_root(&paths.store_path, &root_store)?;

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::load_config;
    use crate::io::prompt::GENERATE;
    use crate::io::store_file::load_root;

    #[test]
    fn init_creates_config_and_seeded_store() {
        let temp = tempfile::tempdir().expect("tempdir");

        let paths = init_project(temp.path(), &InitOptions { force: false }).expect("init");

        assert!(paths.state_dir.is_dir());
        assert_eq!(load_config(&paths.config_path).expect("config"), EngineConfig::default());
        let root = load_root(&paths.store_path).expect("store");
        assert!(root.namespace("preprompts").contains(GENERATE));
        assert!(!paths.workspace_dir.exists());
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let temp = tempfile::tempdir().expect("tempdir");
        init_project(temp.path(), &InitOptions { force: false }).expect("init");

        let err = init_project(temp.path(), &InitOptions { force: false }).unwrap_err();
        assert!(err.to_string().contains("--force"));

        init_project(temp.path(), &InitOptions { force: true }).expect("forced init");
    }
}
