//! Paths and scaffolding for the `.liftlog/` data directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::debug;

use super::config::{AppConfig, write_config};

/// All canonical paths within `.liftlog/` for a data root.
#[derive(Debug, Clone)]
pub struct LiftlogPaths {
    pub root: PathBuf,
    pub data_dir: PathBuf,
    pub state_dir: PathBuf,
    pub store_dir: PathBuf,
    pub gitignore_path: PathBuf,
    pub config_path: PathBuf,
    pub session_path: PathBuf,
}

impl LiftlogPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let data_dir = root.join(".liftlog");
        let state_dir = data_dir.join("state");
        Self {
            root: root.clone(),
            data_dir: data_dir.clone(),
            state_dir: state_dir.clone(),
            store_dir: data_dir.join("store"),
            gitignore_path: data_dir.join(".gitignore"),
            config_path: state_dir.join("config.toml"),
            session_path: state_dir.join("session.json"),
        }
    }
}

/// Options for `init_liftlog`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite an existing config.
    pub force: bool,
}

/// Create `.liftlog/` scaffolding in `root`.
///
/// Fails if `.liftlog/` already exists unless `options.force` is set. Stored
/// documents are never touched, even with `force`.
pub fn init_liftlog(root: &Path, options: &InitOptions) -> Result<LiftlogPaths> {
    let paths = LiftlogPaths::new(root);
    if paths.data_dir.exists() && !options.force {
        return Err(anyhow!(
            "liftlog init: .liftlog already exists (use --force to overwrite)"
        ));
    }
    if paths.data_dir.exists() && !paths.data_dir.is_dir() {
        return Err(anyhow!(
            "liftlog init: .liftlog exists but is not a directory"
        ));
    }

    create_dir(&paths.data_dir)?;
    create_dir(&paths.state_dir)?;
    create_dir(&paths.store_dir)?;

    fs::write(&paths.gitignore_path, LIFTLOG_GITIGNORE)
        .with_context(|| format!("write file {}", paths.gitignore_path.display()))?;
    write_config(&paths.config_path, &AppConfig::default())?;

    debug!(data_dir = %paths.data_dir.display(), "liftlog initialized");
    Ok(paths)
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("create directory {}", path.display()))
}

const LIFTLOG_GITIGNORE: &str = "state/session.json\n";
