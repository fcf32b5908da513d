//! Canonical paths in a target directory and `organizer init`.

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};

use crate::core::eligibility::Exclusions;
use crate::io::config::{CONFIG_FILE_NAME, OrganizerConfig, write_config};
use crate::io::transcript::STATE_DIR;

/// All paths the organizer reads or writes for a target directory.
#[derive(Debug, Clone)]
pub struct OrganizerPaths {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub failure_log_path: PathBuf,
    pub quarantine_dir: PathBuf,
    pub state_dir: PathBuf,
}

impl OrganizerPaths {
    pub fn new(root: impl Into<PathBuf>, config_path: Option<&Path>, cfg: &OrganizerConfig) -> Self {
        let root = root.into();
        let config_path = match config_path {
            Some(path) if path.is_absolute() => path.to_path_buf(),
            Some(path) => root.join(path),
            None => root.join(CONFIG_FILE_NAME),
        };
        Self {
            config_path,
            failure_log_path: root.join(&cfg.failure_log),
            quarantine_dir: root.join(&cfg.quarantine_dir),
            state_dir: root.join(STATE_DIR),
            root,
        }
    }

    /// Names in the root that the work queue must never contain.
    pub fn exclusions(&self, cfg: &OrganizerConfig) -> Exclusions {
        let own_binary = std::env::current_exe().ok().and_then(|exe| {
            let in_root = exe.parent().zip(self.root.canonicalize().ok());
            match in_root {
                Some((parent, root)) if parent == root => exe
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned()),
                _ => None,
            }
        });
        let config_file = match self.config_path.parent() {
            Some(parent) if parent == self.root => self
                .config_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            _ => None,
        };
        Exclusions {
            own_binary,
            failure_log: cfg.failure_log.clone(),
            config_file,
            ignore: cfg.scan.ignore.clone(),
        }
    }
}

/// Options for `init_config`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite an existing config file.
    pub force: bool,
}

/// Write a default `organizer.toml` to `config_path`.
///
/// Fails if the file already exists unless `options.force` is set.
pub fn init_config(config_path: &Path, options: &InitOptions) -> Result<OrganizerConfig> {
    if config_path.exists() && !options.force {
        return Err(anyhow!(
            "organizer init: {} already exists (use --force to overwrite)",
            config_path.display()
        ));
    }
    let cfg = OrganizerConfig::default();
    write_config(config_path, &cfg)?;
    Ok(cfg)
}
