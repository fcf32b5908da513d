//! Organizer configuration stored in `organizer.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::naming::is_plain_file_name;
use crate::core::types::InterruptMode;

/// Default config file name inside the target directory.
pub const CONFIG_FILE_NAME: &str = "organizer.toml";

/// Organizer configuration (TOML).
///
/// Meant to be edited by hand. Missing fields take the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OrganizerConfig {
    /// Failure log file name in the target directory.
    pub failure_log: String,

    /// Subdirectory for files the agent cannot classify.
    pub quarantine_dir: String,

    /// Pause between files, in seconds.
    pub delay_secs: u64,

    pub interrupt: InterruptMode,

    /// Category directories offered to the agent.
    pub categories: Vec<String>,

    /// Naming pattern the agent is asked to follow for renamed files.
    pub naming_pattern: String,

    pub agent: AgentConfig,

    pub scan: ScanConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Program and leading arguments (e.g. `["claude", "--print"]`).
    pub command: Vec<String>,

    /// Model identifier passed after `model_flag`.
    pub model: String,

    pub model_flag: String,

    /// Wall-clock budget for a single agent invocation.
    pub timeout_secs: u64,

    /// Truncate transcript stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScanConfig {
    /// Extra root file names that are never handed to the agent.
    pub ignore: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "claude".to_string(),
                "--print".to_string(),
                "--dangerously-skip-permissions".to_string(),
            ],
            model: "sonnet".to_string(),
            model_flag: "--model".to_string(),
            timeout_secs: 15 * 60,
            output_limit_bytes: 100_000,
        }
    }
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            failure_log: "failed_files.log".to_string(),
            quarantine_dir: "_Quarantine".to_string(),
            delay_secs: 2,
            interrupt: InterruptMode::AfterCurrent,
            categories: [
                "Financial",
                "Medical",
                "Legal",
                "Insurance",
                "Taxes",
                "Work",
                "Education",
                "Travel",
                "Property",
                "Vehicles",
                "Personal",
                "Receipts",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            naming_pattern: "YYYY-MM-DD_Entity_Description".to_string(),
            agent: AgentConfig::default(),
            scan: ScanConfig::default(),
        }
    }
}

impl OrganizerConfig {
    pub fn validate(&self) -> Result<()> {
        if !is_plain_file_name(&self.failure_log) {
            return Err(anyhow!("failure_log must be a plain file name"));
        }
        if !is_plain_file_name(&self.quarantine_dir) || self.quarantine_dir.starts_with('.') {
            return Err(anyhow!(
                "quarantine_dir must be a plain, visible directory name"
            ));
        }
        if self.categories.is_empty() {
            return Err(anyhow!("categories must not be empty"));
        }
        if let Some(bad) = self
            .categories
            .iter()
            .find(|category| !is_plain_file_name(category))
        {
            return Err(anyhow!("category {bad:?} is not a plain directory name"));
        }
        if self.agent.command.is_empty() || self.agent.command[0].trim().is_empty() {
            return Err(anyhow!("agent.command must be a non-empty array"));
        }
        if self.agent.model.trim().is_empty() {
            return Err(anyhow!("agent.model must not be empty"));
        }
        if self.agent.timeout_secs == 0 {
            return Err(anyhow!("agent.timeout_secs must be > 0"));
        }
        if self.agent.output_limit_bytes == 0 {
            return Err(anyhow!("agent.output_limit_bytes must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `OrganizerConfig::default()`.
pub fn load_config(path: &Path) -> Result<OrganizerConfig> {
    if !path.exists() {
        let cfg = OrganizerConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: OrganizerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &OrganizerConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
