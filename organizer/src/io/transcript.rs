//! Per-run transcripts under `.organizer/runs/<run-id>/`.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::types::Outcome;
use crate::io::process::CommandOutput;

/// Hidden directory in the target root that holds run transcripts.
pub const STATE_DIR: &str = ".organizer";

/// Common per-component limit (ext4, APFS, NTFS).
const MAX_FILE_NAME_BYTES: usize = 255;
const LOG_SUFFIX: &str = ".log";

/// New run identifier from the local clock, e.g. `20240101-093000`.
pub fn new_run_id() -> String {
    chrono::Local::now().format("%Y%m%d-%H%M%S").to_string()
}

/// Canonical paths for one run's transcripts.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub dir: PathBuf,
    pub outcomes_path: PathBuf,
}

impl RunPaths {
    pub fn new(root: &Path, run_id: &str) -> Self {
        let dir = root.join(STATE_DIR).join("runs").join(run_id);
        Self {
            outcomes_path: dir.join("outcomes.jsonl"),
            dir,
        }
    }

    /// Agent log path for the `index`-th file (1-based) of the run.
    ///
    /// Long names are cut so the log's own name fits the filesystem limit; the
    /// index prefix keeps cut names unique within the run.
    pub fn transcript_path(&self, index: usize, file_name: &str) -> PathBuf {
        let prefix = format!("{index:03}-");
        let budget = MAX_FILE_NAME_BYTES - prefix.len() - LOG_SUFFIX.len();
        let mut safe = String::new();
        for c in file_name.chars() {
            let c = if c.is_control() || c == '/' || c == '\\' { '_' } else { c };
            if safe.len() + c.len_utf8() > budget {
                break;
            }
            safe.push(c);
        }
        self.dir.join(format!("{prefix}{safe}{LOG_SUFFIX}"))
    }
}

/// One line of `outcomes.jsonl`.
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeEntry<'a> {
    pub run_id: &'a str,
    pub index: usize,
    pub file: &'a str,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub started_at: String,
    pub duration_ms: u64,
}

/// Append one outcome line, creating the run directory on first use.
pub fn append_outcome(paths: &RunPaths, entry: &OutcomeEntry<'_>) -> Result<()> {
    fs::create_dir_all(&paths.dir)
        .with_context(|| format!("create run dir {}", paths.dir.display()))?;
    let mut line = serde_json::to_string(entry).context("serialize outcome")?;
    line.push('\n');
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.outcomes_path)
        .with_context(|| format!("open {}", paths.outcomes_path.display()))?;
    file.write_all(line.as_bytes())
        .with_context(|| format!("append {}", paths.outcomes_path.display()))
}

/// Write the agent's captured stdout/stderr, truncated to `output_limit` bytes.
pub fn write_agent_log(path: &Path, output: &CommandOutput, output_limit: usize) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create transcript dir {}", parent.display()))?;
    }
    let mut buf = String::new();
    buf.push_str("=== stdout ===\n");
    buf.push_str(&String::from_utf8_lossy(&output.stdout));
    buf.push_str("\n=== stderr ===\n");
    buf.push_str(&String::from_utf8_lossy(&output.stderr));
    if let Some(notice) = output.truncation_notice() {
        buf.push('\n');
        buf.push_str(&notice);
        buf.push('\n');
    }
    if output.timed_out {
        buf.push_str("\n[agent timed out]\n");
    }
    if output.interrupted {
        buf.push_str("\n[agent interrupted]\n");
    }

    if buf.len() > output_limit {
        let mut cut = output_limit;
        while !buf.is_char_boundary(cut) {
            cut -= 1;
        }
        let truncated = format!("{}\n[truncated {} bytes]\n", &buf[..cut], buf.len() - cut);
        return fs::write(path, truncated)
            .with_context(|| format!("write transcript {}", path.display()));
    }

    fs::write(path, buf).with_context(|| format!("write transcript {}", path.display()))
}
