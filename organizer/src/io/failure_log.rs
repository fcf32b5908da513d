//! Append-only failure log backing the skip set.
//!
//! The loop only sees the [`FailureStore`] trait; the file-backed store is the
//! production implementation and tests substitute an in-memory one.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::core::record::{FailureRecord, SkipSet, parse_log, skip_set};

/// Persistence for poison-file records.
pub trait FailureStore {
    /// All records currently in the log. A store that does not exist yet is empty.
    fn records(&self) -> Result<Vec<FailureRecord>>;

    /// Append one record. Prior records are never edited.
    fn record(&mut self, record: &FailureRecord) -> Result<()>;

    /// Filenames to exclude from the work queue.
    fn load_skip_set(&self) -> Result<SkipSet> {
        Ok(skip_set(&self.records()?))
    }
}

/// Failure log stored as `<filename> | <reason>` lines in a text file.
#[derive(Debug, Clone)]
pub struct FileFailureStore {
    path: PathBuf,
}

impl FileFailureStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FailureStore for FileFailureStore {
    /// Read the log. A missing file means no failures yet; any other read error
    /// is returned so the caller can refuse to run blind.
    fn records(&self) -> Result<Vec<FailureRecord>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no failure log yet");
                return Ok(Vec::new());
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("read failure log {} (refusing to run without it)", self.path.display())
                });
            }
        };
        let records = parse_log(&contents);
        debug!(path = %self.path.display(), records = records.len(), "failure log loaded");
        Ok(records)
    }

    fn record(&mut self, record: &FailureRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open failure log {}", self.path.display()))?;
        // One write per record so an interrupt never leaves half a line behind.
        file.write_all(record.to_line().as_bytes())
            .with_context(|| format!("append failure log {}", self.path.display()))?;
        file.flush()
            .with_context(|| format!("flush failure log {}", self.path.display()))?;
        info!(file = %record.filename, reason = %record.reason, "recorded failure");
        Ok(())
    }
}
