//! Work queue construction: sort candidates and drop known poison files.

use std::path::PathBuf;

use crate::core::record::{SkipSet, log_key};

/// An eligible root entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// File name, lossily converted to UTF-8 for display and logging.
    pub name: String,
    /// Full path as found on disk.
    pub path: PathBuf,
}

impl Candidate {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Files to process this run, in order, plus the poison files left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkQueue {
    pub files: Vec<Candidate>,
    pub skipped: Vec<Candidate>,
}

impl WorkQueue {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Sort candidates lexicographically and split off those named in `skip`.
pub fn build_work_queue(mut candidates: Vec<Candidate>, skip: &SkipSet) -> WorkQueue {
    candidates.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));
    let (skipped, files): (Vec<_>, Vec<_>) = candidates
        .into_iter()
        .partition(|candidate| skip.contains(&log_key(&candidate.name)));
    WorkQueue { files, skipped }
}
