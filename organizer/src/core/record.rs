//! Line codec for the failure log (`<filename> | <reason>`).

use std::collections::HashSet;

/// Separator between filename and reason on a failure log line.
pub const SEPARATOR: &str = " | ";

/// Filenames of known poison files, keyed by [`log_key`].
pub type SkipSet = HashSet<String>;

/// One failure log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    /// Escaped filename (see [`log_key`]).
    pub filename: String,
    /// Free-form reason; empty for hand-added lines without a separator.
    pub reason: String,
}

impl FailureRecord {
    pub fn new(filename: &str, reason: impl Into<String>) -> Self {
        Self {
            filename: log_key(filename),
            reason: reason.into(),
        }
    }

    /// Render as a single log line including the trailing newline.
    pub fn to_line(&self) -> String {
        format!("{}{}{}\n", self.filename, SEPARATOR, one_line(&self.reason))
    }
}

/// Key under which a filename is stored in the log and looked up in the skip set.
///
/// Line breaks are escaped so a record always occupies exactly one line.
/// Backslashes are escaped first so every name maps to a distinct key.
pub fn log_key(filename: &str) -> String {
    filename
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

/// Parse one log line. Returns `None` for blank lines.
///
/// The filename is everything before the last separator, so names that contain
/// `" | "` themselves still round-trip. A line without a separator is a bare
/// filename.
pub fn parse_line(line: &str) -> Option<FailureRecord> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.trim().is_empty() {
        return None;
    }
    match line.rsplit_once(SEPARATOR) {
        Some((filename, reason)) => Some(FailureRecord {
            filename: filename.to_string(),
            reason: reason.to_string(),
        }),
        None => Some(FailureRecord {
            filename: line.to_string(),
            reason: String::new(),
        }),
    }
}

/// Parse a whole log into records, skipping blank lines.
pub fn parse_log(contents: &str) -> Vec<FailureRecord> {
    contents.lines().filter_map(parse_line).collect()
}

/// Collect the skip set from parsed records. Duplicates collapse.
pub fn skip_set<'a, I>(records: I) -> SkipSet
where
    I: IntoIterator<Item = &'a FailureRecord>,
{
    records
        .into_iter()
        .map(|record| record.filename.clone())
        .collect()
}

fn one_line(reason: &str) -> String {
    reason
        .lines()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .replace(SEPARATOR, " / ")
}
