//! Non-recursive listing of the target directory root.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::core::eligibility::Exclusions;
use crate::core::queue::Candidate;

/// List eligible regular files directly inside `dir`, sorted by name.
///
/// Symlinks count when they point at a regular file. Entries that vanish or
/// cannot be inspected mid-scan are skipped with a warning.
pub fn list_eligible_files(dir: &Path, exclusions: &Exclusions) -> Result<Vec<Candidate>> {
    let entries = fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("read entry in {}", dir.display()))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !exclusions.is_eligible(&name) {
            debug!(file = %name, "excluded");
            continue;
        }
        let path = entry.path();
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => files.push(Candidate::new(name, path)),
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(file = %name, "dangling or vanished entry");
            }
            Err(err) => warn!(file = %name, err = %err, "cannot inspect entry, skipping"),
        }
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Post-condition oracle: has the file left its original path?
pub fn verify_moved(path: &Path) -> bool {
    match fs::symlink_metadata(path) {
        Ok(_) => false,
        Err(err) => err.kind() == ErrorKind::NotFound,
    }
}

/// Names of the entries directly inside `dir`; empty when `dir` does not exist.
pub fn dir_entry_names(dir: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err).with_context(|| format!("read {}", dir.display())),
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("read entry in {}", dir.display()))?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}
