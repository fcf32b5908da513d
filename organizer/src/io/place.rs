//! Collision-safe relocation of a root file into a category or quarantine directory.
//!
//! This backs `organizer place`, the command the agent is told to use. A file
//! is never overwritten: a taken name gets a ` (n)` suffix instead.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, info, warn};

use crate::core::naming::{MAX_VERSION, is_plain_file_name, versioned_name, with_extension};
use crate::io::config::OrganizerConfig;

/// Where a file should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Category(String),
    Quarantine,
}

/// A request to move one root file.
#[derive(Debug, Clone)]
pub struct PlaceRequest {
    pub root: PathBuf,
    pub file: PathBuf,
    pub destination: Destination,
    /// New file name; the original extension is kept if omitted from it.
    pub new_name: Option<String>,
}

/// Move `request.file` into its destination directory and return the final path.
///
/// Fails without touching anything when the file is not directly inside the
/// root, the category is not configured, or the new name is not a plain name.
pub fn place_file(request: &PlaceRequest, config: &OrganizerConfig) -> Result<PathBuf> {
    let source = resolve_source(&request.root, &request.file)?;
    let dir_name = match &request.destination {
        Destination::Quarantine => config.quarantine_dir.clone(),
        Destination::Category(category) => resolve_category(category, config)?,
    };
    let original_name = source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("{} has no file name", source.display()))?;
    let file_name = match &request.new_name {
        Some(name) => {
            let name = name.trim();
            if !is_plain_file_name(name) || name.starts_with('.') {
                bail!("new name {name:?} must be a plain, visible file name");
            }
            let ext = source.extension().map(|ext| ext.to_string_lossy());
            with_extension(name, ext.as_deref())
        }
        None => original_name,
    };

    let dest_dir = request.root.join(&dir_name);
    fs::create_dir_all(&dest_dir)
        .with_context(|| format!("create directory {}", dest_dir.display()))?;
    let placed = move_without_overwrite(&source, &dest_dir, &file_name)?;
    info!(from = %source.display(), to = %placed.display(), "placed file");
    Ok(placed)
}

/// Move `source` into `dest_dir` as `file_name`, versioning the name on collision.
pub fn move_without_overwrite(source: &Path, dest_dir: &Path, file_name: &str) -> Result<PathBuf> {
    for version in 1..=MAX_VERSION {
        let candidate = dest_dir.join(versioned_name(file_name, version));
        // A hard link fails with AlreadyExists instead of replacing the target.
        match fs::hard_link(source, &candidate) {
            Ok(()) => {
                fs::remove_file(source).with_context(|| {
                    format!(
                        "remove {} after linking to {}",
                        source.display(),
                        candidate.display()
                    )
                })?;
                return Ok(candidate);
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                debug!(candidate = %candidate.display(), "name taken");
            }
            Err(err) => {
                if fs::symlink_metadata(&candidate).is_ok() {
                    continue;
                }
                warn!(err = %err, "hard link unavailable, falling back to rename");
                fs::rename(source, &candidate).with_context(|| {
                    format!("move {} to {}", source.display(), candidate.display())
                })?;
                return Ok(candidate);
            }
        }
    }
    bail!(
        "no free name for {file_name} in {} after {MAX_VERSION} attempts",
        dest_dir.display()
    )
}

fn resolve_source(root: &Path, file: &Path) -> Result<PathBuf> {
    let source = if file.is_absolute() {
        file.to_path_buf()
    } else {
        root.join(file)
    };
    let meta = fs::symlink_metadata(&source)
        .with_context(|| format!("inspect {}", source.display()))?;
    if meta.is_dir() {
        bail!("{} is a directory", source.display());
    }
    let parent = source
        .parent()
        .ok_or_else(|| anyhow!("{} has no parent directory", source.display()))?;
    let parent = parent
        .canonicalize()
        .with_context(|| format!("resolve {}", parent.display()))?;
    let root = root
        .canonicalize()
        .with_context(|| format!("resolve {}", root.display()))?;
    if parent != root {
        bail!(
            "{} is not directly inside {}",
            source.display(),
            root.display()
        );
    }
    Ok(source)
}

fn resolve_category(category: &str, config: &OrganizerConfig) -> Result<String> {
    config
        .categories
        .iter()
        .find(|known| known.eq_ignore_ascii_case(category.trim()))
        .cloned()
        .ok_or_else(|| {
            anyhow!(
                "unknown category {category:?} (expected one of: {})",
                config.categories.join(", ")
            )
        })
}
