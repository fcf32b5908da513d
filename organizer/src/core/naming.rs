//! Collision-free destination names.

/// Upper bound on `(n)` suffixes tried before giving up.
pub const MAX_VERSION: u32 = 9_999;

/// Build the `version`-th candidate for `file_name`.
///
/// Version 1 is the name itself; later versions insert ` (n)` before the
/// extension: `invoice.pdf`, `invoice (2).pdf`, `invoice (3).pdf`. Dotfiles and
/// names without an extension get the suffix appended.
pub fn versioned_name(file_name: &str, version: u32) -> String {
    if version <= 1 {
        return file_name.to_string();
    }
    match split_extension(file_name) {
        Some((stem, ext)) => format!("{stem} ({version}).{ext}"),
        None => format!("{file_name} ({version})"),
    }
}

/// Reject names that would escape the destination directory.
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

/// Append `.ext` to `name` unless it already ends with it (case-insensitive).
pub fn with_extension(name: &str, ext: Option<&str>) -> String {
    match ext {
        Some(ext) if !ext.is_empty() => {
            let suffix = format!(".{ext}");
            if name.to_lowercase().ends_with(&suffix.to_lowercase()) {
                name.to_string()
            } else {
                format!("{name}{suffix}")
            }
        }
        _ => name.to_string(),
    }
}

fn split_extension(file_name: &str) -> Option<(&str, &str)> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some((stem, ext))
}
