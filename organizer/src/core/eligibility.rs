//! Which root entries may be handed to the agent.

/// Platform metadata files that are never organized (compared case-insensitively).
const METADATA_NAMES: &[&str] = &[
    ".ds_store",
    "thumbs.db",
    "ehthumbs.db",
    "desktop.ini",
    "icon\r",
    "__macosx",
];

/// Suffixes of files that are still being written by a browser or downloader.
const PARTIAL_SUFFIXES: &[&str] = &[".part", ".crdownload", ".download", ".partial", ".tmp"];

/// Names in the target directory that belong to the organizer itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exclusions {
    /// File name of the running executable, when it lives in the target directory.
    pub own_binary: Option<String>,
    pub failure_log: String,
    pub config_file: Option<String>,
    /// Extra names from `scan.ignore`.
    pub ignore: Vec<String>,
}

impl Exclusions {
    /// Check a root entry's file name against every exclusion rule.
    pub fn is_eligible(&self, name: &str) -> bool {
        if name.is_empty() || name.starts_with('.') {
            return false;
        }
        if is_metadata(name) || is_partial_download(name) {
            return false;
        }
        if name == self.failure_log {
            return false;
        }
        if self.own_binary.as_deref() == Some(name) || self.config_file.as_deref() == Some(name)
        {
            return false;
        }
        !self.ignore.iter().any(|ignored| ignored == name)
    }
}

fn is_metadata(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    METADATA_NAMES.contains(&lower.as_str())
}

fn is_partial_download(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    PARTIAL_SUFFIXES
        .iter()
        .any(|suffix| lower.ends_with(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exclusions() -> Exclusions {
        Exclusions {
            own_binary: Some("organizer".to_string()),
            failure_log: "failed_files.log".to_string(),
            config_file: Some("organizer.toml".to_string()),
            ignore: vec!["keep-me.txt".to_string()],
        }
    }

    #[test]
    fn regular_documents_are_eligible() {
        let ex = exclusions();
        assert!(ex.is_eligible("report.pdf"));
        assert!(ex.is_eligible("Scan 2024-01-01.jpeg"));
        assert!(ex.is_eligible("failed_files.log.bak"));
    }

    #[test]
    fn own_files_are_excluded() {
        let ex = exclusions();
        assert!(!ex.is_eligible("organizer"));
        assert!(!ex.is_eligible("failed_files.log"));
        assert!(!ex.is_eligible("organizer.toml"));
        assert!(!ex.is_eligible("keep-me.txt"));
    }

    #[test]
    fn hidden_and_metadata_files_are_excluded() {
        let ex = exclusions();
        assert!(!ex.is_eligible(".hidden"));
        assert!(!ex.is_eligible(".DS_Store"));
        assert!(!ex.is_eligible("Thumbs.db"));
        assert!(!ex.is_eligible("DESKTOP.INI"));
        assert!(!ex.is_eligible("Icon\r"));
        assert!(!ex.is_eligible(""));
    }

    #[test]
    fn partial_downloads_are_excluded() {
        let ex = exclusions();
        assert!(!ex.is_eligible("movie.mkv.part"));
        assert!(!ex.is_eligible("statement.pdf.crdownload"));
        assert!(!ex.is_eligible("x.TMP"));
    }
}
