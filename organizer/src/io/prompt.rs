//! Instruction text handed to the agent on stdin.

use std::path::Path;

use anyhow::{Context, Result};
use minijinja::{Environment, context};

const ORGANIZE_TEMPLATE: &str = include_str!("prompts/organize.md");

/// Per-run inputs shared by every file's instruction.
#[derive(Debug, Clone)]
pub struct PromptSettings {
    pub categories: Vec<String>,
    pub quarantine_dir: String,
    pub naming_pattern: String,
    /// Shell command prefix the agent uses to relocate a file.
    pub place_command: String,
}

/// Template engine wrapper around minijinja.
pub struct PromptBuilder {
    env: Environment<'static>,
    settings: PromptSettings,
}

impl PromptBuilder {
    pub fn new(settings: PromptSettings) -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("organize", ORGANIZE_TEMPLATE)
            .context("compile organize template")?;
        Ok(Self { env, settings })
    }

    /// Render the instruction for one file.
    pub fn render(&self, file_path: &Path) -> Result<String> {
        let file_name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = file_path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let template = self.env.get_template("organize")?;
        let rendered = template
            .render(context! {
                file_path => file_path.display().to_string(),
                quoted_file_path => shell_quote(&file_path.to_string_lossy()),
                file_name => file_name,
                extension => extension,
                categories => &self.settings.categories,
                quarantine_dir => &self.settings.quarantine_dir,
                naming_pattern => &self.settings.naming_pattern,
                place_command => &self.settings.place_command,
            })
            .context("render organize prompt")?;
        Ok(rendered)
    }
}

/// Quote `value` for a POSIX shell when it contains anything unusual.
pub fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:+,@".contains(c));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}
