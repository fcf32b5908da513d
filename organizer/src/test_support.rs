//! Test-only fixtures: a scratch target directory, a scripted classifier and
//! an in-memory failure store.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, anyhow, bail};

use crate::core::record::FailureRecord;
use crate::core::types::AgentExit;
use crate::io::classifier::{ClassifyRequest, Classifier};
use crate::io::config::OrganizerConfig;
use crate::io::failure_log::FailureStore;
use crate::io::init::OrganizerPaths;
use crate::io::interrupt::Interrupt;
use crate::io::place::move_without_overwrite;
use crate::io::process::SpawnError;
use crate::io::prompt::{PromptBuilder, PromptSettings};
use crate::organize::{BatchOptions, BatchSetup};

/// What a [`ScriptedClassifier`] does on one call.
#[derive(Debug, Clone)]
pub enum ScriptedAction {
    /// Move the requested file into the named category directory and exit 0.
    MoveTo(&'static str),
    /// Move the requested file into a category under a new name and exit 0.
    MoveAs(&'static str, &'static str),
    /// Move every regular file in the root into the category and exit 0.
    MoveAllTo(&'static str),
    /// Move the requested file into the quarantine directory and exit 0.
    Quarantine,
    /// Touch nothing and report the given exit.
    Exit(AgentExit),
    /// Move the file, then request a stop as if Ctrl-C arrived mid-run.
    MoveThenStop(&'static str),
    /// Request an immediate stop and report the agent as killed.
    StopNow,
    /// Fail as if the agent binary could not be started.
    SpawnError,
}

/// Classifier that replays a fixed script instead of spawning an agent.
#[derive(Debug)]
pub struct ScriptedClassifier {
    actions: RefCell<VecDeque<ScriptedAction>>,
    calls: RefCell<Vec<PathBuf>>,
}

impl ScriptedClassifier {
    pub fn new(actions: Vec<ScriptedAction>) -> Self {
        Self {
            actions: RefCell::new(actions.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Files the classifier was asked about, in call order.
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.borrow().clone()
    }

    /// Fail if any scripted action was never used.
    pub fn assert_drained(&self) -> Result<()> {
        let left = self.actions.borrow().len();
        if left > 0 {
            bail!("{left} scripted action(s) never ran");
        }
        Ok(())
    }
}

impl Classifier for ScriptedClassifier {
    fn classify(&self, request: &ClassifyRequest, interrupt: &Interrupt) -> Result<AgentExit> {
        self.calls.borrow_mut().push(request.file_path.clone());
        let action = self
            .actions
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("unexpected classify call for {}", request.file_path.display()))?;
        let root = &request.workdir;
        match action {
            ScriptedAction::MoveTo(category) => {
                move_into(&request.file_path, &root.join(category))?;
                Ok(AgentExit::Success)
            }
            ScriptedAction::MoveAs(category, name) => {
                let dir = root.join(category);
                fs::create_dir_all(&dir)?;
                move_without_overwrite(&request.file_path, &dir, name)?;
                Ok(AgentExit::Success)
            }
            ScriptedAction::MoveAllTo(category) => {
                for entry in fs::read_dir(root)? {
                    let path = entry?.path();
                    if path.is_file() {
                        move_into(&path, &root.join(category))?;
                    }
                }
                Ok(AgentExit::Success)
            }
            ScriptedAction::Quarantine => {
                let quarantine = OrganizerConfig::default().quarantine_dir;
                move_into(&request.file_path, &root.join(quarantine))?;
                Ok(AgentExit::Success)
            }
            ScriptedAction::Exit(exit) => Ok(exit),
            ScriptedAction::MoveThenStop(category) => {
                move_into(&request.file_path, &root.join(category))?;
                interrupt.request_stop();
                Ok(AgentExit::Success)
            }
            ScriptedAction::StopNow => {
                interrupt.request_stop_now();
                Ok(AgentExit::Interrupted)
            }
            ScriptedAction::SpawnError => Err(SpawnError {
                program: "missing-agent".to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }
            .into()),
        }
    }
}

fn move_into(file: &Path, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("{} has no file name", file.display()))?;
    move_without_overwrite(file, dir, &name)
}

/// Failure store held in memory.
#[derive(Debug, Default)]
pub struct MemoryFailureStore {
    records: Vec<FailureRecord>,
    unreadable: bool,
}

impl MemoryFailureStore {
    pub fn with_records(records: Vec<FailureRecord>) -> Self {
        Self {
            records,
            unreadable: false,
        }
    }

    /// A store whose reads always fail, like a log without read permission.
    pub fn unreadable() -> Self {
        Self {
            records: Vec::new(),
            unreadable: true,
        }
    }

    /// Stored records rendered as log lines without the trailing newline.
    pub fn lines(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|record| record.to_line().trim_end().to_string())
            .collect()
    }
}

impl FailureStore for MemoryFailureStore {
    fn records(&self) -> Result<Vec<FailureRecord>> {
        if self.unreadable {
            bail!("permission denied");
        }
        Ok(self.records.clone())
    }

    fn record(&mut self, record: &FailureRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Scratch target directory seeded with files.
pub struct TestDir {
    temp: tempfile::TempDir,
}

impl TestDir {
    /// Create a directory holding one small file per name.
    pub fn with_files(names: &[&str]) -> Result<Self> {
        let temp = tempfile::tempdir()?;
        for name in names {
            fs::write(temp.path().join(name), format!("contents of {name}"))?;
        }
        Ok(Self { temp })
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    /// Batch setup over this directory with the default config, no delay and
    /// no transcripts.
    pub fn setup(&self) -> BatchSetup {
        let cfg = OrganizerConfig::default();
        let paths = OrganizerPaths::new(self.root(), None, &cfg);
        let prompts = PromptBuilder::new(PromptSettings {
            categories: cfg.categories.clone(),
            quarantine_dir: cfg.quarantine_dir.clone(),
            naming_pattern: cfg.naming_pattern.clone(),
            place_command: "organizer place".to_string(),
        })
        .expect("prompt template compiles");
        BatchSetup {
            exclusions: paths.exclusions(&cfg),
            paths,
            prompts,
            options: BatchOptions {
                run_id: "test-run".to_string(),
                delay: Duration::ZERO,
                limit: None,
                agent_timeout: Duration::from_secs(10),
                output_limit_bytes: cfg.agent.output_limit_bytes,
                transcripts: false,
            },
        }
    }
}
