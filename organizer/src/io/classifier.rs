//! Classifier abstraction for agent invocation.
//!
//! The [`Classifier`] trait decouples the batch loop from the actual agent
//! backend (an AI CLI reading instructions on stdin). Tests use scripted
//! classifiers that move files themselves without spawning processes.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::core::types::AgentExit;
use crate::io::config::AgentConfig;
use crate::io::interrupt::Interrupt;
use crate::io::process::run_command_with_timeout;
use crate::io::transcript::write_agent_log;

/// Parameters for one agent invocation.
#[derive(Debug, Clone)]
pub struct ClassifyRequest {
    /// File the agent must organize.
    pub file_path: PathBuf,
    /// Working directory for the agent process (the target directory).
    pub workdir: PathBuf,
    /// Instruction text fed to the agent on stdin.
    pub prompt: String,
    /// Maximum time to wait for the agent.
    pub timeout: Duration,
    /// Truncate captured output beyond this many bytes.
    pub output_limit_bytes: usize,
    /// Where to write the agent's stdout/stderr, if anywhere.
    pub transcript_path: Option<PathBuf>,
}

/// Something that can be asked to organize one file.
///
/// Returns how the attempt ended. Whether the file actually moved is checked
/// by the caller on the filesystem, never trusted from the classifier.
pub trait Classifier {
    fn classify(&self, request: &ClassifyRequest, interrupt: &Interrupt) -> Result<AgentExit>;
}

/// Classifier that spawns the configured agent CLI.
#[derive(Debug, Clone)]
pub struct AgentClassifier {
    program: String,
    args: Vec<String>,
}

impl AgentClassifier {
    pub fn from_config(config: &AgentConfig) -> Self {
        let (program, leading) = config
            .command
            .split_first()
            .map(|(program, rest)| (program.clone(), rest.to_vec()))
            .unwrap_or_default();
        let mut args = leading;
        if !config.model_flag.trim().is_empty() {
            args.push(config.model_flag.clone());
        }
        args.push(config.model.clone());
        Self { program, args }
    }

    /// Program and arguments, for display.
    pub fn command_line(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl Classifier for AgentClassifier {
    #[instrument(skip_all, fields(file = %request.file_path.display(), timeout_secs = request.timeout.as_secs()))]
    fn classify(&self, request: &ClassifyRequest, interrupt: &Interrupt) -> Result<AgentExit> {
        info!(program = %self.program, "starting agent");
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).current_dir(&request.workdir);

        let output = run_command_with_timeout(
            cmd,
            Some(request.prompt.as_bytes()),
            request.timeout,
            request.output_limit_bytes,
            Some(interrupt),
        )
        .with_context(|| format!("run agent {}", self.program))?;

        // The agent already ran; a lost transcript must not hide its outcome.
        if let Some(path) = &request.transcript_path
            && let Err(err) = write_agent_log(path, &output, request.output_limit_bytes)
        {
            warn!(err = %err, path = %path.display(), "could not write agent transcript");
        }

        if output.interrupted {
            warn!("agent stopped by interrupt");
            return Ok(AgentExit::Interrupted);
        }
        if output.timed_out {
            warn!(timeout_secs = request.timeout.as_secs(), "agent timed out");
            return Ok(AgentExit::TimedOut {
                secs: request.timeout.as_secs(),
            });
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "agent failed");
            return Ok(AgentExit::Failed {
                code: output.status.code(),
            });
        }

        debug!("agent completed");
        Ok(AgentExit::Success)
    }
}
