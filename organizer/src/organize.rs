//! The batch loop behind `organizer run`.
//!
//! One file at a time: hand it to the classifier, check the root afterwards,
//! and log anything that stayed behind so later runs skip it.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::core::eligibility::Exclusions;
use crate::core::queue::Candidate;
use crate::core::record::FailureRecord;
use crate::core::types::{FileState, Outcome};
use crate::io::classifier::{ClassifyRequest, Classifier};
use crate::io::failure_log::FailureStore;
use crate::io::init::OrganizerPaths;
use crate::io::interrupt::Interrupt;
use crate::io::prompt::PromptBuilder;
use crate::io::scan::{dir_entry_names, list_eligible_files, verify_moved};
use crate::io::transcript::{OutcomeEntry, RunPaths, append_outcome};
use crate::queue::load_work_queue;

/// Per-run knobs.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub run_id: String,
    /// Pause between files.
    pub delay: Duration,
    /// Process at most this many files.
    pub limit: Option<usize>,
    /// Wall-clock budget per agent invocation.
    pub agent_timeout: Duration,
    pub output_limit_bytes: usize,
    /// Write agent output and outcome lines under `.organizer/runs/`.
    pub transcripts: bool,
}

/// Everything the loop needs besides the classifier and the failure store.
pub struct BatchSetup {
    pub paths: OrganizerPaths,
    pub exclusions: Exclusions,
    pub prompts: PromptBuilder,
    pub options: BatchOptions,
}

/// Progress notification for one file.
#[derive(Debug, Clone)]
pub struct FileEvent<'a> {
    /// 1-based position in the queue.
    pub index: usize,
    pub total: usize,
    pub name: &'a str,
    pub state: FileState,
    /// Set once the file has left `Processing`.
    pub outcome: Option<Outcome>,
}

/// Why `run_batch` stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStop {
    /// Every queued file was attempted.
    Completed,
    /// An interrupt stopped the run early.
    Interrupted,
}

/// Summary of a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub run_id: String,
    /// Files handed to the agent (or found gone) this run.
    pub processed: usize,
    pub moved: usize,
    pub quarantined: usize,
    pub failed: usize,
    pub vanished: usize,
    /// Poison files left out of the queue.
    pub skipped: Vec<String>,
    /// Eligible files still in the root after the run, poison files included.
    pub remaining: Vec<String>,
    pub stop: BatchStop,
}

impl BatchOutcome {
    fn new(run_id: &str, skipped: Vec<String>) -> Self {
        Self {
            run_id: run_id.to_string(),
            processed: 0,
            moved: 0,
            quarantined: 0,
            failed: 0,
            vanished: 0,
            skipped,
            remaining: Vec::new(),
            stop: BatchStop::Completed,
        }
    }

    fn tally(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Interrupted => return,
            Outcome::Moved => self.moved += 1,
            Outcome::Quarantined => self.quarantined += 1,
            Outcome::Vanished => self.vanished += 1,
            Outcome::StillPresent | Outcome::ProcessError { .. } | Outcome::TimedOut { .. } => {
                self.failed += 1;
            }
        }
        self.processed += 1;
    }
}

/// Run the loop over the current work queue.
///
/// File-level failures are recorded in `store` and never abort the run. The
/// run does abort when the failure log cannot be read or written, or when the
/// agent cannot be started at all.
pub fn run_batch<C: Classifier, S: FailureStore, F: FnMut(&FileEvent<'_>)>(
    setup: &BatchSetup,
    classifier: &C,
    store: &mut S,
    interrupt: &Interrupt,
    mut on_event: F,
) -> Result<BatchOutcome> {
    let options = &setup.options;
    let queue = load_work_queue(&setup.paths, &setup.exclusions, store)?;
    let skipped = queue.skipped.iter().map(|c| c.name.clone()).collect();
    let mut outcome = BatchOutcome::new(&options.run_id, skipped);

    let files: Vec<Candidate> = match options.limit {
        Some(limit) => queue.files.into_iter().take(limit).collect(),
        None => queue.files,
    };
    let total = files.len();
    info!(run_id = %options.run_id, total, skipped = outcome.skipped.len(), "starting batch");

    for (i, candidate) in files.iter().enumerate() {
        let index = i + 1;
        if interrupt.stop_requested() {
            outcome.stop = BatchStop::Interrupted;
            break;
        }
        if i > 0 && !interrupt.sleep(options.delay) {
            outcome.stop = BatchStop::Interrupted;
            break;
        }

        on_event(&FileEvent {
            index,
            total,
            name: &candidate.name,
            state: FileState::Processing,
            outcome: None,
        });
        let started = Instant::now();
        let started_at = chrono::Local::now().to_rfc3339();
        let result = process_file(setup, classifier, interrupt, candidate, index)?;

        if let Some(reason) = result.failure_reason() {
            store
                .record(&FailureRecord::new(&candidate.name, reason.to_string()))
                .with_context(|| format!("record failure for {}", candidate.name))?;
        }
        if options.transcripts {
            let entry = OutcomeEntry {
                run_id: &options.run_id,
                index,
                file: &candidate.name,
                outcome: result,
                started_at,
                duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            };
            let run_paths = RunPaths::new(&setup.paths.root, &options.run_id);
            if let Err(err) = append_outcome(&run_paths, &entry) {
                warn!(err = %err, "could not append outcome line");
            }
        }

        outcome.tally(result);
        on_event(&FileEvent {
            index,
            total,
            name: &candidate.name,
            state: result.state(),
            outcome: Some(result),
        });

        if result == Outcome::Interrupted {
            outcome.stop = BatchStop::Interrupted;
            break;
        }
    }

    outcome.remaining = list_eligible_files(&setup.paths.root, &setup.exclusions)?
        .into_iter()
        .map(|c| c.name)
        .collect();
    info!(
        run_id = %options.run_id,
        processed = outcome.processed,
        failed = outcome.failed,
        remaining = outcome.remaining.len(),
        stop = ?outcome.stop,
        "batch finished"
    );
    Ok(outcome)
}

/// Hand one file to the classifier and decide what happened to it.
///
/// Does not touch the failure log; the caller records failures.
pub fn process_file<C: Classifier>(
    setup: &BatchSetup,
    classifier: &C,
    interrupt: &Interrupt,
    candidate: &Candidate,
    index: usize,
) -> Result<Outcome> {
    if verify_moved(&candidate.path) {
        debug!(file = %candidate.name, "already gone from root");
        return Ok(Outcome::Vanished);
    }

    let quarantine_before = dir_entry_names(&setup.paths.quarantine_dir)?;
    let transcript_path = setup.options.transcripts.then(|| {
        RunPaths::new(&setup.paths.root, &setup.options.run_id)
            .transcript_path(index, &candidate.name)
    });
    let request = ClassifyRequest {
        file_path: candidate.path.clone(),
        workdir: setup.paths.root.clone(),
        prompt: setup.prompts.render(&candidate.path)?,
        timeout: setup.options.agent_timeout,
        output_limit_bytes: setup.options.output_limit_bytes,
        transcript_path,
    };

    let exit = classifier.classify(&request, interrupt)?;
    let moved = verify_moved(&candidate.path);
    let quarantined = moved && gained_entries(&setup.paths.quarantine_dir, &quarantine_before)?;
    let outcome = Outcome::from_exit(exit, moved, quarantined);
    debug!(file = %candidate.name, ?exit, moved, quarantined, ?outcome, "file processed");
    Ok(outcome)
}

fn gained_entries(dir: &Path, before: &[String]) -> Result<bool> {
    let after = dir_entry_names(dir)?;
    Ok(after.iter().any(|name| !before.contains(name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::AgentExit;
    use crate::io::process::SpawnError;
    use crate::test_support::{MemoryFailureStore, ScriptedAction, ScriptedClassifier, TestDir};

    #[test]
    fn moved_and_failed_files_are_tallied() {
        let dir = TestDir::with_files(&["a.pdf", "b.pdf", "c.pdf"]).expect("dir");
        let classifier = ScriptedClassifier::new(vec![
            ScriptedAction::MoveTo("Financial"),
            ScriptedAction::Exit(AgentExit::Success),
            ScriptedAction::Exit(AgentExit::Failed { code: Some(1) }),
        ]);
        let mut store = MemoryFailureStore::default();

        let outcome = run_batch(
            &dir.setup(),
            &classifier,
            &mut store,
            &Interrupt::new(),
            |_| {},
        )
        .expect("batch");

        assert_eq!(outcome.processed, 3);
        assert_eq!(outcome.moved, 1);
        assert_eq!(outcome.failed, 2);
        assert_eq!(outcome.stop, BatchStop::Completed);
        assert_eq!(outcome.remaining, vec!["b.pdf", "c.pdf"]);
        assert_eq!(
            store.lines(),
            vec![
                "b.pdf | Agent finished but file was NOT moved",
                "c.pdf | Agent exited with code 1",
            ]
        );
        classifier.assert_drained().expect("drained");
    }

    #[test]
    fn quarantine_is_detected_from_new_entry() {
        let dir = TestDir::with_files(&["blurry.jpg"]).expect("dir");
        let classifier = ScriptedClassifier::new(vec![ScriptedAction::Quarantine]);
        let mut store = MemoryFailureStore::default();

        let outcome = run_batch(
            &dir.setup(),
            &classifier,
            &mut store,
            &Interrupt::new(),
            |_| {},
        )
        .expect("batch");

        assert_eq!(outcome.quarantined, 1);
        assert_eq!(outcome.moved, 0);
        assert!(dir.root().join("_Quarantine/blurry.jpg").is_file());
        assert!(store.lines().is_empty());
    }

    #[test]
    fn events_walk_through_processing_to_terminal_state() {
        let dir = TestDir::with_files(&["a.pdf"]).expect("dir");
        let classifier = ScriptedClassifier::new(vec![ScriptedAction::MoveTo("Work")]);
        let mut store = MemoryFailureStore::default();
        let mut states = Vec::new();

        run_batch(
            &dir.setup(),
            &classifier,
            &mut store,
            &Interrupt::new(),
            |event| states.push((event.index, event.total, event.state, event.outcome)),
        )
        .expect("batch");

        assert_eq!(
            states,
            vec![
                (1, 1, FileState::Processing, None),
                (1, 1, FileState::Moved, Some(Outcome::Moved)),
            ]
        );
    }

    #[test]
    fn file_removed_by_earlier_agent_is_not_reprocessed() {
        let dir = TestDir::with_files(&["a.pdf", "b.pdf"]).expect("dir");
        // The first agent call tidies up both files.
        let classifier = ScriptedClassifier::new(vec![ScriptedAction::MoveAllTo("Work")]);
        let mut store = MemoryFailureStore::default();

        let outcome = run_batch(
            &dir.setup(),
            &classifier,
            &mut store,
            &Interrupt::new(),
            |_| {},
        )
        .expect("batch");

        assert_eq!(outcome.moved, 1);
        assert_eq!(outcome.vanished, 1);
        assert!(outcome.remaining.is_empty());
        classifier.assert_drained().expect("drained");
    }

    #[test]
    fn limit_caps_files_per_run() {
        let dir = TestDir::with_files(&["a.pdf", "b.pdf", "c.pdf"]).expect("dir");
        let classifier = ScriptedClassifier::new(vec![ScriptedAction::MoveTo("Work")]);
        let mut store = MemoryFailureStore::default();
        let mut setup = dir.setup();
        setup.options.limit = Some(1);

        let outcome = run_batch(&setup, &classifier, &mut store, &Interrupt::new(), |_| {})
            .expect("batch");
        assert_eq!(outcome.processed, 1);
        assert_eq!(outcome.remaining, vec!["b.pdf", "c.pdf"]);
    }

    #[test]
    fn spawn_failure_aborts_without_logging() {
        let dir = TestDir::with_files(&["a.pdf"]).expect("dir");
        let classifier = ScriptedClassifier::new(vec![ScriptedAction::SpawnError]);
        let mut store = MemoryFailureStore::default();

        let result = run_batch(
            &dir.setup(),
            &classifier,
            &mut store,
            &Interrupt::new(),
            |_| {},
        );
        let err = result.expect_err("spawn failure aborts");
        assert!(err.downcast_ref::<SpawnError>().is_some());
        assert!(store.lines().is_empty());
        assert!(dir.root().join("a.pdf").exists());
    }

    #[test]
    fn stop_after_current_finishes_file_then_halts() {
        let dir = TestDir::with_files(&["a.pdf", "b.pdf"]).expect("dir");
        let classifier = ScriptedClassifier::new(vec![ScriptedAction::MoveThenStop("Work")]);
        let mut store = MemoryFailureStore::default();

        let outcome = run_batch(
            &dir.setup(),
            &classifier,
            &mut store,
            &Interrupt::new(),
            |_| {},
        )
        .expect("batch");

        assert_eq!(outcome.stop, BatchStop::Interrupted);
        assert_eq!(outcome.moved, 1);
        assert_eq!(outcome.remaining, vec!["b.pdf"]);
        assert_eq!(classifier.calls().len(), 1);
    }

    #[test]
    fn immediate_stop_leaves_file_pending_and_unlogged() {
        let dir = TestDir::with_files(&["a.pdf", "b.pdf"]).expect("dir");
        let classifier = ScriptedClassifier::new(vec![ScriptedAction::StopNow]);
        let mut store = MemoryFailureStore::default();

        let outcome = run_batch(
            &dir.setup(),
            &classifier,
            &mut store,
            &Interrupt::new(),
            |_| {},
        )
        .expect("batch");

        assert_eq!(outcome.stop, BatchStop::Interrupted);
        assert_eq!(outcome.processed, 0);
        assert!(store.lines().is_empty());
        assert_eq!(outcome.remaining, vec!["a.pdf", "b.pdf"]);
    }

    #[test]
    fn stop_before_start_processes_nothing() {
        let dir = TestDir::with_files(&["a.pdf"]).expect("dir");
        let classifier = ScriptedClassifier::new(Vec::new());
        let mut store = MemoryFailureStore::default();
        let interrupt = Interrupt::new();
        interrupt.request_stop();

        let outcome = run_batch(&dir.setup(), &classifier, &mut store, &interrupt, |_| {})
            .expect("batch");
        assert_eq!(outcome.stop, BatchStop::Interrupted);
        assert!(classifier.calls().is_empty());
    }

    #[test]
    fn transcripts_record_each_outcome() {
        let dir = TestDir::with_files(&["a.pdf"]).expect("dir");
        let classifier = ScriptedClassifier::new(vec![ScriptedAction::MoveTo("Work")]);
        let mut store = MemoryFailureStore::default();
        let mut setup = dir.setup();
        setup.options.transcripts = true;

        run_batch(&setup, &classifier, &mut store, &Interrupt::new(), |_| {}).expect("batch");

        let outcomes = RunPaths::new(dir.root(), &setup.options.run_id).outcomes_path;
        let contents = std::fs::read_to_string(outcomes).expect("read outcomes");
        assert!(contents.contains("\"file\":\"a.pdf\""));
        assert!(contents.contains("\"outcome\":\"moved\""));
    }
}
