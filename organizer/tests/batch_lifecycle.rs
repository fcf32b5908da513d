//! Loop-level tests for full organizer run scenarios.
//!
//! These drive `run_batch` over a real directory with the file-backed failure
//! log and a scripted classifier, across several runs, to check what each run
//! leaves behind for the next one.

use std::fs;

use organizer::core::types::AgentExit;
use organizer::io::failure_log::{FailureStore, FileFailureStore};
use organizer::io::interrupt::Interrupt;
use organizer::organize::{BatchStop, run_batch};
use organizer::test_support::{ScriptedAction, ScriptedClassifier, TestDir};

fn log_lines(dir: &TestDir) -> Vec<String> {
    match fs::read_to_string(dir.root().join("failed_files.log")) {
        Ok(contents) => contents.lines().map(str::to_string).collect(),
        Err(_) => Vec::new(),
    }
}

/// One success and one verification failure, then a second run that finds
/// nothing to do.
///
/// Run 1:
/// - `corrupt.pdf`: agent exits 0 without moving it → logged
/// - `report.pdf`: agent files it as `Financial/2024-01-01_Acme_Invoice.pdf`
///
/// Run 2: the root holds only the poison file and the log, so the agent is
/// never invoked.
#[test]
fn success_and_verification_failure_then_idle_rerun() {
    let dir = TestDir::with_files(&["report.pdf", "corrupt.pdf"]).expect("dir");
    let setup = dir.setup();
    let mut store = FileFailureStore::new(&setup.paths.failure_log_path);

    let classifier = ScriptedClassifier::new(vec![
        ScriptedAction::Exit(AgentExit::Success),
        ScriptedAction::MoveAs("Financial", "2024-01-01_Acme_Invoice.pdf"),
    ]);
    let first = run_batch(&setup, &classifier, &mut store, &Interrupt::new(), |_| {})
        .expect("first run");

    assert_eq!(first.moved, 1);
    assert_eq!(first.failed, 1);
    assert_eq!(first.stop, BatchStop::Completed);
    assert!(
        dir.root()
            .join("Financial/2024-01-01_Acme_Invoice.pdf")
            .is_file()
    );
    assert!(!dir.root().join("report.pdf").exists());
    assert!(dir.root().join("corrupt.pdf").exists());
    assert_eq!(
        log_lines(&dir),
        vec!["corrupt.pdf | Agent finished but file was NOT moved"]
    );
    classifier.assert_drained().expect("drained");

    let idle = ScriptedClassifier::new(Vec::new());
    let second = run_batch(&setup, &idle, &mut store, &Interrupt::new(), |_| {})
        .expect("second run");
    assert_eq!(second.processed, 0);
    assert_eq!(second.skipped, vec!["corrupt.pdf"]);
    assert_eq!(second.remaining, vec!["corrupt.pdf"]);
    assert!(idle.calls().is_empty());
    assert_eq!(log_lines(&dir).len(), 1);
}

/// A run cut short by `--limit` leaves the rest for the next run, which picks
/// up exactly where the first stopped.
#[test]
fn limited_run_resumes_with_remaining_files() {
    let dir = TestDir::with_files(&["a.pdf", "b.pdf", "c.pdf"]).expect("dir");
    let mut setup = dir.setup();
    let mut store = FileFailureStore::new(&setup.paths.failure_log_path);

    setup.options.limit = Some(1);
    let classifier = ScriptedClassifier::new(vec![ScriptedAction::MoveTo("Work")]);
    let first = run_batch(&setup, &classifier, &mut store, &Interrupt::new(), |_| {})
        .expect("first run");
    assert_eq!(first.remaining, vec!["b.pdf", "c.pdf"]);

    setup.options.limit = None;
    let classifier = ScriptedClassifier::new(vec![
        ScriptedAction::MoveTo("Work"),
        ScriptedAction::MoveTo("Personal"),
    ]);
    let second = run_batch(&setup, &classifier, &mut store, &Interrupt::new(), |_| {})
        .expect("second run");
    assert_eq!(second.moved, 2);
    assert!(second.remaining.is_empty());
    assert_eq!(
        classifier.calls(),
        vec![dir.root().join("b.pdf"), dir.root().join("c.pdf")]
    );
    assert!(dir.root().join("Personal/c.pdf").is_file());
}

/// A file in the log is never handed to the agent again, whatever the agent
/// would do with it now.
#[test]
fn logged_failures_are_permanent() {
    let dir = TestDir::with_files(&["flaky.pdf", "new.pdf"]).expect("dir");
    let setup = dir.setup();
    let mut store = FileFailureStore::new(&setup.paths.failure_log_path);

    let classifier = ScriptedClassifier::new(vec![
        ScriptedAction::Exit(AgentExit::Failed { code: Some(1) }),
        ScriptedAction::MoveTo("Work"),
    ]);
    run_batch(&setup, &classifier, &mut store, &Interrupt::new(), |_| {}).expect("first run");
    assert_eq!(log_lines(&dir), vec!["flaky.pdf | Agent exited with code 1"]);

    fs::write(dir.root().join("later.pdf"), "x").expect("write");
    let classifier = ScriptedClassifier::new(vec![ScriptedAction::MoveTo("Work")]);
    let second = run_batch(&setup, &classifier, &mut store, &Interrupt::new(), |_| {})
        .expect("second run");

    assert_eq!(classifier.calls(), vec![dir.root().join("later.pdf")]);
    assert_eq!(second.skipped, vec!["flaky.pdf"]);
    assert_eq!(store.records().expect("records").len(), 1);
}

/// An interrupt between files stops the run without logging anything for the
/// untouched files; the next run resumes with them.
#[test]
fn interrupted_run_resumes_cleanly() {
    let dir = TestDir::with_files(&["a.pdf", "b.pdf", "c.pdf"]).expect("dir");
    let setup = dir.setup();
    let mut store = FileFailureStore::new(&setup.paths.failure_log_path);

    let classifier = ScriptedClassifier::new(vec![ScriptedAction::MoveThenStop("Work")]);
    let first = run_batch(&setup, &classifier, &mut store, &Interrupt::new(), |_| {})
        .expect("first run");
    assert_eq!(first.stop, BatchStop::Interrupted);
    assert!(log_lines(&dir).is_empty());

    let classifier = ScriptedClassifier::new(vec![ScriptedAction::StopNow]);
    let second = run_batch(&setup, &classifier, &mut store, &Interrupt::new(), |_| {})
        .expect("second run");
    assert_eq!(second.stop, BatchStop::Interrupted);
    assert!(log_lines(&dir).is_empty());
    assert_eq!(second.remaining, vec!["b.pdf", "c.pdf"]);

    let classifier = ScriptedClassifier::new(vec![
        ScriptedAction::MoveTo("Work"),
        ScriptedAction::Quarantine,
    ]);
    let third = run_batch(&setup, &classifier, &mut store, &Interrupt::new(), |_| {})
        .expect("third run");
    assert_eq!(third.stop, BatchStop::Completed);
    assert_eq!(third.moved, 1);
    assert_eq!(third.quarantined, 1);
    assert!(third.remaining.is_empty());
}

/// Two files given the same new name both survive.
#[test]
fn same_target_name_never_overwrites() {
    let dir = TestDir::with_files(&["scan1.pdf", "scan2.pdf"]).expect("dir");
    let setup = dir.setup();
    let mut store = FileFailureStore::new(&setup.paths.failure_log_path);

    let classifier = ScriptedClassifier::new(vec![
        ScriptedAction::MoveAs("Receipts", "2024-03-01_Store_Receipt.pdf"),
        ScriptedAction::MoveAs("Receipts", "2024-03-01_Store_Receipt.pdf"),
    ]);
    run_batch(&setup, &classifier, &mut store, &Interrupt::new(), |_| {}).expect("run");

    let receipts = dir.root().join("Receipts");
    assert_eq!(
        fs::read_to_string(receipts.join("2024-03-01_Store_Receipt.pdf")).expect("first"),
        "contents of scan1.pdf"
    );
    assert_eq!(
        fs::read_to_string(receipts.join("2024-03-01_Store_Receipt (2).pdf")).expect("second"),
        "contents of scan2.pdf"
    );
}

/// An unreadable failure log aborts the run before the agent sees any file.
#[test]
fn unreadable_failure_log_aborts_run() {
    let dir = TestDir::with_files(&["a.pdf"]).expect("dir");
    let setup = dir.setup();
    fs::create_dir(&setup.paths.failure_log_path).expect("log as directory");
    let mut store = FileFailureStore::new(&setup.paths.failure_log_path);

    let classifier = ScriptedClassifier::new(Vec::new());
    let err = run_batch(&setup, &classifier, &mut store, &Interrupt::new(), |_| {})
        .expect_err("abort");
    assert!(format!("{err:#}").contains("refusing to run"));
    assert!(classifier.calls().is_empty());
    assert!(dir.root().join("a.pdf").exists());
}

/// A file name near the filesystem limit still gets its outcome logged with
/// transcripts on, and the files after it are still processed.
#[cfg(unix)]
#[test]
fn longest_legal_name_is_logged_with_transcripts_on() {
    use organizer::io::classifier::AgentClassifier;
    use organizer::io::config::AgentConfig;

    let long = format!("{}.pdf", "a".repeat(246));
    let dir = TestDir::with_files(&[long.as_str(), "zz.pdf"]).expect("dir");
    let mut setup = dir.setup();
    setup.options.transcripts = true;
    let mut store = FileFailureStore::new(&setup.paths.failure_log_path);
    let agent = AgentClassifier::from_config(&AgentConfig {
        command: vec![
            "sh".to_string(),
            "-c".to_string(),
            "cat >/dev/null".to_string(),
        ],
        model: "test".to_string(),
        model_flag: String::new(),
        ..AgentConfig::default()
    });

    let outcome = run_batch(&setup, &agent, &mut store, &Interrupt::new(), |_| {})
        .expect("run");

    assert_eq!(outcome.failed, 2);
    assert_eq!(
        log_lines(&dir),
        vec![
            format!("{long} | Agent finished but file was NOT moved"),
            "zz.pdf | Agent finished but file was NOT moved".to_string(),
        ]
    );
    let transcripts = fs::read_dir(dir.root().join(".organizer/runs/test-run"))
        .expect("run dir")
        .count();
    // Two agent logs plus outcomes.jsonl.
    assert_eq!(transcripts, 3);
}
