//! Resumable AI-agent file organizer.
//!
//! Hands every loose file in a directory to an agent CLI, one at a time, and
//! keeps a failure log so files the agent could not organize are never retried.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use organizer::core::types::{FileState, InterruptMode};
use organizer::exit_codes;
use organizer::io::classifier::AgentClassifier;
use organizer::io::config::{OrganizerConfig, load_config};
use organizer::io::failure_log::{FailureStore, FileFailureStore};
use organizer::io::init::{InitOptions, OrganizerPaths, init_config};
use organizer::io::interrupt::{Interrupt, listen_for_interrupts};
use organizer::io::place::{Destination, PlaceRequest, place_file};
use organizer::io::process::SpawnError;
use organizer::io::prompt::{PromptBuilder, PromptSettings, shell_quote};
use organizer::io::transcript::new_run_id;
use organizer::logging;
use organizer::organize::{BatchOptions, BatchOutcome, BatchSetup, BatchStop, FileEvent, run_batch};
use organizer::queue::load_work_queue;

#[derive(Parser, Debug)]
#[command(
    name = "organizer",
    version,
    about = "Resumable batch organizer that hands each loose file to an AI agent"
)]
struct Cli {
    /// Directory to organize (default: current directory).
    #[arg(long, global = true, value_name = "DIR")]
    dir: Option<PathBuf>,
    /// Config file, relative to the current directory (default: `organizer.toml`
    /// in the target directory).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Hand every eligible root file to the agent once.
    Run(RunArgs),
    /// Print the files the next run would process, and the skipped ones.
    Queue,
    /// Print the failure log.
    Failures,
    /// Move one root file into a category or the quarantine directory.
    Place(PlaceArgs),
    /// Write a default `organizer.toml`.
    Init {
        /// Overwrite an existing config file.
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Process at most this many files.
    #[arg(long, value_name = "N")]
    limit: Option<usize>,
    /// Pause between files, in seconds.
    #[arg(long, value_name = "SECS")]
    delay_secs: Option<u64>,
    /// Agent model name.
    #[arg(long)]
    model: Option<String>,
    /// Kill an agent that runs longer than this many seconds.
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,
    /// Kill the running agent on the first interrupt instead of letting it finish.
    #[arg(long)]
    immediate: bool,
    /// Skip writing transcripts under `.organizer/runs/`.
    #[arg(long)]
    no_transcripts: bool,
}

#[derive(Args, Debug)]
struct PlaceArgs {
    /// File directly inside the target directory.
    file: PathBuf,
    /// Category directory to move the file into.
    #[arg(required_unless_present = "quarantine", conflicts_with = "quarantine")]
    category: Option<String>,
    /// New file name; the original extension is kept if omitted.
    #[arg(long)]
    name: Option<String>,
    /// Move the file into the quarantine directory instead.
    #[arg(long)]
    quarantine: bool,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            if let Some(spawn) = err.downcast_ref::<SpawnError>() {
                eprintln!(
                    "hint: check `agent.command` in the config; `{}` could not be started",
                    spawn.program
                );
            }
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let root = resolve_root(cli.dir.as_deref())?;
    let config_path = resolve_config(cli.config.as_deref())?;
    let config_path = config_path.as_deref();
    let defaults = OrganizerPaths::new(&root, config_path, &OrganizerConfig::default());

    let command = match cli.command {
        Command::Init { force } => return cmd_init(&defaults, force),
        command => command,
    };
    let cfg = load_config(&defaults.config_path)?;
    let paths = OrganizerPaths::new(&root, config_path, &cfg);

    match command {
        Command::Run(args) => cmd_run(cfg, &paths, config_path.is_some(), &args),
        Command::Queue => cmd_queue(&cfg, &paths),
        Command::Failures => cmd_failures(&paths),
        Command::Place(args) => cmd_place(&cfg, &paths, args),
        Command::Init { force } => cmd_init(&defaults, force),
    }
}

fn cmd_init(paths: &OrganizerPaths, force: bool) -> Result<i32> {
    init_config(&paths.config_path, &InitOptions { force })?;
    println!("organizer: wrote {}", paths.config_path.display());
    Ok(exit_codes::OK)
}

fn resolve_root(dir: Option<&Path>) -> Result<PathBuf> {
    let dir = dir.unwrap_or_else(|| Path::new("."));
    dir.canonicalize()
        .with_context(|| format!("resolve target directory {}", dir.display()))
}

/// A relative `--config` names a file relative to where the user typed it.
fn resolve_config(config: Option<&Path>) -> Result<Option<PathBuf>> {
    config
        .map(|path| {
            std::path::absolute(path)
                .with_context(|| format!("resolve config path {}", path.display()))
        })
        .transpose()
}

fn cmd_run(
    mut cfg: OrganizerConfig,
    paths: &OrganizerPaths,
    custom_config: bool,
    args: &RunArgs,
) -> Result<i32> {
    if let Some(delay) = args.delay_secs {
        cfg.delay_secs = delay;
    }
    if let Some(model) = &args.model {
        cfg.agent.model = model.clone();
    }
    if let Some(timeout) = args.timeout_secs {
        cfg.agent.timeout_secs = timeout;
    }
    if args.immediate {
        cfg.interrupt = InterruptMode::Immediate;
    }
    cfg.validate()?;

    let interrupt = Interrupt::new();
    listen_for_interrupts(&interrupt, cfg.interrupt)?;

    let prompts = PromptBuilder::new(PromptSettings {
        categories: cfg.categories.clone(),
        quarantine_dir: cfg.quarantine_dir.clone(),
        naming_pattern: cfg.naming_pattern.clone(),
        place_command: place_command(paths, custom_config)?,
    })?;
    let setup = BatchSetup {
        exclusions: paths.exclusions(&cfg),
        paths: paths.clone(),
        prompts,
        options: BatchOptions {
            run_id: new_run_id(),
            delay: Duration::from_secs(cfg.delay_secs),
            limit: args.limit,
            agent_timeout: Duration::from_secs(cfg.agent.timeout_secs),
            output_limit_bytes: cfg.agent.output_limit_bytes,
            transcripts: !args.no_transcripts,
        },
    };
    let classifier = AgentClassifier::from_config(&cfg.agent);
    let mut store = FileFailureStore::new(&paths.failure_log_path);

    println!(
        "organize: run {} in {} with `{}`",
        setup.options.run_id,
        paths.root.display(),
        classifier.command_line().join(" ")
    );
    let outcome = run_batch(&setup, &classifier, &mut store, &interrupt, print_event)?;
    print_summary(&outcome, paths, setup.options.transcripts);
    Ok(exit_codes::OK)
}

/// Command line the agent runs to relocate a file, pinned to this binary and root.
fn place_command(paths: &OrganizerPaths, custom_config: bool) -> Result<String> {
    let exe = std::env::current_exe().context("locate organizer binary")?;
    let mut command = format!(
        "{} place --dir {}",
        shell_quote(&exe.to_string_lossy()),
        shell_quote(&paths.root.to_string_lossy())
    );
    if custom_config {
        command.push_str(" --config ");
        command.push_str(&shell_quote(&paths.config_path.to_string_lossy()));
    }
    Ok(command)
}

fn print_event(event: &FileEvent<'_>) {
    let prefix = format!("organize: [{}/{}] {}", event.index, event.total, event.name);
    match (event.state, event.outcome) {
        (FileState::Processing, _) => {
            print!("{prefix} ...");
            let _ = std::io::stdout().flush();
        }
        (_, Some(outcome)) => println!("\r{prefix} -> {}", outcome.label()),
        (_, None) => println!(),
    }
}

fn print_summary(outcome: &BatchOutcome, paths: &OrganizerPaths, transcripts: bool) {
    println!(
        "organize: processed {} (moved {}, quarantined {}, failed {}, gone {})",
        outcome.processed, outcome.moved, outcome.quarantined, outcome.failed, outcome.vanished
    );
    if !outcome.skipped.is_empty() {
        println!(
            "organize: skipped {} file(s) listed in {}",
            outcome.skipped.len(),
            paths.failure_log_path.display()
        );
    }
    println!(
        "organize: {} eligible file(s) remain in {}",
        outcome.remaining.len(),
        paths.root.display()
    );
    for line in remaining_listing(&outcome.remaining, REMAINING_SHOWN) {
        println!("organize:   {line}");
    }
    if transcripts {
        println!(
            "organize: transcripts in {}",
            paths
                .state_dir
                .join("runs")
                .join(&outcome.run_id)
                .display()
        );
    }
    if outcome.stop == BatchStop::Interrupted {
        println!("organize: interrupted; run `organizer run` again to resume");
    }
}

/// Most remaining names printed in the summary; `organizer queue` lists all.
const REMAINING_SHOWN: usize = 20;

fn remaining_listing(remaining: &[String], shown: usize) -> Vec<String> {
    let mut lines: Vec<String> = remaining.iter().take(shown).cloned().collect();
    if remaining.len() > shown {
        lines.push(format!(
            "... and {} more (see `organizer queue`)",
            remaining.len() - shown
        ));
    }
    lines
}

fn cmd_queue(cfg: &OrganizerConfig, paths: &OrganizerPaths) -> Result<i32> {
    let store = FileFailureStore::new(&paths.failure_log_path);
    let queue = load_work_queue(paths, &paths.exclusions(cfg), &store)?;
    for candidate in &queue.files {
        println!("{}", candidate.name);
    }
    for candidate in &queue.skipped {
        println!("skip: {}", candidate.name);
    }
    Ok(exit_codes::OK)
}

fn cmd_failures(paths: &OrganizerPaths) -> Result<i32> {
    let store = FileFailureStore::new(&paths.failure_log_path);
    for record in store.records()? {
        if record.reason.is_empty() {
            println!("{}", record.filename);
        } else {
            println!("{}: {}", record.filename, record.reason);
        }
    }
    Ok(exit_codes::OK)
}

fn cmd_place(cfg: &OrganizerConfig, paths: &OrganizerPaths, args: PlaceArgs) -> Result<i32> {
    let destination = match args.category {
        Some(category) if !args.quarantine => Destination::Category(category),
        _ => Destination::Quarantine,
    };
    let placed = place_file(
        &PlaceRequest {
            root: paths.root.clone(),
            file: args.file,
            destination,
            new_name: args.name,
        },
        cfg,
    )?;
    println!("{}", placed.display());
    Ok(exit_codes::OK)
}
