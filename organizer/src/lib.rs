//! Resumable batch organizer that hands each loose file in a directory to an
//! external AI agent, one file at a time.
//!
//! The crate keeps the same split as any loop runner:
//!
//! - **[`core`]**: Pure, deterministic logic (eligibility, queue order, failure
//!   log lines, outcome mapping). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (directory scans, the failure log,
//!   agent processes, signals, file placement). Isolated behind traits so the
//!   batch loop can be driven by scripted classifiers in tests.
//!
//! Orchestration modules ([`queue`], [`organize`]) coordinate core logic with
//! I/O to implement CLI commands.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod organize;
pub mod queue;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
