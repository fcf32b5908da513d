//! Cooperative interrupt handling for the batch loop.
//!
//! A background thread turns SIGINT into flags on a shared [`Interrupt`]. The
//! loop polls the flags between files, and the process runner polls the
//! "stop now" flag while an agent is running.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::core::types::InterruptMode;

const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// How far an interrupt has escalated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopLevel {
    /// Nothing requested.
    Running,
    /// Stop once the current file is done.
    AfterCurrent,
    /// Kill the running agent and stop.
    Now,
}

#[derive(Debug, Default)]
struct Flags {
    stop_requested: AtomicBool,
    stop_now: AtomicBool,
}

/// Shared stop flags. Cloning shares the same underlying state.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    flags: Arc<Flags>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop after the current file.
    pub fn request_stop(&self) {
        self.flags.stop_requested.store(true, Ordering::SeqCst);
    }

    /// Ask the loop to stop and kill any running agent.
    pub fn request_stop_now(&self) {
        self.flags.stop_requested.store(true, Ordering::SeqCst);
        self.flags.stop_now.store(true, Ordering::SeqCst);
    }

    pub fn stop_requested(&self) -> bool {
        self.flags.stop_requested.load(Ordering::SeqCst)
    }

    pub fn stop_now(&self) -> bool {
        self.flags.stop_now.load(Ordering::SeqCst)
    }

    pub fn level(&self) -> StopLevel {
        if self.stop_now() {
            StopLevel::Now
        } else if self.stop_requested() {
            StopLevel::AfterCurrent
        } else {
            StopLevel::Running
        }
    }

    /// Apply one received signal under `mode` and return the new level.
    ///
    /// In `AfterCurrent` mode a second signal escalates to an immediate stop.
    pub fn escalate(&self, mode: InterruptMode) -> StopLevel {
        match (mode, self.level()) {
            (InterruptMode::Immediate, _) | (_, StopLevel::AfterCurrent | StopLevel::Now) => {
                self.request_stop_now();
            }
            (InterruptMode::AfterCurrent, StopLevel::Running) => self.request_stop(),
        }
        self.level()
    }

    /// Sleep for `duration`, returning early once a stop is requested.
    ///
    /// Returns `true` if the full duration elapsed.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.stop_requested() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}

/// Install a SIGINT listener that escalates `interrupt` according to `mode`.
///
/// The handler is registered before this returns; the listener thread lives
/// for the rest of the process.
pub fn listen_for_interrupts(interrupt: &Interrupt, mode: InterruptMode) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build signal runtime")?;

    #[cfg(unix)]
    let mut sigint = {
        use tokio::signal::unix::{SignalKind, signal};
        let _guard = runtime.enter();
        signal(SignalKind::interrupt()).context("install SIGINT handler")?
    };

    let interrupt = interrupt.clone();
    thread::Builder::new()
        .name("organizer-signals".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                loop {
                    #[cfg(unix)]
                    let received = sigint.recv().await.is_some();
                    #[cfg(not(unix))]
                    let received = tokio::signal::ctrl_c().await.is_ok();
                    if !received {
                        debug!("signal stream closed");
                        break;
                    }
                    match interrupt.escalate(mode) {
                        StopLevel::Now => {
                            info!(signal = "SIGINT", "stopping now");
                            eprintln!("\ninterrupt: stopping now");
                        }
                        StopLevel::AfterCurrent => {
                            info!(signal = "SIGINT", "stopping after current file");
                            eprintln!(
                                "\ninterrupt: finishing the current file (interrupt again to stop now)"
                            );
                        }
                        StopLevel::Running => {}
                    }
                }
            });
        })
        .context("spawn signal listener")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn after_current_escalates_on_second_signal() {
        let interrupt = Interrupt::new();
        assert_eq!(interrupt.level(), StopLevel::Running);
        assert_eq!(
            interrupt.escalate(InterruptMode::AfterCurrent),
            StopLevel::AfterCurrent
        );
        assert!(!interrupt.stop_now());
        assert_eq!(interrupt.escalate(InterruptMode::AfterCurrent), StopLevel::Now);
    }

    #[test]
    fn immediate_mode_stops_on_first_signal() {
        let interrupt = Interrupt::new();
        assert_eq!(interrupt.escalate(InterruptMode::Immediate), StopLevel::Now);
        assert!(interrupt.stop_requested());
    }

    #[test]
    fn clones_share_flags() {
        let interrupt = Interrupt::new();
        let clone = interrupt.clone();
        clone.request_stop();
        assert!(interrupt.stop_requested());
    }

    #[test]
    fn sleep_returns_early_when_stopped() {
        let interrupt = Interrupt::new();
        interrupt.request_stop();
        let start = Instant::now();
        assert!(!interrupt.sleep(Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_secs(1));

        let idle = Interrupt::new();
        assert!(idle.sleep(Duration::from_millis(10)));
    }
}
