//! Development-time tracing for debugging the organizer.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: Dev diagnostics via `RUST_LOG`, output to stderr.
//!   Not persisted, not part of the organizer's product output.
//!
//! - **Run transcripts (`io/transcript`)**: Agent output and per-file outcomes
//!   in `.organizer/runs/`. Unaffected by `RUST_LOG`.
//!
//! - **Failure log (`io/failure_log`)**: The durable skip list. Always written.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing subscriber for development logging.
///
/// Reads `RUST_LOG` env var. Defaults to `warn` if unset.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=organizer=debug organizer run --dir ~/Downloads
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
