//! Stable exit codes for organizer CLI commands.

/// Command succeeded, including a run stopped early by an interrupt.
pub const OK: i32 = 0;
/// Command failed: unreadable failure log, invalid config, agent could not be
/// started, or any other error.
pub const INVALID: i32 = 1;
