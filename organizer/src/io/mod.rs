//! I/O helpers for organizer commands.

pub mod classifier;
pub mod config;
pub mod failure_log;
pub mod init;
pub mod interrupt;
pub mod place;
pub mod process;
pub mod prompt;
pub mod scan;
pub mod transcript;
