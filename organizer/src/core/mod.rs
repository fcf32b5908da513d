//! Deterministic, pure logic shared by the organizer loop.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod eligibility;
pub mod naming;
pub mod queue;
pub mod record;
pub mod types;
