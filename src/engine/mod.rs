// src/engine/mod.rs

//! Supervision engine.
//!
//! - [`scheduler`] holds the per-task retry state machine (pure core) and
//!   the async loop driving it.
//! - [`walker`] resolves the task tree and launches one scheduler per
//!   runnable node, all concurrently.

pub mod scheduler;
pub mod walker;

pub use scheduler::{RetryEvent, RetryPolicy, RetryState, drive};
pub use walker::{run_tasks_with, supervise_with};
