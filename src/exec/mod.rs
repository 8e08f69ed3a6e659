// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`scope`] provides the cancellable [`Scope`] every run and background
//!   worker lives in.
//! - [`runner`] spawns a task's command with `tokio::process::Command`,
//!   wires stdout/stderr through output buffers and waits for exit. The
//!   [`Runner`] trait lets tests swap in a fake implementation.

pub mod runner;
pub mod scope;

pub use runner::{ProcessRunner, Runner, run_process};
pub use scope::Scope;
