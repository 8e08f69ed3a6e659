// src/exec/runner.rs

//! Single execution of a task's command.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::{KeepaliveError, Result};
use crate::output::{Emitter, OutputBuffer, OutputPlan};
use crate::task::Task;

use super::Scope;

/// Trait abstracting how one run of a task is executed.
///
/// The retry scheduler drives a `Runner`; production code uses
/// [`ProcessRunner`], tests can provide an implementation that doesn't
/// spawn real processes.
pub trait Runner: Send + Sync {
    fn run<'a>(
        &'a self,
        task: &'a Task,
        output: &'a OutputPlan,
        scope: &'a Scope,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Runs the task's command as an OS process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl Runner for ProcessRunner {
    fn run<'a>(
        &'a self,
        task: &'a Task,
        output: &'a OutputPlan,
        scope: &'a Scope,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(run_process(task, output, scope))
    }
}

/// Spawn `task.cmd`, pipe its output through two buffers and wait for it.
///
/// - Start failures return [`KeepaliveError::Spawn`] before any output
///   stream is engaged.
/// - A non-zero exit returns [`KeepaliveError::Exited`].
/// - Cancellation of `scope` kills the process and returns
///   [`KeepaliveError::Cancelled`].
///
/// In every case where the process started, both buffers are closed and
/// given one shared `2 × flush_timeout` window to flush before this returns.
pub async fn run_process(task: &Task, output: &OutputPlan, scope: &Scope) -> Result<()> {
    let mut cmd = Command::new(&task.cmd);
    cmd.args(&task.args)
        .stdin(Stdio::null())
        .stdout(stdio_for(&output.out))
        .stderr(stdio_for(&output.err))
        .kill_on_drop(true);
    if !task.dir.as_os_str().is_empty() {
        cmd.current_dir(&task.dir);
    }
    for (key, value) in task.env_pairs() {
        cmd.env(key, value);
    }

    debug!(task = %task.label(), cmd = %task.command_line(), dir = %task.dir.display(), "starting process");

    let mut child = cmd.spawn().map_err(|source| KeepaliveError::Spawn {
        cmd: task.cmd.clone(),
        source,
    })?;

    let out_buffer = child.stdout.take().map(|stdout| {
        let buffer = OutputBuffer::spawn(output.out.clone(), output.timing, scope);
        buffer.pipe_from(stdout);
        buffer
    });
    let err_buffer = child.stderr.take().map(|stderr| {
        let buffer = OutputBuffer::spawn(output.err.clone(), output.timing, scope);
        buffer.pipe_from(stderr);
        buffer
    });

    info!(task = %task.label(), pid = ?child.id(), "process started");

    let result = tokio::select! {
        status = child.wait() => status.map_err(KeepaliveError::from),
        () = scope.cancelled() => {
            info!(task = %task.label(), "cancellation requested; killing process");
            if let Err(e) = child.kill().await {
                warn!(task = %task.label(), error = %e, "failed to kill process on cancellation");
            }
            Err(KeepaliveError::Cancelled { cmd: task.cmd.clone() })
        }
    };

    // Both streams share one grace window.
    tokio::join!(close_buffer(out_buffer), close_buffer(err_buffer));

    let status = result?;
    info!(
        task = %task.label(),
        exit_code = ?status.code(),
        success = status.success(),
        "process exited"
    );

    if status.success() {
        Ok(())
    } else {
        Err(KeepaliveError::Exited {
            cmd: task.cmd.clone(),
            status,
        })
    }
}

async fn close_buffer(buffer: Option<OutputBuffer>) {
    if let Some(buffer) = buffer {
        buffer.close().await;
    }
}

fn stdio_for(emitter: &Emitter) -> Stdio {
    if emitter.is_enabled() {
        Stdio::piped()
    } else {
        Stdio::null()
    }
}

impl Task {
    /// Run the command once and wait for it.
    pub async fn run(&self) -> Result<()> {
        self.run_with_scope(&Scope::new()).await
    }

    /// Run the command once under `scope`; cancelling the scope kills it.
    pub async fn run_with_scope(&self, scope: &Scope) -> Result<()> {
        let output = OutputPlan::compile(self)?;
        run_process(self, &output, scope).await
    }
}
