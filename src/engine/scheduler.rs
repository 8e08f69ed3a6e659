// src/engine/scheduler.rs

//! Per-task retry scheduler.
//!
//! The state machine itself ([`RetryPolicy::next`]) is pure and synchronous;
//! [`drive`] is the async shell that performs the sleeps and runs the
//! transitions ask for.
//!
//! ```text
//! Starting ──▶ Running ──▶ Waiting ──▶ Running ──▶ …
//!                 │
//!                 └──(interval < 0)──▶ Stopped
//! ```
//!
//! Cancellation observed in any state leads straight to `Stopped`.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::{ProcessRunner, Runner, Scope};
use crate::output::OutputPlan;
use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Waiting out the initial delay.
    Starting,
    /// Executing one run.
    Running,
    /// Sleeping between runs.
    Waiting,
    Stopped,
}

/// What ended the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryEvent {
    /// A sleep (or an absent sleep) completed.
    Elapsed,
    /// A run finished, successfully or not.
    RunFinished,
    /// The scope was cancelled.
    Cancelled,
}

/// Timing policy of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delay: Option<Duration>,
    /// `None` means run once.
    pub interval: Option<Duration>,
}

impl RetryPolicy {
    pub fn from_task(task: &Task) -> Self {
        Self {
            delay: task.delay_duration(),
            interval: task.interval_duration(),
        }
    }

    /// Transition function of the retry state machine.
    pub fn next(&self, state: RetryState, event: RetryEvent) -> RetryState {
        match (state, event) {
            (_, RetryEvent::Cancelled) | (RetryState::Stopped, _) => RetryState::Stopped,
            (RetryState::Starting, _) | (RetryState::Waiting, _) => RetryState::Running,
            (RetryState::Running, _) => {
                if self.interval.is_some() {
                    RetryState::Waiting
                } else {
                    RetryState::Stopped
                }
            }
        }
    }
}

/// Run `task` through `runner` according to its delay/interval until it
/// stops or `scope` is cancelled. Returns the number of runs started.
///
/// The output template is compiled once, up front; an error here means the
/// task's configuration is broken and no run was attempted. Errors from
/// individual runs are emitted to the task's error sink and never end the
/// loop.
pub async fn drive<R>(task: &Task, runner: &R, scope: &Scope) -> Result<u64>
where
    R: Runner + ?Sized,
{
    let output = OutputPlan::compile(task)?;
    let policy = RetryPolicy::from_task(task);

    let mut state = RetryState::Starting;
    let mut runs: u64 = 0;
    debug!(task = %task.label(), ?policy, "retry scheduler started");

    loop {
        let event = match state {
            RetryState::Starting => match policy.delay {
                Some(delay) => sleep_event(scope, delay).await,
                None => RetryEvent::Elapsed,
            },
            RetryState::Running => {
                if scope.is_cancelled() {
                    RetryEvent::Cancelled
                } else {
                    runs += 1;
                    if let Err(e) = runner.run(task, &output, scope).await {
                        warn!(task = %task.label(), run = runs, error = %e, "run failed");
                        output.err.emit_text(&e.to_string());
                    }
                    RetryEvent::RunFinished
                }
            }
            RetryState::Waiting => {
                sleep_event(scope, policy.interval.unwrap_or_default()).await
            }
            RetryState::Stopped => break,
        };
        state = policy.next(state, event);
    }

    info!(task = %task.label(), runs, "retry scheduler stopped");
    Ok(runs)
}

async fn sleep_event(scope: &Scope, duration: Duration) -> RetryEvent {
    if scope.sleep(duration).await {
        RetryEvent::Elapsed
    } else {
        RetryEvent::Cancelled
    }
}

impl Task {
    /// Keep the task's command running per its delay/interval until `scope`
    /// is cancelled (or after one run when `interval` is negative).
    pub async fn run_forever(&self, scope: &Scope) -> Result<()> {
        drive(self, &ProcessRunner, scope).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use RetryEvent::*;
    use RetryState::*;

    fn repeating() -> RetryPolicy {
        RetryPolicy {
            delay: None,
            interval: Some(Duration::from_secs(1)),
        }
    }

    fn once() -> RetryPolicy {
        RetryPolicy {
            delay: Some(Duration::from_millis(500)),
            interval: None,
        }
    }

    #[test]
    fn repeating_policy_cycles_between_running_and_waiting() {
        let p = repeating();
        assert_eq!(p.next(Starting, Elapsed), Running);
        assert_eq!(p.next(Running, RunFinished), Waiting);
        assert_eq!(p.next(Waiting, Elapsed), Running);
    }

    #[test]
    fn run_once_policy_stops_after_first_run() {
        let p = once();
        assert_eq!(p.next(Starting, Elapsed), Running);
        assert_eq!(p.next(Running, RunFinished), Stopped);
    }

    #[test]
    fn cancellation_stops_from_every_state() {
        for p in [repeating(), once()] {
            for state in [Starting, Running, Waiting, Stopped] {
                assert_eq!(p.next(state, Cancelled), Stopped);
            }
            assert_eq!(p.next(Stopped, Elapsed), Stopped);
        }
    }

    #[test]
    fn policy_from_task_fields() {
        let task = Task {
            delay: 0.5,
            interval: -1.0,
            ..Task::default()
        };
        assert_eq!(RetryPolicy::from_task(&task), once());

        let task = Task {
            delay: 0.0,
            interval: 1.0,
            ..Task::default()
        };
        assert_eq!(RetryPolicy::from_task(&task), repeating());
    }
}
