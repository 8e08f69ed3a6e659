use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use tokio::time::Instant;

use keepalive::errors::{KeepaliveError, Result};
use keepalive::exec::{Runner, Scope};
use keepalive::output::OutputPlan;
use keepalive::task::Task;

/// A fake runner that:
/// - records which tasks were "run" and when (on the Tokio clock)
/// - pretends each run takes `run_time`, honouring cancellation
/// - succeeds, or fails every run when built with [`FakeRunner::failing`].
#[derive(Clone, Default)]
pub struct FakeRunner {
    starts: Arc<Mutex<Vec<(String, Instant)>>>,
    run_time: Duration,
    fail: bool,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_run_time(mut self, run_time: Duration) -> Self {
        self.run_time = run_time;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// `(task label, start instant)` for every run, in start order.
    pub fn starts(&self) -> Vec<(String, Instant)> {
        self.starts.lock().unwrap().clone()
    }

    pub fn start_count(&self) -> usize {
        self.starts.lock().unwrap().len()
    }

    /// Start instants of runs of the task labelled `label`.
    pub fn starts_of(&self, label: &str) -> Vec<Instant> {
        self.starts()
            .into_iter()
            .filter(|(name, _)| name == label)
            .map(|(_, at)| at)
            .collect()
    }
}

impl Runner for FakeRunner {
    fn run<'a>(
        &'a self,
        task: &'a Task,
        _output: &'a OutputPlan,
        scope: &'a Scope,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            {
                let mut guard = self.starts.lock().unwrap();
                guard.push((task.label().to_string(), Instant::now()));
            }

            if !scope.sleep(self.run_time).await {
                return Err(KeepaliveError::Cancelled {
                    cmd: task.cmd.clone(),
                });
            }

            if self.fail {
                Err(KeepaliveError::Other(anyhow!("simulated failure of {}", task.label())))
            } else {
                Ok(())
            }
        })
    }
}
