#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use keepalive::output::Sink;
use keepalive::task::Task;

/// Builder for `Task` to simplify test setup.
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    /// A task running `cmd`.
    pub fn new(cmd: &str) -> Self {
        Self {
            task: Task {
                cmd: cmd.to_string(),
                ..Task::default()
            },
        }
    }

    /// A task without a command, only grouping children.
    pub fn group() -> Self {
        Self {
            task: Task::default(),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.task.name = name.to_string();
        self
    }

    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.task.dir = dir.into();
        self
    }

    pub fn env(mut self, entry: &str) -> Self {
        self.task.env.push(entry.to_string());
        self
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.task.args.push(arg.to_string());
        self
    }

    pub fn format(mut self, format: &str) -> Self {
        self.task.format = format.to_string();
        self
    }

    pub fn delay(mut self, seconds: f64) -> Self {
        self.task.delay = seconds;
        self
    }

    pub fn interval(mut self, seconds: f64) -> Self {
        self.task.interval = seconds;
        self
    }

    pub fn once(self) -> Self {
        self.interval(-1.0)
    }

    pub fn flush_timeout(mut self, flush_timeout: Duration) -> Self {
        self.task.flush_timeout = flush_timeout;
        self
    }

    pub fn out(mut self, sink: Sink) -> Self {
        self.task.out = Some(sink);
        self
    }

    pub fn err(mut self, sink: Sink) -> Self {
        self.task.err = Some(sink);
        self
    }

    pub fn child(mut self, child: Task) -> Self {
        self.task.tasks.push(child);
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}
