// src/task/mod.rs

//! The supervision tree data model.
//!
//! A [`Task`] is one node of the tree: a command plus its scheduling,
//! formatting and inheritance metadata. Tasks are decoded once from
//! configuration, cloned at every tree-walk step (see [`resolve`]) and then
//! owned by exactly one scheduling loop.

pub mod resolve;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::output::Sink;

pub use resolve::join_dir;

/// One node of the supervision tree.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Task {
    /// Display name.
    pub name: String,

    /// Free-form description, display only.
    pub desc: String,

    /// Working directory, relative to the parent task's directory.
    pub dir: PathBuf,

    /// Environment overlay as `KEY=VALUE` entries. Later duplicates win.
    pub env: Vec<String>,

    /// Executable name or path. Empty means "no process for this node".
    pub cmd: String,

    /// Arguments passed to `cmd`.
    pub args: Vec<String>,

    /// Output template. Empty means output is suppressed.
    pub format: String,

    /// Label of the encoding the command writes its output in
    /// (e.g. `"utf-8"`, `"gbk"`). Empty means inherit.
    pub encoding: String,

    /// Seconds to wait before the first start.
    pub delay: f64,

    /// Seconds to wait between runs; negative runs the command exactly once.
    pub interval: f64,

    /// Child tasks.
    pub tasks: Vec<Task>,

    #[serde(skip)]
    pub out: Option<Sink>,

    #[serde(skip)]
    pub err: Option<Sink>,

    /// Merge-silence duration for output buffers; zero means inherit.
    #[serde(skip)]
    pub merge_threshold: Duration,

    /// Flush period for output buffers; zero means inherit.
    #[serde(skip)]
    pub flush_timeout: Duration,
}

impl Task {
    /// Task running `cmd` with `args`, everything else defaulted.
    pub fn new(cmd: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            cmd: cmd.into(),
            args: args.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// A node without a command and without children never does anything.
    pub fn is_inert(&self) -> bool {
        self.cmd.is_empty() && self.tasks.is_empty()
    }

    /// Whether the command should run exactly once.
    pub fn runs_once(&self) -> bool {
        self.interval < 0.0
    }

    /// Pre-start delay as a duration. Non-positive means "start immediately".
    pub fn delay_duration(&self) -> Option<Duration> {
        seconds(self.delay)
    }

    /// Pause between runs, or `None` for run-once tasks.
    pub fn interval_duration(&self) -> Option<Duration> {
        if self.runs_once() {
            None
        } else {
            Some(seconds(self.interval).unwrap_or(Duration::ZERO))
        }
    }

    /// The environment overlay as `(key, value)` pairs in declaration order.
    ///
    /// Entries without `=` are skipped; config validation rejects them.
    pub fn env_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.env
            .iter()
            .filter_map(|entry| entry.split_once('='))
            .filter(|(key, _)| !key.is_empty())
    }

    /// Label used in logs: the name if set, else the command.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.cmd
        } else {
            &self.name
        }
    }

    /// `cmd` followed by its arguments, for display.
    pub fn command_line(&self) -> String {
        std::iter::once(self.cmd.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("dir", &self.dir)
            .field("env", &self.env)
            .field("cmd", &self.cmd)
            .field("args", &self.args)
            .field("format", &self.format)
            .field("encoding", &self.encoding)
            .field("delay", &self.delay)
            .field("interval", &self.interval)
            .field("tasks", &self.tasks)
            .field("out", &self.out.is_some())
            .field("err", &self.err.is_some())
            .finish_non_exhaustive()
    }
}

/// Convert fractional seconds from config into a duration.
///
/// Returns `None` for zero, negative or non-finite values.
pub(crate) fn seconds(secs: f64) -> Option<Duration> {
    if secs > 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_task_is_inert() {
        assert!(Task::default().is_inert());
        assert!(!Task::new("echo", ["hi"]).is_inert());

        let parent = Task {
            tasks: vec![Task::new("echo", ["hi"])],
            ..Task::default()
        };
        assert!(!parent.is_inert());
    }

    #[test]
    fn negative_interval_means_run_once() {
        let task = Task {
            interval: -1.0,
            ..Task::default()
        };
        assert!(task.runs_once());
        assert_eq!(task.interval_duration(), None);

        let task = Task {
            interval: 0.25,
            ..Task::default()
        };
        assert_eq!(task.interval_duration(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn env_pairs_split_on_first_equals() {
        let task = Task {
            env: vec![
                "A=1".into(),
                "FORMAT={name}={value}".into(),
                "broken".into(),
                "=nokey".into(),
            ],
            ..Task::default()
        };
        let pairs: Vec<_> = task.env_pairs().collect();
        assert_eq!(pairs, vec![("A", "1"), ("FORMAT", "{name}={value}")]);
    }

    #[test]
    fn deserializes_from_toml_with_defaults() {
        let task: Task = toml::from_str(
            r#"
name = "py"
cmd = "python"
args = ["-u", "main.py"]
interval = 2.5

[[tasks]]
cmd = "echo"
"#,
        )
        .unwrap();

        assert_eq!(task.label(), "py");
        assert_eq!(task.command_line(), "python -u main.py");
        assert_eq!(task.tasks.len(), 1);
        assert_eq!(task.tasks[0].label(), "echo");
        assert_eq!(task.tasks[0].interval, 0.0);
        assert!(task.out.is_none());
    }
}
