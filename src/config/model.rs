// src/config/model.rs

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::output::Sink;
use crate::task::{Task, join_dir, seconds};

/// Template used when the root task does not set `format`.
///
/// Children inherit it; since actions are expanded against each task's own
/// fields, every task gets its own header line.
pub const DEFAULT_FORMAT: &str = "{{dir}}> {{cmd}} {{args}}{{endl}}%s{{endl}}";

/// Configuration as read from a TOML file, before validation.
///
/// The root task's fields are top-level keys; buffer timings sit next to
/// them:
///
/// ```toml
/// merge_threshold = 0.1
/// flush_timeout = 1.0
/// env = ["PYTHONIOENCODING=utf-8"]
///
/// [[tasks]]
/// name = "hello"
/// cmd = "python"
/// args = ["-u", "-c", "print('Hello KeepAlive!')"]
/// delay = 0.5
/// interval = 2.5
/// ```
///
/// Times are fractional seconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawConfigFile {
    /// Merge-silence duration for output buffers; 0 selects the default.
    #[serde(default)]
    pub merge_threshold: f64,

    /// Flush period for output buffers; 0 selects the default.
    #[serde(default)]
    pub flush_timeout: f64,

    #[serde(flatten)]
    pub root: Task,
}

impl RawConfigFile {
    /// Config written out when the configured file does not exist yet.
    pub fn sample() -> Self {
        Self {
            merge_threshold: 0.1,
            flush_timeout: 1.0,
            root: Task {
                env: vec!["PYTHONIOENCODING=utf-8".into()],
                tasks: vec![Task {
                    name: "hello".into(),
                    env: vec!["LOGURU_FORMAT={name}.{function}:{line} | {message}".into()],
                    delay: 0.5,
                    interval: 2.5,
                    ..Task::new("python", ["-u", "-c", "print(\"Hello KeepAlive!\")"])
                }],
                ..Task::default()
            },
        }
    }
}

/// Validated configuration. Build one with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    root: Task,
    merge_threshold: Duration,
    flush_timeout: Duration,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            root: raw.root,
            merge_threshold: seconds(raw.merge_threshold).unwrap_or_default(),
            flush_timeout: seconds(raw.flush_timeout).unwrap_or_default(),
        }
    }

    /// The root task as configured, unresolved.
    pub fn root(&self) -> &Task {
        &self.root
    }

    pub fn merge_threshold(&self) -> Duration {
        self.merge_threshold
    }

    pub fn flush_timeout(&self) -> Duration {
        self.flush_timeout
    }

    /// Root task ready for the tree walker: directory anchored at
    /// `config_dir`, sinks attached, buffer timings and a default format
    /// filled in.
    pub fn root_task(&self, config_dir: &Path, out: Option<Sink>, err: Option<Sink>) -> Task {
        let mut root = self.root.clone();
        root.dir = join_dir(config_dir, &root.dir);
        root.out = out;
        root.err = err;
        root.merge_threshold = self.merge_threshold;
        root.flush_timeout = self.flush_timeout;
        if root.format.is_empty() {
            root.format = DEFAULT_FORMAT.to_string();
        }
        root
    }
}
