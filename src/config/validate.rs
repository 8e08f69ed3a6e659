// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{KeepaliveError, Result};
use crate::output::{Normalizer, OutputPlan};
use crate::task::Task;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::KeepaliveError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_work(cfg)?;
    validate_buffer_timing(cfg)?;
    validate_task_tree(&cfg.root, "root")?;
    Ok(())
}

fn ensure_has_work(cfg: &RawConfigFile) -> Result<()> {
    if cfg.root.is_inert() {
        return Err(KeepaliveError::ConfigError(
            "config must set `cmd` or contain at least one [[tasks]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_buffer_timing(cfg: &RawConfigFile) -> Result<()> {
    for (key, value) in [
        ("merge_threshold", cfg.merge_threshold),
        ("flush_timeout", cfg.flush_timeout),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(KeepaliveError::ConfigError(format!(
                "`{key}` must be a non-negative number of seconds (got {value})"
            )));
        }
    }
    Ok(())
}

/// Validate `task` (already resolved against its parent) and, recursively,
/// its children, resolving them the same way the tree walker will.
fn validate_task_tree(task: &Task, path: &str) -> Result<()> {
    validate_task(task, path)?;

    for (index, child) in task.resolved_children().enumerate() {
        let child_path = if child.name.is_empty() {
            format!("{path}/#{index}")
        } else {
            format!("{path}/{}", child.name)
        };
        validate_task_tree(&child, &child_path)?;
    }
    Ok(())
}

fn validate_task(task: &Task, path: &str) -> Result<()> {
    for entry in &task.env {
        match entry.split_once('=') {
            Some((key, _)) if !key.is_empty() => {}
            _ => {
                return Err(KeepaliveError::ConfigError(format!(
                    "task '{path}': env entry '{entry}' must look like KEY=VALUE"
                )));
            }
        }
    }

    if !task.delay.is_finite() || task.delay < 0.0 {
        return Err(KeepaliveError::ConfigError(format!(
            "task '{path}': `delay` must be a non-negative number of seconds (got {})",
            task.delay
        )));
    }
    if !task.interval.is_finite() {
        return Err(KeepaliveError::ConfigError(format!(
            "task '{path}': `interval` must be a number of seconds (got {})",
            task.interval
        )));
    }

    Normalizer::from_label(&task.encoding)
        .map_err(|e| KeepaliveError::ConfigError(format!("task '{path}': {e}")))?;

    if !task.cmd.is_empty() {
        OutputPlan::compile(task).map_err(|e| {
            KeepaliveError::ConfigError(format!("task '{path}': invalid `format`: {e}"))
        })?;
    }

    Ok(())
}
