// src/engine/walker.rs

//! Tree walker: resolves inherited settings and launches a retry scheduler
//! per runnable node, recursing into children concurrently.
//!
//! Every branch gets its own child scope and its own resolved clone of the
//! task; nothing here waits for a branch to finish.

use std::sync::Arc;

use tracing::{debug, error};

use crate::exec::{ProcessRunner, Runner, Scope};
use crate::task::Task;

use super::scheduler::drive;

/// Launch schedulers for every runnable descendant of `parent`.
///
/// `parent` must already be resolved (directory and sinks set).
pub fn run_tasks_with(parent: &Task, runner: Arc<dyn Runner>, scope: &Scope) {
    for child in parent.resolved_children() {
        if child.is_inert() {
            debug!(task = %child.label(), "skipping inert task");
            continue;
        }

        let branch = scope.child();
        if !child.cmd.is_empty() {
            spawn_scheduler(child.clone(), Arc::clone(&runner), branch.clone());
        }
        if !child.tasks.is_empty() {
            let runner = Arc::clone(&runner);
            let walker_scope = branch.clone();
            branch.spawn(async move { run_tasks_with(&child, runner, &walker_scope) });
        }
    }
}

/// Like [`run_tasks_with`], but also schedules `root`'s own command.
pub fn supervise_with(root: &Task, runner: Arc<dyn Runner>, scope: &Scope) {
    if !root.cmd.is_empty() {
        spawn_scheduler(root.clone(), Arc::clone(&runner), scope.child());
    }
    run_tasks_with(root, runner, scope);
}

fn spawn_scheduler(task: Task, runner: Arc<dyn Runner>, scope: Scope) {
    let tracker = scope.clone();
    tracker.spawn(async move {
        if let Err(e) = drive(&task, &*runner, &scope).await {
            error!(task = %task.label(), error = %e, "invalid task output configuration; aborting");
            std::process::exit(1);
        }
    });
}

impl Task {
    /// Resolve each child against this task and start its scheduler and
    /// sub-walk concurrently. Returns immediately.
    pub fn run_tasks(&self, scope: &Scope) {
        run_tasks_with(self, Arc::new(ProcessRunner), scope);
    }

    /// Schedule this task's own command (if any) and walk its children.
    pub fn supervise(&self, scope: &Scope) {
        supervise_with(self, Arc::new(ProcessRunner), scope);
    }
}
