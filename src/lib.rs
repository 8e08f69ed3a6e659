// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod output;
pub mod task;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, write_sample_config};
use crate::exec::Scope;
use crate::output::BufferTiming;
use crate::task::Task;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (writing a sample config if none exists)
/// - root task resolution and output sinks
/// - the supervision tree
/// - Ctrl-C handling and graceful shutdown
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    if !config_path.exists() {
        write_sample_config(&config_path)
            .with_context(|| format!("writing sample config to {}", config_path.display()))?;
        bail!(
            "no config found; wrote a sample to {}, edit it and start again",
            config_path.display()
        );
    }

    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    let (out, err) = logging::output_sinks();
    let root = cfg.root_task(&config_root_dir(&config_path), Some(out), Some(err));

    if args.dry_run {
        print_dry_run(&root);
        return Ok(());
    }

    let scope = Scope::new();
    root.supervise(&scope);
    info!(tasks = count_runnable(&root), "supervising task tree");

    tokio::signal::ctrl_c()
        .await
        .context("listening for Ctrl+C")?;
    info!("shutdown requested; stopping tasks");

    // Buffers get up to twice the flush period to drain after their run ends.
    let grace = BufferTiming::new(cfg.merge_threshold(), cfg.flush_timeout()).grace();
    if tokio::time::timeout(grace + Duration::from_secs(1), scope.shutdown())
        .await
        .is_err()
    {
        warn!(remaining = scope.active_tasks(), "shutdown timed out");
    }

    info!("keepalive exiting");
    Ok(())
}

/// Directory that relative task directories are anchored at.
///
/// - If the config path has a non-empty parent (e.g. "deploy/Keepalive.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Keepalive.toml" (parent = ""),
///   we fall back to the current working directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn count_runnable(task: &Task) -> usize {
    usize::from(!task.cmd.is_empty()) + task.tasks.iter().map(count_runnable).sum::<usize>()
}

/// Print the resolved task tree without running anything.
fn print_dry_run(root: &Task) {
    println!("keepalive dry-run");
    print_task(root, 0);
}

fn print_task(task: &Task, depth: usize) {
    let indent = "  ".repeat(depth);
    let title = if task.name.is_empty() { "(unnamed)" } else { task.name.as_str() };
    println!("{indent}- {title}");
    if !task.desc.is_empty() {
        println!("{indent}    desc: {}", task.desc);
    }
    println!("{indent}    dir: {}", task.dir.display());
    if !task.cmd.is_empty() {
        println!("{indent}    cmd: {}", task.command_line());
        if task.runs_once() {
            println!("{indent}    runs once (delay {}s)", task.delay);
        } else {
            println!("{indent}    every {}s (delay {}s)", task.interval, task.delay);
        }
    }
    if !task.env.is_empty() {
        println!("{indent}    env: {:?}", task.env);
    }
    if !task.encoding.is_empty() {
        println!("{indent}    encoding: {}", task.encoding);
    }

    for child in task.resolved_children() {
        print_task(&child, depth + 1);
    }
}
