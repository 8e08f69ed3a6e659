// src/logging.rs

//! Logging for `keepalive`: the supervisor's own diagnostics, and the
//! [`Sink`]s through which supervised task output reaches the same
//! subscriber.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `KEEPALIVE_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Task output never calls `tracing` directly. Each task's emissions are
//! formatted by its output pipeline and handed to a sink; [`output_sinks`]
//! returns the default pair, which turn emissions into `info` and `error`
//! records under the `keepalive::task` target. Everything ends up on STDERR.

use anyhow::Result;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;
use crate::output::Sink;

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let level = match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None => std::env::var("KEEPALIVE_LOG")
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(tracing::Level::INFO),
    };

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Sinks that forward task emissions into the tracing subscriber.
///
/// Regular output becomes `info` records, error output `error` records, both
/// under the `keepalive::task` target.
pub fn output_sinks() -> (Sink, Sink) {
    let out = Sink::from_fn(|bytes| {
        let text = String::from_utf8_lossy(bytes);
        tracing::info!(target: "keepalive::task", "{}", text.trim_end());
    });
    let err = Sink::from_fn(|bytes| {
        let text = String::from_utf8_lossy(bytes);
        tracing::error!(target: "keepalive::task", "{}", text.trim_end());
    });
    (out, err)
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_level_names_leniently() {
        assert_eq!(parse_level_str(" Debug "), Some(tracing::Level::DEBUG));
        assert_eq!(parse_level_str("warning"), Some(tracing::Level::WARN));
        assert_eq!(parse_level_str("loud"), None);
    }
}
