// src/errors.rs

//! Crate-wide error type and result alias.

use std::process::ExitStatus;

use thiserror::Error;

use crate::output::template::TemplateError;

#[derive(Error, Debug)]
pub enum KeepaliveError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// The command could not be started (missing executable, bad working
    /// directory, permissions, ...).
    #[error("failed to start `{cmd}`: {source}")]
    Spawn {
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    /// The command ran and exited unsuccessfully.
    #[error("`{cmd}` exited unsuccessfully ({status})")]
    Exited { cmd: String, status: ExitStatus },

    /// The command was killed because its scope was cancelled.
    #[error("`{cmd}` was cancelled")]
    Cancelled { cmd: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, KeepaliveError>;
