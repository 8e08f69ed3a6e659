// src/config/mod.rs

//! Configuration loading and validation for keepalive.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate the task tree before anything runs (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, write_sample_config};
pub use model::{ConfigFile, DEFAULT_FORMAT, RawConfigFile};
