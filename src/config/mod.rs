// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - [`model`] is the TOML data model, raw and validated.
//! - [`loader`] reads a file from disk or falls back to defaults.
//! - [`validate`] turns a raw file into a [`ConfigFile`].

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{
    CompilerCatalog, CompilerProfile, ConfigFile, RawConfigFile, RemoteSection, RunnerSection,
};
