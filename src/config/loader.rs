// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use tracing::{debug, info};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Read and deserialize a config file without validating it.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Read, deserialize and validate a config file.
///
/// Interpreter and compiler sections are merged onto the built-in tables.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    info!(path = %path.as_ref().display(), "configuration loaded");
    Ok(config)
}

/// Load `explicit` if given. Otherwise load the default config file, or use
/// built-in defaults when it does not exist.
pub fn load_or_default(explicit: Option<&Path>) -> Result<ConfigFile> {
    if let Some(path) = explicit {
        return load_and_validate(path);
    }

    match default_config_path() {
        Some(path) if path.is_file() => load_and_validate(&path),
        other => {
            debug!(path = ?other, "no config file found; using defaults");
            Ok(ConfigFile::default())
        }
    }
}

/// `<config dir>/snipexec/config.toml`, e.g. `~/.config/snipexec/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|b| b.config_dir().join("snipexec").join("config.toml"))
}
