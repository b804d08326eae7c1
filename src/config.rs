// src/config.rs

//! Configuration loading utilities.
//!
//! The spider reads `config.toml` from its storage directory, next to the
//! catalog and the stored torrents.

use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::Config;

pub const CONFIG_FILE: &str = "config.toml";

/// Path of the configuration file inside a storage directory.
pub fn config_path(storage_dir: &Path) -> PathBuf {
    storage_dir.join(CONFIG_FILE)
}

/// Load configuration from a storage directory.
///
/// Falls back to defaults if the file is missing or unreadable.
pub fn load_config(storage_dir: &Path) -> Config {
    Config::load_or_default(config_path(storage_dir))
}

/// Load configuration strictly and validate it.
///
/// Unlike [`load_config`], a missing or malformed file is an error.
pub fn load_validated(storage_dir: &Path) -> Result<Config> {
    let path = config_path(storage_dir);
    let config = Config::load(&path)
        .map_err(|e| AppError::config(format!("Failed to load {}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}
