pub mod config;
pub mod kv;

use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::PathBuf;

pub use config::{BillingConfig, Config, ConfigStorage, GeneralConfig, TomlConfigStorage};
pub use kv::{FileStore, KeyValueStore, MemoryStore};

/// Ensure XDG data and config directories exist
/// Returns (data_dir, config_dir)
///
/// XDG Base Directory Specification:
/// - Data: $XDG_DATA_HOME/parkr (default: ~/.local/share/parkr)
/// - Config: $XDG_CONFIG_HOME/parkr (default: ~/.config/parkr)
pub fn ensure_directories() -> Result<(PathBuf, PathBuf)> {
    let home = env::var("HOME").context("HOME environment variable not set")?;
    let home_path = PathBuf::from(home);

    let data_dir = match env::var("XDG_DATA_HOME") {
        Ok(xdg_data) if !xdg_data.is_empty() => PathBuf::from(xdg_data).join("parkr"),
        _ => home_path.join(".local/share/parkr"),
    };

    let config_dir = match env::var("XDG_CONFIG_HOME") {
        Ok(xdg_config) if !xdg_config.is_empty() => PathBuf::from(xdg_config).join("parkr"),
        _ => home_path.join(".config/parkr"),
    };

    fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create config directory {:?}", config_dir))?;

    log::debug!("Data directory: {:?}", data_dir);
    log::debug!("Config directory: {:?}", config_dir);

    Ok((data_dir, config_dir))
}
