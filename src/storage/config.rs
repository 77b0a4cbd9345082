use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::models::BillingPolicy;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub billing: BillingConfig,
}

/// General configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Write logs to a rotating file in the data directory
    #[serde(default = "default_log_to_file")]
    pub log_to_file: bool,

    /// Minimum level written to the log file
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Minimum level echoed to stderr
    #[serde(default = "default_console_level")]
    pub console_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            log_to_file: default_log_to_file(),
            log_level: default_log_level(),
            console_level: default_console_level(),
        }
    }
}

/// Rate card settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Length of one billing block in seconds
    #[serde(default = "default_block_seconds")]
    pub block_seconds: u64,

    /// Fee charged per started block, in the smallest currency unit
    #[serde(default = "default_block_fee")]
    pub block_fee: u64,

    /// Symbol printed in front of amounts
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for BillingConfig {
    fn default() -> Self {
        BillingConfig {
            block_seconds: default_block_seconds(),
            block_fee: default_block_fee(),
            currency: default_currency(),
        }
    }
}

impl BillingConfig {
    /// Rate card for the registry; a zero-length block falls back to the default
    pub fn policy(&self) -> BillingPolicy {
        BillingPolicy::new(self.block_seconds, self.block_fee).unwrap_or_else(|| {
            log::warn!(
                "billing.block_seconds must be positive, using default of {}s",
                BillingPolicy::DEFAULT_BLOCK_SECONDS
            );
            BillingPolicy::new(BillingPolicy::DEFAULT_BLOCK_SECONDS, self.block_fee)
                .unwrap_or_default()
        })
    }
}

// Default value functions for serde
fn default_log_to_file() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_console_level() -> String {
    "warn".to_string()
}

fn default_block_seconds() -> u64 {
    BillingPolicy::DEFAULT_BLOCK_SECONDS
}

fn default_block_fee() -> u64 {
    BillingPolicy::DEFAULT_BLOCK_FEE
}

fn default_currency() -> String {
    "₡".to_string()
}

/// Trait for configuration storage
pub trait ConfigStorage: Send + Sync {
    /// Load configuration from file
    fn load(&self) -> Result<Config>;

    /// Save configuration to file
    fn save(&self, config: &Config) -> Result<()>;

    /// Get the config file path
    fn path(&self) -> &PathBuf;

    /// Create default configuration file if it doesn't exist
    fn create_default(&self) -> Result<()>;
}

/// TOML-based implementation of ConfigStorage
pub struct TomlConfigStorage {
    path: PathBuf,
}

impl TomlConfigStorage {
    pub fn new(path: PathBuf) -> Self {
        TomlConfigStorage { path }
    }
}

impl ConfigStorage for TomlConfigStorage {
    fn load(&self) -> Result<Config> {
        // If file doesn't exist, create default and return it
        if !self.path.exists() {
            log::info!(
                "Config file not found at {:?}, creating default configuration",
                self.path
            );
            self.create_default()?;
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read config from {:?}", self.path))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {:?}", self.path))?;

        log::info!("Loaded configuration from {:?}", self.path);
        log::debug!(
            "Config: block_seconds={}, block_fee={}",
            config.billing.block_seconds,
            config.billing.block_fee
        );

        Ok(config)
    }

    fn save(&self, config: &Config) -> Result<()> {
        let toml_str = toml::to_string_pretty(config)
            .with_context(|| "Failed to serialize configuration")?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        fs::write(&self.path, toml_str)
            .with_context(|| format!("Failed to write config to {:?}", self.path))?;

        log::debug!("Saved configuration to {:?}", self.path);

        Ok(())
    }

    fn path(&self) -> &PathBuf {
        &self.path
    }

    fn create_default(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        // Use the example config compiled into the binary
        let example_config = include_str!("../../parkr.toml.example");

        fs::write(&self.path, example_config)
            .with_context(|| format!("Failed to create default config at {:?}", self.path))?;

        log::info!("Created default configuration at {:?}", self.path);

        Ok(())
    }
}
