//! Configuration loading and parsing

use anyhow::{Context, Result};
use dpm_log_decoder::history::DEFAULT_MAX_ENTRIES;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PDDF_PATH: &str = "/usr/share/sonic/platform/pddf/pd-plugin.json";
pub const DEFAULT_HISTORY_DIR: &str = "/host/reboot-cause/platform/dpm";

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// PDDF plugin document with the `DPM` section
    #[serde(default = "default_pddf_path")]
    pub pddf_path: PathBuf,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_dir")]
    pub dir: PathBuf,
    /// Snapshots kept before the oldest is removed
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pddf_path: default_pddf_path(),
            history: HistoryConfig::default(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            dir: default_history_dir(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_pddf_path() -> PathBuf {
    PathBuf::from(DEFAULT_PDDF_PATH)
}

fn default_history_dir() -> PathBuf {
    PathBuf::from(DEFAULT_HISTORY_DIR)
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    if config.history.max_entries == 0 {
        anyhow::bail!("history.max_entries must be at least 1 in {:?}", path);
    }

    Ok(config)
}
