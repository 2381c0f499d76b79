use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSettings {
    /// Path to the adb executable; empty means "adb" on PATH.
    pub command_path: String,
    /// Timeout for short device commands (discovery, getprop, find).
    pub command_timeout_secs: u64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            command_path: String::new(),
            command_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorSettings {
    pub poll_interval_ms: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncSettings {
    pub progress_interval_ms: u64,
    /// Timeout for a single file pull; large files need more headroom than
    /// the short-command timeout.
    pub pull_timeout_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            progress_interval_ms: 500,
            pull_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub tool: ToolSettings,
    #[serde(default)]
    pub monitor: MonitorSettings,
    #[serde(default)]
    pub sync: SyncSettings,
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("PHOTOFERRY_CONFIG_PATH") {
        return PathBuf::from(path);
    }
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("photoferry").join("config.json")
}

pub fn load_config(trace_id: &str) -> Result<AppConfig, AppError> {
    load_config_from_path(&config_path(), trace_id)
}

pub fn save_config(config: &AppConfig, trace_id: &str) -> Result<(), AppError> {
    save_config_to_path(config, &config_path(), trace_id)
}

pub fn load_config_from_path(path: &Path, trace_id: &str) -> Result<AppConfig, AppError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let raw = fs::read_to_string(path)
        .map_err(|err| AppError::system(format!("Failed to read config: {err}"), trace_id))?;
    let config: AppConfig = serde_json::from_str(&raw)
        .map_err(|err| AppError::system(format!("Failed to parse config: {err}"), trace_id))?;
    Ok(validate_config(config))
}

pub fn save_config_to_path(
    config: &AppConfig,
    path: &Path,
    trace_id: &str,
) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let payload = serde_json::to_string_pretty(config)
        .map_err(|err| AppError::system(format!("Failed to serialize config: {err}"), trace_id))?;
    fs::write(path, payload)
        .map_err(|err| AppError::system(format!("Failed to write config: {err}"), trace_id))?;
    Ok(())
}

/// Floors keep a hand-edited config from producing a busy-loop poller or a
/// zero-length timeout.
fn validate_config(mut config: AppConfig) -> AppConfig {
    if config.monitor.poll_interval_ms < 250 {
        config.monitor.poll_interval_ms = 2_000;
    }
    if config.sync.progress_interval_ms < 100 {
        config.sync.progress_interval_ms = 500;
    }
    if config.tool.command_timeout_secs == 0 {
        config.tool.command_timeout_secs = 10;
    }
    if config.sync.pull_timeout_secs == 0 {
        config.sync.pull_timeout_secs = 300;
    }
    config
}

pub fn normalize_config_for_save(mut config: AppConfig) -> AppConfig {
    config.tool.command_path = config.tool.command_path.trim().to_string();
    validate_config(config)
}
