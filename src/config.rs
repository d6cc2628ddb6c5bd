//! Persisted run settings.
//!
//! Stored as pretty JSON in the platform config directory:
//!   macOS:   ~/Library/Application Support/super-capt/config.json
//!   Linux:   ~/.config/super-capt/config.json
//!   Windows: %APPDATA%/super-capt/config.json

use crate::keyboard::PageKey;
use crate::pipeline::PipelineOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const MAX_PAGES: u32 = 9999;
pub const MIN_SETTLE_DELAY_MS: u64 = 1000;

/// Application configuration, collected once before a run starts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub total_pages: u32,
    pub page_key: PageKey,
    pub output_root: PathBuf,
    /// Wait after each page-advance keystroke.
    pub settle_delay_ms: u64,
    /// Wait before the first capture so the operator can focus the viewer.
    pub countdown_secs: u64,
    /// Resolution recorded for every PDF page.
    pub dpi: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            total_pages: 200,
            page_key: PageKey::PageDown,
            output_root: default_output_root(),
            settle_delay_ms: 1500,
            countdown_secs: 3,
            dpi: 150.0,
        }
    }
}

impl AppConfig {
    /// Checks bounds and makes sure the output root is a writable directory,
    /// creating it when missing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_PAGES).contains(&self.total_pages) {
            return Err(ConfigError::PageCountOutOfRange(self.total_pages));
        }
        if self.settle_delay_ms < MIN_SETTLE_DELAY_MS {
            return Err(ConfigError::SettleDelayTooShort(self.settle_delay_ms));
        }
        if !(self.dpi.is_finite() && self.dpi > 0.0) {
            return Err(ConfigError::InvalidDpi(self.dpi));
        }
        ensure_writable_dir(&self.output_root)
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            countdown: Duration::from_secs(self.countdown_secs),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            dpi: self.dpi,
            ..PipelineOptions::default()
        }
    }
}

/// Desktop when the platform has one, otherwise the home directory.
pub fn default_output_root() -> PathBuf {
    dirs::desktop_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("super-capt")
        .join("config.json")
}

/// Load configuration from the default location.
pub fn load_config() -> AppConfig {
    load_config_from(&config_path())
}

/// Load configuration from `path`, falling back to defaults when the file is
/// missing or unparsable.
pub fn load_config_from(path: &Path) -> AppConfig {
    if !path.exists() {
        return AppConfig::default();
    }

    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(config) => return config,
            Err(e) => log::warn!("[config] Failed to parse {}: {}", path.display(), e),
        },
        Err(e) => log::warn!("[config] Failed to read {}: {}", path.display(), e),
    }

    AppConfig::default()
}

/// Save configuration to the default location.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(config, &config_path())
}

pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let content = serde_json::to_string_pretty(config)?;
    fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    log::info!("[config] Saved to {}", path.display());
    Ok(())
}

fn ensure_writable_dir(dir: &Path) -> Result<(), ConfigError> {
    if dir.exists() && !dir.is_dir() {
        return Err(ConfigError::NotADirectory(dir.to_path_buf()));
    }
    fs::create_dir_all(dir).map_err(|source| ConfigError::NotWritable {
        path: dir.to_path_buf(),
        source,
    })?;
    tempfile::NamedTempFile::new_in(dir).map_err(|source| ConfigError::NotWritable {
        path: dir.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Total pages must be between 1 and 9999, got {0}")]
    PageCountOutOfRange(u32),

    #[error("Settle delay must be at least 1000ms, got {0}ms")]
    SettleDelayTooShort(u64),

    #[error("DPI must be a positive number, got {0}")]
    InvalidDpi(f32),

    #[error("Output folder {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("Output folder {} is not writable: {source}", path.display())]
    NotWritable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}
