//! Application Configuration
//!
//! Backend, lookup and status settings stored in TOML format.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// OCR/translation backend settings
    pub backend: BackendConfig,
    /// Card database lookup settings
    pub lookup: LookupConfig,
    /// Status message settings
    pub status: StatusConfig,
}

/// How captured images are sent to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadMode {
    /// `multipart/form-data` with a `file` field
    #[default]
    Multipart,
    /// JSON body with a base64 `image_base64` field
    Base64,
}

/// OCR backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the OCR service
    pub base_url: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// Upload encoding
    pub upload_mode: UploadMode,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout_ms: 30_000,
            upload_mode: UploadMode::Multipart,
        }
    }
}

/// Card database lookup settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Base URL of the card database API
    pub base_url: String,
    /// Per-lookup timeout in milliseconds; 0 disables it
    pub timeout_ms: u64,
    /// Minimum delay between consecutive requests
    pub min_interval_ms: u64,
    /// User-Agent header sent with every lookup
    pub user_agent: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.scryfall.com".to_string(),
            timeout_ms: 10_000,
            min_interval_ms: 100,
            user_agent: concat!("card-lens/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Transient status message settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// How long a status message stays visible
    pub dismiss_after_ms: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            dismiss_after_ms: 3000,
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {:?}", path))?;
    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {:?}", path))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}
