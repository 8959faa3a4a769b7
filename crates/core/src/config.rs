//! Configuration management for sitepilot

use crate::error::{Error, Result};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration directory name
const CONFIG_DIR: &str = "sitepilot";

/// Configuration file name
const CONFIG_FILE: &str = "config.toml";

/// Upper bound for concurrent uploads during a sync
const MAX_CONCURRENT_UPLOADS: usize = 64;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub website: WebsiteConfig,
    #[serde(default)]
    pub cdn: CdnConfig,
    pub advanced: Option<AdvancedConfig>,
    pub logging: Option<LoggingConfig>,
}

/// AWS session configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwsConfig {
    /// Named profile from the shared AWS config files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// Region override; the profile's region is used otherwise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// Static website hosting documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebsiteConfig {
    #[serde(default = "default_index_document")]
    pub index_document: String,
    #[serde(default = "default_error_document")]
    pub error_document: String,
}

impl Default for WebsiteConfig {
    fn default() -> Self {
        Self {
            index_document: default_index_document(),
            error_document: default_error_document(),
        }
    }
}

/// CloudFront deployment wait settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdnConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_deploy_timeout")]
    pub deploy_timeout_secs: u64,
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            deploy_timeout_secs: default_deploy_timeout(),
        }
    }
}

impl CdnConfig {
    /// Poll interval as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Deploy timeout as a duration
    pub fn deploy_timeout(&self) -> Duration {
        Duration::from_secs(self.deploy_timeout_secs)
    }
}

/// Advanced configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_uploads: usize,
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            max_concurrent_uploads: default_max_concurrent(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl ConfigFile {
    /// Upload concurrency, falling back to the default when `[advanced]` is absent
    pub fn max_concurrent_uploads(&self) -> usize {
        self.advanced
            .as_ref()
            .map(|a| a.max_concurrent_uploads)
            .unwrap_or_else(default_max_concurrent)
    }

    /// Configured log level, if any
    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().map(|l| l.level.as_str())
    }
}

// Default values
fn default_index_document() -> String {
    "index.html".to_string()
}

fn default_error_document() -> String {
    "error.html".to_string()
}

fn default_poll_interval() -> u64 {
    30
}

fn default_deploy_timeout() -> u64 {
    1800 // 30 minutes
}

fn default_max_concurrent() -> usize {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let home = home_dir().ok_or_else(|| Error::Config("Cannot determine home directory".to_string()))?;
    Ok(home.join(".config").join(CONFIG_DIR))
}

/// Get the configuration file path
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(CONFIG_FILE))
}

/// Load configuration from a specific file
pub fn load_config_from(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Err(Error::ConfigNotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|e| {
        Error::InvalidConfig(format!("Failed to read config file: {}", e))
    })?;

    let config: ConfigFile = toml::from_str(&content).map_err(|e| {
        Error::InvalidConfig(format!("Failed to parse config file: {}", e))
    })?;

    Ok(config)
}

/// Load configuration, using defaults when the file does not exist
pub fn load_config_or_default(path: Option<&Path>) -> Result<ConfigFile> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => get_config_path()?,
    };

    match load_config_from(&path) {
        Ok(config) => Ok(config),
        Err(Error::ConfigNotFound(p)) => {
            tracing::debug!("No configuration at {}, using defaults", p.display());
            Ok(ConfigFile::default())
        }
        Err(e) => Err(e),
    }
}

/// Render configuration as TOML
pub fn render_config(config: &ConfigFile) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}

/// Validate configuration
pub fn validate_config(config: &ConfigFile) -> Result<()> {
    for (name, document) in [
        ("index_document", &config.website.index_document),
        ("error_document", &config.website.error_document),
    ] {
        if document.is_empty() {
            return Err(Error::InvalidInput(format!("{} cannot be empty", name)));
        }
        if document.contains('/') {
            return Err(Error::InvalidInput(format!(
                "{} must be a file name, got '{}'",
                name, document
            )));
        }
    }

    if config.cdn.poll_interval_secs == 0 {
        return Err(Error::InvalidInput(
            "poll_interval_secs must be greater than 0".to_string(),
        ));
    }

    if config.cdn.deploy_timeout_secs < config.cdn.poll_interval_secs {
        return Err(Error::InvalidInput(format!(
            "deploy_timeout_secs ({}) cannot be shorter than poll_interval_secs ({})",
            config.cdn.deploy_timeout_secs, config.cdn.poll_interval_secs
        )));
    }

    let concurrency = config.max_concurrent_uploads();
    if concurrency == 0 || concurrency > MAX_CONCURRENT_UPLOADS {
        return Err(Error::InvalidInput(format!(
            "max_concurrent_uploads must be between 1 and {} (got {})",
            MAX_CONCURRENT_UPLOADS, concurrency
        )));
    }

    Ok(())
}
