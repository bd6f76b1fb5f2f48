//! TOML configuration file I/O
//!
//! Handles loading and saving the proxy and lifecycle configuration
//! to/from TOML files in the user's configuration directory.

use crate::config::{LifecycleConfig, ProxyConfig};
use crate::error::{ConfigError, TorProcError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Complete TOML configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Local SOCKS endpoint and Tor location
    #[serde(rename = "proxy", default)]
    pub proxy: ProxyConfig,

    /// Start policy and readiness timing
    #[serde(rename = "lifecycle", default)]
    pub lifecycle: LifecycleConfig,
}

impl TomlConfig {
    /// Create a new TOML configuration
    pub fn new(proxy: ProxyConfig, lifecycle: LifecycleConfig) -> Self {
        Self { proxy, lifecycle }
    }

    /// Validate both sections
    pub fn validate(&self) -> Result<(), TorProcError> {
        self.proxy
            .validate()
            .map_err(|message| ConfigError::ValidationError { message })?;
        self.lifecycle
            .validate()
            .map_err(|message| ConfigError::ValidationError { message })?;
        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, TorProcError> {
        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => TorProcError::Config(ConfigError::LoadFailed {
                path: path.to_string_lossy().to_string(),
            }),
            _ => TorProcError::Config(ConfigError::IoError {
                message: format!("Failed to read config file: {}", e),
            }),
        })?;

        let config: TomlConfig = toml::from_str(&contents).map_err(|e| {
            TorProcError::Config(ConfigError::ValidationError {
                message: format!("Failed to parse config file: {}", e),
            })
        })?;

        config.validate()?;

        debug!(
            socks_address = %config.proxy.socks_address,
            socks_port = config.proxy.socks_port,
            start_policy = %config.lifecycle.start_policy,
            "Loaded configuration from {:?}",
            path
        );

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<(), TorProcError> {
        self.validate()?;

        let contents = toml::to_string_pretty(self)?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                TorProcError::Config(ConfigError::IoError {
                    message: format!("Failed to create config directory: {}", e),
                })
            })?;
        }

        std::fs::write(path, contents).map_err(|_e| {
            TorProcError::Config(ConfigError::SaveFailed {
                path: path.to_string_lossy().to_string(),
            })
        })?;

        info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

/// Default configuration file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Get the default configuration directory
///
/// Returns ~/.config/torproc, or TORPROC_CONFIG_DIR if set
pub fn get_config_dir() -> Result<PathBuf, TorProcError> {
    // Allow tests to override config directory via environment variable
    if let Ok(config_dir) = std::env::var("TORPROC_CONFIG_DIR") {
        return Ok(PathBuf::from(config_dir));
    }

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| {
            TorProcError::Config(ConfigError::IoError {
                message: "HOME environment variable not set".to_string(),
            })
        })?;

    Ok(PathBuf::from(home).join(".config").join("torproc"))
}

/// Get the default configuration file path
pub fn get_config_path() -> Result<PathBuf, TorProcError> {
    Ok(get_config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load configuration from the default file, falling back to defaults when absent
pub fn load_config() -> Result<TomlConfig, TorProcError> {
    let path = get_config_path()?;
    if !path.exists() {
        debug!("No configuration file at {:?}, using defaults", path);
        return Ok(TomlConfig::default());
    }
    TomlConfig::from_file(&path)
}

/// Save configuration to the default file
pub fn save_config(config: &TomlConfig) -> Result<PathBuf, TorProcError> {
    let path = get_config_path()?;
    config.to_file(&path)?;
    Ok(path)
}

/// Check if a configuration file exists
pub fn config_exists() -> Result<bool, TorProcError> {
    Ok(get_config_path()?.exists())
}
