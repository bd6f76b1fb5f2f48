//! CLI command implementations
//!
//! This module contains the implementation of all CLI subcommands.

pub mod init;
pub mod lifecycle;
pub mod list;

use torproc_core::config::toml_config::{self, TomlConfig};
use torproc_core::error::TorProcError;

/// Load the configuration file, applying the `--tor-path` override
pub fn load_config(tor_path: Option<String>) -> Result<TomlConfig, TorProcError> {
    let mut config = toml_config::load_config()?;
    if let Some(path) = tor_path {
        config.proxy.tor_path = path;
    }
    Ok(config)
}
