//! Init command implementation
//!
//! Writes a default configuration file to ~/.config/torproc/config.toml.

use colored::Colorize;
use torproc_core::config::toml_config::{self, TomlConfig};
use torproc_core::config::ProxyConfig;
use torproc_core::error::TorProcError;

/// Run the init command
pub fn run_init(tor_path: Option<String>, force: bool) -> Result<(), TorProcError> {
    if toml_config::config_exists()? && !force {
        let path = toml_config::get_config_path()?;
        println!(
            "{} Configuration already exists at {}",
            "!".yellow().bold(),
            path.display()
        );
        println!("Use --force to overwrite it.");
        return Ok(());
    }

    let config = TomlConfig {
        proxy: ProxyConfig::new(tor_path.unwrap_or_default()),
        ..TomlConfig::default()
    };

    let path = toml_config::save_config(&config)?;
    println!("{} Wrote {}", "✓".green().bold(), path.display());

    if config.proxy.tor_path.is_empty() {
        println!("Set tor_path under [proxy] before running other commands.");
    }

    Ok(())
}
