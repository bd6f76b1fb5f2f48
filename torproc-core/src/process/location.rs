//! Tor Browser executable resolution
//!
//! Accepts either the browser executable itself or the root of a Tor Browser
//! installation and resolves it once, failing fast when nothing exists there.

use crate::config::ProxyConfig;
use crate::error::ConfigError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Candidate executables below an installation root, in lookup order
const BUNDLED_EXECUTABLES: &[&str] = &["Browser/firefox.exe", "Browser/firefox"];

/// Validated path to the executable that gets launched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableLocation {
    path: PathBuf,
}

impl ExecutableLocation {
    /// Resolve an executable path or installation directory
    pub fn resolve(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = path.to_string_lossy();
        if raw.trim().is_empty() {
            return Err(ConfigError::MissingPath);
        }

        if path.is_file() {
            return Self::from_file(path);
        }

        if path.is_dir() {
            return Self::from_install_dir(path);
        }

        // A bare command name is looked up on PATH
        if path.components().count() == 1 {
            if let Ok(found) = which::which(path) {
                debug!("Resolved {:?} on PATH to {:?}", path, found);
                return Self::from_file(&found);
            }
        }

        Err(ConfigError::ExecutableNotFound {
            path: raw.to_string(),
        })
    }

    /// Resolve the `tor_path` of a proxy configuration
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ConfigError> {
        Self::resolve(&config.tor_path)
    }

    fn from_install_dir(root: &Path) -> Result<Self, ConfigError> {
        BUNDLED_EXECUTABLES
            .iter()
            .map(|relative| root.join(relative))
            .find(|candidate| candidate.is_file())
            .map(|exe| Self::from_file(&exe))
            .unwrap_or_else(|| {
                Err(ConfigError::ExecutableNotFound {
                    path: root.join(BUNDLED_EXECUTABLES[0]).to_string_lossy().to_string(),
                })
            })
    }

    fn from_file(file: &Path) -> Result<Self, ConfigError> {
        let path = file.canonicalize().map_err(|e| ConfigError::IoError {
            message: format!("Failed to canonicalize {}: {}", file.display(), e),
        })?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Case-insensitive equality, the way executable paths compare on the
    /// platforms Tor Browser ships for
    pub fn matches_path(&self, other: &Path) -> bool {
        self.path
            .to_string_lossy()
            .eq_ignore_ascii_case(&other.to_string_lossy())
    }
}

impl AsRef<Path> for ExecutableLocation {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}
