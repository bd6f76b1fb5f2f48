//! Error types for the torproc toolkit
//!
//! This module defines all error types used throughout the crate. Errors that
//! the lifecycle controller treats as best-effort (per-process kill failures,
//! per-attempt probe failures) are still typed here so they can be logged,
//! but they never escape `dispose`, `kill_existing` or `wait_until_ready`.

use thiserror::Error;

/// Main error type for the torproc toolkit
#[derive(Error, Debug)]
pub enum TorProcError {
    /// Errors related to configuration loading/parsing and executable resolution
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors related to starting or stopping the managed process
    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    /// Errors related to the readiness probe
    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl TorProcError {
    /// Whether the error stems from bad or missing configuration
    ///
    /// Configuration errors are fatal at construction time; everything else
    /// is a runtime condition the caller may retry.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            TorProcError::Config(_) | TorProcError::Toml(_) | TorProcError::TomlSerialize(_)
        )
    }
}

/// Configuration-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Tor executable path is missing or empty")]
    MissingPath,

    #[error("Tor executable not found: {path}")]
    ExecutableNotFound { path: String },

    #[error("Failed to load configuration file: {path}")]
    LoadFailed { path: String },

    #[error("Failed to save configuration file: {path}")]
    SaveFailed { path: String },

    #[error("Configuration validation error: {message}")]
    ValidationError { message: String },

    #[error("I/O error: {message}")]
    IoError { message: String },
}

/// Lifecycle errors surfaced by the process controller
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("Tor is already running ({count} matching process(es))")]
    AlreadyRunning { count: usize },

    #[error("Failed to launch Tor: {reason}")]
    LaunchFailed { reason: String },

    #[error("Failed to terminate process {pid}: {reason}")]
    TerminationFailed { pid: u32, reason: String },

    #[error("Controller has been disposed")]
    Disposed,
}

/// Readiness probe errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP client creation failed: {0}")]
    ClientCreationFailed(String),

    #[error("Network error: {reason}")]
    Network { reason: String },

    #[error("Tor did not become ready")]
    NotReady,
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, TorProcError>;
