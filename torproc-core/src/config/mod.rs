//! Configuration module
//!
//! Handles the proxy settings the readiness probe routes through and the
//! lifecycle defaults used by the CLI, loaded from TOML files.

use crate::types::{StartPolicy, WindowVisibility};
use serde::{Deserialize, Serialize};
use std::net::Ipv6Addr;
use std::time::Duration;
use url::Url;

pub mod toml_config;

/// Default check page used to confirm traffic leaves through Tor
pub const DEFAULT_CHECK_URL: &str = "https://check.torproject.org/";

/// SOCKS protocol version spoken by the local endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocksVersion {
    V4,
    #[default]
    V5,
}

impl SocksVersion {
    /// Proxy URL scheme; host names are always resolved on the proxy side
    pub fn scheme(&self) -> &'static str {
        match self {
            SocksVersion::V4 => "socks4a",
            SocksVersion::V5 => "socks5h",
        }
    }
}

/// Local SOCKS endpoint and Tor installation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Address of the local SOCKS listener
    #[serde(default = "default_socks_address")]
    pub socks_address: String,

    /// Port of the local SOCKS listener (Tor Browser uses 9150)
    #[serde(default = "default_socks_port")]
    pub socks_port: u16,

    #[serde(default)]
    pub socks_version: SocksVersion,

    /// Optional SOCKS credentials; Tor uses them for stream isolation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Tor Browser executable or installation root
    #[serde(default)]
    pub tor_path: String,
}

fn default_socks_address() -> String {
    "127.0.0.1".to_string()
}
fn default_socks_port() -> u16 {
    9150
}

impl ProxyConfig {
    pub fn new(tor_path: impl Into<String>) -> Self {
        Self {
            tor_path: tor_path.into(),
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.socks_address.trim().is_empty() {
            return Err("SOCKS address cannot be empty".to_string());
        }

        if self.socks_port == 0 {
            return Err("SOCKS port cannot be zero".to_string());
        }

        if self.username.is_some() != self.password.is_some() {
            return Err("SOCKS username and password must be set together".to_string());
        }

        if self.socks_version == SocksVersion::V4 && self.password.is_some() {
            return Err("SOCKS4 does not support password authentication".to_string());
        }

        Ok(())
    }

    /// Build the proxy URL, credentials included
    pub fn proxy_url(&self) -> Result<Url, String> {
        let address = self.socks_address.trim();
        // IPv6 literals need brackets in the authority
        let host = match address.parse::<Ipv6Addr>() {
            Ok(_) => format!("[{}]", address),
            Err(_) => address.to_string(),
        };
        let raw = format!(
            "{}://{}:{}",
            self.socks_version.scheme(),
            host,
            self.socks_port
        );
        let mut url = Url::parse(&raw).map_err(|e| format!("Invalid proxy address: {}", e))?;

        if let Some(username) = &self.username {
            url.set_username(username)
                .map_err(|_| "Proxy URL cannot carry a username".to_string())?;
            url.set_password(self.password.as_deref())
                .map_err(|_| "Proxy URL cannot carry a password".to_string())?;
        }

        Ok(url)
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            socks_address: default_socks_address(),
            socks_port: default_socks_port(),
            socks_version: SocksVersion::default(),
            username: None,
            password: None,
            tor_path: String::new(),
        }
    }
}

/// Start and readiness defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    #[serde(default)]
    pub start_policy: StartPolicy,

    #[serde(default)]
    pub window: WindowVisibility,

    /// Pause between readiness attempts
    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,

    /// Total readiness budget
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: u64,

    /// Per-request timeout of the probe client
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    #[serde(default = "default_check_url")]
    pub check_url: String,
}

fn default_retry_interval() -> u64 {
    5
}
fn default_max_wait() -> u64 {
    60
}
fn default_probe_timeout() -> u64 {
    30
}
fn default_check_url() -> String {
    DEFAULT_CHECK_URL.to_string()
}

impl LifecycleConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.probe_timeout_secs == 0 {
            return Err("Probe timeout cannot be zero".to_string());
        }

        let url = Url::parse(&self.check_url)
            .map_err(|e| format!("Invalid check URL '{}': {}", self.check_url, e))?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(format!(
                "Check URL must use http or https, got: {}",
                scheme
            )),
        }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            start_policy: StartPolicy::default(),
            window: WindowVisibility::default(),
            retry_interval_secs: default_retry_interval(),
            max_wait_secs: default_max_wait(),
            probe_timeout_secs: default_probe_timeout(),
            check_url: default_check_url(),
        }
    }
}
