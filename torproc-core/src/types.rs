//! Core type definitions
//!
//! Value types shared between the process table, the lifecycle controller
//! and the CLI.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// What `start` does when matching instances are already running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartPolicy {
    /// Fail with `AlreadyRunning`; the caller has to clean up first
    ThrowIfRunning,
    /// Adopt the tracked handle, or the first discovered instance
    #[default]
    ReturnExisting,
    /// Terminate every discovered instance, then start a fresh one
    KillExistings,
}

impl StartPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            StartPolicy::ThrowIfRunning => "throw_if_running",
            StartPolicy::ReturnExisting => "return_existing",
            StartPolicy::KillExistings => "kill_existings",
        }
    }
}

impl fmt::Display for StartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StartPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "throw_if_running" | "throw" => Ok(StartPolicy::ThrowIfRunning),
            "return_existing" | "return" | "adopt" => Ok(StartPolicy::ReturnExisting),
            "kill_existings" | "kill_existing" | "kill" => Ok(StartPolicy::KillExistings),
            other => Err(format!(
                "unknown start policy '{}' (expected throw_if_running, return_existing or kill_existings)",
                other
            )),
        }
    }
}

/// Window visibility requested for a freshly launched instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowVisibility {
    #[default]
    Hidden,
    Normal,
}

impl WindowVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowVisibility::Hidden => "hidden",
            WindowVisibility::Normal => "normal",
        }
    }
}

impl fmt::Display for WindowVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WindowVisibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hidden" => Ok(WindowVisibility::Hidden),
            "normal" | "visible" => Ok(WindowVisibility::Normal),
            other => Err(format!(
                "unknown window visibility '{}' (expected hidden or normal)",
                other
            )),
        }
    }
}

/// How the controller came to track a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessOrigin {
    /// Spawned by this controller
    Launched,
    /// Found already running and returned instead of launching
    Adopted,
}

/// Reference to the instance tracked by a controller
///
/// This is a snapshot: the process may exit at any time after it was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessRef {
    pub pid: u32,
    pub session_id: Option<u32>,
    pub origin: ProcessOrigin,
}

impl ProcessRef {
    pub fn launched(pid: u32, session_id: Option<u32>) -> Self {
        Self {
            pid,
            session_id,
            origin: ProcessOrigin::Launched,
        }
    }

    pub fn adopted(info: &ProcessInfo) -> Self {
        Self {
            pid: info.pid,
            session_id: info.session_id,
            origin: ProcessOrigin::Adopted,
        }
    }

    /// Same OS-level identity: pid and session both equal
    ///
    /// The session id separates a reused pid from the original process.
    pub fn same_identity(&self, info: &ProcessInfo) -> bool {
        self.pid == info.pid && self.session_id == info.session_id
    }
}

/// One row of the host process table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub session_id: Option<u32>,
    pub name: String,
    /// Main executable; `None` when it could not be introspected
    pub exe: Option<PathBuf>,
    /// Start time in seconds since the Unix epoch
    pub started_at: Option<u64>,
    /// Zombie or dead entry still listed in the table
    pub exited: bool,
}

impl ProcessInfo {
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            session_id: None,
            name: name.into(),
            exe: None,
            started_at: None,
            exited: false,
        }
    }

    pub fn with_exe(mut self, exe: impl Into<PathBuf>) -> Self {
        self.exe = Some(exe.into());
        self
    }

    pub fn with_session(mut self, session_id: u32) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_exited(mut self, exited: bool) -> Self {
        self.exited = exited;
        self
    }
}
