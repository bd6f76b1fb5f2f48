//! Process creation
//!
//! The controller launches through the `Launcher` trait so tests can count
//! and order launches without spawning anything.

use crate::error::ProcessError;
use crate::types::WindowVisibility;
use std::io;
use std::path::Path;
use std::process::{Child, Command};
use tracing::debug;

/// Arguments passed on every launch
pub const LAUNCH_ARGS: &[&str] = &["-n"];

/// A process started by a `Launcher`
pub trait ManagedChild: Send {
    fn id(&self) -> u32;

    /// Non-blocking exit check
    fn has_exited(&mut self) -> bool;

    /// Forcefully terminate; fails if the process is no longer there to kill
    fn kill(&mut self) -> io::Result<()>;
}

/// Starts the managed executable
pub trait Launcher: Send + Sync {
    fn launch(
        &self,
        exe: &Path,
        args: &[&str],
        window: WindowVisibility,
    ) -> Result<Box<dyn ManagedChild>, ProcessError>;
}

/// `Launcher` backed by `std::process::Command`
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandLauncher;

impl CommandLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl Launcher for CommandLauncher {
    fn launch(
        &self,
        exe: &Path,
        args: &[&str],
        window: WindowVisibility,
    ) -> Result<Box<dyn ManagedChild>, ProcessError> {
        let mut cmd = Command::new(exe);
        cmd.args(args);
        apply_window(&mut cmd, window);

        let child = cmd.spawn().map_err(|e| ProcessError::LaunchFailed {
            reason: format!("Failed to spawn {}: {}", exe.display(), e),
        })?;

        debug!(pid = child.id(), window = %window, "Spawned Tor Browser");
        Ok(Box::new(CommandChild { child }))
    }
}

#[cfg(windows)]
fn apply_window(cmd: &mut Command, window: WindowVisibility) {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;

    if window == WindowVisibility::Hidden {
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
}

#[cfg(not(windows))]
fn apply_window(cmd: &mut Command, window: WindowVisibility) {
    use std::process::Stdio;

    // No console to hide; a hidden launch is detached from the terminal instead
    if window == WindowVisibility::Hidden {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
    }
}

struct CommandChild {
    child: Child,
}

impl ManagedChild for CommandChild {
    fn id(&self) -> u32 {
        self.child.id()
    }

    fn has_exited(&mut self) -> bool {
        // An unreadable status is treated as gone
        !matches!(self.child.try_wait(), Ok(None))
    }

    fn kill(&mut self) -> io::Result<()> {
        if self.has_exited() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("process {} has already exited", self.child.id()),
            ));
        }
        self.child.kill()?;
        // Reap so the pid does not linger as a zombie
        self.child.wait().map(|_| ())
    }
}
