//! Host process table access
//!
//! Discovery and the dispose fallback always re-query the OS through a
//! `ProcessTable`; nothing here is cached between calls. Tests substitute a
//! fixture table.

use crate::error::ProcessError;
use crate::types::ProcessInfo;
use sysinfo::{ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System, UpdateKind};
use tracing::debug;

/// Enumerate and signal host processes
pub trait ProcessTable: Send + Sync {
    /// Fresh snapshot of every process visible to the caller
    fn snapshot(&self) -> Vec<ProcessInfo>;

    /// Forcefully terminate a process; a process that is already gone is not an error
    fn kill(&self, pid: u32) -> Result<(), ProcessError>;

    /// Session the process belongs to, if it can be determined
    fn session_id(&self, pid: u32) -> Option<u32> {
        self.snapshot()
            .into_iter()
            .find(|process| process.pid == pid)
            .and_then(|process| process.session_id)
    }
}

/// `ProcessTable` backed by the operating system
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessTable;

impl SystemProcessTable {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessTable for SystemProcessTable {
    fn snapshot(&self) -> Vec<ProcessInfo> {
        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::new().with_exe(UpdateKind::OnlyIfNotSet),
        );

        let processes: Vec<ProcessInfo> = system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessInfo {
                pid: pid.as_u32(),
                session_id: process.session_id().map(|sid| sid.as_u32()),
                name: process.name().to_string_lossy().into_owned(),
                exe: process.exe().map(|exe| exe.to_path_buf()),
                started_at: Some(process.start_time()).filter(|secs| *secs > 0),
                exited: matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead),
            })
            .collect();

        debug!(count = processes.len(), "Enumerated host processes");
        processes
    }

    #[cfg(unix)]
    fn kill(&self, pid: u32) -> Result<(), ProcessError> {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        match kill(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            Ok(()) => {
                debug!(pid, "Sent SIGKILL");
                Ok(())
            }
            Err(Errno::ESRCH) => {
                debug!(pid, "Process already terminated");
                Ok(())
            }
            Err(e) => Err(ProcessError::TerminationFailed {
                pid,
                reason: e.to_string(),
            }),
        }
    }

    #[cfg(not(unix))]
    fn kill(&self, pid: u32) -> Result<(), ProcessError> {
        let sys_pid = sysinfo::Pid::from_u32(pid);
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::Some(&[sys_pid]), true);

        match system.process(sys_pid) {
            None => Ok(()),
            Some(process) if process.kill() => Ok(()),
            Some(_) => Err(ProcessError::TerminationFailed {
                pid,
                reason: "kill request was rejected".to_string(),
            }),
        }
    }

    #[cfg(unix)]
    fn session_id(&self, pid: u32) -> Option<u32> {
        nix::unistd::getsid(Some(nix::unistd::Pid::from_raw(pid as i32)))
            .ok()
            .map(|sid| sid.as_raw() as u32)
    }
}
