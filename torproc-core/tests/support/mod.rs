//! Shared fixtures: a scripted process table, launcher and probe client
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use torproc_core::error::{ProbeError, ProcessError};
use torproc_core::probe::ProbeClient;
use torproc_core::process::{
    ExecutableLocation, Launcher, ManagedChild, ProcessTable, TorProcess,
};
use torproc_core::types::{ProcessInfo, WindowVisibility};

pub const BUNDLE_EXE: &str = "/opt/Tor Browser/Browser/firefox";

pub const READY_PAGE: &str = r#"<html><body>
<h1 class="on">Congratulations. This browser is configured to use Tor.</h1>
<p>Your IP address appears to be: <strong>185.220.101.4</strong></p>
</body></html>"#;

pub const NOT_TOR_PAGE: &str = r#"<html><body>
<h1 class="off">Sorry. You are not using Tor.</h1>
</body></html>"#;

/// Side effects in the order they happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    TableKill(u32),
    Launch(u32),
}

#[derive(Debug, Default)]
pub struct Journal(Mutex<Vec<Event>>);

impl Journal {
    pub fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn launches(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::Launch(_)))
            .count()
    }

    pub fn table_kills(&self) -> Vec<u32> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                Event::TableKill(pid) => Some(*pid),
                _ => None,
            })
            .collect()
    }
}

/// A running Tor Browser bundle entry
pub fn tor_instance(pid: u32) -> ProcessInfo {
    ProcessInfo::new(pid, "firefox").with_exe(BUNDLE_EXE)
}

/// Process table backed by a vector
pub struct FixtureTable {
    processes: Mutex<Vec<ProcessInfo>>,
    failing_kills: Mutex<HashSet<u32>>,
    sessions: Mutex<HashMap<u32, u32>>,
    journal: Arc<Journal>,
}

impl FixtureTable {
    pub fn new(processes: Vec<ProcessInfo>, journal: Arc<Journal>) -> Self {
        Self {
            processes: Mutex::new(processes),
            failing_kills: Mutex::new(HashSet::new()),
            sessions: Mutex::new(HashMap::new()),
            journal,
        }
    }

    pub fn set_processes(&self, processes: Vec<ProcessInfo>) {
        *self.processes.lock().unwrap() = processes;
    }

    pub fn fail_kill(&self, pid: u32) {
        self.failing_kills.lock().unwrap().insert(pid);
    }

    /// Session reported for a pid that is not (yet) in the table
    pub fn assign_session(&self, pid: u32, session_id: u32) {
        self.sessions.lock().unwrap().insert(pid, session_id);
    }
}

impl ProcessTable for FixtureTable {
    fn snapshot(&self) -> Vec<ProcessInfo> {
        self.processes.lock().unwrap().clone()
    }

    fn kill(&self, pid: u32) -> Result<(), ProcessError> {
        self.journal.push(Event::TableKill(pid));
        if self.failing_kills.lock().unwrap().contains(&pid) {
            return Err(ProcessError::TerminationFailed {
                pid,
                reason: "operation not permitted".to_string(),
            });
        }
        self.processes.lock().unwrap().retain(|p| p.pid != pid);
        Ok(())
    }

    fn session_id(&self, pid: u32) -> Option<u32> {
        if let Some(sid) = self.sessions.lock().unwrap().get(&pid) {
            return Some(*sid);
        }
        self.snapshot()
            .into_iter()
            .find(|p| p.pid == pid)
            .and_then(|p| p.session_id)
    }
}

/// Shared state of a fixture child, inspectable after the controller owns it
#[derive(Debug, Default)]
pub struct ChildState {
    pub exited: AtomicBool,
    pub kill_calls: AtomicUsize,
}

impl ChildState {
    /// Simulate the process exiting on its own
    pub fn exit(&self) {
        self.exited.store(true, Ordering::SeqCst);
    }

    pub fn kill_calls(&self) -> usize {
        self.kill_calls.load(Ordering::SeqCst)
    }
}

struct FixtureChild {
    pid: u32,
    state: Arc<ChildState>,
}

impl ManagedChild for FixtureChild {
    fn id(&self) -> u32 {
        self.pid
    }

    fn has_exited(&mut self) -> bool {
        self.state.exited.load(Ordering::SeqCst)
    }

    fn kill(&mut self) -> io::Result<()> {
        self.state.kill_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.exited.swap(true, Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "already exited"));
        }
        Ok(())
    }
}

/// Launcher that hands out fixture children with increasing pids
pub struct FixtureLauncher {
    journal: Arc<Journal>,
    next_pid: AtomicU32,
    fail: AtomicBool,
    delay: Duration,
    children: Mutex<Vec<Arc<ChildState>>>,
    last_args: Mutex<Vec<String>>,
    last_window: Mutex<Option<WindowVisibility>>,
}

impl FixtureLauncher {
    pub fn new(journal: Arc<Journal>) -> Self {
        Self::with_delay(journal, Duration::ZERO)
    }

    pub fn with_delay(journal: Arc<Journal>, delay: Duration) -> Self {
        Self {
            journal,
            next_pid: AtomicU32::new(500),
            fail: AtomicBool::new(false),
            delay,
            children: Mutex::new(Vec::new()),
            last_args: Mutex::new(Vec::new()),
            last_window: Mutex::new(None),
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn child(&self, index: usize) -> Arc<ChildState> {
        Arc::clone(&self.children.lock().unwrap()[index])
    }

    pub fn last_args(&self) -> Vec<String> {
        self.last_args.lock().unwrap().clone()
    }

    pub fn last_window(&self) -> Option<WindowVisibility> {
        *self.last_window.lock().unwrap()
    }
}

impl Launcher for FixtureLauncher {
    fn launch(
        &self,
        _exe: &Path,
        args: &[&str],
        window: WindowVisibility,
    ) -> Result<Box<dyn ManagedChild>, ProcessError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProcessError::LaunchFailed {
                reason: "permission denied".to_string(),
            });
        }

        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        self.journal.push(Event::Launch(pid));
        *self.last_args.lock().unwrap() = args.iter().map(|a| a.to_string()).collect();
        *self.last_window.lock().unwrap() = Some(window);

        let state = Arc::new(ChildState::default());
        self.children.lock().unwrap().push(Arc::clone(&state));
        Ok(Box::new(FixtureChild { pid, state }))
    }
}

/// Probe client that replays scripted answers, repeating the last one
pub struct ScriptedClient {
    script: Vec<Result<String, ProbeError>>,
    attempts: Mutex<Vec<Instant>>,
}

impl ScriptedClient {
    pub fn new(script: Vec<Result<String, ProbeError>>) -> Self {
        Self {
            script,
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn always_failing() -> Self {
        Self::new(vec![Err(network_error())])
    }

    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProbeClient for ScriptedClient {
    async fn get(&self, _url: &str) -> Result<String, ProbeError> {
        let index = {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.push(Instant::now());
            attempts.len() - 1
        };
        self.script[index.min(self.script.len() - 1)].clone()
    }
}


pub fn network_error() -> ProbeError {
    ProbeError::Network {
        reason: "Connection refused or unreachable".to_string(),
    }
}

/// A real file to resolve the executable location against
pub fn location() -> (TempDir, ExecutableLocation) {
    let dir = tempfile::tempdir().unwrap();
    let exe = dir.path().join("firefox");
    std::fs::write(&exe, b"").unwrap();
    let location = ExecutableLocation::resolve(&exe).unwrap();
    (dir, location)
}

/// Everything a controller test needs, kept alive together
pub struct Harness {
    pub _dir: TempDir,
    pub journal: Arc<Journal>,
    pub table: Arc<FixtureTable>,
    pub launcher: Arc<FixtureLauncher>,
    pub controller: Arc<TorProcess>,
}

impl Harness {
    pub fn new(processes: Vec<ProcessInfo>) -> Self {
        Self::with_launch_delay(processes, Duration::ZERO)
    }

    pub fn with_launch_delay(processes: Vec<ProcessInfo>, delay: Duration) -> Self {
        let (dir, location) = location();
        let journal = Arc::new(Journal::default());
        let table = Arc::new(FixtureTable::new(processes, Arc::clone(&journal)));
        let launcher = Arc::new(FixtureLauncher::with_delay(Arc::clone(&journal), delay));
        let controller = Arc::new(TorProcess::with_parts(
            location,
            Arc::clone(&table) as Arc<dyn ProcessTable>,
            Arc::clone(&launcher) as Arc<dyn Launcher>,
        ));

        Self {
            _dir: dir,
            journal,
            table,
            launcher,
            controller,
        }
    }
}
