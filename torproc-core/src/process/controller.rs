//! Tor Browser lifecycle controller
//!
//! Owns at most one tracked instance: discovers running instances, starts or
//! adopts one under a `StartPolicy`, confirms readiness through the SOCKS
//! endpoint, and tears the instance down exactly once.

use crate::config::toml_config::TomlConfig;
use crate::config::DEFAULT_CHECK_URL;
use crate::error::{ConfigError, ProcessError};
use crate::probe::readiness::{DEFAULT_MAX_WAIT, DEFAULT_RETRY_INTERVAL};
use crate::probe::{is_ready_page, normalize_wait, ProbeClient};
use crate::process::discovery::InstanceMatcher;
use crate::process::launcher::{CommandLauncher, Launcher, ManagedChild, LAUNCH_ARGS};
use crate::process::location::ExecutableLocation;
use crate::process::table::{ProcessTable, SystemProcessTable};
use crate::types::{ProcessInfo, ProcessRef, StartPolicy, WindowVisibility};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// The instance a controller currently answers for
enum Tracked {
    Launched {
        child: Box<dyn ManagedChild>,
        process: ProcessRef,
    },
    Adopted(ProcessRef),
}

impl Tracked {
    fn process(&self) -> &ProcessRef {
        match self {
            Tracked::Launched { process, .. } | Tracked::Adopted(process) => process,
        }
    }
}

/// Lifecycle controller for a single Tor Browser instance
///
/// Thread-safe: the tracked handle sits behind one mutex and disposal is
/// guarded by an atomic flag. Dropping the controller disposes it; use
/// [`TorProcess::detach`] to leave the instance running.
pub struct TorProcess {
    matcher: InstanceMatcher,
    table: Arc<dyn ProcessTable>,
    launcher: Arc<dyn Launcher>,
    check_url: String,
    tracked: Mutex<Option<Tracked>>,
    disposing: AtomicBool,
    dispose_signal: Notify,
}

impl TorProcess {
    /// Controller over the real process table and launcher
    pub fn new(location: ExecutableLocation) -> Self {
        Self::with_parts(
            location,
            Arc::new(SystemProcessTable::new()),
            Arc::new(CommandLauncher::new()),
        )
    }

    /// Controller over caller-supplied process table and launcher
    pub fn with_parts(
        location: ExecutableLocation,
        table: Arc<dyn ProcessTable>,
        launcher: Arc<dyn Launcher>,
    ) -> Self {
        Self {
            matcher: InstanceMatcher::new(location),
            table,
            launcher,
            check_url: DEFAULT_CHECK_URL.to_string(),
            tracked: Mutex::new(None),
            disposing: AtomicBool::new(false),
            dispose_signal: Notify::new(),
        }
    }

    /// Resolve the executable from configuration; fails fast when it does not exist
    pub fn from_config(config: &TomlConfig) -> Result<Self, ConfigError> {
        let location = ExecutableLocation::from_config(&config.proxy)?;
        Ok(Self::new(location).with_check_url(config.lifecycle.check_url.clone()))
    }

    /// Page fetched by the readiness probe
    pub fn with_check_url(mut self, url: impl Into<String>) -> Self {
        self.check_url = url.into();
        self
    }

    pub fn location(&self) -> &ExecutableLocation {
        self.matcher.location()
    }

    pub fn check_url(&self) -> &str {
        &self.check_url
    }

    pub fn is_disposing(&self) -> bool {
        self.disposing.load(Ordering::Acquire)
    }

    fn lock_tracked(&self) -> MutexGuard<'_, Option<Tracked>> {
        // A panic while holding the lock leaves the handle itself consistent
        self.tracked
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_live(&self, tracked: &mut Tracked) -> bool {
        match tracked {
            Tracked::Launched { child, .. } => !child.has_exited(),
            Tracked::Adopted(process) => self.listed(process).is_some_and(|info| !info.exited),
        }
    }

    /// Fresh table entry with the same pid and session as `process`
    ///
    /// A pid reused by another session is not a match.
    fn listed(&self, process: &ProcessRef) -> Option<ProcessInfo> {
        self.table
            .snapshot()
            .into_iter()
            .find(|info| process.same_identity(info))
    }

    /// Every running instance on the host, whoever started it
    pub fn find_running_instances(&self) -> Vec<ProcessInfo> {
        self.matcher.find_running_instances(self.table.as_ref())
    }

    /// Snapshot of the tracked instance
    ///
    /// An instance that exited out of band is dropped here rather than returned.
    pub fn current_process(&self) -> Option<ProcessRef> {
        let mut tracked = self.lock_tracked();
        let live = match tracked.as_mut() {
            Some(current) => self.is_live(current),
            None => return None,
        };

        if live {
            tracked.as_ref().map(|current| current.process().clone())
        } else {
            if let Some(stale) = tracked.take() {
                debug!(pid = stale.process().pid, "Tracked instance exited, clearing handle");
            }
            None
        }
    }

    /// Start with `ReturnExisting`, hidden
    pub fn start_default(&self) -> Result<ProcessRef, ProcessError> {
        self.start(StartPolicy::ReturnExisting, WindowVisibility::Hidden)
    }

    /// Start an instance, or adopt one, according to `policy`
    #[tracing::instrument(skip(self), fields(exe = %self.location().path().display()))]
    pub fn start(
        &self,
        policy: StartPolicy,
        window: WindowVisibility,
    ) -> Result<ProcessRef, ProcessError> {
        if self.is_disposing() {
            return Err(ProcessError::Disposed);
        }

        // Zombie or dead rows are still listed but are not running
        let existing: Vec<ProcessInfo> = self
            .find_running_instances()
            .into_iter()
            .filter(|process| !process.exited)
            .collect();
        if !existing.is_empty() {
            match policy {
                StartPolicy::ThrowIfRunning => {
                    warn!(count = existing.len(), "Tor Browser is already running");
                    return Err(ProcessError::AlreadyRunning {
                        count: existing.len(),
                    });
                }
                StartPolicy::ReturnExisting => return self.adopt(&existing),
                StartPolicy::KillExistings => {
                    let killed = self.kill_processes(&existing);
                    info!(
                        killed,
                        found = existing.len(),
                        "Terminated existing instances before launch"
                    );
                }
            }
        }

        // Check, launch and store under one lock so concurrent callers spawn once
        let mut tracked = self.lock_tracked();
        if self.is_disposing() {
            return Err(ProcessError::Disposed);
        }

        if let Some(current) = tracked.as_mut() {
            if self.is_live(current) {
                debug!(pid = current.process().pid, "Instance already tracked");
                return Ok(current.process().clone());
            }
            debug!(pid = current.process().pid, "Tracked instance exited, launching a new one");
        }
        *tracked = None;

        let child = self
            .launcher
            .launch(self.location().path(), LAUNCH_ARGS, window)
            .map_err(|e| {
                warn!(error = %e, "Failed to launch Tor Browser");
                e
            })?;

        let pid = child.id();
        let process = ProcessRef::launched(pid, self.table.session_id(pid));
        info!(pid, session_id = ?process.session_id, "Launched Tor Browser");

        *tracked = Some(Tracked::Launched {
            child,
            process: process.clone(),
        });
        Ok(process)
    }

    fn adopt(&self, existing: &[ProcessInfo]) -> Result<ProcessRef, ProcessError> {
        let mut tracked = self.lock_tracked();
        if self.is_disposing() {
            return Err(ProcessError::Disposed);
        }

        if let Some(current) = tracked.as_mut() {
            if self.is_live(current) {
                return Ok(current.process().clone());
            }
        }

        let first = existing.first().ok_or_else(|| ProcessError::LaunchFailed {
            reason: "no running instance to adopt".to_string(),
        })?;
        let process = ProcessRef::adopted(first);
        info!(pid = process.pid, session_id = ?process.session_id, "Adopted running Tor Browser");

        *tracked = Some(Tracked::Adopted(process.clone()));
        Ok(process)
    }

    /// Terminate every running instance; returns how many were killed
    pub fn kill_existing(&self) -> usize {
        let existing = self.find_running_instances();
        self.kill_processes(&existing)
    }

    /// Best-effort bulk termination
    ///
    /// Entries already marked as exited are skipped; a failure on one process
    /// never stops the rest.
    pub fn kill_processes(&self, processes: &[ProcessInfo]) -> usize {
        let mut killed = 0;
        for process in processes.iter().filter(|process| !process.exited) {
            match self.table.kill(process.pid) {
                Ok(()) => {
                    debug!(pid = process.pid, "Terminated instance");
                    killed += 1;
                }
                Err(e) => debug!(pid = process.pid, error = %e, "Ignoring kill failure"),
            }
        }
        killed
    }

    /// Terminate the tracked instance, once
    ///
    /// Safe to call repeatedly and from several threads: only the first caller
    /// does anything. Termination failures are logged, never returned.
    pub fn dispose(&self) {
        if self
            .disposing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Dispose already handled");
            return;
        }
        self.dispose_signal.notify_waiters();

        // Take the handle and release the lock; the fallback re-enters discovery
        let tracked = self.lock_tracked().take();
        let Some(tracked) = tracked else {
            debug!("Nothing tracked to terminate");
            return;
        };

        match tracked {
            Tracked::Launched { mut child, process } => match child.kill() {
                Ok(()) => info!(pid = process.pid, "Terminated Tor Browser"),
                Err(e) => {
                    debug!(pid = process.pid, error = %e, "Direct kill failed");
                    self.kill_fallback(&process);
                }
            },
            Tracked::Adopted(process) => {
                if self.listed(&process).is_none() {
                    debug!(pid = process.pid, "Adopted instance already gone");
                    return;
                }
                match self.table.kill(process.pid) {
                    Ok(()) => info!(pid = process.pid, "Terminated adopted Tor Browser"),
                    Err(e) => {
                        debug!(pid = process.pid, error = %e, "Direct kill failed");
                        self.kill_fallback(&process);
                    }
                }
            }
        }
    }

    /// Second chance after a failed kill, usually a process that exited
    /// between the liveness check and the signal
    fn kill_fallback(&self, process: &ProcessRef) {
        let existing = self.find_running_instances();
        match existing.iter().find(|info| process.same_identity(info)) {
            Some(info) if info.exited => {
                if let Err(e) = self.table.kill(info.pid) {
                    debug!(pid = info.pid, error = %e, "Ignoring fallback kill failure");
                }
            }
            Some(info) => {
                debug!(pid = info.pid, "Instance still listed as running after failed kill")
            }
            None => debug!(pid = process.pid, "Instance no longer listed"),
        }
    }

    /// Stop tracking without terminating anything
    ///
    /// The controller is disposed afterwards, so dropping it leaves the
    /// instance running.
    pub fn detach(&self) -> Option<ProcessRef> {
        if self
            .disposing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        self.dispose_signal.notify_waiters();

        let tracked = self.lock_tracked().take()?;
        let process = tracked.process().clone();
        info!(pid = process.pid, "Detached from Tor Browser");
        Some(process)
    }

    /// Wait with the default 5 s interval and 1 min budget
    pub async fn wait_until_ready_default(&self, client: &dyn ProbeClient) -> bool {
        self.wait_until_ready(client, DEFAULT_RETRY_INTERVAL, DEFAULT_MAX_WAIT)
            .await
    }

    /// Poll the check page through `client` until it confirms Tor
    ///
    /// Returns `false` once the controller is disposed or the normalized
    /// `max_wait` budget has elapsed. Failed attempts only count as
    /// "not ready yet". Disposal is observed between attempts; an in-flight
    /// request is left to finish.
    pub async fn wait_until_ready(
        &self,
        client: &dyn ProbeClient,
        retry_interval: Duration,
        max_wait: Duration,
    ) -> bool {
        let (retry_interval, max_wait) = normalize_wait(retry_interval, max_wait);
        let started = Instant::now();
        let mut attempt: u32 = 0;

        info!(
            url = %self.check_url,
            retry_ms = retry_interval.as_millis(),
            max_wait_ms = max_wait.as_millis(),
            "Waiting for Tor to become ready"
        );

        loop {
            if attempt > 0 {
                if started.elapsed() >= max_wait {
                    warn!(attempts = attempt, "Tor did not become ready in time");
                    return false;
                }

                let notified = self.dispose_signal.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                if !self.is_disposing() {
                    tokio::select! {
                        _ = tokio::time::sleep(retry_interval) => {}
                        _ = &mut notified => {}
                    }
                }
            }

            if self.is_disposing() {
                debug!(attempts = attempt, "Disposed while waiting for readiness");
                return false;
            }

            attempt += 1;
            match client.get(&self.check_url).await {
                Ok(body) if is_ready_page(&body) => {
                    info!(
                        attempt,
                        elapsed_ms = started.elapsed().as_millis(),
                        "Tor is ready"
                    );
                    return !self.is_disposing();
                }
                Ok(_) => debug!(attempt, "Check page does not confirm Tor yet"),
                Err(e) => debug!(attempt, error = %e, "Readiness attempt failed"),
            }
        }
    }
}

impl Drop for TorProcess {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for TorProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TorProcess")
            .field("location", self.location())
            .field("check_url", &self.check_url)
            .field("disposing", &self.is_disposing())
            .finish_non_exhaustive()
    }
}
