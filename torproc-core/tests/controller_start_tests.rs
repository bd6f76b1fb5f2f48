//! Tests for start policies, idempotent start and launch failures

mod support;

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use support::{tor_instance, Event, Harness};
use torproc_core::error::ProcessError;
use torproc_core::types::{ProcessInfo, ProcessOrigin, StartPolicy, WindowVisibility};

#[test]
fn test_start_on_empty_host_launches_once() {
    let harness = Harness::new(vec![]);

    let process = harness
        .controller
        .start(StartPolicy::ThrowIfRunning, WindowVisibility::Normal)
        .unwrap();

    assert_eq!(process.pid, 500);
    assert_eq!(process.origin, ProcessOrigin::Launched);
    assert_eq!(harness.journal.launches(), 1);
    assert_eq!(harness.launcher.last_args(), vec!["-n".to_string()]);
    assert_eq!(harness.launcher.last_window(), Some(WindowVisibility::Normal));
    assert_eq!(harness.controller.current_process(), Some(process));
}

#[test]
fn test_start_default_is_return_existing_hidden() {
    let harness = Harness::new(vec![tor_instance(42)]);

    let process = harness.controller.start_default().unwrap();

    assert_eq!(process.pid, 42);
    assert_eq!(harness.journal.launches(), 0);

    harness.table.set_processes(vec![]);
    harness.controller.dispose();

    let fresh = Harness::new(vec![]);
    fresh.controller.start_default().unwrap();
    assert_eq!(fresh.launcher.last_window(), Some(WindowVisibility::Hidden));
}

#[test]
fn test_throw_if_running_fails_without_launching() {
    let harness = Harness::new(vec![tor_instance(42), tor_instance(43)]);

    let result = harness
        .controller
        .start(StartPolicy::ThrowIfRunning, WindowVisibility::Hidden);

    assert_eq!(result, Err(ProcessError::AlreadyRunning { count: 2 }));
    assert_eq!(harness.journal.launches(), 0);
    assert!(harness.journal.table_kills().is_empty());
    assert_eq!(harness.controller.current_process(), None);
}

#[test]
fn test_return_existing_adopts_first_match_without_launching() {
    let harness = Harness::new(vec![
        ProcessInfo::new(7, "bash").with_exe("/bin/bash"),
        tor_instance(42).with_session(3),
        tor_instance(43),
    ]);

    let process = harness
        .controller
        .start(StartPolicy::ReturnExisting, WindowVisibility::Hidden)
        .unwrap();

    assert_eq!(process.pid, 42);
    assert_eq!(process.session_id, Some(3));
    assert_eq!(process.origin, ProcessOrigin::Adopted);
    assert_eq!(harness.journal.launches(), 0);
    assert_eq!(harness.controller.current_process(), Some(process));
}

#[test]
fn test_return_existing_prefers_tracked_handle() {
    let harness = Harness::new(vec![]);
    let launched = harness.controller.start_default().unwrap();

    // Someone else starts a bundle; our own instance is still returned
    harness.table.set_processes(vec![tor_instance(77)]);
    let again = harness
        .controller
        .start(StartPolicy::ReturnExisting, WindowVisibility::Hidden)
        .unwrap();

    assert_eq!(again, launched);
    assert_eq!(harness.journal.launches(), 1);
}

#[test]
fn test_kill_existings_kills_every_match_before_launch() {
    let harness = Harness::new(vec![tor_instance(41), tor_instance(42), tor_instance(43)]);
    harness.table.fail_kill(42);

    let process = harness
        .controller
        .start(StartPolicy::KillExistings, WindowVisibility::Hidden)
        .unwrap();

    assert_eq!(
        harness.journal.events(),
        vec![
            Event::TableKill(41),
            Event::TableKill(42),
            Event::TableKill(43),
            Event::Launch(500),
        ]
    );
    assert_eq!(process.origin, ProcessOrigin::Launched);
}

#[test]
fn test_kill_existings_on_empty_host_just_launches() {
    let harness = Harness::new(vec![]);

    harness
        .controller
        .start(StartPolicy::KillExistings, WindowVisibility::Hidden)
        .unwrap();

    assert_eq!(harness.journal.events(), vec![Event::Launch(500)]);
}

#[test]
fn test_concurrent_starts_launch_exactly_once() {
    let harness = Harness::with_launch_delay(vec![], Duration::from_millis(50));
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let controller = Arc::clone(&harness.controller);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                controller
                    .start(StartPolicy::ReturnExisting, WindowVisibility::Hidden)
                    .unwrap()
            })
        })
        .collect();

    let pids: Vec<u32> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap().pid)
        .collect();

    assert_eq!(harness.journal.launches(), 1);
    assert!(pids.iter().all(|pid| *pid == 500));
}

#[test]
fn test_launch_failure_leaves_handle_empty_and_is_recoverable() {
    let harness = Harness::new(vec![]);
    harness.launcher.set_failing(true);

    let result = harness.controller.start_default();
    assert!(matches!(result, Err(ProcessError::LaunchFailed { .. })));
    assert_eq!(harness.controller.current_process(), None);

    harness.launcher.set_failing(false);
    let process = harness.controller.start_default().unwrap();
    assert_eq!(harness.controller.current_process(), Some(process));
}

#[test]
fn test_exited_instance_is_replaced_on_next_start() {
    let harness = Harness::new(vec![]);
    let first = harness.controller.start_default().unwrap();

    harness.launcher.child(0).exit();
    assert_eq!(harness.controller.current_process(), None);

    let second = harness.controller.start_default().unwrap();
    assert_ne!(first.pid, second.pid);
    assert_eq!(harness.journal.launches(), 2);
}

#[test]
fn test_adopted_instance_dropped_once_it_exits() {
    let harness = Harness::new(vec![tor_instance(42)]);
    harness.controller.start_default().unwrap();

    harness.table.set_processes(vec![tor_instance(42).with_exited(true)]);
    assert_eq!(harness.controller.current_process(), None);
}

#[test]
fn test_adopted_instance_not_live_once_pid_is_reused() {
    let harness = Harness::new(vec![tor_instance(42).with_session(3)]);
    harness.controller.start_default().unwrap();

    harness
        .table
        .set_processes(vec![ProcessInfo::new(42, "sshd").with_session(4)]);

    assert_eq!(harness.controller.current_process(), None);
}

#[test]
fn test_return_existing_ignores_exited_entries() {
    let harness = Harness::new(vec![tor_instance(42).with_exited(true)]);

    let process = harness.controller.start_default().unwrap();

    assert_eq!(process.pid, 500);
    assert_eq!(process.origin, ProcessOrigin::Launched);
    assert_eq!(harness.journal.launches(), 1);
    assert_eq!(harness.controller.current_process(), Some(process));
}

#[test]
fn test_throw_if_running_ignores_exited_entries() {
    let harness = Harness::new(vec![tor_instance(42).with_exited(true)]);

    let process = harness
        .controller
        .start(StartPolicy::ThrowIfRunning, WindowVisibility::Hidden)
        .unwrap();

    assert_eq!(process.origin, ProcessOrigin::Launched);
    assert_eq!(harness.journal.events(), vec![Event::Launch(500)]);
}

#[test]
fn test_return_existing_adopts_live_entry_after_exited_one() {
    let harness = Harness::new(vec![tor_instance(42).with_exited(true), tor_instance(43)]);

    let process = harness.controller.start_default().unwrap();

    assert_eq!(process.pid, 43);
    assert_eq!(process.origin, ProcessOrigin::Adopted);
    assert_eq!(harness.journal.launches(), 0);
}

#[test]
fn test_start_after_dispose_is_rejected() {
    let harness = Harness::new(vec![]);
    harness.controller.dispose();

    assert_eq!(
        harness.controller.start_default(),
        Err(ProcessError::Disposed)
    );
    assert_eq!(harness.journal.launches(), 0);
}

#[test]
fn test_launched_session_is_recorded() {
    let harness = Harness::new(vec![]);
    harness.table.assign_session(500, 9);

    let process = harness.controller.start_default().unwrap();
    assert_eq!(process.session_id, Some(9));
}
