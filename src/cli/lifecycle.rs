//! Lifecycle commands: start, wait, check and kill

use colored::Colorize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use torproc_core::config::toml_config::TomlConfig;
use torproc_core::error::{ProbeError, TorProcError};
use torproc_core::probe::readiness::duration_from_signed_secs;
use torproc_core::probe::{ExitStatus, HttpProbeClient, ProbeClient};
use torproc_core::process::TorProcess;
use torproc_core::types::{ProcessOrigin, ProcessRef, StartPolicy, WindowVisibility};
use tracing::{debug, info};

/// Run the start command
///
/// The instance is detached before returning, so it outlives this process.
/// Ctrl+C during `--wait` disposes the controller and terminates it instead.
pub async fn run_start(
    config: &TomlConfig,
    policy: Option<StartPolicy>,
    window: Option<WindowVisibility>,
    wait: bool,
) -> Result<(), TorProcError> {
    let controller = Arc::new(TorProcess::from_config(config)?);
    let policy = policy.unwrap_or(config.lifecycle.start_policy);
    let window = window.unwrap_or(config.lifecycle.window);

    let process = controller.start(policy, window)?;
    print_process(&process);

    let ready = if wait {
        let client = probe_client(config)?;
        let interrupt = dispose_on_ctrl_c(&controller);
        let ready = controller
            .wait_until_ready(
                &client,
                config.lifecycle.retry_interval(),
                config.lifecycle.max_wait(),
            )
            .await;
        interrupt.abort();
        print_readiness(ready);
        ready
    } else {
        true
    };

    controller.detach();
    if ready {
        Ok(())
    } else {
        Err(ProbeError::NotReady.into())
    }
}

/// Run the wait command
pub async fn run_wait(
    config: &TomlConfig,
    retry_secs: Option<i64>,
    max_wait_secs: Option<i64>,
) -> Result<(), TorProcError> {
    let controller = Arc::new(TorProcess::from_config(config)?);
    let client = probe_client(config)?;

    let retry = retry_secs
        .map(duration_from_signed_secs)
        .unwrap_or_else(|| config.lifecycle.retry_interval());
    let max_wait = max_wait_secs
        .map(duration_from_signed_secs)
        .unwrap_or_else(|| config.lifecycle.max_wait());

    let interrupt = dispose_on_ctrl_c(&controller);
    let ready = controller.wait_until_ready(&client, retry, max_wait).await;
    interrupt.abort();

    print_readiness(ready);
    if ready {
        Ok(())
    } else {
        Err(ProbeError::NotReady.into())
    }
}

/// Run the check command
///
/// Starts or adopts a visible instance, waits for it, then reports the exit
/// address the check page sees. The instance is terminated afterwards unless
/// `keep` is set.
pub async fn run_check(config: &TomlConfig, keep: bool) -> Result<(), TorProcError> {
    let controller = Arc::new(TorProcess::from_config(config)?);
    let client = probe_client(config)?;

    let process = controller.start(StartPolicy::ReturnExisting, WindowVisibility::Normal)?;
    print_process(&process);

    let interrupt = dispose_on_ctrl_c(&controller);
    let result = verify(&controller, &client, config).await;
    interrupt.abort();

    if keep {
        controller.detach();
    } else {
        controller.dispose();
    }

    let status = result?;
    if status.is_tor() {
        println!("{} {}", "✓".green().bold(), status);
    } else {
        println!("{} {}", "✗".red().bold(), status);
    }
    Ok(())
}

async fn verify(
    controller: &TorProcess,
    client: &HttpProbeClient,
    config: &TomlConfig,
) -> Result<ExitStatus, TorProcError> {
    let ready = controller
        .wait_until_ready(
            client,
            config.lifecycle.retry_interval(),
            config.lifecycle.max_wait(),
        )
        .await;
    print_readiness(ready);
    if !ready {
        return Err(ProbeError::NotReady.into());
    }

    let body = client.get(controller.check_url()).await?;
    Ok(ExitStatus::parse(&body))
}

/// Run the kill command
pub fn run_kill(config: &TomlConfig) -> Result<(), TorProcError> {
    let controller = TorProcess::from_config(config)?;
    let found = controller.find_running_instances().len();
    let killed = controller.kill_existing();

    info!(found, killed, "Kill command finished");
    if found == 0 {
        println!("No running instance found");
    } else {
        println!("Terminated {} of {} instance(s)", killed, found);
    }
    Ok(())
}

/// Probe client routed through the configured SOCKS endpoint
fn probe_client(config: &TomlConfig) -> Result<HttpProbeClient, ProbeError> {
    HttpProbeClient::through_proxy(&config.proxy, config.lifecycle.probe_timeout())
}

/// Dispose the controller on Ctrl+C so a pending wait returns promptly
fn dispose_on_ctrl_c(controller: &Arc<TorProcess>) -> JoinHandle<()> {
    let controller = Arc::clone(controller);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupted, disposing");
            controller.dispose();
        }
    })
}

fn print_process(process: &ProcessRef) {
    let verb = match process.origin {
        ProcessOrigin::Launched => "Started",
        ProcessOrigin::Adopted => "Using running",
    };
    println!(
        "{} {} Tor Browser (pid {})",
        "✓".green().bold(),
        verb,
        process.pid
    );
}

fn print_readiness(ready: bool) {
    if ready {
        println!("{} Tor is ready", "✓".green().bold());
    } else {
        println!("{} Tor did not become ready", "✗".red().bold());
    }
}
