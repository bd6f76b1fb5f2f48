//! List command implementation

use chrono::{DateTime, Local};
use colored::Colorize;
use torproc_core::config::toml_config::TomlConfig;
use torproc_core::error::TorProcError;
use torproc_core::process::TorProcess;
use torproc_core::types::ProcessInfo;

/// Run the list command
pub fn run_list(config: &TomlConfig, json: bool) -> Result<(), TorProcError> {
    let controller = TorProcess::from_config(config)?;
    let instances = controller.find_running_instances();

    if json {
        let output = serde_json::to_string_pretty(&instances).map_err(std::io::Error::from)?;
        println!("{}", output);
        return Ok(());
    }

    if instances.is_empty() {
        println!(
            "No running instance of {}",
            controller.location().path().display()
        );
        return Ok(());
    }

    println!(
        "{:>8}  {:>8}  {:<19}  {}",
        "PID".bold(),
        "SESSION".bold(),
        "STARTED".bold(),
        "EXECUTABLE".bold()
    );
    for instance in &instances {
        println!("{}", format_row(instance));
    }

    Ok(())
}

fn format_row(instance: &ProcessInfo) -> String {
    let session = instance
        .session_id
        .map(|sid| sid.to_string())
        .unwrap_or_else(|| "-".to_string());
    let exe = instance
        .exe
        .as_ref()
        .map(|exe| exe.display().to_string())
        .unwrap_or_else(|| instance.name.clone());
    let pid = if instance.exited {
        format!("{:>8}", instance.pid).dimmed().to_string()
    } else {
        format!("{:>8}", instance.pid)
    };

    format!(
        "{}  {:>8}  {:<19}  {}",
        pid,
        session,
        format_started(instance.started_at),
        exe
    )
}

fn format_started(started_at: Option<u64>) -> String {
    started_at
        .and_then(|secs| i64::try_from(secs).ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|utc| utc.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}
