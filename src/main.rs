//! torproc - Tor Browser lifecycle CLI
//!
//! Starts, adopts, verifies and stops a local Tor Browser instance and
//! confirms through its SOCKS endpoint that traffic is routed over Tor.

use clap::{Parser, Subcommand};
use torproc_core::{error::TorProcError, init_logging};
use torproc_core::types::{StartPolicy, WindowVisibility};

mod cli;

#[derive(Parser)]
#[command(name = "torproc")]
#[command(about = "Start, adopt, verify and stop a local Tor Browser instance")]
struct Cli {
    /// Tor Browser executable or installation directory (overrides the config file)
    #[arg(long, global = true)]
    tor_path: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List running Tor Browser instances
    List {
        /// Print the instances as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start Tor Browser, or adopt a running instance, and leave it running
    Start {
        /// throw_if_running, return_existing or kill_existings
        #[arg(long)]
        policy: Option<StartPolicy>,
        /// hidden or normal
        #[arg(long)]
        window: Option<WindowVisibility>,
        /// Wait until the SOCKS endpoint routes through Tor
        #[arg(long)]
        wait: bool,
    },
    /// Wait until the SOCKS endpoint routes through Tor
    Wait {
        /// Seconds between attempts
        #[arg(long, allow_negative_numbers = true)]
        retry_secs: Option<i64>,
        /// Total seconds to wait before giving up
        #[arg(long, allow_negative_numbers = true)]
        max_wait_secs: Option<i64>,
    },
    /// Start or adopt an instance, verify it and report the exit address
    Check {
        /// Leave the instance running afterwards
        #[arg(long)]
        keep: bool,
    },
    /// Terminate every running Tor Browser instance
    Kill,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize logging
    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(2);
    }

    let result = run(Cli::parse()).await;

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            // Configuration errors (exit code 2), runtime errors (exit code 1)
            let exit_code = if e.is_configuration() { 2 } else { 1 };
            eprintln!("{}", e);
            std::process::exit(exit_code);
        }
    }
}

async fn run(args: Cli) -> Result<(), TorProcError> {
    let tor_path = args.tor_path;

    match args.command {
        Commands::Init { force } => cli::init::run_init(tor_path, force),
        Commands::List { json } => cli::list::run_list(&cli::load_config(tor_path)?, json),
        Commands::Start {
            policy,
            window,
            wait,
        } => cli::lifecycle::run_start(&cli::load_config(tor_path)?, policy, window, wait).await,
        Commands::Wait {
            retry_secs,
            max_wait_secs,
        } => {
            cli::lifecycle::run_wait(&cli::load_config(tor_path)?, retry_secs, max_wait_secs).await
        }
        Commands::Check { keep } => {
            cli::lifecycle::run_check(&cli::load_config(tor_path)?, keep).await
        }
        Commands::Kill => cli::lifecycle::run_kill(&cli::load_config(tor_path)?),
    }
}
