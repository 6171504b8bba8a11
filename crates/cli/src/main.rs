// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! crew - worker lifecycle CLI

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;
mod error;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{daemon, demo, worker};

use crate::client::{find_project_root, DaemonClient};
use crate::error::CrewError;
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "crew", version, about = "Crew - durable worker lifecycle demo")]
struct Cli {
    /// Project root directory
    #[arg(long, global = true)]
    repo: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value_t)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a worker
    Create(worker::CreateArgs),
    /// Show one worker
    Status {
        /// Worker id
        id: String,
    },
    /// Mark a worker completed
    Complete(worker::CompleteArgs),
    /// List registered workers, failed first
    List,
    /// Demo generator control
    Demo(demo::DemoArgs),
    /// Daemon management
    Daemon(daemon::DaemonArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<CrewError>() {
                Some(crew) => eprint!("{}", crew),
                None => eprintln!("error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let format = cli.output;

    // Daemon management does not need a connection
    if let Commands::Daemon(args) = cli.command {
        return daemon::daemon(args, cli.repo, format).await;
    }

    let project_root = cli.repo.map_or_else(find_project_root, Ok)?;
    let client = DaemonClient::connect_or_start(project_root)
        .await
        .map_err(CrewError::from)?;

    match cli.command {
        Commands::Create(args) => worker::create(&client, args, format).await,
        Commands::Status { id } => worker::status(&client, &id, format).await,
        Commands::Complete(args) => worker::complete(&client, args).await,
        Commands::List => worker::list(&client, format).await,
        Commands::Demo(args) => demo::handle(&client, args, format).await,
        Commands::Daemon(_) => Ok(()),
    }
}

/// Diagnostics go to stderr, quiet unless RUST_LOG asks for more
fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
