// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `crew daemon`: start, stop and inspect the per-project daemon

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use crew_daemon::Config;

use crate::client::{self, ClientError, DaemonClient};
use crate::error::CrewError;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon if it is not running
    Start,
    /// Stop the daemon
    Stop,
    /// Show daemon status
    Status,
    /// Print the daemon log
    Logs {
        /// Number of trailing lines to show
        #[arg(short = 'n', long, default_value = "50")]
        lines: usize,
    },
}

pub async fn daemon(args: DaemonArgs, repo: Option<PathBuf>, format: OutputFormat) -> Result<()> {
    let project_root = repo.map_or_else(client::find_project_root, Ok)?;

    match args.command {
        DaemonCommand::Start => {
            let client = DaemonClient::connect_or_start(project_root)
                .await
                .map_err(CrewError::from)?;
            let version = client.hello().await?;
            println!("Daemon running (version {})", version);
        }

        DaemonCommand::Stop => {
            if client::daemon_stop(&project_root).await? {
                println!("Daemon stopped");
            } else {
                println!("Daemon not running");
            }
        }

        DaemonCommand::Status => {
            let client = match DaemonClient::connect(&project_root) {
                Ok(client) => client,
                Err(ClientError::DaemonNotRunning) => {
                    println!("Daemon not running");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };
            let status = client.status().await?;
            output::print(&status, format, |s| {
                format!(
                    "Daemon running\n  Uptime: {}s\n  Workers: {} registered, {} active, {} total\n  Scheduled calls: {}\n  Demo: {}",
                    s.uptime_secs,
                    s.workers_registered,
                    s.workers_active,
                    s.workers_total,
                    s.scheduled_calls,
                    if s.frozen { "frozen" } else { "running" },
                )
            });
        }

        DaemonCommand::Logs { lines } => {
            let config = Config::for_project(&project_root)?;
            let content = match std::fs::read_to_string(&config.log_path) {
                Ok(content) => content,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    println!("No daemon log at {}", config.log_path.display());
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };
            let all: Vec<&str> = content.lines().collect();
            for line in &all[all.len().saturating_sub(lines)..] {
                println!("{}", line);
            }
        }
    }

    Ok(())
}
