// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker commands: create, status, complete, list

use std::time::Duration;

use anyhow::Result;
use clap::Args;

use crate::client::{ClientError, DaemonClient};
use crate::error::CrewError;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct CreateArgs {
    /// What the worker should do
    pub task_description: String,

    /// Delay before the worker starts, in milliseconds
    #[arg(long, default_value = "0")]
    pub delay_ms: u64,

    /// Idempotency key; retrying with the same key returns the same worker
    #[arg(long)]
    pub key: Option<String>,
}

#[derive(Args)]
pub struct CompleteArgs {
    /// Worker id
    pub id: String,

    /// Idempotency key for the completion
    #[arg(long)]
    pub key: Option<String>,
}

pub async fn create(client: &DaemonClient, args: CreateArgs, format: OutputFormat) -> Result<()> {
    let worker_id = client
        .create(
            &args.task_description,
            Duration::from_millis(args.delay_ms),
            args.key,
        )
        .await?;
    output::print(&worker_id, format, |id| format!("Created worker {}", id));
    Ok(())
}

pub async fn status(client: &DaemonClient, id: &str, format: OutputFormat) -> Result<()> {
    let worker = client.worker(id).await.map_err(|e| not_found(e, id))?;
    output::print(&worker, format, output::worker_detail);
    Ok(())
}

pub async fn complete(client: &DaemonClient, args: CompleteArgs) -> Result<()> {
    client
        .complete(&args.id, args.key)
        .await
        .map_err(|e| not_found(e, &args.id))?;
    println!("Completed worker {}", args.id);
    Ok(())
}

pub async fn list(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let workers = client.list().await?;
    output::print(&workers, format, |w| output::worker_table(w));
    Ok(())
}

fn not_found(err: ClientError, id: &str) -> anyhow::Error {
    match err {
        ClientError::Rejected(message) if message.starts_with("worker not found") => {
            CrewError::worker_not_found(id).into()
        }
        other => other.into(),
    }
}
