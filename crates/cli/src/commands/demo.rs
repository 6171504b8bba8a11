// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `crew demo`: pause and resume the demo generator

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::client::DaemonClient;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct DemoArgs {
    #[command(subcommand)]
    pub command: DemoCommand,
}

#[derive(Subcommand)]
pub enum DemoCommand {
    /// Stop creating demo workers
    Freeze,
    /// Resume creating demo workers
    Unfreeze,
    /// Flip between frozen and running
    Toggle,
    /// Show whether the generator is frozen
    Status,
}

pub async fn handle(client: &DaemonClient, args: DemoArgs, format: OutputFormat) -> Result<()> {
    let frozen = match args.command {
        DemoCommand::Freeze => set(client, true).await?,
        DemoCommand::Unfreeze => set(client, false).await?,
        DemoCommand::Toggle => {
            let frozen = client.is_frozen().await?;
            set(client, !frozen).await?
        }
        DemoCommand::Status => client.is_frozen().await?,
    };

    output::print(&serde_json::json!({ "frozen": frozen }), format, |_| {
        if frozen {
            "Demo generator frozen".to_string()
        } else {
            "Demo generator running".to_string()
        }
    });
    Ok(())
}

async fn set(client: &DaemonClient, frozen: bool) -> Result<bool> {
    client.freeze(frozen).await?;
    Ok(frozen)
}
