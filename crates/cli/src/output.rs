// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output formatting for CLI commands

use clap::ValueEnum;
use crew_core::WorkerInfo;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print `value` as pretty JSON, or as the text `render` produces
pub fn print<T: Serialize>(value: &T, format: OutputFormat, render: impl FnOnce(&T) -> String) {
    match format {
        OutputFormat::Text => println!("{}", render(value)),
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(value) {
                println!("{}", json);
            }
        }
    }
}

/// Table of workers, one per line
pub fn worker_table(workers: &[WorkerInfo]) -> String {
    if workers.is_empty() {
        return "No workers".to_string();
    }

    let mut out = format!("{:<38} {:<12} TASK", "ID", "STATUS");
    for w in workers {
        out.push('\n');
        out.push_str(&format!(
            "{:<38} {:<12} {}",
            w.worker_id.as_str(),
            w.status.to_string(),
            w.task_description
        ));
    }
    out
}

/// Multi-line detail view of one worker
pub fn worker_detail(worker: &WorkerInfo) -> String {
    format!(
        "Worker: {}\n  Task: {}\n  Status: {}",
        worker.worker_id, worker.task_description, worker.status
    )
}
