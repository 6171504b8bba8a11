// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-friendly error display with context and suggestions.

use std::fmt;

use crate::client::ClientError;

/// Error with context and recovery suggestions for user-friendly display.
#[derive(Debug)]
pub struct CrewError {
    /// What went wrong
    pub message: String,
    /// Why it might have happened
    pub context: Vec<String>,
    /// How to fix it
    pub suggestions: Vec<String>,
}

impl CrewError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// The daemon exited or never came up
    pub fn daemon_start_failed(details: &str) -> Self {
        let mut err = Self::new("Failed to start daemon");
        for line in details.lines() {
            err = err.with_context(line);
        }
        err.with_suggestion("Check the daemon log: crew daemon logs")
            .with_suggestion("Stop a stuck daemon: crew daemon stop")
    }

    /// A worker id the daemon does not know
    pub fn worker_not_found(id: &str) -> Self {
        Self::new(format!("Worker '{}' not found", id))
            .with_context("Completed workers leave the registry after the removal delay")
            .with_suggestion("List registered workers: crew list")
    }
}

impl From<ClientError> for CrewError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::DaemonStartFailed(details) => Self::daemon_start_failed(&details),
            ClientError::DaemonStartTimeout => {
                Self::daemon_start_failed("timed out waiting for the socket")
            }
            other => Self::new(other.to_string()),
        }
    }
}

impl fmt::Display for CrewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.message)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            for ctx in &self.context {
                writeln!(f, "  -> {}", ctx)?;
            }
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            writeln!(f, "suggestions:")?;
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for CrewError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CrewError::new("Something went wrong")
            .with_context("First context")
            .with_context("Second context")
            .with_suggestion("Try this")
            .with_suggestion("Or this");

        let output = format!("{}", err);
        assert!(output.contains("error: Something went wrong"));
        assert!(output.contains("-> First context"));
        assert!(output.contains("-> Second context"));
        assert!(output.contains("1. Try this"));
        assert!(output.contains("2. Or this"));
    }

    #[test]
    fn start_failure_lists_each_log_line() {
        let err = CrewError::from(ClientError::DaemonStartFailed(
            "bad crew.toml\nunknown field `demo_mode`".to_string(),
        ));
        let output = err.to_string();
        assert!(output.contains("-> bad crew.toml"));
        assert!(output.contains("-> unknown field `demo_mode`"));
        assert!(output.contains("crew daemon logs"));
    }

    #[test]
    fn worker_not_found_points_at_list() {
        let output = CrewError::worker_not_found("w-7").to_string();
        assert!(output.contains("'w-7'"));
        assert!(output.contains("crew list"));
    }
}
