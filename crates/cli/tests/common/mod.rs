// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test utilities for CLI integration tests.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A project directory plus isolated state and socket directories
pub struct TestEnv {
    pub project: TempDir,
    pub state: TempDir,
}

impl TestEnv {
    /// New project with the demo generator turned off and short timings
    pub fn new() -> Self {
        let project = TempDir::new().expect("Failed to create project directory");
        let state = TempDir::new().expect("Failed to create state directory");
        std::fs::write(
            project.path().join("crew.toml"),
            "demo = false\ntick_interval = \"10ms\"\n\n[timings]\ncomplete_pause = \"1ms\"\n",
        )
        .expect("Failed to write crew.toml");
        Self { project, state }
    }

    pub fn project_root(&self) -> &Path {
        self.project.path()
    }

    /// `crew` with every path pointed inside this environment
    pub fn crew(&self) -> Command {
        let mut cmd = Command::cargo_bin("crew").expect("crew binary");
        cmd.current_dir(self.project.path())
            .env("XDG_STATE_HOME", self.state.path())
            .env("CREW_SOCKET_DIR", self.state.path())
            .env("CREW_TIMEOUT_EXIT_MS", "500")
            .env_remove("CREW_PROJECT_ROOT")
            .env_remove("RUST_LOG");
        if let Some(crewd) = crewd_binary() {
            cmd.env("CREW_DAEMON_BINARY", crewd);
        }
        cmd
    }
}

impl Drop for TestEnv {
    fn drop(&mut self) {
        // Stop any daemon a test left behind
        let _ = self.crew().args(["daemon", "stop"]).output();
    }
}

/// Path to a built `crewd` next to the `crew` test binary, if there is one
pub fn crewd_binary() -> Option<PathBuf> {
    let crew = assert_cmd::cargo::cargo_bin("crew");
    let crewd = crew.parent()?.join("crewd");
    crewd.exists().then_some(crewd)
}
