// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup, recovery and shutdown

use std::fs::File;
use std::sync::Arc;
use std::time::Instant;

use crew_core::{initialize_key, SystemClock, UuidIdGen};
use crew_engine::{Runtime, RuntimeConfig, RuntimeError};
use crew_daemon::{Config, ConfigError};
use fs2::FileExt;
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::server::ServerContext;

/// Runtime type used by the daemon
pub type DaemonRuntime = Runtime<SystemClock, UuidIdGen>;

/// Daemon state during operation
pub struct DaemonState {
    /// Configuration
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Unix socket listener
    pub listener: UnixListener,
    /// Shared with every connection task
    pub ctx: Arc<ServerContext>,
}

impl DaemonState {
    pub fn runtime(&self) -> &Arc<DaemonRuntime> {
        &self.ctx.runtime
    }

    /// Shutdown the daemon gracefully
    pub fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        for path in [
            &self.config.socket_path,
            &self.config.lock_path,
            &self.config.version_path,
        ] {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!("Failed to remove {}: {}", path.display(), e);
                }
            }
        }

        // The WAL is fsynced on every commit; nothing to flush here.
        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(std::path::PathBuf, std::io::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] crew_engine::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config).await {
        Ok(state) => Ok(state),
        Err(e) => {
            // Clean up any resources created before failure
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config) -> Result<DaemonState, LifecycleError> {
    // 1. Create directories
    for path in [&config.socket_path, &config.lock_path, &config.wal_path] {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // 2. Acquire lock file FIRST - prevents races
    let mut lock_file = File::create(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    use std::io::Write;
    writeln!(lock_file, "{}", std::process::id())?;

    std::fs::write(&config.version_path, env!("CARGO_PKG_VERSION"))?;

    // 3. Load settings BEFORE binding socket (fail fast on a bad crew.toml)
    let settings = RuntimeConfig::load(&config.project_root)?;
    let demo = settings.demo;

    // 4. Rebuild state from the WAL and pick up interrupted work
    let runtime = Arc::new(Runtime::open(
        &config.wal_path,
        SystemClock,
        UuidIdGen,
        settings,
    )?);
    let recovered = runtime.recover();
    info!(
        calls = recovered.calls,
        workflows = recovered.workflows,
        "recovered pending work"
    );

    // 5. Make sure the registry exists, then kick off the demo loop
    runtime.initialize_registry(initialize_key()).await?;
    if demo {
        runtime.start_demo()?;
    }

    // 6. Remove stale socket and bind (LAST - only after all validation passes)
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    info!(
        "Daemon started for project: {}",
        config.project_root.display()
    );

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        listener,
        ctx: Arc::new(ServerContext {
            runtime,
            start_time: Instant::now(),
            shutdown: Notify::new(),
        }),
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    for path in [
        &config.socket_path,
        &config.version_path,
        &config.lock_path,
    ] {
        if path.exists() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
pub(crate) mod tests;
