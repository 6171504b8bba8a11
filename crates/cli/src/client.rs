// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use crew_core::{WorkerId, WorkerInfo, WorkerStatus};
use crew_daemon::protocol::{self, ProtocolError};
use crew_daemon::{Config, ConfigError, Request, Response};
use thiserror::Error;
use tokio::net::UnixStream;

// Timeout configuration (env vars in milliseconds)
fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Timeout for IPC requests
pub fn timeout_ipc() -> Duration {
    parse_duration_ms("CREW_TIMEOUT_IPC_MS").unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for daemon to start
pub fn timeout_connect() -> Duration {
    parse_duration_ms("CREW_TIMEOUT_CONNECT_MS").unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for process to exit
pub fn timeout_exit() -> Duration {
    parse_duration_ms("CREW_TIMEOUT_EXIT_MS").unwrap_or(Duration::from_secs(2))
}

/// Polling interval for retries
pub fn poll_interval() -> Duration {
    parse_duration_ms("CREW_POLL_INTERVAL_MS").unwrap_or(Duration::from_millis(50))
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not running")]
    DaemonNotRunning,

    #[error("Failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("Connection timeout waiting for daemon to start")]
    DaemonStartTimeout,

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("{0}")]
    Rejected(String),

    #[error("Unexpected response from daemon")]
    UnexpectedResponse,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Summary returned by [`DaemonClient::status`]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DaemonStatus {
    pub uptime_secs: u64,
    pub workers_total: usize,
    pub workers_registered: usize,
    pub workers_active: usize,
    pub scheduled_calls: usize,
    pub frozen: bool,
}

/// Daemon client
pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// Connect to daemon, auto-starting if not running
    pub async fn connect_or_start(project_root: PathBuf) -> Result<Self, ClientError> {
        let config = Config::for_project(&project_root)?;

        // Restart the daemon if it was built from a different version
        if let Ok(daemon_version) = std::fs::read_to_string(&config.version_path) {
            if daemon_version.trim() != env!("CARGO_PKG_VERSION") {
                let _ = daemon_stop(&project_root).await;
            }
        }

        match Self::connect(&project_root) {
            Ok(client) => Ok(client),
            Err(ClientError::DaemonNotRunning) => {
                let child = start_daemon_background(&project_root)?;
                Self::connect_with_retry(&project_root, timeout_connect(), child).await
            }
            Err(e) => Err(wrap_with_startup_error(e, &config)),
        }
    }

    /// Connect to existing daemon (no auto-start)
    pub fn connect(project_root: &Path) -> Result<Self, ClientError> {
        let socket_path = Config::for_project(project_root)?.socket_path;

        if !socket_path.exists() {
            return Err(ClientError::DaemonNotRunning);
        }

        Ok(Self { socket_path })
    }

    async fn connect_with_retry(
        project_root: &Path,
        timeout: Duration,
        mut child: std::process::Child,
    ) -> Result<Self, ClientError> {
        let config = Config::for_project(project_root)?;
        let start = Instant::now();
        while start.elapsed() < timeout {
            // Check if daemon process exited early (startup failure)
            if let Ok(Some(status)) = child.try_wait() {
                // Poll for startup error in log (filesystem may need to sync)
                let poll_start = Instant::now();
                while poll_start.elapsed() < timeout_exit() {
                    if let Some(err) = read_startup_error(&config) {
                        return Err(ClientError::DaemonStartFailed(err));
                    }
                    tokio::time::sleep(poll_interval()).await;
                }
                return Err(ClientError::DaemonStartFailed(format!(
                    "exited with {}",
                    status
                )));
            }

            match Self::connect(project_root) {
                Ok(client) => return Ok(client),
                Err(ClientError::DaemonNotRunning) => {
                    tokio::time::sleep(poll_interval()).await;
                }
                Err(e) => return Err(wrap_with_startup_error(e, &config)),
            }
        }

        Err(wrap_with_startup_error(
            ClientError::DaemonStartTimeout,
            &config,
        ))
    }

    /// Send a request and receive a response
    pub async fn send(&self, request: Request) -> Result<Response, ClientError> {
        let timeout = timeout_ipc();
        tracing::debug!(?request, "sending request");
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (mut reader, mut writer) = stream.into_split();

        let data = protocol::encode(&request)?;
        tokio::time::timeout(timeout, protocol::write_message(&mut writer, &data))
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        let response_bytes = tokio::time::timeout(timeout, protocol::read_message(&mut reader))
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        Ok(protocol::decode(&response_bytes)?)
    }

    /// Send a request that only acknowledges
    async fn send_ok(&self, request: Request) -> Result<(), ClientError> {
        match self.send(request).await? {
            Response::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Get daemon version via Hello handshake
    pub async fn hello(&self) -> Result<String, ClientError> {
        let request = Request::Hello {
            version: env!("CARGO_PKG_VERSION").to_string(),
        };
        match self.send(request).await? {
            Response::Hello { version } => Ok(version),
            other => Err(unexpected(other)),
        }
    }

    /// Get daemon status
    pub async fn status(&self) -> Result<DaemonStatus, ClientError> {
        match self.send(Request::Status).await? {
            Response::Status {
                uptime_secs,
                workers_total,
                workers_registered,
                workers_active,
                scheduled_calls,
                frozen,
            } => Ok(DaemonStatus {
                uptime_secs,
                workers_total,
                workers_registered,
                workers_active,
                scheduled_calls,
                frozen,
            }),
            other => Err(unexpected(other)),
        }
    }

    /// Request daemon shutdown
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.send(Request::Shutdown).await? {
            Response::Ok | Response::ShuttingDown => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub async fn create(
        &self,
        task_description: &str,
        start_delay: Duration,
        idempotency_key: Option<String>,
    ) -> Result<WorkerId, ClientError> {
        let request = Request::Create {
            task_description: task_description.to_string(),
            start_delay_ms: start_delay.as_millis() as u64,
            idempotency_key,
        };
        match self.send(request).await? {
            Response::Created { worker_id } => Ok(worker_id),
            other => Err(unexpected(other)),
        }
    }

    pub async fn complete(
        &self,
        id: &str,
        idempotency_key: Option<String>,
    ) -> Result<(), ClientError> {
        self.send_ok(Request::Complete {
            id: id.to_string(),
            idempotency_key,
        })
        .await
    }

    pub async fn worker(&self, id: &str) -> Result<WorkerInfo, ClientError> {
        match self.send(Request::WorkerStatus { id: id.to_string() }).await? {
            Response::Worker {
                worker_id,
                task_description,
                status,
            } => Ok(WorkerInfo {
                worker_id,
                task_description,
                status,
            }),
            other => Err(unexpected(other)),
        }
    }

    /// Registered workers, failed ones first
    pub async fn list(&self) -> Result<Vec<WorkerInfo>, ClientError> {
        match self.send(Request::List).await? {
            Response::Workers { mut workers } => {
                failed_first(&mut workers);
                Ok(workers)
            }
            other => Err(unexpected(other)),
        }
    }

    pub async fn freeze(&self, frozen: bool) -> Result<(), ClientError> {
        self.send_ok(Request::Freeze { frozen }).await
    }

    pub async fn is_frozen(&self) -> Result<bool, ClientError> {
        match self.send(Request::IsFrozen).await? {
            Response::Frozen { frozen } => Ok(frozen),
            other => Err(unexpected(other)),
        }
    }
}

/// Move failed workers to the front, keeping registry order within each group
pub fn failed_first(workers: &mut [WorkerInfo]) {
    workers.sort_by_key(|w| w.status != WorkerStatus::Failed);
}

fn unexpected(response: Response) -> ClientError {
    match response {
        Response::Error { message } => ClientError::Rejected(message),
        _ => ClientError::UnexpectedResponse,
    }
}

/// Start the daemon in the background, returning the child process handle
fn start_daemon_background(project_root: &Path) -> Result<std::process::Child, ClientError> {
    let crewd_path = find_crewd_binary();

    Command::new(&crewd_path)
        .arg(project_root)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| ClientError::DaemonStartFailed(e.to_string()))
}

/// Stop the daemon (graceful first, then forceful)
/// Returns true if daemon was stopped, false if it wasn't running
pub async fn daemon_stop(project_root: &Path) -> Result<bool, ClientError> {
    let config = Config::for_project(project_root)?;
    let client = match DaemonClient::connect(project_root) {
        Ok(c) => c,
        Err(ClientError::DaemonNotRunning) => {
            cleanup_stale_pid(&config);
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    let shutdown_result = client.shutdown().await;

    if let Some(pid) = read_daemon_pid(&config) {
        if shutdown_result.is_ok() {
            wait_for_exit(pid, timeout_exit()).await;
        }

        // Force kill if still running
        if process_exists(pid) {
            tracing::warn!(pid, "daemon did not exit, killing it");
            force_kill_daemon(pid);
            wait_for_exit(pid, timeout_exit()).await;
        }
    }

    cleanup_stale_pid(&config);
    Ok(true)
}

/// Wait for a process to exit
async fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if !process_exists(pid) {
            return true;
        }
        tokio::time::sleep(poll_interval()).await;
    }
    false
}

/// Find the crewd binary
fn find_crewd_binary() -> PathBuf {
    // Explicit override (used by tests to ensure correct binary)
    if let Ok(path) = std::env::var("CREW_DAEMON_BINARY") {
        return PathBuf::from(path);
    }

    // Check current executable's directory
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("crewd");
            if sibling.exists() {
                return sibling;
            }
        }
    }

    // Fall back to PATH lookup
    PathBuf::from("crewd")
}

/// Find the project root by walking up from current directory
///
/// Checks CREW_PROJECT_ROOT first, then walks up looking for `crew.toml`.
pub fn find_project_root() -> Result<PathBuf, ClientError> {
    if let Ok(root) = std::env::var("CREW_PROJECT_ROOT") {
        return Ok(PathBuf::from(root));
    }

    let cwd = std::env::current_dir()?;
    let mut current = cwd.clone();
    loop {
        if current.join("crew.toml").is_file() {
            return Ok(current);
        }
        if !current.pop() {
            // No crew.toml found, use current directory as project root
            return Ok(cwd);
        }
    }
}

/// Remove an orphaned PID file.
///
/// Called by daemon_stop when the daemon is not running or after stopping it.
fn cleanup_stale_pid(config: &Config) {
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

/// Get the PID from the daemon PID file, if it exists
pub fn read_daemon_pid(config: &Config) -> Option<u32> {
    std::fs::read_to_string(&config.lock_path)
        .ok()
        .and_then(|content| content.trim().parse::<u32>().ok())
}

/// Check if a process with the given PID exists
pub fn process_exists(pid: u32) -> bool {
    // Use kill -0 to check if process exists without sending a signal
    Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Force kill a daemon process
pub fn force_kill_daemon(pid: u32) -> bool {
    Command::new("kill")
        .args(["-9", &pid.to_string()])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Startup marker prefix that daemon writes to log before anything else.
/// Full format: "--- crewd: starting (pid: 12345)"
const STARTUP_MARKER_PREFIX: &str = "--- crewd: starting (pid: ";

/// Read daemon log from the last startup marker, looking for errors.
pub fn read_startup_error(config: &Config) -> Option<String> {
    let content = std::fs::read_to_string(&config.log_path).ok()?;
    parse_startup_error(&content)
}

fn parse_startup_error(log: &str) -> Option<String> {
    let start_pos = log.rfind(STARTUP_MARKER_PREFIX)?;
    let errors: Vec<&str> = log[start_pos..]
        .lines()
        .filter(|line| line.contains(" ERROR ") || line.contains("Failed to start"))
        .collect();

    if errors.is_empty() {
        return None;
    }

    // Format: "timestamp LEVEL target: message"; keep the message part
    let messages: Vec<String> = errors
        .iter()
        .filter_map(|line| line.split_once(": ").map(|(_, msg)| msg.to_string()))
        .collect();

    if messages.is_empty() {
        Some(errors.join("\n"))
    } else {
        Some(messages.join("\n"))
    }
}

/// Wrap an error with startup log info if available.
fn wrap_with_startup_error(err: ClientError, config: &Config) -> ClientError {
    if matches!(err, ClientError::DaemonStartFailed(_)) {
        return err;
    }

    match read_startup_error(config) {
        Some(startup_error) => ClientError::DaemonStartFailed(startup_error),
        None => err,
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
