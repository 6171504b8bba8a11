// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol between `crew` and `crewd`
//!
//! Every message is a 4-byte big-endian length followed by that many bytes
//! of JSON.

use crew_core::{WorkerId, WorkerInfo, WorkerStatus};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Version reported in `Hello`; the CLI refuses to talk to a different one
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default timeout for a single request or response
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on a single message
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Request from CLI to daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Liveness check
    Ping,

    /// Version handshake
    Hello { version: String },

    /// Daemon summary
    Status,

    /// Stop the daemon
    Shutdown,

    /// Construct and create a new worker
    Create {
        task_description: String,
        #[serde(default)]
        start_delay_ms: u64,
        #[serde(default)]
        idempotency_key: Option<String>,
    },

    /// Mark a worker completed
    Complete {
        id: String,
        #[serde(default)]
        idempotency_key: Option<String>,
    },

    /// Look up one worker
    WorkerStatus { id: String },

    /// List the registered workers
    List,

    /// Pause or resume the demo generator
    Freeze { frozen: bool },

    /// Whether the demo generator is paused
    IsFrozen,
}

/// Response from daemon to CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Ok,

    Pong,

    Hello { version: String },

    ShuttingDown,

    Status {
        uptime_secs: u64,
        /// Workers known to the daemon, removed ones included
        workers_total: usize,
        /// Workers currently in the registry
        workers_registered: usize,
        /// Workers that are NotStarted or InProgress
        workers_active: usize,
        /// Scheduled calls not yet delivered
        scheduled_calls: usize,
        frozen: bool,
    },

    Created { worker_id: WorkerId },

    Worker {
        worker_id: WorkerId,
        task_description: String,
        status: WorkerStatus,
    },

    Workers { workers: Vec<WorkerInfo> },

    Frozen { frozen: bool },

    Error { message: String },
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Timed out")]
    Timeout,

    #[error("Connection closed")]
    ConnectionClosed,
}

/// Serialize a message to JSON bytes (no length prefix)
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(message)?)
}

/// Deserialize a message from JSON bytes
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Read one length-prefixed message
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed)
        }
        Err(e) => return Err(e.into()),
    }

    let size = u32::from_be_bytes(len_buf) as usize;
    if size > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size,
            max: MAX_MESSAGE_SIZE,
        });
    }

    let mut buf = vec![0u8; size];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Write one length-prefixed message
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), ProtocolError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: data.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    writer.write_all(&(data.len() as u32).to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a request, giving up after `timeout`
pub async fn read_request<R: AsyncRead + Unpin>(
    reader: &mut R,
    timeout: Duration,
) -> Result<Request, ProtocolError> {
    let bytes = tokio::time::timeout(timeout, read_message(reader))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    decode(&bytes)
}

/// Write a response, giving up after `timeout`
pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
    timeout: Duration,
) -> Result<(), ProtocolError> {
    let bytes = encode(response)?;
    tokio::time::timeout(timeout, write_message(writer, &bytes))
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
