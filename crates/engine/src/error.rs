// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine runtime

use crate::ExecuteError;
use crew_core::WorkerId;
use crew_storage::WalError;
use thiserror::Error;

/// Errors that can occur in the runtime
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("execute error: {0}")]
    Execute(#[from] ExecuteError),
    #[error("storage error: {0}")]
    Storage(#[from] WalError),
    #[error("worker not found: {0}")]
    WorkerNotFound(WorkerId),
    #[error("registry is not initialized")]
    RegistryNotInitialized,
}
