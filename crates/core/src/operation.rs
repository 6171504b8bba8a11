// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operations for the write-ahead log
//!
//! A transaction is a list of operations appended as one WAL entry, so the
//! operations of a single entity call become durable together or not at all.

use crate::call::Call;
use crate::id::IdempotencyKey;
use crate::worker::{WorkerId, WorkerStatus};
use serde::{Deserialize, Serialize};

/// Operations that can be persisted to the WAL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Bring the registry into existence, empty and unfrozen
    RegistryInitialize,

    /// Track a live worker
    RegistryAdd { worker_id: WorkerId },

    /// Stop tracking a worker
    RegistryRemove { worker_id: WorkerId },

    /// Set the admission flag
    RegistryFreeze { frozen: bool },

    /// Create a worker record in NOT_STARTED
    WorkerCreate {
        id: WorkerId,
        task_description: String,
    },

    /// Move a worker to a new status
    WorkerStatus { id: WorkerId, status: WorkerStatus },

    /// Bind a construction key to the worker id it produced
    WorkerConstruct { key: IdempotencyKey, id: WorkerId },

    /// A call accepted for later delivery
    CallScheduled {
        key: IdempotencyKey,
        call: Call,
        fire_at_ms: u64,
    },

    /// A scheduled call has been delivered and must not fire again
    CallDelivered { key: IdempotencyKey },

    /// The effect of the call with this key has been applied
    KeyApplied { key: IdempotencyKey },

    /// Checkpoint of a running Run workflow: when its simulated work ends
    WorkflowStarted {
        key: IdempotencyKey,
        worker_id: WorkerId,
        wake_at_ms: u64,
    },

    /// The Run workflow with this key has written its outcome
    WorkflowFinished { key: IdempotencyKey },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::RegistryInitialize => "registry_initialize",
            Operation::RegistryAdd { .. } => "registry_add",
            Operation::RegistryRemove { .. } => "registry_remove",
            Operation::RegistryFreeze { .. } => "registry_freeze",
            Operation::WorkerCreate { .. } => "worker_create",
            Operation::WorkerStatus { .. } => "worker_status",
            Operation::WorkerConstruct { .. } => "worker_construct",
            Operation::CallScheduled { .. } => "call_scheduled",
            Operation::CallDelivered { .. } => "call_delivered",
            Operation::KeyApplied { .. } => "key_applied",
            Operation::WorkflowStarted { .. } => "workflow_started",
            Operation::WorkflowFinished { .. } => "workflow_finished",
        }
    }
}
