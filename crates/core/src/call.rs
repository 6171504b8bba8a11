// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request and response records for every worker and registry operation
//!
//! Mutating operations are addressed through [`Call`] so they can be
//! written to the WAL and delivered later by the scheduler. Read
//! projections (`Status`, `List`, `IsFrozen`) are never scheduled.

use crate::registry::REGISTRY_ID;
use crate::worker::{WorkerId, WorkerStatus};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreateRequest {
    pub task_description: String,
    /// Zero means "as soon as the scheduler can"
    #[serde(default)]
    pub start_delay_ms: u64,
}

impl CreateRequest {
    pub fn new(task_description: impl Into<String>, start_delay: Duration) -> Self {
        Self {
            task_description: task_description.into(),
            start_delay_ms: start_delay.as_millis() as u64,
        }
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StartRequest {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunRequest {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompleteRequest {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusRequest {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: WorkerStatus,
    pub task_description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InitializeRequest {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddRequest {
    pub worker_id: WorkerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveRequest {
    pub worker_id: WorkerId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListRequest {}

/// One row of a [`ListResponse`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerInfo {
    pub worker_id: WorkerId,
    pub task_description: String,
    pub status: WorkerStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListResponse {
    pub workers: Vec<WorkerInfo>,
}

/// One iteration of the demo generator; the counter travels with the call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DemoRequest {
    pub iteration: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreezeRequest {
    pub frozen: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IsFrozenRequest {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsFrozenResponse {
    pub frozen: bool,
}

/// Mutating operations on a single worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum WorkerCall {
    Create(CreateRequest),
    Start(StartRequest),
    Run(RunRequest),
    Complete(CompleteRequest),
}

/// Mutating operations on the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum RegistryCall {
    Initialize(InitializeRequest),
    Add(AddRequest),
    Remove(RemoveRequest),
    Demo(DemoRequest),
    Freeze(FreezeRequest),
}

/// An addressed, durable call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum Call {
    Worker { id: WorkerId, call: WorkerCall },
    Registry { call: RegistryCall },
}

impl Call {
    pub fn worker(id: WorkerId, call: WorkerCall) -> Self {
        Call::Worker { id, call }
    }

    pub fn registry(call: RegistryCall) -> Self {
        Call::Registry { call }
    }

    /// Operation name, for logging
    pub fn method(&self) -> &'static str {
        match self {
            Call::Worker { call, .. } => match call {
                WorkerCall::Create(_) => "worker.create",
                WorkerCall::Start(_) => "worker.start",
                WorkerCall::Run(_) => "worker.run",
                WorkerCall::Complete(_) => "worker.complete",
            },
            Call::Registry { call } => match call {
                RegistryCall::Initialize(_) => "registry.initialize",
                RegistryCall::Add(_) => "registry.add",
                RegistryCall::Remove(_) => "registry.remove",
                RegistryCall::Demo(_) => "registry.demo",
                RegistryCall::Freeze(_) => "registry.freeze",
            },
        }
    }

    /// Name of the entity that serializes this call
    pub fn entity(&self) -> String {
        match self {
            Call::Worker { id, .. } => worker_entity(id),
            Call::Registry { .. } => format!("registry:{}", REGISTRY_ID),
        }
    }
}

/// Entity name of a worker
pub fn worker_entity(id: &WorkerId) -> String {
    format!("worker:{}", id)
}
