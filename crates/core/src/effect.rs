// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effects and events for state machine orchestration

use crate::call::{Call, CreateRequest};
use crate::id::IdempotencyKey;
use crate::operation::Operation;
use crate::worker::WorkerId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Side effects that state machines request from the hosting runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Durably schedule `call` for delivery at or after `delay` from now
    Schedule {
        call: Call,
        delay: Duration,
        key: IdempotencyKey,
    },
    /// Deliver `call` before the current operation returns
    Invoke { call: Call, key: IdempotencyKey },
    /// Construct a brand-new worker and deliver `Create` to it
    Construct {
        key: IdempotencyKey,
        request: CreateRequest,
    },
    /// Record a state change in the current transaction
    Persist { operation: Operation },
    /// Emit an event for observers
    Emit { event: Event },
}

impl Effect {
    pub fn persist(operation: Operation) -> Self {
        Effect::Persist { operation }
    }

    pub fn emit(event: Event) -> Self {
        Effect::Emit { event }
    }
}

/// Effects that carry a stable name and structured fields for log spans
pub trait TracedEffect {
    fn name(&self) -> &'static str;

    fn fields(&self) -> Vec<(&'static str, String)>;
}

/// Events emitted by state machines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    WorkerCreated { id: WorkerId },
    WorkerStarted { id: WorkerId },
    WorkerCompleted { id: WorkerId },
    WorkerFailed { id: WorkerId },
    WorkerRegistered { id: WorkerId },
    WorkerRemoved { id: WorkerId },
    RegistryInitialized,
    CreationFrozen { frozen: bool },
    DemoIteration { iteration: u64, created: usize },
}

impl Event {
    /// Short name used as the log message
    pub fn name(&self) -> &'static str {
        match self {
            Event::WorkerCreated { .. } => "not started",
            Event::WorkerStarted { .. } => "in progress",
            Event::WorkerCompleted { .. } => "completed",
            Event::WorkerFailed { .. } => "failed",
            Event::WorkerRegistered { .. } => "registered",
            Event::WorkerRemoved { .. } => "removed",
            Event::RegistryInitialized => "registry initialized",
            Event::CreationFrozen { frozen: true } => "freezing worker creation",
            Event::CreationFrozen { frozen: false } => "unfreezing worker creation",
            Event::DemoIteration { .. } => "demo iteration",
        }
    }
}

impl TracedEffect for Effect {
    fn name(&self) -> &'static str {
        match self {
            Effect::Schedule { .. } => "schedule",
            Effect::Invoke { .. } => "invoke",
            Effect::Construct { .. } => "construct",
            Effect::Persist { .. } => "persist",
            Effect::Emit { .. } => "emit",
        }
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Effect::Schedule { call, delay, key } => vec![
                ("call", call.method().to_string()),
                ("entity", call.entity()),
                ("delay_ms", delay.as_millis().to_string()),
                ("key", key.to_string()),
            ],
            Effect::Invoke { call, key } => vec![
                ("call", call.method().to_string()),
                ("entity", call.entity()),
                ("key", key.to_string()),
            ],
            Effect::Construct { key, request } => vec![
                ("key", key.to_string()),
                ("task_description", request.task_description.clone()),
                ("start_delay_ms", request.start_delay_ms.to_string()),
            ],
            Effect::Persist { operation } => vec![("operation", operation.name().to_string())],
            Effect::Emit { event } => vec![("event", event.name().to_string())],
        }
    }
}
