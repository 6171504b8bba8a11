// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! crew-core: pure state machines for the crew worker fleet
//!
//! This crate provides:
//! - The worker lifecycle state machine and the registry that tracks live workers
//! - A deterministic, retry-stable outcome decision derived from worker identity
//! - Tagged request/response types for every operation
//! - Effects requested by the state machines and the WAL operations that persist them

pub mod clock;
pub mod id;
pub mod timing;

// State machines (order matters for dependencies)
pub mod call;
pub mod demo;
pub mod effect;
pub mod operation;
pub mod outcome;
pub mod registry;
pub mod worker;

// Re-exports
pub use call::{
    AddRequest, Call, CompleteRequest, CreateRequest, DemoRequest, FreezeRequest,
    InitializeRequest, IsFrozenRequest, IsFrozenResponse, ListRequest, ListResponse,
    RegistryCall, RemoveRequest, RunRequest, StartRequest, StatusRequest, StatusResponse,
    WorkerCall, WorkerInfo, worker_entity,
};
pub use clock::{Clock, FakeClock, SystemClock};
pub use effect::{Effect, Event, TracedEffect};
pub use id::{IdGen, IdempotencyKey, KeyError, SequentialIdGen, UuidIdGen};
pub use operation::Operation;
pub use outcome::{decide, outcome_value, Outcome, FAILURE_THRESHOLD};
pub use registry::{
    construct_key, demo_key, initialize_key, Registry, RegistryEvent, REGISTRY_ID,
};
pub use timing::Timings;
pub use worker::{removal_key, Worker, WorkerEvent, WorkerId, WorkerStatus};
