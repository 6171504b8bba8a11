// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! crew execution engine
//!
//! Hosts the worker and registry state machines: durable keyed state,
//! scheduled and immediate calls deduplicated by idempotency key,
//! per-entity serialization and the resumable Run and Demo workflows.

mod config;
mod error;
mod executor;
mod locks;
mod runtime;
mod scheduler;
mod workflow;

pub use config::{ConfigError, RuntimeConfig, CONFIG_FILE};
pub use error::RuntimeError;
pub use executor::{ExecuteError, Executor};
pub use runtime::{Recovered, Runtime};
pub use scheduler::{Due, Scheduler};
