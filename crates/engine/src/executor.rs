// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effect executor
//!
//! Turns the effects of one entity call into a single WAL transaction.
//! Persist and Schedule effects become operations in that transaction.
//! Invoke effects are recorded as calls due now, so a crash before their
//! delivery leaves them pending for recovery. Invoke and Construct effects
//! are handed back for delivery once the transaction is durable.

use crate::Scheduler;
use crew_core::{Clock, Effect, Event, IdempotencyKey, Operation, TracedEffect};
use crew_storage::{MaterializedState, Wal, WalError};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during effect execution
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("storage error: {0}")]
    Storage(#[from] WalError),
}

/// Executes effects against the WAL, materialized state and scheduler
pub struct Executor<C: Clock> {
    wal: Arc<Mutex<Wal>>,
    state: Arc<Mutex<MaterializedState>>,
    scheduler: Arc<Mutex<Scheduler>>,
    clock: C,
}

impl<C: Clock> Executor<C> {
    pub fn new(wal: Wal, state: MaterializedState, clock: C) -> Self {
        Self {
            wal: Arc::new(Mutex::new(wal)),
            state: Arc::new(Mutex::new(state)),
            scheduler: Arc::new(Mutex::new(Scheduler::new())),
            clock,
        }
    }

    pub fn scheduler(&self) -> Arc<Mutex<Scheduler>> {
        Arc::clone(&self.scheduler)
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Run `f` against the current state
    pub fn with_state<R>(&self, f: impl FnOnce(&MaterializedState) -> R) -> R {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&state)
    }

    /// Commit `effects` plus `bookkeeping` operations as one transaction.
    ///
    /// Schedules and Invokes whose key was already scheduled or delivered
    /// are dropped. Returns the surviving Invoke and Construct effects, in
    /// order, for the caller to deliver.
    pub fn commit(
        &self,
        effects: Vec<Effect>,
        bookkeeping: Vec<Operation>,
    ) -> Result<Vec<Effect>, ExecuteError> {
        let span = tracing::info_span!("commit", effects = effects.len());
        let _guard = span.enter();

        let mut ops = Vec::new();
        let mut timers: Vec<(IdempotencyKey, crew_core::Call, Duration)> = Vec::new();
        let mut events = Vec::new();
        let mut outbox = Vec::new();

        let start = std::time::Instant::now();
        {
            // The WAL lock serializes commits, so the dedupe check below and
            // the append cannot interleave with another transaction
            let mut wal = self.wal.lock().unwrap_or_else(|e| e.into_inner());
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

            let mut keys_in_tx = HashSet::new();
            for effect in effects {
                tracing::debug!(effect = effect.name(), fields = ?effect.fields(), "executing");
                match effect {
                    Effect::Persist { operation } => ops.push(operation),
                    Effect::Schedule { call, delay, key } => {
                        if state.is_scheduled(&key) || !keys_in_tx.insert(key.clone()) {
                            tracing::debug!(key = %key, "duplicate schedule dropped");
                            continue;
                        }
                        ops.push(Operation::CallScheduled {
                            key: key.clone(),
                            call: call.clone(),
                            fire_at_ms: self.clock.epoch_ms() + delay.as_millis() as u64,
                        });
                        timers.push((key, call, delay));
                    }
                    Effect::Invoke { call, key } => {
                        if state.is_scheduled(&key) || !keys_in_tx.insert(key.clone()) {
                            tracing::debug!(key = %key, "duplicate invoke dropped");
                            continue;
                        }
                        // Delivered inline; recovery re-queues it if that never happens
                        ops.push(Operation::CallScheduled {
                            key: key.clone(),
                            call: call.clone(),
                            fire_at_ms: self.clock.epoch_ms(),
                        });
                        outbox.push(Effect::Invoke { call, key });
                    }
                    Effect::Construct { .. } => outbox.push(effect),
                    Effect::Emit { event } => events.push(event),
                }
            }
            ops.extend(bookkeeping);

            if !ops.is_empty() {
                wal.append(&ops)?;
                for op in &ops {
                    state.apply(op);
                }
            }
        }

        tracing::debug!(
            ops = ops.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "committed"
        );

        if !timers.is_empty() {
            let now = self.clock.now();
            let mut scheduler = self.scheduler.lock().unwrap_or_else(|e| e.into_inner());
            for (key, call, delay) in timers {
                scheduler.schedule(key, call, now + delay);
            }
        }

        for event in &events {
            log_event(event);
        }

        Ok(outbox)
    }
}

/// Log a state machine event
fn log_event(event: &Event) {
    let name = event.name();
    match event {
        Event::WorkerCreated { id }
        | Event::WorkerStarted { id }
        | Event::WorkerCompleted { id }
        | Event::WorkerFailed { id }
        | Event::WorkerRegistered { id }
        | Event::WorkerRemoved { id } => tracing::info!(worker_id = %id, "{}", name),
        Event::RegistryInitialized | Event::CreationFrozen { .. } => tracing::info!("{}", name),
        Event::DemoIteration { iteration, created } => {
            tracing::info!(iteration, created, "{}", name)
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
