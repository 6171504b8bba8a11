// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from WAL replay

use crew_core::{Call, IdempotencyKey, Operation, Registry, Worker, WorkerId};
use std::collections::{HashMap, HashSet};

/// A call accepted for later delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledCall {
    pub key: IdempotencyKey,
    pub call: Call,
    pub fire_at_ms: u64,
}

/// A Run workflow that has checkpointed its wake-up time but not finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
    pub key: IdempotencyKey,
    pub worker_id: WorkerId,
    pub wake_at_ms: u64,
}

/// Materialized state built from WAL operations
#[derive(Debug, Default)]
pub struct MaterializedState {
    pub workers: HashMap<WorkerId, Worker>,
    /// `None` until the registry has been initialized
    pub registry: Option<Registry>,
    /// Keys whose call has been applied to its entity
    pub applied_keys: HashSet<IdempotencyKey>,
    /// Construction key to the worker id it produced
    pub constructions: HashMap<IdempotencyKey, WorkerId>,
    /// Scheduled calls not yet delivered
    pub scheduled: HashMap<IdempotencyKey, ScheduledCall>,
    pub delivered: HashSet<IdempotencyKey>,
    /// Run workflows in flight
    pub workflows: HashMap<IdempotencyKey, Workflow>,
    pub finished_workflows: HashSet<IdempotencyKey>,
}

impl MaterializedState {
    /// Rebuild state by applying replayed operations in order
    pub fn from_ops<'a>(ops: impl IntoIterator<Item = &'a Operation>) -> Self {
        let mut state = Self::default();
        for op in ops {
            state.apply(op);
        }
        state
    }

    pub fn worker(&self, id: &WorkerId) -> Option<&Worker> {
        self.workers.get(id)
    }

    /// Whether a call with this key was already scheduled or delivered
    pub fn is_scheduled(&self, key: &IdempotencyKey) -> bool {
        self.scheduled.contains_key(key) || self.delivered.contains(key)
    }

    pub fn is_applied(&self, key: &IdempotencyKey) -> bool {
        self.applied_keys.contains(key)
    }

    /// Scheduled calls ordered by fire time
    pub fn pending_calls(&self) -> Vec<ScheduledCall> {
        let mut calls: Vec<ScheduledCall> = self.scheduled.values().cloned().collect();
        calls.sort_by(|a, b| a.fire_at_ms.cmp(&b.fire_at_ms).then_with(|| a.key.cmp(&b.key)));
        calls
    }

    /// Apply an operation to update the state
    pub fn apply(&mut self, op: &Operation) {
        match op {
            Operation::RegistryInitialize => {
                if self.registry.is_none() {
                    self.registry = Some(Registry::default());
                }
            }

            Operation::RegistryAdd { worker_id } => {
                if let Some(registry) = self.registry.as_mut() {
                    if !registry.contains(worker_id) {
                        registry.worker_ids.push(worker_id.clone());
                    }
                }
            }

            Operation::RegistryRemove { worker_id } => {
                if let Some(registry) = self.registry.as_mut() {
                    registry.worker_ids.retain(|id| id != worker_id);
                }
            }

            Operation::RegistryFreeze { frozen } => {
                if let Some(registry) = self.registry.as_mut() {
                    registry.frozen = *frozen;
                }
            }

            Operation::WorkerConstruct { key, id } => {
                self.constructions.insert(key.clone(), id.clone());
                self.workers
                    .entry(id.clone())
                    .or_insert_with(|| Worker::new(id.clone()));
            }

            Operation::WorkerCreate {
                id,
                task_description,
            } => {
                let worker = self
                    .workers
                    .entry(id.clone())
                    .or_insert_with(|| Worker::new(id.clone()));
                worker.task_description = task_description.clone();
            }

            Operation::WorkerStatus { id, status } => {
                if let Some(worker) = self.workers.get_mut(id) {
                    worker.status = *status;
                }
            }

            Operation::CallScheduled {
                key,
                call,
                fire_at_ms,
            } => {
                if !self.delivered.contains(key) {
                    self.scheduled.entry(key.clone()).or_insert(ScheduledCall {
                        key: key.clone(),
                        call: call.clone(),
                        fire_at_ms: *fire_at_ms,
                    });
                }
            }

            Operation::CallDelivered { key } => {
                self.scheduled.remove(key);
                self.delivered.insert(key.clone());
            }

            Operation::KeyApplied { key } => {
                self.applied_keys.insert(key.clone());
            }

            Operation::WorkflowStarted {
                key,
                worker_id,
                wake_at_ms,
            } => {
                if !self.finished_workflows.contains(key) {
                    self.workflows.entry(key.clone()).or_insert(Workflow {
                        key: key.clone(),
                        worker_id: worker_id.clone(),
                        wake_at_ms: *wake_at_ms,
                    });
                }
            }

            Operation::WorkflowFinished { key } => {
                self.workflows.remove(key);
                self.finished_workflows.insert(key.clone());
            }
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
