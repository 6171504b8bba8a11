// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker state machine
//!
//! A worker is a single simulated task. It is created, starts after an
//! optional delay, runs for a while and ends up completed or failed:
//!
//! ```text
//! NOT_STARTED -> IN_PROGRESS -> COMPLETED
//!                            \-> FAILED
//! ```
//!
//! Status never moves backwards. Events that would regress or re-enter a
//! state leave the worker untouched and request no effects, which is what
//! makes redelivered calls harmless.

use crate::call::{
    AddRequest, Call, RegistryCall, RemoveRequest, RunRequest, StartRequest, WorkerCall,
};
use crate::effect::{Effect, Event};
use crate::id::IdempotencyKey;
use crate::operation::Operation;
use crate::outcome::{decide, Outcome};
use crate::timing::Timings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Unique identifier for a worker
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(pub String);

impl WorkerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for WorkerId {
    fn from(s: String) -> Self {
        WorkerId(s)
    }
}

impl From<&str> for WorkerId {
    fn from(s: &str) -> Self {
        WorkerId(s.to_string())
    }
}

/// Lifecycle status of a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

impl WorkerStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkerStatus::Completed | WorkerStatus::Failed)
    }

    /// Position along the lifecycle; both terminal states share the last slot
    pub fn rank(self) -> u8 {
        match self {
            WorkerStatus::NotStarted => 0,
            WorkerStatus::InProgress => 1,
            WorkerStatus::Completed | WorkerStatus::Failed => 2,
        }
    }
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            WorkerStatus::NotStarted => "Not Started",
            WorkerStatus::InProgress => "In Progress",
            WorkerStatus::Completed => "Completed",
            WorkerStatus::Failed => "Failed",
        };
        f.write_str(label)
    }
}

/// Events that can change worker state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// Record the description, schedule Start and register with the registry
    Create {
        task_description: String,
        start_delay: Duration,
    },
    /// Begin work and schedule the Run workflow
    Start,
    /// Run's completion write: decide the outcome from the worker id
    Finish,
    /// Explicit completion, independent of the run's outcome
    Complete,
}

/// A worker task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    pub task_description: String,
    pub status: WorkerStatus,
}

impl Worker {
    /// A worker that has not been created yet
    pub fn new(id: impl Into<WorkerId>) -> Self {
        Worker {
            id: id.into(),
            task_description: String::new(),
            status: WorkerStatus::NotStarted,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Pure transition function - returns new state and effects
    ///
    /// `key` is the idempotency key of the call being applied; keys of the
    /// calls this transition requests are derived from it.
    pub fn transition(
        &self,
        event: WorkerEvent,
        key: &IdempotencyKey,
        timings: &Timings,
    ) -> (Worker, Vec<Effect>) {
        match (self.status, event) {
            (
                WorkerStatus::NotStarted,
                WorkerEvent::Create {
                    task_description,
                    start_delay,
                },
            ) => {
                let worker = Worker {
                    task_description: task_description.clone(),
                    ..self.clone()
                };
                let effects = vec![
                    Effect::persist(Operation::WorkerCreate {
                        id: self.id.clone(),
                        task_description,
                    }),
                    Effect::Schedule {
                        call: Call::worker(self.id.clone(), WorkerCall::Start(StartRequest {})),
                        delay: start_delay,
                        key: key.child("start"),
                    },
                    Effect::Invoke {
                        call: Call::registry(RegistryCall::Add(AddRequest {
                            worker_id: self.id.clone(),
                        })),
                        key: key.child("add"),
                    },
                    Effect::emit(Event::WorkerCreated {
                        id: self.id.clone(),
                    }),
                ];
                (worker, effects)
            }

            // NOT_STARTED → IN_PROGRESS
            (WorkerStatus::NotStarted, WorkerEvent::Start) => {
                let worker = Worker {
                    status: WorkerStatus::InProgress,
                    ..self.clone()
                };
                let effects = vec![
                    self.persist_status(WorkerStatus::InProgress),
                    Effect::Schedule {
                        call: Call::worker(self.id.clone(), WorkerCall::Run(RunRequest {})),
                        delay: Duration::ZERO,
                        key: key.child("run"),
                    },
                    Effect::emit(Event::WorkerStarted {
                        id: self.id.clone(),
                    }),
                ];
                (worker, effects)
            }

            // IN_PROGRESS → COMPLETED | FAILED
            (WorkerStatus::InProgress, WorkerEvent::Finish) => match decide(&self.id) {
                Outcome::Failed => {
                    let worker = Worker {
                        status: WorkerStatus::Failed,
                        ..self.clone()
                    };
                    let effects = vec![
                        self.persist_status(WorkerStatus::Failed),
                        Effect::emit(Event::WorkerFailed {
                            id: self.id.clone(),
                        }),
                    ];
                    (worker, effects)
                }
                Outcome::Completed => self.complete(timings),
            },

            // NOT_STARTED | IN_PROGRESS → COMPLETED
            (WorkerStatus::NotStarted | WorkerStatus::InProgress, WorkerEvent::Complete) => {
                self.complete(timings)
            }

            // Already completed: ask again for the removal, which dedupes by key
            (WorkerStatus::Completed, WorkerEvent::Complete) => {
                (self.clone(), vec![self.schedule_removal(timings)])
            }

            // Everything else would regress or re-enter a state
            _ => (self.clone(), vec![]),
        }
    }

    /// Enter COMPLETED and ask the registry to forget this worker later.
    ///
    /// FAILED workers are never removed; only completion schedules removal.
    fn complete(&self, timings: &Timings) -> (Worker, Vec<Effect>) {
        let worker = Worker {
            status: WorkerStatus::Completed,
            ..self.clone()
        };
        let effects = vec![
            self.persist_status(WorkerStatus::Completed),
            self.schedule_removal(timings),
            Effect::emit(Event::WorkerCompleted {
                id: self.id.clone(),
            }),
        ];
        (worker, effects)
    }

    fn schedule_removal(&self, timings: &Timings) -> Effect {
        Effect::Schedule {
            call: Call::registry(RegistryCall::Remove(RemoveRequest {
                worker_id: self.id.clone(),
            })),
            delay: timings.removal_delay,
            key: removal_key(&self.id),
        }
    }

    fn persist_status(&self, status: WorkerStatus) -> Effect {
        Effect::persist(Operation::WorkerStatus {
            id: self.id.clone(),
            status,
        })
    }
}

/// Stable key for the delayed registry removal of `id`.
///
/// It depends on the worker alone, so a worker completed through both Run
/// and Complete schedules at most one removal.
pub fn removal_key(id: &WorkerId) -> IdempotencyKey {
    IdempotencyKey::derived(format!("remove/{}", id))
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
