// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry of live workers
//!
//! The registry is a single entity with a reserved id. It only tracks worker
//! ids; worker state always lives with the worker itself.

use crate::call::{Call, CreateRequest, DemoRequest, RegistryCall};
use crate::demo;
use crate::effect::{Effect, Event};
use crate::id::IdempotencyKey;
use crate::operation::Operation;
use crate::timing::Timings;
use crate::worker::WorkerId;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Reserved id of the one registry instance
pub const REGISTRY_ID: &str = "(singleton)";

/// Workers constructed by the first demo iteration
pub const FIRST_DEMO_BATCH: usize = 5;

/// Workers constructed by every later demo iteration
pub const DEMO_BATCH: usize = 1;

/// Events that can change registry state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Add { worker_id: WorkerId },
    Remove { worker_id: WorkerId },
    Freeze { frozen: bool },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    /// Live worker ids in registration order, each at most once
    pub worker_ids: Vec<WorkerId>,
    /// When set, demo iterations construct no workers
    pub frozen: bool,
}

impl Registry {
    /// Bring the registry into existence: empty and unfrozen
    pub fn initialize() -> (Registry, Vec<Effect>) {
        (
            Registry::default(),
            vec![
                Effect::persist(Operation::RegistryInitialize),
                Effect::emit(Event::RegistryInitialized),
            ],
        )
    }

    pub fn contains(&self, id: &WorkerId) -> bool {
        self.worker_ids.contains(id)
    }

    /// Pure transition function - returns new state and effects
    pub fn transition(&self, event: RegistryEvent) -> (Registry, Vec<Effect>) {
        match event {
            RegistryEvent::Add { worker_id } => {
                if self.contains(&worker_id) {
                    return (self.clone(), vec![]);
                }
                let mut registry = self.clone();
                registry.worker_ids.push(worker_id.clone());
                let effects = vec![
                    Effect::persist(Operation::RegistryAdd {
                        worker_id: worker_id.clone(),
                    }),
                    Effect::emit(Event::WorkerRegistered { id: worker_id }),
                ];
                (registry, effects)
            }

            RegistryEvent::Remove { worker_id } => {
                if !self.contains(&worker_id) {
                    return (self.clone(), vec![]);
                }
                let mut registry = self.clone();
                registry.worker_ids.retain(|id| id != &worker_id);
                let effects = vec![
                    Effect::persist(Operation::RegistryRemove {
                        worker_id: worker_id.clone(),
                    }),
                    Effect::emit(Event::WorkerRemoved { id: worker_id }),
                ];
                (registry, effects)
            }

            RegistryEvent::Freeze { frozen } => {
                if self.frozen == frozen {
                    return (self.clone(), vec![]);
                }
                let registry = Registry {
                    frozen,
                    ..self.clone()
                };
                let effects = vec![
                    Effect::persist(Operation::RegistryFreeze { frozen }),
                    Effect::emit(Event::CreationFrozen { frozen }),
                ];
                (registry, effects)
            }
        }
    }

    /// Plan one demo iteration.
    ///
    /// Construct keys depend only on the iteration and the worker's index in
    /// it, so replaying an iteration constructs the same workers. The next
    /// iteration is always scheduled, frozen or not.
    pub fn plan_demo(&self, iteration: u64, timings: &Timings, rng: &mut impl Rng) -> Vec<Effect> {
        let batch = if self.frozen {
            0
        } else if iteration == 0 {
            FIRST_DEMO_BATCH
        } else {
            DEMO_BATCH
        };

        let mut effects = Vec::with_capacity(batch + 2);
        for index in 0..batch {
            let task_description = demo::task_description(rng);
            let start_delay = timings.roll_start_delay(rng);
            effects.push(Effect::Construct {
                key: construct_key(iteration, index),
                request: CreateRequest::new(task_description, start_delay),
            });
        }

        effects.push(Effect::emit(Event::DemoIteration {
            iteration,
            created: batch,
        }));
        effects.push(Effect::Schedule {
            call: Call::registry(RegistryCall::Demo(DemoRequest {
                iteration: iteration + 1,
            })),
            delay: timings.demo_interval,
            key: demo_key(iteration + 1),
        });
        effects
    }
}

/// Key the registry is initialized under at startup
pub fn initialize_key() -> IdempotencyKey {
    IdempotencyKey::derived("initialize".to_string())
}

/// Key of the scheduled call that runs demo iteration `iteration`
pub fn demo_key(iteration: u64) -> IdempotencyKey {
    IdempotencyKey::derived(format!("demo/{}", iteration))
}

/// Key of the `index`-th worker constructed by demo iteration `iteration`
pub fn construct_key(iteration: u64, index: usize) -> IdempotencyKey {
    IdempotencyKey::derived(format!("create-{}-{}", iteration, index))
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
