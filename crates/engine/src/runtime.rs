// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime hosting the worker and registry entities
//!
//! Every mutating call is delivered with an idempotency key. Delivery takes
//! the entity's lock, skips keys that were already applied, runs the pure
//! transition and commits its effects together with the key in one WAL
//! transaction. Immediate invocations requested by the transition are
//! delivered after the lock is released.

use crate::executor::Executor;
use crate::locks::EntityLocks;
use crate::{Due, RuntimeConfig, RuntimeError};
use crew_core::{
    demo_key, AddRequest, Call, Clock, CompleteRequest, CreateRequest, DemoRequest, Effect,
    FreezeRequest, IdGen, IdempotencyKey, InitializeRequest, ListResponse, Operation, Registry,
    RegistryCall, RegistryEvent, RemoveRequest, StatusResponse, WorkerCall, WorkerEvent, WorkerId,
    WorkerInfo, WorkerStatus,
};
use crew_storage::{MaterializedState, Wal, Workflow};
use futures::future::join_all;
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::Instrument;

/// Work left to do after an entity call commits
pub(crate) enum Step {
    Deliver {
        key: IdempotencyKey,
        call: Call,
    },
    Construct {
        key: IdempotencyKey,
        request: CreateRequest,
    },
}

impl Step {
    fn from_effect(effect: Effect) -> Option<Step> {
        match effect {
            Effect::Invoke { call, key } => Some(Step::Deliver { key, call }),
            Effect::Construct { key, request } => Some(Step::Construct { key, request }),
            _ => None,
        }
    }
}

/// What [`Runtime::recover`] picked back up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recovered {
    pub calls: usize,
    pub workflows: usize,
}

/// Runtime that coordinates the system
pub struct Runtime<C: Clock, I: IdGen> {
    pub(crate) executor: Executor<C>,
    pub(crate) config: RuntimeConfig,
    id_gen: I,
    pub(crate) locks: EntityLocks,
    /// Run workflows with a live task in this process
    pub(crate) running: Mutex<HashSet<IdempotencyKey>>,
}

impl<C: Clock, I: IdGen> Runtime<C, I> {
    pub fn new(
        wal: Wal,
        state: MaterializedState,
        clock: C,
        id_gen: I,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            executor: Executor::new(wal, state, clock),
            config,
            id_gen,
            locks: EntityLocks::default(),
            running: Mutex::new(HashSet::new()),
        }
    }

    /// Replay the WAL at `wal_path` and open it for appending
    pub fn open(
        wal_path: &Path,
        clock: C,
        id_gen: I,
        config: RuntimeConfig,
    ) -> Result<Self, RuntimeError> {
        let ops = Wal::replay(wal_path)?;
        let state = MaterializedState::from_ops(&ops);
        tracing::info!(ops = ops.len(), workers = state.workers.len(), "replayed WAL");
        let wal = Wal::open(wal_path)?;
        Ok(Self::new(wal, state, clock, id_gen, config))
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn executor(&self) -> &Executor<C> {
        &self.executor
    }

    // -- mutations --------------------------------------------------------

    /// Initialize the registry; a no-op once it exists
    pub async fn initialize_registry(
        self: &Arc<Self>,
        key: IdempotencyKey,
    ) -> Result<(), RuntimeError> {
        let call = Call::registry(RegistryCall::Initialize(InitializeRequest {}));
        self.deliver(key, call).await
    }

    /// Construct a new worker and deliver `Create` to it.
    ///
    /// The same key always yields the same worker id, and the worker is
    /// created at most once.
    pub async fn construct_worker(
        self: &Arc<Self>,
        key: IdempotencyKey,
        request: CreateRequest,
    ) -> Result<WorkerId, RuntimeError> {
        let id = self.ensure_constructed(&key).await?;
        let call = Call::worker(id.clone(), WorkerCall::Create(request));
        self.drive(Step::Deliver { key, call }).await?;
        Ok(id)
    }

    /// Create a worker on behalf of a client. Without a key the request is
    /// not deduplicated.
    pub async fn create_worker(
        self: &Arc<Self>,
        request: CreateRequest,
        key: Option<IdempotencyKey>,
    ) -> Result<WorkerId, RuntimeError> {
        let key = key.unwrap_or_else(IdempotencyKey::fresh).scoped("create");
        self.construct_worker(key, request).await
    }

    /// Mark a worker completed, then pause before returning
    pub async fn complete_worker(
        self: &Arc<Self>,
        id: &WorkerId,
        key: Option<IdempotencyKey>,
    ) -> Result<(), RuntimeError> {
        let key = key
            .unwrap_or_else(IdempotencyKey::fresh)
            .scoped(&format!("complete/{}", id));
        let call = Call::worker(id.clone(), WorkerCall::Complete(CompleteRequest {}));
        self.deliver(key, call).await?;
        tokio::time::sleep(self.config.timings.complete_pause).await;
        Ok(())
    }

    /// Set the admission flag; later demo iterations observe it
    pub async fn freeze(self: &Arc<Self>, frozen: bool) -> Result<(), RuntimeError> {
        let call = Call::registry(RegistryCall::Freeze(FreezeRequest { frozen }));
        self.deliver(IdempotencyKey::fresh(), call).await
    }

    /// Schedule the first demo iteration. Restarts find it already scheduled
    /// or delivered and do nothing.
    pub fn start_demo(&self) -> Result<(), RuntimeError> {
        self.executor.commit(
            vec![Effect::Schedule {
                call: Call::registry(RegistryCall::Demo(DemoRequest { iteration: 0 })),
                delay: Duration::ZERO,
                key: demo_key(0),
            }],
            vec![],
        )?;
        Ok(())
    }

    /// Deliver `call` under `key`. A key whose effect was already applied is
    /// acknowledged without running the call again.
    pub async fn deliver(
        self: &Arc<Self>,
        key: IdempotencyKey,
        call: Call,
    ) -> Result<(), RuntimeError> {
        self.drive(Step::Deliver { key, call }).await
    }

    /// Deliver a call and everything it invokes, breadth first
    pub(crate) async fn drive(self: &Arc<Self>, first: Step) -> Result<(), RuntimeError> {
        let mut queue = VecDeque::from([first]);
        while let Some(step) = queue.pop_front() {
            let next = match step {
                Step::Deliver { key, call } => {
                    let span = tracing::info_span!("deliver", call = call.method(), key = %key);
                    self.apply(key, call).instrument(span).await?
                }
                Step::Construct { key, request } => {
                    let id = self.ensure_constructed(&key).await?;
                    let call = Call::worker(id, WorkerCall::Create(request));
                    vec![Step::Deliver { key, call }]
                }
            };
            queue.extend(next);
        }
        Ok(())
    }

    async fn apply(
        self: &Arc<Self>,
        key: IdempotencyKey,
        call: Call,
    ) -> Result<Vec<Step>, RuntimeError> {
        if let Call::Registry {
            call: RegistryCall::Demo(DemoRequest { iteration }),
        } = call
        {
            Arc::clone(self).run_demo(key, iteration).await?;
            return Ok(vec![]);
        }

        let guard = self.locks.lock(&call.entity()).await;
        if self.executor.with_state(|s| s.is_applied(&key)) {
            tracing::debug!("already applied");
            self.mark_delivered(&key)?;
            return Ok(vec![]);
        }

        let mut bookkeeping = vec![
            Operation::KeyApplied { key: key.clone() },
            Operation::CallDelivered { key: key.clone() },
        ];
        let effects = match call {
            Call::Worker { id, call } => {
                let worker = self
                    .executor
                    .with_state(|s| s.worker(&id).cloned())
                    .ok_or_else(|| RuntimeError::WorkerNotFound(id.clone()))?;
                let event = match call {
                    WorkerCall::Create(request) => WorkerEvent::Create {
                        start_delay: request.start_delay(),
                        task_description: request.task_description,
                    },
                    WorkerCall::Start(_) => WorkerEvent::Start,
                    WorkerCall::Complete(_) => WorkerEvent::Complete,
                    WorkerCall::Run(_) => {
                        // A worker completed before its run began has nothing to run
                        let workflow = (worker.status == WorkerStatus::InProgress)
                            .then(|| self.checkpoint_run(&key, &id));
                        if let Some(workflow) = &workflow {
                            bookkeeping.push(Operation::WorkflowStarted {
                                key: workflow.key.clone(),
                                worker_id: workflow.worker_id.clone(),
                                wake_at_ms: workflow.wake_at_ms,
                            });
                        }
                        self.executor.commit(vec![], bookkeeping)?;
                        drop(guard);
                        if let Some(workflow) = workflow {
                            self.spawn_run(workflow);
                        }
                        return Ok(vec![]);
                    }
                };
                worker.transition(event, &key, &self.config.timings).1
            }

            Call::Registry { call } => {
                let registry = self.executor.with_state(|s| s.registry.clone());
                match (call, registry) {
                    (RegistryCall::Initialize(_), None) => Registry::initialize().1,
                    (RegistryCall::Initialize(_), Some(_)) => vec![],
                    (_, None) => return Err(RuntimeError::RegistryNotInitialized),
                    (RegistryCall::Add(AddRequest { worker_id }), Some(registry)) => {
                        registry.transition(RegistryEvent::Add { worker_id }).1
                    }
                    (RegistryCall::Remove(RemoveRequest { worker_id }), Some(registry)) => {
                        registry.transition(RegistryEvent::Remove { worker_id }).1
                    }
                    (RegistryCall::Freeze(FreezeRequest { frozen }), Some(registry)) => {
                        registry.transition(RegistryEvent::Freeze { frozen }).1
                    }
                    // Handled by run_demo above
                    (RegistryCall::Demo(_), Some(_)) => vec![],
                }
            }
        };

        let outbox = self.executor.commit(effects, bookkeeping)?;
        drop(guard);
        Ok(outbox.into_iter().filter_map(Step::from_effect).collect())
    }

    /// Look up or allocate the worker id bound to a construction key
    async fn ensure_constructed(&self, key: &IdempotencyKey) -> Result<WorkerId, RuntimeError> {
        let _guard = self.locks.lock(&format!("construct:{}", key)).await;
        if let Some(id) = self.executor.with_state(|s| s.constructions.get(key).cloned()) {
            return Ok(id);
        }
        let id = WorkerId(self.id_gen.next());
        self.executor.commit(
            vec![],
            vec![Operation::WorkerConstruct {
                key: key.clone(),
                id: id.clone(),
            }],
        )?;
        tracing::debug!(key = %key, worker_id = %id, "constructed worker");
        Ok(id)
    }

    /// Acknowledge a redelivered scheduled call so it never fires again
    pub(crate) fn mark_delivered(&self, key: &IdempotencyKey) -> Result<(), RuntimeError> {
        if self.executor.with_state(|s| s.scheduled.contains_key(key)) {
            self.executor
                .commit(vec![], vec![Operation::CallDelivered { key: key.clone() }])?;
        }
        Ok(())
    }

    // -- reads ------------------------------------------------------------

    /// Status of one worker as of the last committed transaction
    pub async fn status(&self, id: &WorkerId) -> Result<StatusResponse, RuntimeError> {
        self.executor
            .with_state(|s| {
                s.worker(id).map(|worker| StatusResponse {
                    status: worker.status,
                    task_description: worker.task_description.clone(),
                })
            })
            .ok_or_else(|| RuntimeError::WorkerNotFound(id.clone()))
    }

    /// Every registered worker with its status, fetched concurrently.
    /// Workers whose status cannot be fetched are left out.
    pub async fn list(&self) -> Result<ListResponse, RuntimeError> {
        let ids = self
            .executor
            .with_state(|s| s.registry.as_ref().map(|r| r.worker_ids.clone()))
            .ok_or(RuntimeError::RegistryNotInitialized)?;

        let lookups = ids.into_iter().map(|id| async move {
            let result = self.status(&id).await;
            (id, result)
        });
        let workers = join_all(lookups)
            .await
            .into_iter()
            .filter_map(|(worker_id, result)| match result {
                Ok(status) => Some(WorkerInfo {
                    worker_id,
                    task_description: status.task_description,
                    status: status.status,
                }),
                Err(e) => {
                    tracing::warn!(worker_id = %worker_id, error = %e, "omitting worker from list");
                    None
                }
            })
            .collect();
        Ok(ListResponse { workers })
    }

    pub fn is_frozen(&self) -> Result<bool, RuntimeError> {
        self.executor
            .with_state(|s| s.registry.as_ref().map(|r| r.frozen))
            .ok_or(RuntimeError::RegistryNotInitialized)
    }

    // -- scheduling -------------------------------------------------------

    /// Deliver every scheduled call that is due; returns how many fired
    pub fn fire_due(self: &Arc<Self>) -> usize {
        let now = self.executor.clock().now();
        let due = self
            .executor
            .scheduler()
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .poll(now);
        let count = due.len();
        for Due { key, call } in due {
            let runtime = Arc::clone(self);
            tokio::spawn(async move { runtime.deliver_scheduled(key, call).await });
        }
        count
    }

    async fn deliver_scheduled(self: &Arc<Self>, key: IdempotencyKey, call: Call) {
        let Err(e) = self.deliver(key.clone(), call.clone()).await else {
            return;
        };
        let backoff = self.config.timings.redelivery_backoff;
        tracing::warn!(
            key = %key,
            call = call.method(),
            error = %e,
            backoff_ms = backoff.as_millis() as u64,
            "delivery failed, will retry"
        );
        let fire_at = self.executor.clock().now() + backoff;
        self.executor
            .scheduler()
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .schedule(key, call, fire_at);
    }

    /// Re-queue undelivered scheduled calls and resume unfinished Run
    /// workflows from their checkpointed wake-up time
    pub fn recover(self: &Arc<Self>) -> Recovered {
        let (pending, workflows): (Vec<_>, Vec<Workflow>) = self.executor.with_state(|s| {
            (s.pending_calls(), s.workflows.values().cloned().collect())
        });

        let now = self.executor.clock().now();
        let epoch_ms = self.executor.clock().epoch_ms();
        {
            let scheduler = self.executor.scheduler();
            let mut scheduler = scheduler.lock().unwrap_or_else(|e| e.into_inner());
            for call in &pending {
                let wait = Duration::from_millis(call.fire_at_ms.saturating_sub(epoch_ms));
                scheduler.schedule(call.key.clone(), call.call.clone(), now + wait);
            }
        }

        let recovered = Recovered {
            calls: pending.len(),
            workflows: workflows.len(),
        };
        for workflow in workflows {
            self.spawn_run(workflow);
        }
        recovered
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
