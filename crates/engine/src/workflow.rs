// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Long-running workflows: a worker's Run and the registry's Demo loop
//!
//! Neither holds an entity lock while it waits, so status reads and
//! explicit completion stay responsive during a run.

use crate::{Runtime, RuntimeError};
use crew_core::{
    worker_entity, Clock, Effect, IdGen, IdempotencyKey, Operation, WorkerEvent, WorkerId,
};
use crew_storage::Workflow;
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use std::time::Duration;

impl<C: Clock, I: IdGen> Runtime<C, I> {
    /// Roll the simulated run length once; the wake-up time is persisted
    /// with the Run call so a replayed run never rolls again.
    pub(crate) fn checkpoint_run(&self, key: &IdempotencyKey, worker_id: &WorkerId) -> Workflow {
        let duration = self
            .config
            .timings
            .roll_run_duration(&mut rand::thread_rng());
        tracing::debug!(
            worker_id = %worker_id,
            duration_ms = duration.as_millis() as u64,
            "run scheduled"
        );
        Workflow {
            key: key.clone(),
            worker_id: worker_id.clone(),
            wake_at_ms: self.executor.clock().epoch_ms() + duration.as_millis() as u64,
        }
    }

    /// Start a task for `workflow` unless one is already running
    pub(crate) fn spawn_run(self: &Arc<Self>, workflow: Workflow) {
        {
            let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
            if !running.insert(workflow.key.clone()) {
                return;
            }
        }
        tokio::spawn(Arc::clone(self).finish_run(workflow));
    }

    /// Sleep until the checkpointed wake-up time, then write the outcome.
    /// Failed writes are retried until they succeed.
    fn finish_run(self: Arc<Self>, workflow: Workflow) -> BoxFuture<'static, ()> {
        async move {
            let remaining = workflow
                .wake_at_ms
                .saturating_sub(self.executor.clock().epoch_ms());
            tokio::time::sleep(Duration::from_millis(remaining)).await;

            while let Err(e) = self.apply_finish(&workflow).await {
                let backoff = self.config.timings.redelivery_backoff;
                tracing::warn!(
                    worker_id = %workflow.worker_id,
                    error = %e,
                    backoff_ms = backoff.as_millis() as u64,
                    "run outcome not written, will retry"
                );
                tokio::time::sleep(backoff).await;
            }

            self.running
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&workflow.key);
        }
        .boxed()
    }

    async fn apply_finish(self: &Arc<Self>, workflow: &Workflow) -> Result<(), RuntimeError> {
        let key = workflow.key.child("complete_or_fail");
        let guard = self.locks.lock(&worker_entity(&workflow.worker_id)).await;

        let finished = Operation::WorkflowFinished {
            key: workflow.key.clone(),
        };
        if self.executor.with_state(|s| s.is_applied(&key)) {
            self.executor.commit(vec![], vec![finished])?;
            return Ok(());
        }

        let worker = self
            .executor
            .with_state(|s| s.worker(&workflow.worker_id).cloned())
            .ok_or_else(|| RuntimeError::WorkerNotFound(workflow.worker_id.clone()))?;
        let (_, effects) = worker.transition(WorkerEvent::Finish, &key, &self.config.timings);
        let outbox = self.executor.commit(
            effects,
            vec![finished, Operation::KeyApplied { key: key.clone() }],
        )?;
        drop(guard);

        for effect in outbox {
            if let Effect::Invoke { call, key } = effect {
                self.deliver(key, call).await?;
            }
        }
        Ok(())
    }

    /// One demo iteration.
    ///
    /// Workers are constructed before the iteration is marked applied, so a
    /// crash mid-iteration replays it; construction keys make the replay
    /// create nothing twice. The registry lock is not held, since each
    /// construction registers its worker with the registry.
    pub(crate) fn run_demo(
        self: Arc<Self>,
        key: IdempotencyKey,
        iteration: u64,
    ) -> BoxFuture<'static, Result<(), RuntimeError>> {
        async move {
            let _guard = self.locks.lock(&format!("demo:{}", key)).await;
            if self.executor.with_state(|s| s.is_applied(&key)) {
                self.mark_delivered(&key)?;
                return Ok(());
            }

            // The admission flag is read once per iteration
            let registry = self
                .executor
                .with_state(|s| s.registry.clone())
                .ok_or(RuntimeError::RegistryNotInitialized)?;
            let effects = self.plan_demo(&registry, iteration);

            let mut rest = Vec::new();
            for effect in effects {
                match effect {
                    Effect::Construct { key, request } => {
                        self.construct_worker(key, request).await?;
                    }
                    other => rest.push(other),
                }
            }

            self.executor.commit(
                rest,
                vec![
                    Operation::KeyApplied { key: key.clone() },
                    Operation::CallDelivered { key: key.clone() },
                ],
            )?;
            Ok(())
        }
        .boxed()
    }

    fn plan_demo(&self, registry: &crew_core::Registry, iteration: u64) -> Vec<Effect> {
        registry.plan_demo(iteration, &self.config.timings, &mut rand::thread_rng())
    }
}
