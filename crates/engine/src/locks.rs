// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-entity serialization
//!
//! Calls against one entity run one at a time; calls against different
//! entities run concurrently. Guards are async so a holder may await.
//! A lock with no holder and no waiter is dropped from the table.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

type EntityLock = Arc<tokio::sync::Mutex<()>>;

#[derive(Default)]
pub(crate) struct EntityLocks {
    locks: Mutex<HashMap<String, EntityLock>>,
}

/// Holds one entity's lock until dropped
pub(crate) struct EntityGuard<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    lock: EntityLock,
    entity: String,
    locks: &'a EntityLocks,
}

impl EntityLocks {
    pub(crate) async fn lock(&self, entity: &str) -> EntityGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(locks.entry(entity.to_string()).or_default())
        };
        let guard = Arc::clone(&lock).lock_owned().await;
        EntityGuard {
            guard: Some(guard),
            lock,
            entity: entity.to_string(),
            locks: self,
        }
    }

    /// Entities with a live lock
    #[cfg(test)]
    pub(crate) fn entity_count(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Drop for EntityGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.locks.lock().unwrap_or_else(|e| e.into_inner());
        // Only the table and this guard still refer to the lock
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.entity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_entity_is_serialized() {
        let locks = Arc::new(EntityLocks::default());
        let guard = locks.lock("worker:a").await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock("worker:a").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn different_entities_do_not_block() {
        let locks = EntityLocks::default();
        let _a = locks.lock("worker:a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock("worker:b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn released_locks_leave_the_table() {
        let locks = EntityLocks::default();
        for i in 0..100 {
            let _guard = locks.lock(&format!("construct:create-{}", i)).await;
        }
        assert_eq!(locks.entity_count(), 0);
    }

    #[tokio::test]
    async fn waited_on_locks_stay_until_the_last_holder() {
        let locks = Arc::new(EntityLocks::default());
        let guard = locks.lock("worker:a").await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock("worker:a").await;
                locks.entity_count()
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(guard);
        assert_eq!(locks.entity_count(), 1);

        // The contender held the same lock, so it still saw one entry
        assert_eq!(contender.await.unwrap(), 1);
        assert_eq!(locks.entity_count(), 0);
    }
}
