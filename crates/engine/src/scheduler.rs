// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory delivery queue for durably scheduled calls
//!
//! The WAL is the source of truth for what is scheduled; this heap only
//! decides when the runtime should try to deliver it.

use crew_core::{Call, IdempotencyKey};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::time::Instant;

/// A call whose fire time has passed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Due {
    pub key: IdempotencyKey,
    pub call: Call,
}

#[derive(Debug, Clone)]
struct Entry {
    key: IdempotencyKey,
    call: Call,
    fire_at: Instant,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at && self.key == other.key
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Min-heap: earliest first
        Reverse(self.fire_at)
            .cmp(&Reverse(other.fire_at))
            .then_with(|| other.key.cmp(&self.key))
    }
}

/// Min-heap of pending calls keyed by fire time
#[derive(Default)]
pub struct Scheduler {
    items: BinaryHeap<Entry>,
    queued: HashSet<IdempotencyKey>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `call` for `fire_at`. A key that is already queued is ignored.
    pub fn schedule(&mut self, key: IdempotencyKey, call: Call, fire_at: Instant) -> bool {
        if !self.queued.insert(key.clone()) {
            return false;
        }
        self.items.push(Entry { key, call, fire_at });
        true
    }

    /// Remove and return every call due at or before `now`
    pub fn poll(&mut self, now: Instant) -> Vec<Due> {
        let mut ready = Vec::new();
        while let Some(item) = self.items.peek() {
            if item.fire_at > now {
                break;
            }
            let Some(item) = self.items.pop() else {
                break;
            };
            self.queued.remove(&item.key);
            ready.push(Due {
                key: item.key,
                call: item.call,
            });
        }
        ready
    }

    pub fn contains(&self, key: &IdempotencyKey) -> bool {
        self.queued.contains(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
