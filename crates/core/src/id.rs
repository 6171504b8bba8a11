// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ID generation and idempotency keys

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Generates unique identifiers
pub trait IdGen: Clone + Send + Sync + 'static {
    fn next(&self) -> String;
}

/// UUID-based ID generator for production use
#[derive(Clone, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Sequential ID generator for testing
#[derive(Clone)]
pub struct SequentialIdGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new("worker")
    }
}

impl IdGen for SequentialIdGen {
    fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", self.prefix, n)
    }
}

/// Errors from constructing an idempotency key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("idempotency key must not be empty")]
    Empty,
}

/// Caller-supplied identity of one logical operation.
///
/// Redelivering a call with the same key must not repeat its effect. Keys for
/// the effects an operation requests are derived from the operation's own key
/// with [`IdempotencyKey::child`], so a retried operation re-derives exactly
/// the same keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Create a key from caller input, rejecting blank keys
    pub fn new(key: impl Into<String>) -> Result<Self, KeyError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(KeyError::Empty);
        }
        Ok(Self(key))
    }

    /// A fresh random key, for callers that do not retry
    pub fn fresh() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Key for a named step performed by the operation keyed by `self`
    pub fn child(&self, step: &str) -> Self {
        Self(format!("{}/{}", self.0, step))
    }

    /// Place a caller-supplied key under `scope`, keeping it apart from
    /// the keys the system derives for itself
    pub fn scoped(&self, scope: &str) -> Self {
        Self(format!("{}/{}", scope, self.0))
    }

    pub(crate) fn derived(key: String) -> Self {
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_gen_creates_unique_ids() {
        let id_gen = UuidIdGen;
        let id1 = id_gen.next();
        let id2 = id_gen.next();
        assert_ne!(id1, id2);
        assert_eq!(id1.len(), 36); // UUID format
    }

    #[test]
    fn sequential_gen_is_cloneable_and_shared() {
        let id_gen1 = SequentialIdGen::new("shared");
        let id_gen2 = id_gen1.clone();
        assert_eq!(id_gen1.next(), "shared-1");
        assert_eq!(id_gen2.next(), "shared-2");
        assert_eq!(id_gen1.next(), "shared-3");
    }

    #[test]
    fn blank_keys_are_rejected() {
        assert_eq!(IdempotencyKey::new(""), Err(KeyError::Empty));
        assert_eq!(IdempotencyKey::new("  "), Err(KeyError::Empty));
        assert!(IdempotencyKey::new("create-0-0").is_ok());
    }

    #[test]
    fn child_keys_are_stable() {
        let key = IdempotencyKey::new("op-1").unwrap();
        assert_eq!(key.child("start"), key.child("start"));
        assert_eq!(key.child("start").as_str(), "op-1/start");
        assert_ne!(key.child("start"), key.child("add"));
    }

    #[test]
    fn scoped_keys_are_prefixed() {
        let key = IdempotencyKey::new("demo/1").unwrap();
        assert_eq!(key.scoped("create").as_str(), "create/demo/1");
    }

    #[test]
    fn keys_serialize_as_plain_strings() {
        let key = IdempotencyKey::new("demo/3").unwrap();
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"demo/3\"");
    }
}
