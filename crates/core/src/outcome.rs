// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry-stable outcome of a worker's run
//!
//! The decision is a pure function of the worker id. A retried run must
//! reach the same verdict, so no random source is consulted here.

use crate::worker::WorkerId;

/// Runs whose normalized checksum is at or below this value fail
pub const FAILURE_THRESHOLD: f64 = 0.2;

/// Terminal verdict of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Failed,
}

/// Normalize the CRC32 of the id's UTF-8 bytes into `[0, 1)`
pub fn outcome_value(id: &WorkerId) -> f64 {
    f64::from(crc32fast::hash(id.as_str().as_bytes())) / 4_294_967_296.0
}

/// Decide how the run of `id` ends: roughly 80% complete, 20% fail
pub fn decide(id: &WorkerId) -> Outcome {
    if outcome_value(id) <= FAILURE_THRESHOLD {
        Outcome::Failed
    } else {
        Outcome::Completed
    }
}

#[cfg(test)]
#[path = "outcome_tests.rs"]
mod tests;
