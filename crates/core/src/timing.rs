// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delays and durations that drive the worker lifecycle

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lifecycle timings
///
/// Every field can be overridden from `crew.toml` using humantime strings
/// (`"30s"`, `"250ms"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Shortest simulated run
    #[serde(with = "humantime_serde")]
    pub run_min: Duration,
    /// Longest simulated run
    #[serde(with = "humantime_serde")]
    pub run_max: Duration,
    /// Grace period between completion and removal from the registry
    #[serde(with = "humantime_serde")]
    pub removal_delay: Duration,
    /// Pause before an explicit Complete returns
    #[serde(with = "humantime_serde")]
    pub complete_pause: Duration,
    /// Interval between demo generator iterations
    #[serde(with = "humantime_serde")]
    pub demo_interval: Duration,
    /// Upper bound for the start delay of demo workers
    #[serde(with = "humantime_serde")]
    pub max_start_delay: Duration,
    /// Wait before a failed scheduled delivery is attempted again
    #[serde(with = "humantime_serde")]
    pub redelivery_backoff: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            run_min: Duration::from_millis(1_000),
            run_max: Duration::from_millis(20_000),
            removal_delay: Duration::from_secs(30),
            complete_pause: Duration::from_secs(1),
            demo_interval: Duration::from_secs(5),
            max_start_delay: Duration::from_millis(5_000),
            redelivery_backoff: Duration::from_secs(1),
        }
    }
}

impl Timings {
    /// Draw a run duration uniformly from `[run_min, run_max]` at millisecond granularity
    pub fn roll_run_duration(&self, rng: &mut impl Rng) -> Duration {
        uniform_ms(rng, self.run_min, self.run_max)
    }

    /// Draw a start delay uniformly from `[0, max_start_delay]`
    pub fn roll_start_delay(&self, rng: &mut impl Rng) -> Duration {
        uniform_ms(rng, Duration::ZERO, self.max_start_delay)
    }
}

fn uniform_ms(rng: &mut impl Rng, low: Duration, high: Duration) -> Duration {
    let low = low.as_millis() as u64;
    let high = high.as_millis() as u64;
    if high <= low {
        return Duration::from_millis(low);
    }
    Duration::from_millis(rng.gen_range(low..=high))
}
