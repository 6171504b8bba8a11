// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! crew-storage: durable state for the crew runtime
//!
//! Every entity call commits one transaction to the write-ahead log. On
//! startup the log is replayed into a [`MaterializedState`].

mod state;
mod wal;

pub use state::{MaterializedState, ScheduledCall, Workflow};
pub use wal::{Wal, WalEntry, WalError};
