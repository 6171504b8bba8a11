// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! crew daemon library: the wire protocol and per-project paths shared by
//! `crewd` and the `crew` CLI

mod config;
pub mod protocol;

pub use config::{Config, ConfigError};
pub use protocol::{Request, Response, PROTOCOL_VERSION};
