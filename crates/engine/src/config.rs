// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime configuration, optionally loaded from `crew.toml`
//!
//! ```toml
//! demo = true
//! tick_interval = "100ms"
//!
//! [timings]
//! removal_delay = "30s"
//! run_max = "20s"
//! ```

use crew_core::Timings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Name of the config file looked up in the project root
pub const CONFIG_FILE: &str = "crew.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    pub timings: Timings,
    /// Start the demo generator at boot
    pub demo: bool,
    /// How often the daemon fires due scheduled calls
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            timings: Timings::default(),
            demo: true,
            tick_interval: Duration::from_millis(100),
        }
    }
}

impl RuntimeConfig {
    /// Load `crew.toml` from `project_root`; a missing file means defaults
    pub fn load(project_root: &Path) -> Result<Self, ConfigError> {
        let path = project_root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
