// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-project daemon paths

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Project not found at {0}: {1}")]
    ProjectNotFound(PathBuf, std::io::Error),

    #[error("Could not determine state directory")]
    NoStateDir,
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Project root directory
    pub project_root: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to version file
    pub version_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to the write-ahead log
    pub wal_path: PathBuf,
}

impl Config {
    /// Create config for a project
    pub fn for_project(project_root: &Path) -> Result<Self, ConfigError> {
        let canonical = project_root
            .canonicalize()
            .map_err(|e| ConfigError::ProjectNotFound(project_root.to_path_buf(), e))?;

        let hash = project_hash(&canonical);
        let state_dir = state_dir()?.join("projects").join(&hash);

        Ok(Self {
            project_root: canonical,
            socket_path: socket_dir().join(format!("{}.sock", hash)),
            lock_path: state_dir.join("daemon.pid"),
            version_path: state_dir.join("daemon.version"),
            log_path: state_dir.join("daemon.log"),
            wal_path: state_dir.join("wal").join("crew.wal"),
        })
    }
}

/// Get the state directory for crew
fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("crew"));
    }

    let home = std::env::var("HOME").map_err(|_| ConfigError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/crew"))
}

/// Get the socket directory for crew
///
/// Uses /tmp/crew by default to keep paths short (macOS SUN_LEN = 104).
/// Can be overridden with CREW_SOCKET_DIR for testing.
fn socket_dir() -> PathBuf {
    match std::env::var("CREW_SOCKET_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => PathBuf::from("/tmp/crew"),
    }
}

/// First 16 hex chars of the SHA-256 of the project path
fn project_hash(path: &Path) -> String {
    let digest = Sha256::digest(path.to_string_lossy().as_bytes());
    digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_hash_is_stable_and_short() {
        let a = project_hash(Path::new("/work/crew"));
        assert_eq!(a, project_hash(Path::new("/work/crew")));
        assert_ne!(a, project_hash(Path::new("/work/other")));
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn paths_share_the_project_hash() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::for_project(dir.path()).unwrap();
        let hash = project_hash(&config.project_root);

        assert_eq!(
            config.socket_path.file_name().unwrap().to_string_lossy(),
            format!("{}.sock", hash)
        );
        assert!(config.log_path.to_string_lossy().contains(&hash));
        assert!(config.wal_path.ends_with("wal/crew.wal"));
    }

    #[test]
    fn missing_project_is_an_error() {
        let err = Config::for_project(Path::new("/nonexistent/crew/project")).unwrap_err();
        assert!(matches!(err, ConfigError::ProjectNotFound(..)));
    }
}
