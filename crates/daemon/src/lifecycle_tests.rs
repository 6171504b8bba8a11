// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::Path;

/// Config rooted entirely inside `dir`, with the demo loop off
pub(crate) fn test_config(dir: &Path) -> Config {
    let project = dir.join("project");
    let state = dir.join("state");
    std::fs::create_dir_all(&project).unwrap();
    std::fs::write(project.join("crew.toml"), "demo = false\n").unwrap();
    Config {
        project_root: project,
        socket_path: dir.join("crewd.sock"),
        lock_path: state.join("daemon.pid"),
        version_path: state.join("daemon.version"),
        log_path: state.join("daemon.log"),
        wal_path: state.join("wal").join("crew.wal"),
    }
}

#[tokio::test]
async fn startup_writes_runtime_files_and_initializes_registry() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let daemon = startup(&config).await.unwrap();

    assert!(config.socket_path.exists());
    assert!(config.wal_path.exists());
    assert_eq!(
        std::fs::read_to_string(&config.version_path).unwrap(),
        env!("CARGO_PKG_VERSION")
    );
    let pid = std::fs::read_to_string(&config.lock_path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());
    assert!(!daemon.runtime().is_frozen().unwrap());
}

#[tokio::test]
async fn second_daemon_cannot_take_the_lock() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let _first = startup(&config).await.unwrap();
    let err = startup(&config).await.err().unwrap();

    assert!(matches!(err, LifecycleError::LockFailed(_)));
}

#[tokio::test]
async fn bad_settings_fail_before_binding() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    std::fs::write(config.project_root.join("crew.toml"), "tick = 1").unwrap();

    let err = startup(&config).await.err().unwrap();

    assert!(matches!(err, LifecycleError::Settings(_)));
    assert!(!config.socket_path.exists());
    assert!(!config.lock_path.exists());
    assert!(!config.version_path.exists());
}

#[tokio::test]
async fn shutdown_removes_runtime_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let mut daemon = startup(&config).await.unwrap();
    daemon.shutdown().unwrap();

    assert!(!config.socket_path.exists());
    assert!(!config.lock_path.exists());
    assert!(!config.version_path.exists());
    assert!(config.wal_path.exists());
}

#[tokio::test]
async fn restart_keeps_workers() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let id = {
        let mut daemon = startup(&config).await.unwrap();
        let id = daemon
            .runtime()
            .create_worker(
                crew_core::CreateRequest::new(
                    "mend the torn sails",
                    std::time::Duration::from_secs(60),
                ),
                None,
            )
            .await
            .unwrap();
        daemon.shutdown().unwrap();
        id
    };

    let daemon = startup(&config).await.unwrap();
    let listed = daemon.runtime().list().await.unwrap();
    assert_eq!(listed.workers.len(), 1);
    assert_eq!(listed.workers[0].worker_id, id);
    assert_eq!(listed.workers[0].task_description, "mend the torn sails");
}
