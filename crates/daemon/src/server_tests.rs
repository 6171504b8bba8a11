// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::lifecycle::{startup, DaemonState};
use crew_core::WorkerStatus;
use tempfile::TempDir;

async fn daemon() -> (TempDir, DaemonState) {
    let dir = tempfile::tempdir().unwrap();
    let config = crate::lifecycle::tests::test_config(dir.path());
    let daemon = startup(&config).await.unwrap();
    (dir, daemon)
}

fn create(description: &str, key: Option<&str>) -> Request {
    Request::Create {
        task_description: description.to_string(),
        start_delay_ms: 60_000,
        idempotency_key: key.map(str::to_string),
    }
}

#[tokio::test]
async fn ping_and_hello() {
    let (_dir, daemon) = daemon().await;

    assert_eq!(handle_request(&daemon.ctx, Request::Ping).await, Response::Pong);
    assert_eq!(
        handle_request(
            &daemon.ctx,
            Request::Hello {
                version: "0.0.0".to_string()
            }
        )
        .await,
        Response::Hello {
            version: PROTOCOL_VERSION.to_string()
        }
    );
}

#[tokio::test]
async fn create_then_look_up() {
    let (_dir, daemon) = daemon().await;

    let Response::Created { worker_id } =
        handle_request(&daemon.ctx, create("wax the oak floors", None)).await
    else {
        panic!("expected Created");
    };

    let response = handle_request(
        &daemon.ctx,
        Request::WorkerStatus {
            id: worker_id.to_string(),
        },
    )
    .await;
    assert_eq!(
        response,
        Response::Worker {
            worker_id: worker_id.clone(),
            task_description: "wax the oak floors".to_string(),
            status: WorkerStatus::NotStarted,
        }
    );

    match handle_request(&daemon.ctx, Request::List).await {
        Response::Workers { workers } => {
            assert_eq!(workers.len(), 1);
            assert_eq!(workers[0].worker_id, worker_id);
        }
        other => panic!("expected Workers, got {:?}", other),
    }
}

#[tokio::test]
async fn create_with_same_key_returns_same_worker() {
    let (_dir, daemon) = daemon().await;

    let first = handle_request(&daemon.ctx, create("a", Some("k-1"))).await;
    let second = handle_request(&daemon.ctx, create("a", Some("k-1"))).await;

    assert!(matches!(first, Response::Created { .. }));
    assert_eq!(first, second);
}

#[tokio::test]
async fn blank_key_is_rejected() {
    let (_dir, daemon) = daemon().await;

    let response = handle_request(&daemon.ctx, create("a", Some("   "))).await;
    assert!(matches!(response, Response::Error { .. }));
}

#[tokio::test]
async fn unknown_worker_is_an_error() {
    let (_dir, daemon) = daemon().await;

    for request in [
        Request::WorkerStatus {
            id: "nobody".to_string(),
        },
        Request::Complete {
            id: "nobody".to_string(),
            idempotency_key: None,
        },
    ] {
        match handle_request(&daemon.ctx, request).await {
            Response::Error { message } => assert!(message.contains("nobody"), "{}", message),
            other => panic!("expected Error, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn complete_marks_worker_completed() {
    let (_dir, daemon) = daemon().await;

    let Response::Created { worker_id } =
        handle_request(&daemon.ctx, create("fold the maps", None)).await
    else {
        panic!("expected Created");
    };

    let response = handle_request(
        &daemon.ctx,
        Request::Complete {
            id: worker_id.to_string(),
            idempotency_key: Some("done".to_string()),
        },
    )
    .await;
    assert_eq!(response, Response::Ok);

    let status = daemon.runtime().status(&worker_id).await.unwrap();
    assert_eq!(status.status, WorkerStatus::Completed);
}

#[tokio::test]
async fn freeze_toggles_is_frozen() {
    let (_dir, daemon) = daemon().await;

    assert_eq!(
        handle_request(&daemon.ctx, Request::IsFrozen).await,
        Response::Frozen { frozen: false }
    );
    assert_eq!(
        handle_request(&daemon.ctx, Request::Freeze { frozen: true }).await,
        Response::Ok
    );
    assert_eq!(
        handle_request(&daemon.ctx, Request::IsFrozen).await,
        Response::Frozen { frozen: true }
    );
}

#[tokio::test]
async fn status_counts_workers() {
    let (_dir, daemon) = daemon().await;
    handle_request(&daemon.ctx, create("a", None)).await;
    handle_request(&daemon.ctx, create("b", None)).await;

    match handle_request(&daemon.ctx, Request::Status).await {
        Response::Status {
            workers_total,
            workers_registered,
            workers_active,
            frozen,
            ..
        } => {
            assert_eq!(workers_total, 2);
            assert_eq!(workers_registered, 2);
            assert_eq!(workers_active, 2);
            assert!(!frozen);
        }
        other => panic!("expected Status, got {:?}", other),
    }
}

#[tokio::test]
async fn shutdown_request_notifies_main_loop() {
    let (_dir, daemon) = daemon().await;

    assert_eq!(
        handle_request(&daemon.ctx, Request::Shutdown).await,
        Response::ShuttingDown
    );
    // notify_one stores a permit, so a later waiter still sees it
    tokio::time::timeout(std::time::Duration::from_secs(1), daemon.ctx.shutdown.notified())
        .await
        .unwrap();
}

#[tokio::test]
async fn connection_roundtrip_over_socket() {
    let (_dir, daemon) = daemon().await;
    let path = daemon.config.socket_path.clone();
    let ctx = Arc::clone(&daemon.ctx);
    let listener = daemon.listener;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        handle_connection(&ctx, stream).await
    });

    let stream = UnixStream::connect(&path).await.unwrap();
    let (mut reader, mut writer) = stream.into_split();
    let bytes = protocol::encode(&Request::Ping).unwrap();
    protocol::write_message(&mut writer, &bytes).await.unwrap();
    let reply = protocol::read_message(&mut reader).await.unwrap();

    assert_eq!(protocol::decode::<Response>(&reply).unwrap(), Response::Pong);
    server.await.unwrap().unwrap();
}
