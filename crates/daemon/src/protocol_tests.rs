// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol unit tests

use super::*;

#[test]
fn create_request_survives_encoding() {
    let request = Request::Create {
        task_description: "sort the dusty ledgers".to_string(),
        start_delay_ms: 250,
        idempotency_key: Some("batch-7".to_string()),
    };

    let encoded = encode(&request).expect("encode failed");
    let decoded: Request = decode(&encoded).expect("decode failed");

    assert_eq!(request, decoded);
}

#[test]
fn create_defaults_optional_fields() {
    let decoded: Request =
        decode(br#"{"type":"Create","task_description":"tidy"}"#).expect("decode failed");

    assert_eq!(
        decoded,
        Request::Create {
            task_description: "tidy".to_string(),
            start_delay_ms: 0,
            idempotency_key: None,
        }
    );
}

#[test]
fn requests_are_tagged_by_type() {
    let encoded = encode(&Request::Freeze { frozen: true }).expect("encode failed");
    let json: serde_json::Value = serde_json::from_slice(&encoded).expect("valid json");

    assert_eq!(json["type"], "Freeze");
    assert_eq!(json["frozen"], true);
}

#[test]
fn worker_list_keeps_statuses() {
    let workers = vec![
        WorkerInfo {
            worker_id: WorkerId::from("w-1"),
            task_description: "polish the brass lamps".to_string(),
            status: WorkerStatus::Failed,
        },
        WorkerInfo {
            worker_id: WorkerId::from("w-2"),
            task_description: "count the quiet sheep".to_string(),
            status: WorkerStatus::InProgress,
        },
    ];

    let encoded = encode(&Response::Workers {
        workers: workers.clone(),
    })
    .expect("encode failed");
    let json = std::str::from_utf8(&encoded).expect("should be valid UTF-8");
    assert!(json.contains("\"IN_PROGRESS\""), "{}", json);

    match decode(&encoded).expect("decode failed") {
        Response::Workers { workers: decoded } => assert_eq!(decoded, workers),
        other => panic!("Expected Workers response, got {:?}", other),
    }
}

#[test]
fn encode_returns_json_without_length_prefix() {
    let encoded = encode(&Response::Ok).expect("encode failed");

    let json_str = std::str::from_utf8(&encoded).expect("should be valid UTF-8");
    assert!(
        json_str.starts_with('{'),
        "should be JSON object: {}",
        json_str
    );
}

#[tokio::test]
async fn read_write_message_roundtrip() {
    let original = b"hello world";

    let mut buffer = Vec::new();
    write_message(&mut buffer, original)
        .await
        .expect("write failed");

    // write_message adds 4-byte length prefix
    assert_eq!(buffer.len(), 4 + original.len());

    let mut cursor = std::io::Cursor::new(buffer);
    let read_back = read_message(&mut cursor).await.expect("read failed");

    assert_eq!(read_back, original);
}

#[tokio::test]
async fn write_message_adds_length_prefix() {
    let data = b"test data";

    let mut buffer = Vec::new();
    write_message(&mut buffer, data)
        .await
        .expect("write failed");

    let len = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;
    assert_eq!(len, data.len());
    assert_eq!(&buffer[4..], data);
}

#[tokio::test]
async fn empty_stream_is_connection_closed() {
    let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed));
}

#[tokio::test]
async fn oversized_length_is_rejected() {
    let mut buffer = ((MAX_MESSAGE_SIZE + 1) as u32).to_be_bytes().to_vec();
    buffer.extend_from_slice(b"{}");
    let mut cursor = std::io::Cursor::new(buffer);

    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::MessageTooLarge { .. }));
}

#[tokio::test]
async fn request_roundtrips_through_framing() {
    let mut buffer = Vec::new();
    let bytes = encode(&Request::WorkerStatus {
        id: "w-9".to_string(),
    })
    .expect("encode failed");
    write_message(&mut buffer, &bytes).await.expect("write failed");

    let mut cursor = std::io::Cursor::new(buffer);
    let request = read_request(&mut cursor, DEFAULT_TIMEOUT)
        .await
        .expect("read failed");

    assert_eq!(
        request,
        Request::WorkerStatus {
            id: "w-9".to_string()
        }
    );
}

#[tokio::test]
async fn stalled_reader_times_out() {
    let (_client, mut server) = tokio::io::duplex(64);
    let err = read_request(&mut server, std::time::Duration::from_millis(20))
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Timeout));
}
