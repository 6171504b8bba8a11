// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crew_core::{IdempotencyKey, WorkerId, WorkerStatus};
use std::fs;

fn create_op(id: &str) -> Operation {
    Operation::WorkerCreate {
        id: WorkerId::from(id),
        task_description: "deploy the joyful firewall".to_string(),
    }
}

fn applied(key: &str) -> Operation {
    Operation::KeyApplied {
        key: IdempotencyKey::new(key).unwrap(),
    }
}

#[test]
fn wal_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.wal");

    {
        let mut wal = Wal::open(&path).unwrap();
        wal.append(&[create_op("w-1"), applied("k-1")]).unwrap();
        wal.append(&[Operation::WorkerStatus {
            id: WorkerId::from("w-1"),
            status: WorkerStatus::InProgress,
        }])
        .unwrap();
    }

    let ops = Wal::replay(&path).unwrap();
    assert_eq!(ops.len(), 3);
    assert!(matches!(ops[0], Operation::WorkerCreate { .. }));
    assert!(matches!(ops[1], Operation::KeyApplied { .. }));
    assert!(matches!(ops[2], Operation::WorkerStatus { .. }));
}

#[test]
fn wal_sequence_continues() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.wal");

    {
        let mut wal = Wal::open(&path).unwrap();
        assert_eq!(wal.sequence(), 0);
        assert_eq!(wal.append(&[Operation::RegistryInitialize]).unwrap(), 1);
    }

    {
        let mut wal = Wal::open(&path).unwrap();
        assert_eq!(wal.sequence(), 1);
        assert_eq!(wal.append(&[applied("k")]).unwrap(), 2);
    }
}

#[test]
fn wal_replay_nonexistent() {
    let path = Path::new("/nonexistent/path/wal");
    let ops = Wal::replay(path).unwrap();
    assert!(ops.is_empty());
}

#[test]
fn torn_transaction_is_dropped_whole() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.wal");
    {
        let mut wal = Wal::open(&path).unwrap();
        wal.append(&[Operation::RegistryInitialize]).unwrap();
    }

    // Simulate a crash halfway through writing a two-operation transaction
    let full = serde_json::to_string(
        &WalEntry::new(2, vec![create_op("w-1"), applied("k-1")]).unwrap(),
    )
    .unwrap();
    let mut contents = fs::read_to_string(&path).unwrap();
    contents.push_str(&full[..full.len() / 2]);
    fs::write(&path, contents).unwrap();

    let ops = Wal::replay(&path).unwrap();
    assert_eq!(ops, vec![Operation::RegistryInitialize]);
}

#[test]
fn checksum_mismatch_stops_replay() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.wal");
    {
        let mut wal = Wal::open(&path).unwrap();
        wal.append(&[create_op("w-1")]).unwrap();
        wal.append(&[create_op("w-2")]).unwrap();
        wal.append(&[create_op("w-3")]).unwrap();
    }

    let contents = fs::read_to_string(&path).unwrap();
    let tampered: Vec<String> = contents
        .lines()
        .enumerate()
        .map(|(i, line)| {
            if i == 1 {
                line.replace("w-2", "w-X")
            } else {
                line.to_string()
            }
        })
        .collect();
    fs::write(&path, tampered.join("\n") + "\n").unwrap();

    let ops = Wal::replay(&path).unwrap();
    assert_eq!(ops, vec![create_op("w-1")]);
}

#[test]
fn open_truncates_corrupt_tail_before_appending() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.wal");
    {
        let mut wal = Wal::open(&path).unwrap();
        wal.append(&[create_op("w-1")]).unwrap();
    }
    let mut contents = fs::read_to_string(&path).unwrap();
    contents.push_str("{\"seq\":2,\"ops\":[");
    fs::write(&path, contents).unwrap();

    {
        let mut wal = Wal::open(&path).unwrap();
        assert_eq!(wal.sequence(), 1);
        assert_eq!(wal.append(&[create_op("w-2")]).unwrap(), 2);
    }

    let ops = Wal::replay(&path).unwrap();
    assert_eq!(ops, vec![create_op("w-1"), create_op("w-2")]);
}

#[test]
fn entries_verify_their_checksum() {
    let mut entry = WalEntry::new(1, vec![applied("a")]).unwrap();
    assert!(entry.verify());
    entry.ops.push(applied("b"));
    assert!(!entry.verify());
}
