// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log for durable storage
//!
//! One line of JSON per transaction. A transaction holds every operation of a
//! single entity call, so either all of them survive a crash or none do. A
//! torn or corrupted tail is dropped on open.

use crew_core::Operation;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur in WAL operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A committed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalEntry {
    pub seq: u64,
    pub ops: Vec<Operation>,
    /// CRC32 of the serialized operations
    pub checksum: u32,
}

impl WalEntry {
    pub fn new(seq: u64, ops: Vec<Operation>) -> Result<Self, WalError> {
        let checksum = checksum(&ops)?;
        Ok(Self { seq, ops, checksum })
    }

    pub fn verify(&self) -> bool {
        checksum(&self.ops).is_ok_and(|sum| sum == self.checksum)
    }
}

fn checksum(ops: &[Operation]) -> Result<u32, WalError> {
    let json = serde_json::to_string(ops)?;
    Ok(crc32fast::hash(json.as_bytes()))
}

/// Write-ahead log for durable operation storage
pub struct Wal {
    file: File,
    sequence: u64,
}

impl Wal {
    /// Open or create a WAL at the given path, discarding any corrupt tail
    pub fn open(path: &Path) -> Result<Self, WalError> {
        let scan = Scan::read(path)?;
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        if let Some(line) = scan.corrupt_line {
            tracing::warn!(
                path = %path.display(),
                line,
                valid_bytes = scan.valid_len,
                "truncating corrupt WAL tail"
            );
            file.set_len(scan.valid_len)?;
        }

        Ok(Self {
            file,
            sequence: scan.last_sequence(),
        })
    }

    /// Commit a transaction; returns its sequence number
    pub fn append(&mut self, ops: &[Operation]) -> Result<u64, WalError> {
        let entry = WalEntry::new(self.sequence + 1, ops.to_vec())?;
        let line = serde_json::to_string(&entry)?;
        writeln!(self.file, "{}", line)?;
        self.file.sync_all()?;
        self.sequence = entry.seq;
        Ok(self.sequence)
    }

    /// Get the current sequence number
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Replay the operations of every intact transaction, in commit order
    pub fn replay(path: &Path) -> Result<Vec<Operation>, WalError> {
        let scan = Scan::read(path)?;
        if let Some(line) = scan.corrupt_line {
            tracing::warn!(
                path = %path.display(),
                line,
                "WAL replay stopped at corrupt entry"
            );
        }
        Ok(scan.entries.into_iter().flat_map(|entry| entry.ops).collect())
    }
}

/// Intact prefix of a WAL file
struct Scan {
    entries: Vec<WalEntry>,
    /// Byte length of the intact prefix
    valid_len: u64,
    /// 1-based line number of the first bad entry, if any
    corrupt_line: Option<u64>,
}

impl Scan {
    fn read(path: &Path) -> Result<Self, WalError> {
        let mut scan = Scan {
            entries: Vec::new(),
            valid_len: 0,
            corrupt_line: None,
        };
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(scan),
            Err(e) => return Err(e.into()),
        };

        let mut reader = BufReader::new(file);
        let mut line = String::new();
        let mut line_number = 0;
        loop {
            line.clear();
            let bytes = reader.read_line(&mut line)?;
            if bytes == 0 {
                break;
            }
            line_number += 1;

            // A line without its newline was torn mid-write
            let intact = if line.ends_with('\n') {
                serde_json::from_str::<WalEntry>(line.trim_end())
                    .ok()
                    .filter(WalEntry::verify)
            } else {
                None
            };
            match intact {
                Some(entry) => {
                    scan.valid_len += bytes as u64;
                    scan.entries.push(entry);
                }
                None if line.trim().is_empty() && line.ends_with('\n') => {
                    scan.valid_len += bytes as u64;
                }
                None => {
                    scan.corrupt_line = Some(line_number);
                    break;
                }
            }
        }
        Ok(scan)
    }

    fn last_sequence(&self) -> u64 {
        self.entries.last().map_or(0, |entry| entry.seq)
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
