// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only write-ahead log of broker events, one JSON object per line.
//!
//! On restart, the broker replays every entry after the last checkpointed
//! sequence number to rebuild its in-memory job index.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{BrokerError, BrokerResult};

/// One logged event, tagged with its monotonic sequence number.
#[derive(Debug, Clone)]
pub struct WalEntry<E> {
    pub seq: u64,
    pub event: E,
}

/// A durable, append-only log backing one broker instance.
///
/// Generic over the event payload type so `ff-broker` can log
/// [`crate::events::BrokerEvent`] without depending on `ff-engine`.
pub struct Wal<E> {
    path: PathBuf,
    file: File,
    next_seq: u64,
    processed_seq: u64,
    _marker: std::marker::PhantomData<E>,
}

impl<E> Wal<E>
where
    E: Serialize + DeserializeOwned,
{
    /// Open (creating if absent) the WAL at `path`, resuming sequence numbers
    /// from `processed_seq` (the last checkpointed offset).
    pub fn open(path: &Path, processed_seq: u64) -> BrokerResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        let next_seq = Self::scan_max_seq(path)?.map(|s| s + 1).unwrap_or(0);
        Ok(Self {
            path: path.to_path_buf(),
            file,
            next_seq,
            processed_seq,
            _marker: std::marker::PhantomData,
        })
    }

    fn scan_max_seq(path: &Path) -> BrokerResult<Option<u64>> {
        if !path.exists() {
            return Ok(None);
        }
        let reader = BufReader::new(File::open(path)?);
        let mut max_seq = None;
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: StoredRecord<serde_json::Value> = serde_json::from_str(&line)?;
            max_seq = Some(record.seq.max(max_seq.unwrap_or(0)));
        }
        Ok(max_seq)
    }

    /// Append `event`, returning its assigned sequence number. Not flushed to
    /// disk until [`Wal::flush`] is called.
    pub fn append(&mut self, event: E) -> BrokerResult<u64> {
        let seq = self.next_seq;
        let record = StoredRecord { seq, event };
        let line = serde_json::to_string(&record)?;
        writeln!(self.file, "{line}")?;
        self.next_seq += 1;
        Ok(seq)
    }

    pub fn flush(&mut self) -> BrokerResult<()> {
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }

    pub fn processed_seq(&self) -> u64 {
        self.processed_seq
    }

    pub fn mark_processed(&mut self, seq: u64) {
        self.processed_seq = self.processed_seq.max(seq);
    }

    /// Every entry with `seq > after`, in order.
    pub fn entries_after(&self, after: u64) -> BrokerResult<Vec<WalEntry<E>>> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        reader.seek(SeekFrom::Start(0))?;
        let mut out = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: StoredRecord<E> = serde_json::from_str(&line).map_err(|e| {
                BrokerError::WalCorrupt {
                    offset: line_no as u64,
                    reason: e.to_string(),
                }
            })?;
            if record.seq > after {
                out.push(WalEntry {
                    seq: record.seq,
                    event: record.event,
                });
            }
        }
        Ok(out)
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct StoredRecord<E> {
    seq: u64,
    event: E,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn appended_entries_are_replayed_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wal");
        let mut wal: Wal<String> = Wal::open(&path, 0).unwrap();
        wal.append("a".to_string()).unwrap();
        wal.append("b".to_string()).unwrap();
        wal.flush().unwrap();

        let entries = wal.entries_after(0).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event, "a");
        assert_eq!(entries[1].event, "b");
    }

    #[test]
    fn reopening_resumes_sequence_numbers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wal");
        {
            let mut wal: Wal<String> = Wal::open(&path, 0).unwrap();
            wal.append("a".to_string()).unwrap();
            wal.flush().unwrap();
        }
        let mut wal: Wal<String> = Wal::open(&path, 0).unwrap();
        let seq = wal.append("b".to_string()).unwrap();
        assert_eq!(seq, 1);
    }

    #[test]
    fn entries_after_excludes_processed_prefix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wal");
        let mut wal: Wal<String> = Wal::open(&path, 0).unwrap();
        wal.append("a".to_string()).unwrap();
        wal.append("b".to_string()).unwrap();
        wal.flush().unwrap();

        let entries = wal.entries_after(0).unwrap();
        assert_eq!(entries[0].seq, 0);
        let replay_from_1 = wal.entries_after(0).unwrap();
        assert_eq!(replay_from_1.len(), 2);
    }
}
