// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable snapshots of [`MaterializedState`]: zstd-compressed JSON written
//! atomically (temp file + rename) with rotating `.bak` generations, the same
//! shape as the teacher's snapshot rotation for its own state file.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{StorageError, StorageResult};
use crate::state::MaterializedState;

/// How many prior generations to retain alongside the live snapshot.
const MAX_BAK_FILES: usize = 3;
const ZSTD_LEVEL: i32 = 3;

pub struct Snapshot {
    path: PathBuf,
}

impl Snapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the state at `path`, or a fresh default if no snapshot exists yet.
    pub fn load(&self) -> StorageResult<MaterializedState> {
        if !self.path.exists() {
            return Ok(MaterializedState::new());
        }
        let compressed = fs::read(&self.path)?;
        let raw = zstd::decode_all(compressed.as_slice()).map_err(|e| StorageError::Zstd(e.to_string()))?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Write `state`, rotating the previous generations out of the way first.
    pub fn save(&self, state: &MaterializedState) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        self.rotate_bak_files()?;

        let raw = serde_json::to_vec(state)?;
        let compressed = zstd::encode_all(raw.as_slice(), ZSTD_LEVEL).map_err(|e| StorageError::Zstd(e.to_string()))?;

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, compressed)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn rotate_bak_files(&self) -> StorageResult<()> {
        if !self.path.exists() {
            return Ok(());
        }
        for gen in (1..MAX_BAK_FILES).rev() {
            let from = self.bak_path(gen);
            let to = self.bak_path(gen + 1);
            if from.exists() {
                if let Err(err) = fs::rename(&from, &to) {
                    warn!(?from, ?to, %err, "failed to rotate snapshot backup");
                }
            }
        }
        let first_bak = self.bak_path(1);
        fs::copy(&self.path, &first_bak)?;
        Ok(())
    }

    fn bak_path(&self, generation: usize) -> PathBuf {
        rotate_bak_path(&self.path, generation)
    }
}

fn rotate_bak_path(path: &Path, generation: usize) -> PathBuf {
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("state");
    path.with_file_name(format!("{file_name}.bak{generation}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ff_core::{Flow, FlowId, FlowNode, FlowProgress, FlowStatus};

    fn sample_state() -> MaterializedState {
        let mut state = MaterializedState::new();
        let id = FlowId::new();
        let now = chrono::Utc::now();
        state.flows.insert(
            id.clone(),
            Flow {
                id,
                flowname: "demo".to_string(),
                root_name: "root".to_string(),
                root_queue: "jobQueue".to_string(),
                user_id: "u1".to_string(),
                job_structure: FlowNode {
                    name: "root".to_string(),
                    queue: "jobQueue".to_string(),
                    data: serde_json::json!({}),
                    opts: serde_json::json!({}),
                    children: vec![],
                },
                root_job_id: None,
                status: FlowStatus::Pending,
                progress: FlowProgress::new(1),
                result: None,
                error: None,
                created_at: now,
                updated_at: now,
                started_at: None,
                completed_at: None,
            },
        );
        state
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Snapshot::new(dir.path().join("state.bin"));
        let state = sample_state();
        snapshot.save(&state).unwrap();
        let loaded = snapshot.load().unwrap();
        assert_eq!(loaded.flows.len(), 1);
    }

    #[test]
    fn load_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Snapshot::new(dir.path().join("missing.bin"));
        let loaded = snapshot.load().unwrap();
        assert!(loaded.flows.is_empty());
    }

    #[test]
    fn repeated_saves_rotate_backups() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Snapshot::new(dir.path().join("state.bin"));
        for _ in 0..(MAX_BAK_FILES + 2) {
            snapshot.save(&sample_state()).unwrap();
        }
        assert!(snapshot.bak_path(1).exists());
    }
}
