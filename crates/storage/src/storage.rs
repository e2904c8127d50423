// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shared handle every `flows`/`webhooks`/`apikeys`/`users` operation is
//! implemented against: an in-memory [`MaterializedState`] guarded by a
//! single `RwLock`, periodically snapshotted to disk.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::StorageResult;
use crate::snapshot::Snapshot;
use crate::state::MaterializedState;

#[derive(Clone)]
pub struct Storage {
    pub(crate) state: Arc<RwLock<MaterializedState>>,
    snapshot: Option<Arc<Snapshot>>,
}

impl Storage {
    /// Load existing state from `snapshot_path`, or start empty.
    pub fn open(snapshot_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let snapshot = Snapshot::new(snapshot_path);
        let state = snapshot.load()?;
        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            snapshot: Some(Arc::new(snapshot)),
        })
    }

    /// A `Storage` with no backing snapshot file; `flush` is a no-op. Useful
    /// for tests and for components that only ever see state via `ff-broker`
    /// replay at startup.
    pub fn in_memory() -> Self {
        Self {
            state: Arc::new(RwLock::new(MaterializedState::new())),
            snapshot: None,
        }
    }

    /// Write the current state to disk. Callers typically run this on a
    /// timer or before a graceful shutdown.
    pub fn flush(&self) -> StorageResult<()> {
        let Some(snapshot) = &self.snapshot else {
            return Ok(());
        };
        let state = self.state.read().clone();
        snapshot.save(&state)
    }
}
