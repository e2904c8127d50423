// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot (de)serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("snapshot compression error: {0}")]
    Zstd(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for ff_core::CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { kind, id } => ff_core::CoreError::NotFound { kind, id },
            StorageError::Conflict(msg) => ff_core::CoreError::Conflict(msg),
            other => ff_core::CoreError::Internal(other.to_string()),
        }
    }
}
