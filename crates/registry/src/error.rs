// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no handler registered for job type {job_type:?}")]
    HandlerNotFound { job_type: String },

    #[error("handler {job_type:?} is disabled")]
    HandlerDisabled { job_type: String },

    #[error("failed to load handler module at {path}: {reason}")]
    LoadFailed { path: String, reason: String },

    #[error("handler watcher I/O error: {0}")]
    Watch(#[from] notify::Error),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

impl From<RegistryError> for ff_core::CoreError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::HandlerNotFound { job_type } => ff_core::CoreError::HandlerNotFound { job_type },
            RegistryError::HandlerDisabled { job_type } => ff_core::CoreError::HandlerNotFound { job_type },
            other => ff_core::CoreError::Internal(other.to_string()),
        }
    }
}
