// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker-local error taxonomy; converted to [`ff_core::CoreError`] at the
//! boundary so callers never see storage-layer detail.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("queue {queue:?} is not enabled")]
    UnknownQueue { queue: String },

    #[error("job {job_id} not found in queue {queue}")]
    JobNotFound { queue: String, job_id: String },

    #[error("schedule {0} not found")]
    ScheduleNotFound(String),

    #[error("wal corrupt at offset {offset}: {reason}")]
    WalCorrupt { offset: u64, reason: String },
}

impl From<BrokerError> for ff_core::CoreError {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::UnknownQueue { queue } => ff_core::CoreError::InvalidQueue { queue },
            BrokerError::JobNotFound { job_id, .. } => {
                ff_core::CoreError::not_found("job", job_id)
            }
            BrokerError::ScheduleNotFound(id) => ff_core::CoreError::not_found("schedule", id),
            other => ff_core::CoreError::BrokerUnavailable(other.to_string()),
        }
    }
}

pub type BrokerResult<T> = Result<T, BrokerError>;
