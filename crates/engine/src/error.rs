// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] ff_core::CoreError),

    #[error(transparent)]
    Broker(#[from] ff_broker::BrokerError),

    #[error(transparent)]
    Registry(#[from] ff_registry::RegistryError),

    #[error(transparent)]
    Storage(#[from] ff_storage::StorageError),

    #[error("flow graph contains a cycle")]
    CyclicFlow,

    #[error("invalid cron expression {expression:?}: {reason}")]
    InvalidCron { expression: String, reason: String },
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<EngineError> for ff_core::CoreError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Core(e) => e,
            EngineError::Broker(e) => e.into(),
            EngineError::Registry(e) => e.into(),
            EngineError::Storage(e) => e.into(),
            EngineError::CyclicFlow => ff_core::CoreError::InvalidInput("flow graph contains a cycle".to_string()),
            EngineError::InvalidCron { expression, reason } => {
                ff_core::CoreError::InvalidInput(format!("invalid cron expression {expression:?}: {reason}"))
            }
        }
    }
}
