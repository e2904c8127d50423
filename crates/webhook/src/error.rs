// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Webhook-local error taxonomy; converted to [`ff_core::CoreError`] at the boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error(transparent)]
    Core(#[from] ff_core::CoreError),

    #[error(transparent)]
    Broker(#[from] ff_broker::BrokerError),

    #[error(transparent)]
    Storage(#[from] ff_storage::StorageError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl From<WebhookError> for ff_core::CoreError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::Core(err) => err,
            WebhookError::Broker(err) => err.into(),
            WebhookError::Storage(err) => err.into(),
            WebhookError::Http(err) => ff_core::CoreError::WebhookDeliveryFailed(err.to_string()),
        }
    }
}

pub type WebhookResult<T> = Result<T, WebhookError>;
