// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error taxonomy used across all crates.

use thiserror::Error;

/// Errors surfaced by core domain operations.
///
/// Adapter crates (`ff-daemon`) map these onto transport-specific codes
/// (HTTP status, WS close codes); the variants here stay transport-neutral.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("queue {queue:?} is not on the project whitelist")]
    InvalidQueue { queue: String },

    #[error("invalid status transition: {from} -> {to}")]
    InvalidStatus { from: String, to: String },

    #[error("no handler registered for job type {job_type:?}")]
    HandlerNotFound { job_type: String },

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("unauthorised: {0}")]
    Unauthorised(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("broker unavailable: {0}")]
    BrokerUnavailable(String),

    #[error("handler failed: {0}")]
    HandlerFailed(String),

    #[error("webhook delivery failed: {0}")]
    WebhookDeliveryFailed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn invalid_status(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::InvalidStatus {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Whether retrying the same operation without intervention could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BrokerUnavailable(_) | Self::HandlerFailed(_))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
