// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maps every subsystem error onto an HTTP response: the taxonomy of spec §7
//! plus a status code, the last stop before a [`ff_core::CoreError`] reaches
//! a client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ff_core::CoreError;
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("unauthorised: {0}")]
    Unauthorised(String),

    #[error(transparent)]
    Json(#[from] axum::extract::rejection::JsonRejection),
}

impl From<ff_engine::EngineError> for ApiError {
    fn from(err: ff_engine::EngineError) -> Self {
        ApiError::Core(err.into())
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Core(CoreError::InvalidInput(_)) => (StatusCode::BAD_REQUEST, "invalid_input"),
            ApiError::Core(CoreError::InvalidQueue { .. }) => (StatusCode::BAD_REQUEST, "invalid_queue"),
            ApiError::Core(CoreError::InvalidStatus { .. }) => (StatusCode::BAD_REQUEST, "invalid_status"),
            ApiError::Core(CoreError::HandlerNotFound { .. }) => (StatusCode::UNPROCESSABLE_ENTITY, "handler_not_found"),
            ApiError::Core(CoreError::NotFound { .. }) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Core(CoreError::Unauthorised(_)) => (StatusCode::UNAUTHORIZED, "unauthorised"),
            ApiError::Core(CoreError::Conflict(_)) => (StatusCode::CONFLICT, "conflict"),
            ApiError::Core(CoreError::BrokerUnavailable(_)) => (StatusCode::SERVICE_UNAVAILABLE, "broker_unavailable"),
            ApiError::Core(CoreError::HandlerFailed(_)) => (StatusCode::INTERNAL_SERVER_ERROR, "handler_failed"),
            ApiError::Core(CoreError::WebhookDeliveryFailed(_)) => (StatusCode::INTERNAL_SERVER_ERROR, "webhook_delivery_failed"),
            ApiError::Core(CoreError::Internal(_)) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
            ApiError::Unauthorised(_) => (StatusCode::UNAUTHORIZED, "unauthorised"),
            ApiError::Json(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "request failed");
        }
        let body = Json(json!({ "error": { "code": code, "message": self.to_string() } }));
        (status, body).into_response()
    }
}
