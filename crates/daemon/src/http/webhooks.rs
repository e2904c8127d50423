// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Webhook subscription CRUD (spec §6 Webhook operations).

use axum::extract::{Path, State};
use axum::Json;
use ff_core::{EventType, Webhook, WebhookId};
use serde::Deserialize;

use crate::auth::AuthenticatedPrincipal;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWebhookRequest {
    pub url: String,
    pub event_type: EventType,
    pub description: Option<String>,
}

pub async fn create_webhook(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Json(request): Json<CreateWebhookRequest>,
) -> Result<Json<Webhook>, ApiError> {
    let webhook = state
        .orchestrator
        .create_webhook(&principal, request.url, request.event_type, request.description)?;
    Ok(Json(webhook))
}

pub async fn list_webhooks(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Json<Vec<Webhook>> {
    Json(state.orchestrator.list_webhooks(&principal))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWebhookRequest {
    pub active: Option<bool>,
    pub description: Option<String>,
}

pub async fn update_webhook(
    State(state): State<AppState>,
    Path(webhook_id): Path<String>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Json(request): Json<UpdateWebhookRequest>,
) -> Result<Json<Webhook>, ApiError> {
    let webhook = state.orchestrator.update_webhook(
        &principal,
        &WebhookId::from_string(webhook_id),
        request.active,
        request.description,
    )?;
    Ok(Json(webhook))
}

pub async fn delete_webhook(
    State(state): State<AppState>,
    Path(webhook_id): Path<String>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<axum::http::StatusCode, ApiError> {
    state.orchestrator.delete_webhook(&principal, &WebhookId::from_string(webhook_id))?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
