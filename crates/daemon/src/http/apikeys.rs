// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! API key CRUD (spec §6 ApiKey operations). The plaintext key is only ever
//! present in the creation response; see `ff_core::apikey::NewApiKey`.

use std::collections::HashSet;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use ff_core::{ApiKey, ApiKeyId, NewApiKey};
use serde::Deserialize;

use crate::auth::AuthenticatedPrincipal;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyRequest {
    pub name: String,
    #[serde(default)]
    pub permissions: HashSet<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

pub async fn create_api_key(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Json(request): Json<CreateApiKeyRequest>,
) -> Json<NewApiKey> {
    let key = state
        .orchestrator
        .create_api_key(&principal, request.name, request.permissions, request.expires_at);
    Json(key)
}

pub async fn list_api_keys(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Json<Vec<ApiKey>> {
    Json(state.orchestrator.list_api_keys(&principal))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApiKeyRequest {
    pub permissions: Option<HashSet<String>>,
}

pub async fn update_api_key(
    State(state): State<AppState>,
    Path(key_id): Path<String>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Json(request): Json<UpdateApiKeyRequest>,
) -> Result<Json<ApiKey>, ApiError> {
    let key = state
        .orchestrator
        .update_api_key(&principal, &ApiKeyId::from_string(key_id), request.permissions)?;
    Ok(Json(key))
}

pub async fn revoke_api_key(
    State(state): State<AppState>,
    Path(key_id): Path<String>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<axum::http::StatusCode, ApiError> {
    state.orchestrator.revoke_api_key(&principal, &ApiKeyId::from_string(key_id))?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
