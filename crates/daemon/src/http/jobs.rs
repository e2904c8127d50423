// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job submission, lookup, listing, and deletion (spec §6 Job operations).

use axum::extract::{Path, Query, State};
use axum::Json;
use ff_core::JobOptions;
use serde::{Deserialize, Serialize};

use crate::auth::AuthenticatedPrincipal;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobRequest {
    pub handler_name: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub options: JobOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobResponse {
    pub job_id: String,
}

pub async fn submit_job(
    State(state): State<AppState>,
    Path(queue): Path<String>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Json(request): Json<SubmitJobRequest>,
) -> Result<Json<SubmitJobResponse>, ApiError> {
    request.options.validate()?;
    let job_id = state
        .orchestrator
        .submit_job(&principal, &queue, &request.handler_name, request.data, request.options)?;
    Ok(Json(SubmitJobResponse {
        job_id: job_id.as_str().to_string(),
    }))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path((queue, job_id)): Path<(String, String)>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<Json<ff_core::JobRecord>, ApiError> {
    let job = state.orchestrator.get_job(&principal, &queue, &job_id)?;
    Ok(Json(job))
}

pub async fn delete_job(
    State(state): State<AppState>,
    Path((queue, job_id)): Path<(String, String)>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<axum::http::StatusCode, ApiError> {
    state.orchestrator.delete_job(&principal, &queue, &job_id)?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListJobsQuery {
    pub status: Option<String>,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
}

fn default_page() -> usize {
    1
}

fn default_limit() -> usize {
    20
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListJobsResponse {
    pub jobs: Vec<ff_core::JobRecord>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

/// List is not owner-filtered here: the queue-scoped broker listing has no
/// per-user index, matching `Orchestrator::list_jobs`'s own signature (no
/// `Principal` parameter). Callers needing only their own jobs filter
/// client-side or via `GET .../jobs/:id`, which is owner-checked.
pub async fn list_jobs(
    State(state): State<AppState>,
    Path(queue): Path<String>,
    AuthenticatedPrincipal(_principal): AuthenticatedPrincipal,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<ListJobsResponse>, ApiError> {
    // `ListJobsQuery.page` is the public, 1-indexed page number; the broker's
    // `list_by_state` (and `Orchestrator::list_jobs`, which passes it through
    // unchanged) is 0-indexed, so page 1 must cross the boundary as index 0.
    let store_page = query.page.saturating_sub(1);
    let page = state.orchestrator.list_jobs(
        &queue,
        query.status.as_deref(),
        store_page,
        query.limit,
        query.sort_by.as_deref(),
        query.sort_dir.as_deref(),
    )?;
    Ok(Json(ListJobsResponse {
        jobs: page.jobs,
        total: page.total,
        page: query.page,
        limit: page.limit,
    }))
}
