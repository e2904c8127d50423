// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flow creation, lookup, listing, deletion, and retry (spec §6 Flow
//! operations). `UpdateFlowProgress` is worker-internal and has no route
//! here; see `flow_sync`.

use axum::extract::{Path, State};
use axum::Json;
use ff_core::{FlowId, FlowNode};
use serde::Deserialize;

use crate::auth::AuthenticatedPrincipal;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFlowRequest {
    pub flowname: String,
    pub root_name: String,
    pub root_queue: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub opts: serde_json::Value,
    #[serde(default)]
    pub children: Vec<FlowNode>,
}

pub async fn create_flow(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Json(request): Json<CreateFlowRequest>,
) -> Result<Json<ff_core::Flow>, ApiError> {
    let submission = ff_engine::FlowSubmission {
        flowname: request.flowname,
        root_name: request.root_name,
        root_queue: request.root_queue,
        data: request.data,
        opts: request.opts,
        children: request.children,
    };
    let flow = state.orchestrator.create_flow(&principal, submission)?;
    Ok(Json(flow))
}

pub async fn get_flow(
    State(state): State<AppState>,
    Path(flow_id): Path<String>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<Json<ff_core::Flow>, ApiError> {
    let flow = state.orchestrator.get_flow(&principal, &FlowId::from_string(flow_id))?;
    Ok(Json(flow))
}

pub async fn list_flows(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Json<Vec<ff_core::Flow>> {
    Json(state.orchestrator.list_flows(&principal))
}

pub async fn delete_flow(
    State(state): State<AppState>,
    Path(flow_id): Path<String>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<Json<Vec<ff_core::JobRemovalReport>>, ApiError> {
    let report = state.orchestrator.delete_flow(&principal, &FlowId::from_string(flow_id))?;
    Ok(Json(report))
}

#[derive(serde::Serialize)]
pub struct RunFlowResponse {
    pub job_id: String,
}

pub async fn run_flow(
    State(state): State<AppState>,
    Path(flow_id): Path<String>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<Json<RunFlowResponse>, ApiError> {
    let job_id = state.orchestrator.run_flow(&principal, &FlowId::from_string(flow_id))?;
    Ok(Json(RunFlowResponse {
        job_id: job_id.as_str().to_string(),
    }))
}
