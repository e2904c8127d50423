// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schedule creation, lookup, listing, and deletion (spec §6 Schedule
//! operations).

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use ff_core::{Schedule, SchedulerId, ScheduleTemplate, Trigger};
use serde::Deserialize;

use crate::auth::AuthenticatedPrincipal;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleRequest {
    pub template: ScheduleTemplate,
    pub trigger: Trigger,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

pub async fn create_schedule(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Json(request): Json<CreateScheduleRequest>,
) -> Result<Json<Schedule>, ApiError> {
    let now = Utc::now();
    let schedule = Schedule {
        id: SchedulerId::new(),
        user_id: principal.user_id.clone(),
        template: request.template,
        trigger: request.trigger,
        start_date: request.start_date,
        end_date: request.end_date,
        fire_count: 0,
        last_fired_at: None,
        created_at: now,
        updated_at: now,
    };
    let created = schedule.clone();
    state.orchestrator.create_schedule(schedule)?;
    Ok(Json(created))
}

pub async fn get_schedule(
    State(state): State<AppState>,
    Path(schedule_id): Path<String>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<Json<Schedule>, ApiError> {
    let schedule = state
        .orchestrator
        .get_schedule(&principal, &SchedulerId::from_string(schedule_id))?;
    Ok(Json(schedule))
}

pub async fn list_schedules(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Json<Vec<Schedule>> {
    Json(state.orchestrator.list_schedules(&principal))
}

pub async fn delete_schedule(
    State(state): State<AppState>,
    Path(schedule_id): Path<String>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<axum::http::StatusCode, ApiError> {
    state
        .orchestrator
        .delete_schedule(&principal, &SchedulerId::from_string(schedule_id))?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
