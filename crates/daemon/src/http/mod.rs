// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The HTTP surface from spec §6, one module per resource.

mod apikeys;
mod flows;
mod jobs;
mod schedules;
mod webhooks;

use axum::routing::{get, patch, post, put};
use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/queues/:queue/jobs", post(jobs::submit_job).get(jobs::list_jobs))
        .route("/v1/queues/:queue/jobs/:job_id", get(jobs::get_job).delete(jobs::delete_job))
        .route("/v1/flows", post(flows::create_flow).get(flows::list_flows))
        .route("/v1/flows/:flow_id", get(flows::get_flow).delete(flows::delete_flow))
        .route("/v1/flows/:flow_id/run", post(flows::run_flow))
        .route("/v1/schedules", post(schedules::create_schedule).get(schedules::list_schedules))
        .route("/v1/schedules/:schedule_id", get(schedules::get_schedule).delete(schedules::delete_schedule))
        .route("/v1/webhooks", post(webhooks::create_webhook).get(webhooks::list_webhooks))
        .route("/v1/webhooks/:webhook_id", patch(webhooks::update_webhook).delete(webhooks::delete_webhook))
        .route("/v1/api-keys", post(apikeys::create_api_key).get(apikeys::list_api_keys))
        .route("/v1/api-keys/:key_id", put(apikeys::update_api_key).delete(apikeys::revoke_api_key))
}
