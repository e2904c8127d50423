// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ff-daemon`: the HTTP/WebSocket adapter over `ff-engine`'s
//! transport-neutral operation surface (spec §6). A thin adapter
//! demonstrating the external interfaces, not a transport specification.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod auth;
pub mod config;
pub mod error;
pub mod flow_sync;
mod http;
pub mod startup;
pub mod state;
mod ws;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use startup::{build, BuildError, Daemon};
pub use state::AppState;

/// Assemble the full router: every resource under `http::router`, plus the
/// real-time WebSocket upgrade.
pub fn app(state: AppState) -> Router {
    http::router()
        .route("/v1/events", get(ws::connect))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
