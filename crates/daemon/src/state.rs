// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared state every axum handler and the WebSocket upgrade route pulls
//! from, the analogue of the teacher's `ListenCtx`.

use std::sync::Arc;

use ff_engine::Orchestrator;
use ff_realtime::RealtimeHub;
use ff_storage::Storage;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub realtime: Arc<RealtimeHub>,
    pub storage: Storage,
    pub config: Arc<Config>,
}
