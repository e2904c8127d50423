// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job handler contract: one implementation per job type, looked up by
//! `JobRecord::handler_name` at dispatch time.

use async_trait::async_trait;
use ff_core::{JobContext, JobRecord};

/// Metadata a handler reports about itself, surfaced by the registry for
/// introspection and logged on every (re)registration.
#[derive(Debug, Clone, Default)]
pub struct HandlerMeta {
    pub description: Option<String>,
    pub version: Option<String>,
}

/// Executes one job type. Implementations are expected to be cheap to
/// construct and safe to share across worker tasks via `Arc`.
#[async_trait]
pub trait Handler: Send + Sync {
    /// The `handler_name` this implementation answers to; must be stable
    /// across reloads so in-flight jobs keep resolving to it.
    fn name(&self) -> &str;

    fn meta(&self) -> HandlerMeta {
        HandlerMeta::default()
    }

    /// Run the job. `ctx` is the only channel back to the engine: progress
    /// updates and cancellation polling both go through it.
    async fn execute(
        &self,
        job: &JobRecord,
        ctx: &dyn JobContext,
    ) -> Result<serde_json::Value, String>;
}
