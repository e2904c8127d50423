// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The narrow interface a handler sees during execution: progress reporting
//! and cooperative cancellation. The concrete implementation (bound to a
//! specific job, queue, and event bus) lives in `ff-engine`; handlers and the
//! registry only depend on this trait, so `ff-registry` never needs to link
//! against `ff-engine`.

/// Passed to `Handler::execute` for the duration of one job invocation.
pub trait JobContext: Send + Sync {
    /// Publish a `progress` event. May be called arbitrarily often; values
    /// may be numeric (0-100) or a structured object for delta streams.
    fn update_progress(&self, value: serde_json::Value);

    /// Whether the broker has signalled removal while this job is active.
    /// Cancellation is cooperative: a handler that ignores this runs to
    /// completion and its result is discarded.
    fn is_cancelled(&self) -> bool;

    /// The job id this context was created for, for logging.
    fn job_id(&self) -> &str;
}
