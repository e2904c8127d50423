// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use chrono::Utc;

use crate::event::Event;
use crate::flow::{FlowNode, TrackedJob};
use crate::job::JobState;
use crate::queue::JobOptions;

/// Proptest strategies for core state machine types.
pub mod strategies {
    use crate::job::JobState;
    use proptest::prelude::*;

    pub fn arb_job_state() -> impl Strategy<Value = JobState> {
        prop_oneof![
            Just(JobState::Waiting),
            Just(JobState::Delayed),
            Just(JobState::WaitingChildren),
            Just(JobState::Active),
            Just(JobState::Completed),
            Just(JobState::Failed),
            Just(JobState::Paused),
            Just(JobState::Stuck),
        ]
    }
}

pub fn leaf_node(name: &str, queue: &str) -> FlowNode {
    FlowNode {
        name: name.to_string(),
        queue: queue.to_string(),
        data: serde_json::json!({}),
        opts: serde_json::json!({}),
        children: vec![],
    }
}

pub fn tracked_job(status: JobState) -> TrackedJob {
    TrackedJob {
        handler_name: "test-handler".to_string(),
        queue_name: "jobQueue".to_string(),
        status,
        result: None,
        error: None,
        completed_at: status.is_terminal().then(Utc::now),
    }
}

pub fn job_completed_event(job_id: &str, user_id: &str) -> Event {
    Event::JobCompleted {
        job_id: job_id.to_string(),
        queue: "jobQueue".to_string(),
        user_id: Some(user_id.to_string()),
        flow_id: None,
        handler_name: "test-handler".to_string(),
        result: serde_json::json!({"ok": true}),
        at: Utc::now(),
    }
}

pub fn job_failed_event(job_id: &str, user_id: &str, reason: &str) -> Event {
    Event::JobFailed {
        job_id: job_id.to_string(),
        queue: "jobQueue".to_string(),
        user_id: Some(user_id.to_string()),
        flow_id: None,
        handler_name: "test-handler".to_string(),
        reason: reason.to_string(),
        attempts_made: 1,
        at: Utc::now(),
    }
}

pub fn default_options() -> JobOptions {
    JobOptions::default()
}
