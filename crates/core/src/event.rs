// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The broker/domain event enum bridging the worker pool, flow coordinator,
//! webhook dispatcher, and real-time fan-out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::flow::FlowStatus;

/// Every event the in-process event bus carries.
///
/// `#[serde(tag = "type")]` so events serialise the same shape they're
/// published under on the wire (real-time fan-out, webhook payloads, logs).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "job:active")]
    JobActive {
        job_id: String,
        queue: String,
        user_id: Option<String>,
        flow_id: Option<String>,
        at: DateTime<Utc>,
    },
    #[serde(rename = "job:progress")]
    JobProgress {
        job_id: String,
        queue: String,
        user_id: Option<String>,
        flow_id: Option<String>,
        progress: serde_json::Value,
        at: DateTime<Utc>,
    },
    #[serde(rename = "job:delta")]
    JobDelta {
        job_id: String,
        queue: String,
        user_id: Option<String>,
        flow_id: Option<String>,
        chunk: serde_json::Value,
        at: DateTime<Utc>,
    },
    #[serde(rename = "job:completed")]
    JobCompleted {
        job_id: String,
        queue: String,
        user_id: Option<String>,
        flow_id: Option<String>,
        handler_name: String,
        result: serde_json::Value,
        at: DateTime<Utc>,
    },
    #[serde(rename = "job:failed")]
    JobFailed {
        job_id: String,
        queue: String,
        user_id: Option<String>,
        flow_id: Option<String>,
        handler_name: String,
        reason: String,
        attempts_made: u32,
        at: DateTime<Utc>,
    },
    #[serde(rename = "job:stuck")]
    JobStuck {
        job_id: String,
        queue: String,
        at: DateTime<Utc>,
    },
    #[serde(rename = "flow:updated")]
    FlowUpdated {
        flow_id: String,
        status: FlowStatus,
        percentage: u32,
        at: DateTime<Utc>,
    },
    #[serde(rename = "flow:completed")]
    FlowCompleted {
        flow_id: String,
        status: FlowStatus,
        at: DateTime<Utc>,
    },
    #[serde(rename = "flow:deleted")]
    FlowDeleted { flow_id: String, at: DateTime<Utc> },
    #[serde(rename = "schedule:fired")]
    ScheduleFired {
        scheduler_id: String,
        job_id: String,
        at: DateTime<Utc>,
    },
    #[serde(rename = "registry:reloaded")]
    RegistryReloaded {
        added: Vec<String>,
        removed: Vec<String>,
        at: DateTime<Utc>,
    },
    /// Unknown/forward-compatible event kinds are retained, never dropped silently.
    #[serde(other)]
    Custom,
}

impl Event {
    /// The job id this event concerns, if any — used for `job:{jobId}` routing.
    pub fn job_id(&self) -> Option<&str> {
        match self {
            Event::JobActive { job_id, .. }
            | Event::JobProgress { job_id, .. }
            | Event::JobDelta { job_id, .. }
            | Event::JobCompleted { job_id, .. }
            | Event::JobFailed { job_id, .. }
            | Event::JobStuck { job_id, .. } => Some(job_id),
            _ => None,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Event::JobActive { user_id, .. }
            | Event::JobProgress { user_id, .. }
            | Event::JobDelta { user_id, .. }
            | Event::JobCompleted { user_id, .. }
            | Event::JobFailed { user_id, .. } => user_id.as_deref(),
            _ => None,
        }
    }

    pub fn flow_id(&self) -> Option<&str> {
        match self {
            Event::JobActive { flow_id, .. }
            | Event::JobProgress { flow_id, .. }
            | Event::JobDelta { flow_id, .. }
            | Event::JobCompleted { flow_id, .. }
            | Event::JobFailed { flow_id, .. } => flow_id.as_deref(),
            Event::FlowUpdated { flow_id, .. }
            | Event::FlowCompleted { flow_id, .. }
            | Event::FlowDeleted { flow_id, .. } => Some(flow_id),
            _ => None,
        }
    }

    /// Whether back-pressure is allowed to drop this event kind under overflow.
    ///
    /// `progress`/`delta` may be coalesced or dropped; terminal outcomes never are.
    pub fn is_droppable(&self) -> bool {
        matches!(self, Event::JobProgress { .. } | Event::JobDelta { .. })
    }
}
