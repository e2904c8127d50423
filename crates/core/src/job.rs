// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker-owned job identity, lifecycle states, and dispatch records.

use serde::{Deserialize, Serialize};

use crate::define_id;
use crate::error::{CoreError, CoreResult};
use crate::queue::JobOptions;
use crate::simple_display;

define_id! {
    /// Broker-assigned job identifier.
    pub struct JobId, "job_"
}

/// Job lifecycle state. Transitions are broker-driven; see [`JobState::can_transition_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobState {
    Waiting,
    Delayed,
    WaitingChildren,
    Active,
    Completed,
    Failed,
    Paused,
    /// Worker crashed between entering `active` and finalisation.
    Stuck,
}

simple_display!(JobState {
    Waiting => "waiting",
    Delayed => "delayed",
    WaitingChildren => "waiting-children",
    Active => "active",
    Completed => "completed",
    Failed => "failed",
    Paused => "paused",
    Stuck => "stuck",
});

impl JobState {
    pub const ALL: [JobState; 8] = [
        JobState::Waiting,
        JobState::Delayed,
        JobState::WaitingChildren,
        JobState::Active,
        JobState::Completed,
        JobState::Failed,
        JobState::Paused,
        JobState::Stuck,
    ];

    pub fn parse(s: &str) -> CoreResult<Self> {
        Self::ALL
            .into_iter()
            .find(|state| state.to_string() == s)
            .ok_or_else(|| CoreError::InvalidStatus {
                from: s.to_string(),
                to: "<one of the canonical states>".to_string(),
            })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn can_transition_to(&self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Waiting, Delayed)
                | (Waiting, WaitingChildren)
                | (Waiting, Active)
                | (Delayed, Waiting)
                | (Delayed, Active)
                | (WaitingChildren, Active)
                | (Active, Completed)
                | (Active, Failed)
                | (Active, Stuck)
                | (Active, Waiting) // requeue after retryable failure
                | (Stuck, Waiting)
                | (Stuck, Failed)
                | (Waiting, Paused)
                | (Paused, Waiting)
        )
    }
}

/// A broker-owned job as observed by the orchestrator façade.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: JobId,
    pub queue: String,
    pub handler_name: String,
    pub payload: serde_json::Value,
    pub options: JobOptions,
    pub state: JobState,
    pub attempts_made: u32,
    pub result: Option<serde_json::Value>,
    pub failed_reason: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl JobRecord {
    /// `payload.userId`, by convention present on every job payload.
    pub fn user_id(&self) -> Option<&str> {
        self.payload.get("userId").and_then(|v| v.as_str())
    }

    pub fn flow_id(&self) -> Option<&str> {
        self.payload.get("flowId").and_then(|v| v.as_str())
    }
}
