// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The durable record types the broker's WAL persists. Distinct from
//! `ff_core::Event`, which is the richer, non-durable in-process event the
//! engine's event bus fans out to subscribers.

use chrono::{DateTime, Utc};
use ff_core::{JobOptions, JobState};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum BrokerEvent {
    JobEnqueued {
        queue: String,
        job_id: String,
        handler_name: String,
        payload: serde_json::Value,
        options: JobOptions,
        delay_until: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    },
    JobStateChanged {
        queue: String,
        job_id: String,
        from: JobState,
        to: JobState,
        result: Option<serde_json::Value>,
        failed_reason: Option<String>,
        at: DateTime<Utc>,
    },
    JobRemoved {
        queue: String,
        job_id: String,
        at: DateTime<Utc>,
    },
    ScheduleUpserted {
        scheduler_id: String,
        user_id: String,
        template: serde_json::Value,
        trigger: serde_json::Value,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    },
    ScheduleRemoved {
        scheduler_id: String,
        at: DateTime<Utc>,
    },
}

impl BrokerEvent {
    pub fn queue(&self) -> Option<&str> {
        match self {
            Self::JobEnqueued { queue, .. }
            | Self::JobStateChanged { queue, .. }
            | Self::JobRemoved { queue, .. } => Some(queue),
            _ => None,
        }
    }
}
