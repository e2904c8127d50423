// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bridges job completions to flow progress.
//!
//! `ff_engine::WorkerPool` publishes `job:completed`/`job:failed` onto the
//! event bus but has no reason to know about flows; `ff_engine::Orchestrator`
//! exposes `update_flow_progress` but nothing calls it automatically. This
//! task is that wiring, built the same way `ff_webhook::WebhookDispatcher`
//! and `ff_realtime::RealtimeHub::spawn_delta_tracker` bridge the bus to
//! their own side effects: subscribe to `Topic::All`, filter, act.

use ff_core::{Event, FlowId, JobState};
use ff_engine::{EventBus, Orchestrator, ProgressUpdate, Topic};
use tokio::task::JoinHandle;
use tracing::warn;

pub struct FlowSync {
    orchestrator: Orchestrator,
    events: EventBus,
}

impl FlowSync {
    pub fn new(orchestrator: Orchestrator, events: EventBus) -> Self {
        Self { orchestrator, events }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        let mut rx = self.events.subscribe(Topic::All);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Some(update) = progress_update_for(&event) {
                    let (flow_id, job_id) = update.0;
                    if let Err(err) = self
                        .orchestrator
                        .update_flow_progress(&FlowId::from_string(flow_id), &job_id, update.1)
                        .await
                    {
                        warn!(%err, job_id, "failed to sync flow progress");
                    }
                }
            }
        })
    }
}

fn progress_update_for(event: &Event) -> Option<((String, String), ProgressUpdate)> {
    match event {
        Event::JobCompleted {
            job_id,
            queue,
            flow_id: Some(flow_id),
            handler_name,
            result,
            ..
        } => Some((
            (flow_id.clone(), job_id.clone()),
            ProgressUpdate {
                status: JobState::Completed,
                result: Some(result.clone()),
                error: None,
                handler_name: handler_name.clone(),
                queue_name: queue.clone(),
            },
        )),
        Event::JobFailed {
            job_id,
            queue,
            flow_id: Some(flow_id),
            handler_name,
            reason,
            ..
        } => Some((
            (flow_id.clone(), job_id.clone()),
            ProgressUpdate {
                status: JobState::Failed,
                result: None,
                error: Some(reason.clone()),
                handler_name: handler_name.clone(),
                queue_name: queue.clone(),
            },
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn completed(flow_id: Option<&str>) -> Event {
        Event::JobCompleted {
            job_id: "job_1".to_string(),
            queue: "jobQueue".to_string(),
            user_id: Some("u1".to_string()),
            flow_id: flow_id.map(str::to_string),
            handler_name: "h".to_string(),
            result: serde_json::json!(null),
            at: Utc::now(),
        }
    }

    #[test]
    fn jobs_outside_a_flow_are_ignored() {
        assert!(progress_update_for(&completed(None)).is_none());
    }

    #[test]
    fn completed_job_in_a_flow_maps_to_a_progress_update() {
        let ((flow_id, job_id), update) = progress_update_for(&completed(Some("flow_1"))).unwrap();
        assert_eq!(flow_id, "flow_1");
        assert_eq!(job_id, "job_1");
        assert_eq!(update.status, JobState::Completed);
    }
}
