// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The real-time fan-out hub (spec §4.8): one [`Subscription`] per connected
//! client, auto-joined to its owning user's group, with `subscribe:job` /
//! `unsubscribe:job` joining/leaving per-job groups on demand. Back-pressure
//! and the progress/delta-droppable-but-terminal-never policy are already
//! enforced by `ff-engine`'s [`EventBus`]; this module only manages which
//! topics a connection is listening to and tracks delta replay state.

use std::collections::HashMap;

use ff_core::Event;
use ff_engine::{EventBus, Topic};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::delta::DeltaAccumulator;

#[derive(Clone)]
pub struct RealtimeHub {
    events: EventBus,
    deltas: DeltaAccumulator,
}

impl RealtimeHub {
    pub fn new(events: EventBus) -> Self {
        Self {
            events,
            deltas: DeltaAccumulator::new(),
        }
    }

    /// Track `job:delta` chunks and clear them on terminal events, across
    /// every job in the system. Spawn once per process.
    pub fn spawn_delta_tracker(&self) -> JoinHandle<()> {
        let mut rx = self.events.subscribe(Topic::All);
        let deltas = self.deltas.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match &event {
                    Event::JobDelta { job_id, chunk, .. } => deltas.record(job_id, chunk.clone()),
                    Event::JobCompleted { job_id, .. } | Event::JobFailed { job_id, .. } => deltas.clear(job_id),
                    _ => {}
                }
            }
        })
    }

    /// Open a connection scoped to `user_id`, auto-joined to its user group.
    pub fn connect(&self, user_id: &str) -> Subscription {
        debug!(user_id, "realtime connection joined user group");
        Subscription {
            user_id: user_id.to_string(),
            user_rx: self.events.subscribe(Topic::User(user_id.to_string())),
            job_rx: HashMap::new(),
            events: self.events.clone(),
        }
    }

    /// Deltas accumulated so far for `job_id`, for a client joining mid-stream.
    pub fn replay_deltas(&self, job_id: &str) -> Vec<serde_json::Value> {
        self.deltas.replay(job_id)
    }
}

/// One connected client's live topic subscriptions.
pub struct Subscription {
    user_id: String,
    user_rx: mpsc::Receiver<Event>,
    job_rx: HashMap<String, mpsc::Receiver<Event>>,
    events: EventBus,
}

impl Subscription {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn user_events(&mut self) -> &mut mpsc::Receiver<Event> {
        &mut self.user_rx
    }

    /// Join `job:{jobId}`. Idempotent: re-subscribing an already-joined job is a no-op.
    pub fn subscribe_job(&mut self, job_id: &str) {
        self.job_rx
            .entry(job_id.to_string())
            .or_insert_with(|| self.events.subscribe(Topic::Job(job_id.to_string())));
    }

    pub fn unsubscribe_job(&mut self, job_id: &str) {
        self.job_rx.remove(job_id);
    }

    pub fn job_events_mut(&mut self) -> &mut HashMap<String, mpsc::Receiver<Event>> {
        &mut self.job_rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn progress_event(job_id: &str, user_id: &str) -> Event {
        Event::JobProgress {
            job_id: job_id.to_string(),
            queue: "jobQueue".to_string(),
            user_id: Some(user_id.to_string()),
            flow_id: None,
            progress: serde_json::json!(50),
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn connecting_auto_joins_the_user_group() {
        let events = EventBus::new();
        let hub = RealtimeHub::new(events.clone());
        let mut sub = hub.connect("u1");

        events.publish_job_event("jobQueue", "job_1", Some("u1"), progress_event("job_1", "u1"));

        assert!(sub.user_events().recv().await.is_some());
    }

    #[tokio::test]
    async fn subscribe_job_receives_job_scoped_events() {
        let events = EventBus::new();
        let hub = RealtimeHub::new(events.clone());
        let mut sub = hub.connect("u1");
        sub.subscribe_job("job_1");

        events.publish_job_event("jobQueue", "job_1", Some("u1"), progress_event("job_1", "u1"));

        let rx = sub.job_events_mut().get_mut("job_1").unwrap();
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn unsubscribe_job_drops_the_receiver() {
        let events = EventBus::new();
        let hub = RealtimeHub::new(events);
        let mut sub = hub.connect("u1");
        sub.subscribe_job("job_1");
        sub.unsubscribe_job("job_1");
        assert!(sub.job_events_mut().get_mut("job_1").is_none());
    }

    #[tokio::test]
    async fn delta_tracker_records_chunks_and_clears_on_completion() {
        let events = EventBus::new();
        let hub = RealtimeHub::new(events.clone());
        let _tracker = hub.spawn_delta_tracker();

        events.publish_job_event(
            "jobQueue",
            "job_1",
            Some("u1"),
            Event::JobDelta {
                job_id: "job_1".to_string(),
                queue: "jobQueue".to_string(),
                user_id: Some("u1".to_string()),
                flow_id: None,
                chunk: serde_json::json!("tok"),
                at: Utc::now(),
            },
        );
        // Give the tracker task a chance to run.
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(hub.replay_deltas("job_1"), vec![serde_json::json!("tok")]);

        events.publish_job_event(
            "jobQueue",
            "job_1",
            Some("u1"),
            Event::JobCompleted {
                job_id: "job_1".to_string(),
                queue: "jobQueue".to_string(),
                user_id: Some("u1".to_string()),
                flow_id: None,
                handler_name: "h".to_string(),
                result: serde_json::json!(null),
                at: Utc::now(),
            },
        );
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(hub.replay_deltas("job_1").is_empty());
    }
}
