// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The concrete [`ff_core::JobContext`] handed to handlers during execution,
//! plus the registry of cancellation flags a removal request sets.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use ff_core::{Event, JobContext};
use parking_lot::RwLock;

use crate::event_bus::EventBus;

/// Tracks one cancellation flag per in-flight job id so `DeleteJob` on an
/// `active` job can signal its handler cooperatively (spec §5).
#[derive(Clone, Default)]
pub struct CancellationRegistry {
    flags: Arc<RwLock<HashMap<String, Arc<AtomicBool>>>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, job_id: &str) -> Arc<AtomicBool> {
        let flag = Arc::new(AtomicBool::new(false));
        self.flags.write().insert(job_id.to_string(), flag.clone());
        flag
    }

    pub fn cancel(&self, job_id: &str) -> bool {
        match self.flags.read().get(job_id) {
            Some(flag) => {
                flag.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    pub fn clear(&self, job_id: &str) {
        self.flags.write().remove(job_id);
    }
}

pub struct WorkerCtx {
    job_id: String,
    queue: String,
    user_id: Option<String>,
    flow_id: Option<String>,
    cancelled: Arc<AtomicBool>,
    events: EventBus,
}

impl WorkerCtx {
    pub fn new(
        job_id: String,
        queue: String,
        user_id: Option<String>,
        flow_id: Option<String>,
        cancelled: Arc<AtomicBool>,
        events: EventBus,
    ) -> Self {
        Self {
            job_id,
            queue,
            user_id,
            flow_id,
            cancelled,
            events,
        }
    }
}

impl JobContext for WorkerCtx {
    fn update_progress(&self, value: serde_json::Value) {
        let event = Event::JobProgress {
            job_id: self.job_id.clone(),
            queue: self.queue.clone(),
            user_id: self.user_id.clone(),
            flow_id: self.flow_id.clone(),
            progress: value,
            at: Utc::now(),
        };
        self.events
            .publish_job_event(&self.queue, &self.job_id, self.user_id.as_deref(), event);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn job_id(&self) -> &str {
        &self.job_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_cancel_flips_flag() {
        let registry = CancellationRegistry::new();
        let flag = registry.register("job_1");
        assert!(!flag.load(Ordering::SeqCst));
        assert!(registry.cancel("job_1"));
        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn cancel_unknown_job_returns_false() {
        let registry = CancellationRegistry::new();
        assert!(!registry.cancel("ghost"));
    }

    #[tokio::test]
    async fn update_progress_publishes_event() {
        let events = EventBus::new();
        let mut rx = events.subscribe(crate::event_bus::Topic::Job("job_1".to_string()));
        let ctx = WorkerCtx::new(
            "job_1".to_string(),
            "jobQueue".to_string(),
            Some("u1".to_string()),
            None,
            Arc::new(AtomicBool::new(false)),
            events,
        );
        ctx.update_progress(serde_json::json!(50));
        assert!(rx.recv().await.is_some());
    }
}
