// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-local pub/sub bridging broker events into the richer
//! [`ff_core::Event`] vocabulary, fanned out to per-queue, per-job, and
//! per-user topics. Distinct from `ff-broker`'s durable `BrokerEvent` WAL —
//! this is purely in-memory and lossy by design for high-frequency kinds.

use std::collections::HashMap;
use std::sync::Arc;

use ff_core::Event;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::debug;

/// Per-subscriber channel capacity. Overflow policy (see [`EventBus::publish`])
/// drops `progress`/`delta` but never `completed`/`failed`.
const SUBSCRIBER_BUFFER: usize = 256;

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Topic {
    Queue(String),
    Job(String),
    User(String),
    /// Every job/flow event, regardless of owner — the webhook dispatcher's
    /// subscription, since it must match against arbitrary users' webhooks
    /// without knowing their ids up front.
    All,
}

#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<RwLock<HashMap<Topic, Vec<mpsc::Sender<Event>>>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn subscribe(&self, topic: Topic) -> mpsc::Receiver<Event> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        self.subscribers.write().entry(topic).or_default().push(tx);
        rx
    }

    /// Publish one event to every live subscriber of `topic`. Never blocks:
    /// droppable events (`progress`, `delta`) are dropped on a full channel;
    /// non-droppable (terminal) events are guaranteed delivery by handing
    /// the blocking send off to a background task.
    pub fn publish(&self, topic: Topic, event: Event) {
        let mut subscribers = self.subscribers.write();
        let Some(list) = subscribers.get_mut(&topic) else {
            return;
        };
        list.retain_mut(|tx| {
            if tx.is_closed() {
                return false;
            }
            match tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Closed(_)) => false,
                Err(mpsc::error::TrySendError::Full(pending)) => {
                    if event.is_droppable() {
                        debug!(?topic, "dropping event on full subscriber buffer");
                    } else {
                        let tx = tx.clone();
                        tokio::spawn(async move {
                            let _ = tx.send(pending).await;
                        });
                    }
                    true
                }
            }
        });
    }

    /// The dual emission rule from spec §4.8: every job event fans out to
    /// its queue topic, its job-scoped topic, its (if owned) user topic, and
    /// unconditionally to `Topic::All` for the webhook dispatcher.
    pub fn publish_job_event(&self, queue: &str, job_id: &str, user_id: Option<&str>, event: Event) {
        self.publish(Topic::Queue(queue.to_string()), event.clone());
        self.publish(Topic::Job(job_id.to_string()), event.clone());
        if let Some(user_id) = user_id {
            self.publish(Topic::User(user_id.to_string()), event.clone());
        }
        self.publish(Topic::All, event);
    }

    pub fn publish_flow_event(&self, user_id: &str, event: Event) {
        self.publish(Topic::User(user_id.to_string()), event.clone());
        self.publish(Topic::All, event);
    }
}
