// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscribes to every job event and enqueues one delivery job per matching
//! webhook. Delivery itself — HTTP POST, retries, backoff — is the
//! `webhook-delivery` handler's job, dispatched through the same worker pool
//! as any other job (spec §4.7): this module only decides *who* to notify.

use std::sync::Arc;

use ff_broker::Broker;
use ff_core::{Event, EventType, JobOptions, QueueName, UserId};
use ff_engine::{EventBus, Topic};
use ff_storage::Storage;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::handler::DELIVERY_HANDLER_NAME;
use crate::payload::{build_payload, event_kind};

const DELIVERY_QUEUE: &str = "webhooks";
const WEBHOOK_MAX_ATTEMPTS: u32 = 3;

pub struct WebhookDispatcher {
    storage: Storage,
    broker: Arc<dyn Broker>,
    events: EventBus,
}

impl WebhookDispatcher {
    pub fn new(storage: Storage, broker: Arc<dyn Broker>, events: EventBus) -> Self {
        Self { storage, broker, events }
    }

    /// Run the dispatch loop until the event bus is dropped.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut events = self.events.subscribe(Topic::All);
            while let Some(event) = events.recv().await {
                self.handle_event(&event);
            }
        })
    }

    fn handle_event(&self, event: &Event) {
        let Some(kind) = event_kind(event) else {
            return;
        };
        let Some(user_id) = event.user_id() else {
            return;
        };

        let jobname = self.resolve_jobname(event);
        let Some(body) = build_payload(event, &jobname) else {
            return;
        };

        let matching: Vec<String> = self
            .storage
            .list_webhooks_by_user(user_id)
            .into_iter()
            .filter(|webhook| webhook.active && webhook.event_type.matches(kind))
            .map(|webhook| webhook.url)
            .collect();

        if !matching.is_empty() {
            for url in matching {
                self.enqueue_delivery(&url, &body);
            }
            return;
        }

        // No modern webhook matched: fall back to the legacy per-user URL,
        // but only for `completed` (spec §4.7, §9).
        if kind != EventType::Completed {
            return;
        }
        if let Ok(user) = self.storage.get_user(&UserId::from_string(user_id.to_string())) {
            if let Some(url) = user.legacy_webhook_url {
                self.enqueue_delivery(&url, &body);
            }
        }
    }

    /// `Completed`/`Failed` events carry `handler_name` directly; `Progress`/
    /// `Delta` don't, so look the job up in the broker for its name.
    fn resolve_jobname(&self, event: &Event) -> String {
        match event {
            Event::JobCompleted { handler_name, .. } | Event::JobFailed { handler_name, .. } => {
                handler_name.clone()
            }
            Event::JobProgress { job_id, queue, .. } | Event::JobDelta { job_id, queue, .. } => QueueName::new(queue.as_str())
                .ok()
                .and_then(|queue| self.broker.get_job(&queue, job_id).ok())
                .map(|job| job.handler_name)
                .unwrap_or_default(),
            _ => String::new(),
        }
    }

    fn enqueue_delivery(&self, url: &str, body: &serde_json::Value) {
        let Ok(queue) = QueueName::new(DELIVERY_QUEUE) else {
            return;
        };
        let payload = serde_json::json!({ "url": url, "body": body });
        let options = JobOptions::default().attempts(WEBHOOK_MAX_ATTEMPTS);
        if let Err(err) = self.broker.enqueue(&queue, DELIVERY_HANDLER_NAME, payload, options) {
            warn!(%err, url, "failed to enqueue webhook delivery");
        }
    }
}
