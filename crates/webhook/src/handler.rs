// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `webhook-delivery` job handler: one HTTP POST per attempt. Retries are
//! the worker pool's job, not this handler's — it only reports success or
//! failure and lets `ff-engine`'s backoff loop re-enqueue the attempt.

use std::time::Duration;

use async_trait::async_trait;
use ff_core::{JobContext, JobRecord};
use ff_registry::{Handler, HandlerMeta};

/// `handler_name` every delivery job on the `webhooks` queue is dispatched to.
pub const DELIVERY_HANDLER_NAME: &str = "webhook-delivery";

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

pub struct WebhookDeliveryHandler {
    client: reqwest::Client,
}

impl WebhookDeliveryHandler {
    pub fn new() -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(DELIVERY_TIMEOUT).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Handler for WebhookDeliveryHandler {
    fn name(&self) -> &str {
        DELIVERY_HANDLER_NAME
    }

    fn meta(&self) -> HandlerMeta {
        HandlerMeta {
            description: Some("delivers one webhook event to a subscriber's URL".to_string()),
            version: None,
        }
    }

    async fn execute(&self, job: &JobRecord, _ctx: &dyn JobContext) -> Result<serde_json::Value, String> {
        let url = job
            .payload
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "delivery job missing url".to_string())?;
        let body = job.payload.get("body").cloned().unwrap_or(serde_json::Value::Null);

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|err| err.to_string())?;

        if response.status().is_success() {
            Ok(serde_json::json!({"status": response.status().as_u16()}))
        } else {
            Err(format!("subscriber responded {}", response.status()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ff_core::{JobId, JobOptions, JobState};

    struct NullCtx;
    impl JobContext for NullCtx {
        fn update_progress(&self, _value: serde_json::Value) {}
        fn is_cancelled(&self) -> bool {
            false
        }
        fn job_id(&self) -> &str {
            "job_1"
        }
    }

    fn delivery_job(payload: serde_json::Value) -> JobRecord {
        let now = Utc::now();
        JobRecord {
            id: JobId::new(),
            queue: "webhooks".to_string(),
            handler_name: DELIVERY_HANDLER_NAME.to_string(),
            payload,
            options: JobOptions::default(),
            state: JobState::Active,
            attempts_made: 0,
            result: None,
            failed_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn missing_url_fails_without_dispatching() {
        let handler = WebhookDeliveryHandler::new().unwrap();
        let job = delivery_job(serde_json::json!({"body": {}}));
        let err = handler.execute(&job, &NullCtx).await.unwrap_err();
        assert!(err.contains("url"));
    }
}
