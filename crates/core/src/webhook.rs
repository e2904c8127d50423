// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-owned webhook subscriptions routed by event type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::define_id;
use crate::simple_display;

define_id! {
    /// Webhook identifier.
    pub struct WebhookId, "whk_"
}

/// The broker event kinds a webhook can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Progress,
    Completed,
    Failed,
    Delta,
    All,
}

simple_display!(EventType {
    Progress => "progress",
    Completed => "completed",
    Failed => "failed",
    Delta => "delta",
    All => "all",
});

impl EventType {
    /// Whether a webhook configured with `self` should receive an event of kind `emitted`.
    pub fn matches(&self, emitted: EventType) -> bool {
        *self == EventType::All || *self == emitted
    }
}

/// A user-owned webhook subscription. Unique per `(userId, url, eventType)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    pub id: WebhookId,
    pub user_id: String,
    pub url: String,
    pub event_type: EventType,
    pub active: bool,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Webhook {
    pub fn key(&self) -> (String, String, EventType) {
        (self.user_id.clone(), self.url.clone(), self.event_type)
    }
}
