// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The row-shaped user record persisted alongside flows, webhooks, and API keys.
//!
//! Account creation, password hashing, and session issuance are external
//! collaborators (spec §1); the core only persists enough of a user row to
//! resolve ownership and to let `ff-daemon`'s auth adapter attach to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::define_id;

define_id! {
    /// User identifier.
    pub struct UserId, "user"
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    /// Opaque to the core; owned and interpreted by the auth adapter.
    pub password_hash: String,
    /// Pre-webhook-entity single-URL notification target. Honoured only for
    /// `completed` events, and only when no modern webhook matches.
    #[serde(default)]
    pub legacy_webhook_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_has_expected_prefix() {
        let id = UserId::new();
        assert!(id.as_str().starts_with("user"));
    }
}
