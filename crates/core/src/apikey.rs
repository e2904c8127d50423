// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! API key records. Hashing and verification live outside the core;
//! here we only model the row and the one-time plaintext-return contract.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::define_id;

define_id! {
    /// API key identifier.
    pub struct ApiKeyId, "akey"
}

/// A user-owned API key. `key_hash` is a one-way hash; the plaintext is
/// returned once at creation time via [`NewApiKey`] and never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub id: ApiKeyId,
    pub user_id: String,
    pub name: String,
    /// Leading bytes of the plaintext, stored verbatim to support prefix lookup.
    pub prefix: String,
    pub key_hash: String,
    pub permissions: HashSet<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub last_used: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ApiKey {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| now > exp).unwrap_or(false)
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired(now)
    }
}

/// Returned once, at creation, with the plaintext key. Never reconstructable afterwards.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApiKey {
    pub id: ApiKeyId,
    pub name: String,
    pub prefix: String,
    pub plaintext: String,
    pub permissions: HashSet<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(is_active: bool, expires_at: Option<DateTime<Utc>>) -> ApiKey {
        ApiKey {
            id: ApiKeyId::new(),
            user_id: "u1".to_string(),
            name: "ci".to_string(),
            prefix: "ffk_ab12".to_string(),
            key_hash: "hashed".to_string(),
            permissions: HashSet::new(),
            expires_at,
            is_active,
            last_used: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn inactive_key_is_not_usable() {
        assert!(!key(false, None).is_usable(Utc::now()));
    }

    #[test]
    fn expired_key_is_not_usable() {
        let expired = key(true, Some(Utc::now() - chrono::Duration::hours(1)));
        assert!(!expired.is_usable(Utc::now()));
    }

    #[test]
    fn active_unexpired_key_is_usable() {
        let fresh = key(true, Some(Utc::now() + chrono::Duration::hours(1)));
        assert!(fresh.is_usable(Utc::now()));
    }
}
