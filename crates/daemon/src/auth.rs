// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Derives a [`Principal`] from an incoming bearer token.
//!
//! Account creation, password hashing, and session (token) issuance are
//! external collaborators (spec §1; see `ff_core::user`'s doc comment); this
//! module only *verifies* what an external issuer handed the caller, via two
//! schemes:
//!
//! - an `ffk_`-prefixed API key, hashed and looked up in storage the same
//!   way `ff_engine::Orchestrator::create_api_key` stores it;
//! - an opaque `userId.expiry.signature` access token, HMAC-style signed
//!   with `secrets.tokenSecret` — the minimal shared scheme an external
//!   issuer and this adapter must agree on to interoperate.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use ff_core::{AuthVia, Principal};
use sha2::{Digest, Sha256};

use crate::error::ApiError;
use crate::state::AppState;

const API_KEY_PREFIX: &str = "ffk_";

fn hex_sha256(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Sign `user_id`/`expires_at` with `secret`, producing the opaque access
/// token this module's [`verify_access_token`] accepts. Exposed so tests
/// (and a real external issuer using the same secret) can mint one; there is
/// no HTTP route for issuance.
pub fn issue_access_token(secret: &str, user_id: &str, expires_at: DateTime<Utc>) -> String {
    let expires_at = expires_at.to_rfc3339();
    let signature = hex_sha256(&format!("{user_id}.{expires_at}.{secret}"));
    format!("{user_id}.{expires_at}.{signature}")
}

fn verify_access_token(secret: &str, token: &str, now: DateTime<Utc>) -> Option<Principal> {
    let mut parts = token.splitn(3, '.');
    let user_id = parts.next()?;
    let expires_at_raw = parts.next()?;
    let signature = parts.next()?;
    let expected = hex_sha256(&format!("{user_id}.{expires_at_raw}.{secret}"));
    if expected != signature {
        return None;
    }
    let expires_at: DateTime<Utc> = expires_at_raw.parse().ok()?;
    if now > expires_at {
        return None;
    }
    Some(Principal::new(user_id, AuthVia::Token))
}

fn verify_api_key(state: &AppState, plaintext: &str, now: DateTime<Utc>) -> Option<Principal> {
    let hash = hex_sha256(plaintext);
    let key = state.storage.find_api_key_by_hash(&hash)?;
    if !key.is_usable(now) {
        return None;
    }
    if let Err(err) = state.storage.update_api_key(&key.id, |key| key.last_used = Some(now)) {
        tracing::warn!(%err, "failed to record api key last_used");
    }
    Some(Principal::new(key.user_id, AuthVia::ApiKey).with_permissions(key.permissions))
}

/// Verify `Authorization: Bearer <token>` against either scheme.
pub fn authenticate(state: &AppState, bearer: &str) -> Option<Principal> {
    let now = Utc::now();
    if bearer.starts_with(API_KEY_PREFIX) {
        return verify_api_key(state, bearer, now);
    }
    state
        .config
        .secrets
        .token_secret
        .as_deref()
        .and_then(|secret| verify_access_token(secret, bearer, now))
}

/// An axum extractor pulling an authenticated [`Principal`] out of the
/// `Authorization` header; rejects with [`ApiError::Unauthorised`] otherwise.
pub struct AuthenticatedPrincipal(pub Principal);

#[async_trait::async_trait]
impl FromRequestParts<AppState> for AuthenticatedPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorised("missing Authorization header".to_string()))?;
        let bearer = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorised("expected a Bearer token".to_string()))?;
        authenticate(state, bearer).ok_or_else(|| ApiError::Unauthorised("invalid or expired credentials".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies_within_ttl() {
        let now = Utc::now();
        let token = issue_access_token("secret", "user_1", now + chrono::Duration::minutes(30));
        let principal = verify_access_token("secret", &token, now).unwrap();
        assert_eq!(principal.user_id, "user_1");
        assert_eq!(principal.via, AuthVia::Token);
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now();
        let token = issue_access_token("secret", "user_1", now - chrono::Duration::minutes(1));
        assert!(verify_access_token("secret", &token, now).is_none());
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let now = Utc::now();
        let token = issue_access_token("secret", "user_1", now + chrono::Duration::minutes(30));
        let tampered = token.replace("user_1", "user_2");
        assert!(verify_access_token("secret", &tampered, now).is_none());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let now = Utc::now();
        let token = issue_access_token("secret", "user_1", now + chrono::Duration::minutes(30));
        assert!(verify_access_token("other-secret", &token, now).is_none());
    }
}
