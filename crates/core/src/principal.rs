// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The authenticated caller context consumed by every core operation.
//!
//! Password hashing, JWT issuance, and API-key verification are external
//! collaborators; the core only ever sees the result, a [`Principal`].

use std::collections::HashSet;

use crate::simple_display;

/// How a [`Principal`] was authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthVia {
    Token,
    ApiKey,
}

simple_display!(AuthVia {
    Token => "token",
    ApiKey => "apiKey",
});

/// The authenticated caller of an operation: `{userId, permissions, via}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub permissions: HashSet<String>,
    pub via: AuthVia,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, via: AuthVia) -> Self {
        Self {
            user_id: user_id.into(),
            permissions: HashSet::new(),
            via,
        }
    }

    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = String>) -> Self {
        self.permissions = permissions.into_iter().collect();
        self
    }

    pub fn has_permission(&self, name: &str) -> bool {
        self.permissions.contains(name)
    }

    /// The ownership predicate used by every authorisation check: `E.userId == principal.userId`.
    pub fn owns(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owns_matches_on_user_id() {
        let p = Principal::new("u1", AuthVia::Token);
        assert!(p.owns("u1"));
        assert!(!p.owns("u2"));
    }

    #[test]
    fn permission_lookup() {
        let p = Principal::new("u1", AuthVia::ApiKey)
            .with_permissions(["jobs:write".to_string()]);
        assert!(p.has_permission("jobs:write"));
        assert!(!p.has_permission("jobs:read"));
    }
}
