// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use ff_core::{User, UserId};

use crate::error::{StorageError, StorageResult};
use crate::storage::Storage;

impl Storage {
    pub fn insert_user(&self, user: User) {
        self.state.write().users.insert(user.id.clone(), user);
    }

    pub fn get_user(&self, id: &UserId) -> StorageResult<User> {
        self.state
            .read()
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                kind: "user",
                id: id.to_string(),
            })
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<User> {
        self.state.read().users.values().find(|user| user.email == email).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user(email: &str) -> User {
        let now = chrono::Utc::now();
        User {
            id: UserId::new(),
            email: email.to_string(),
            password_hash: "hashed".to_string(),
            legacy_webhook_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn find_by_email_locates_user() {
        let storage = Storage::in_memory();
        storage.insert_user(sample_user("a@example.com"));
        assert!(storage.find_user_by_email("a@example.com").is_some());
        assert!(storage.find_user_by_email("missing@example.com").is_none());
    }
}
