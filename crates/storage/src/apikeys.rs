// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use ff_core::{ApiKey, ApiKeyId};

use crate::error::{StorageError, StorageResult};
use crate::storage::Storage;

impl Storage {
    pub fn insert_api_key(&self, key: ApiKey) {
        self.state.write().api_keys.insert(key.id.clone(), key);
    }

    pub fn get_api_key(&self, id: &ApiKeyId) -> StorageResult<ApiKey> {
        self.state
            .read()
            .api_keys
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                kind: "apikey",
                id: id.to_string(),
            })
    }

    /// Lookup by the hash stored at creation time, the authentication path.
    pub fn find_api_key_by_hash(&self, hash: &str) -> Option<ApiKey> {
        self.state
            .read()
            .api_keys
            .values()
            .find(|key| key.key_hash == hash)
            .cloned()
    }

    pub fn remove_api_key(&self, id: &ApiKeyId) -> Option<ApiKey> {
        self.state.write().api_keys.remove(id)
    }

    pub fn update_api_key(&self, id: &ApiKeyId, mutate: impl FnOnce(&mut ApiKey)) -> StorageResult<ApiKey> {
        let mut state = self.state.write();
        let key = state.api_keys.get_mut(id).ok_or_else(|| StorageError::NotFound {
            kind: "apikey",
            id: id.to_string(),
        })?;
        mutate(key);
        Ok(key.clone())
    }

    pub fn list_api_keys_by_user(&self, user_id: &str) -> Vec<ApiKey> {
        self.state
            .read()
            .api_keys
            .values()
            .filter(|key| key.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_key(hash: &str) -> ApiKey {
        use std::collections::HashSet;
        ApiKey {
            id: ApiKeyId::new(),
            user_id: "u1".to_string(),
            name: "ci".to_string(),
            prefix: "ffk_ab12".to_string(),
            key_hash: hash.to_string(),
            permissions: HashSet::new(),
            expires_at: None,
            is_active: true,
            last_used: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn find_by_hash_locates_matching_key() {
        let storage = Storage::in_memory();
        storage.insert_api_key(sample_key("abc123"));
        assert!(storage.find_api_key_by_hash("abc123").is_some());
        assert!(storage.find_api_key_by_hash("nope").is_none());
    }

    #[test]
    fn list_by_user_filters() {
        let storage = Storage::in_memory();
        storage.insert_api_key(sample_key("abc123"));
        let mut other = sample_key("def456");
        other.user_id = "u2".to_string();
        storage.insert_api_key(other);
        assert_eq!(storage.list_api_keys_by_user("u1").len(), 1);
    }
}
