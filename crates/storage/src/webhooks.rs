// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use ff_core::{EventType, Webhook, WebhookId};

use crate::error::{StorageError, StorageResult};
use crate::storage::Storage;

impl Storage {
    pub fn insert_webhook(&self, webhook: Webhook) {
        self.state.write().webhooks.insert(webhook.id.clone(), webhook);
    }

    pub fn get_webhook(&self, id: &WebhookId) -> StorageResult<Webhook> {
        self.state
            .read()
            .webhooks
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                kind: "webhook",
                id: id.to_string(),
            })
    }

    pub fn remove_webhook(&self, id: &WebhookId) -> Option<Webhook> {
        self.state.write().webhooks.remove(id)
    }

    pub fn update_webhook(&self, id: &WebhookId, mutate: impl FnOnce(&mut Webhook)) -> StorageResult<Webhook> {
        let mut state = self.state.write();
        let webhook = state.webhooks.get_mut(id).ok_or_else(|| StorageError::NotFound {
            kind: "webhook",
            id: id.to_string(),
        })?;
        mutate(webhook);
        Ok(webhook.clone())
    }

    pub fn list_webhooks_by_user(&self, user_id: &str) -> Vec<Webhook> {
        self.state
            .read()
            .webhooks
            .values()
            .filter(|webhook| webhook.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Every active webhook whose `event_type` matches `event_type`, across
    /// all users — the dispatcher's fan-out query on every event.
    pub fn active_webhooks_matching(&self, event_type: EventType) -> Vec<Webhook> {
        self.state
            .read()
            .webhooks
            .values()
            .filter(|webhook| webhook.active && webhook.event_type.matches(event_type))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_webhook(event_type: EventType) -> Webhook {
        let now = chrono::Utc::now();
        Webhook {
            id: WebhookId::new(),
            user_id: "u1".to_string(),
            url: "https://example.com/hook".to_string(),
            event_type,
            active: true,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn active_webhooks_matching_filters_by_event_type() {
        let storage = Storage::in_memory();
        storage.insert_webhook(sample_webhook(EventType::Completed));
        storage.insert_webhook(sample_webhook(EventType::Failed));
        let matching = storage.active_webhooks_matching(EventType::Completed);
        assert_eq!(matching.len(), 1);
    }

    #[test]
    fn inactive_webhooks_are_excluded() {
        let storage = Storage::in_memory();
        let mut webhook = sample_webhook(EventType::All);
        webhook.active = false;
        storage.insert_webhook(webhook);
        assert!(storage.active_webhooks_matching(EventType::Progress).is_empty());
    }

    #[test]
    fn remove_webhook_drops_entry() {
        let storage = Storage::in_memory();
        let webhook = sample_webhook(EventType::All);
        let id = webhook.id.clone();
        storage.insert_webhook(webhook);
        assert!(storage.remove_webhook(&id).is_some());
        assert!(storage.get_webhook(&id).is_err());
    }
}
