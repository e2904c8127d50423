// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The in-memory job index, rebuilt from the WAL on startup by folding
//! [`BrokerEvent`]s the same way the teacher's `MaterializedState::apply_event`
//! folds domain events — idempotently, so replay is always safe.

use std::collections::HashMap;

use ff_core::{JobId, JobRecord, JobState};

use crate::events::BrokerEvent;

/// Holds every job, regardless of queue, keyed by id; `by_queue` is a
/// secondary index for `listByState`.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: HashMap<JobId, JobRecord>,
    by_queue: HashMap<String, Vec<JobId>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one WAL entry into the index. Idempotent: re-applying an entry
    /// whose effect is already reflected in `jobs` is a no-op.
    pub fn apply(&mut self, event: &BrokerEvent) {
        match event {
            BrokerEvent::JobEnqueued {
                queue,
                job_id,
                handler_name,
                payload,
                options,
                at,
                ..
            } => {
                let id = JobId::from_string(job_id.clone());
                if self.jobs.contains_key(&id) {
                    return;
                }
                self.jobs.insert(
                    id.clone(),
                    JobRecord {
                        id: id.clone(),
                        queue: queue.clone(),
                        handler_name: handler_name.clone(),
                        payload: payload.clone(),
                        options: options.clone(),
                        state: JobState::Waiting,
                        attempts_made: 0,
                        result: None,
                        failed_reason: None,
                        created_at: *at,
                        updated_at: *at,
                    },
                );
                self.by_queue.entry(queue.clone()).or_default().push(id);
            }
            BrokerEvent::JobStateChanged {
                job_id,
                to,
                result,
                failed_reason,
                at,
                ..
            } => {
                let id = JobId::from_string(job_id.clone());
                if let Some(job) = self.jobs.get_mut(&id) {
                    if job.state == *to {
                        return;
                    }
                    if *to == JobState::Active {
                        job.attempts_made += 1;
                    }
                    job.state = *to;
                    job.result = result.clone().or_else(|| job.result.clone());
                    job.failed_reason = failed_reason.clone().or_else(|| job.failed_reason.clone());
                    job.updated_at = *at;
                }
            }
            BrokerEvent::JobRemoved { job_id, queue, .. } => {
                let id = JobId::from_string(job_id.clone());
                self.jobs.remove(&id);
                if let Some(ids) = self.by_queue.get_mut(queue) {
                    ids.retain(|existing| existing != &id);
                }
            }
            BrokerEvent::ScheduleUpserted { .. } | BrokerEvent::ScheduleRemoved { .. } => {}
        }
    }

    pub fn get(&self, id: &JobId) -> Option<&JobRecord> {
        self.jobs.get(id)
    }

    /// Prefix lookup: find the one job whose id starts with `prefix`, the way
    /// the teacher's `MaterializedState::get_job` resolves shortened ids.
    pub fn find_by_prefix(&self, queue: &str, prefix: &str) -> Option<&JobRecord> {
        self.by_queue.get(queue)?.iter().find_map(|id| {
            (id.as_str().starts_with(prefix))
                .then(|| self.jobs.get(id))
                .flatten()
        })
    }

    pub fn list_by_state(
        &self,
        queue: &str,
        states: &[JobState],
        page: usize,
        limit: usize,
    ) -> (Vec<&JobRecord>, usize) {
        let mut matching: Vec<&JobRecord> = self
            .by_queue
            .get(queue)
            .into_iter()
            .flatten()
            .filter_map(|id| self.jobs.get(id))
            .filter(|job| states.is_empty() || states.contains(&job.state))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matching.len();
        let start = page.saturating_mul(limit).min(total);
        let end = (start + limit).min(total);
        (matching[start..end].to_vec(), total)
    }

    pub fn remove(&mut self, id: &JobId) -> Option<JobRecord> {
        let removed = self.jobs.remove(id);
        if let Some(job) = &removed {
            if let Some(ids) = self.by_queue.get_mut(&job.queue) {
                ids.retain(|existing| existing != id);
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn enqueue(store: &mut JobStore, job_id: &str) {
        store.apply(&BrokerEvent::JobEnqueued {
            queue: "jobQueue".to_string(),
            job_id: job_id.to_string(),
            handler_name: "h".to_string(),
            payload: serde_json::json!({"userId": "u1"}),
            options: ff_core::JobOptions::default(),
            delay_until: None,
            at: Utc::now(),
        });
    }

    #[test]
    fn enqueue_then_get_round_trips() {
        let mut store = JobStore::new();
        enqueue(&mut store, "job_1");
        let id = JobId::from_string("job_1");
        assert_eq!(store.get(&id).unwrap().state, JobState::Waiting);
    }

    #[test]
    fn re_applying_enqueue_is_idempotent() {
        let mut store = JobStore::new();
        enqueue(&mut store, "job_1");
        enqueue(&mut store, "job_1");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn state_change_updates_attempts_on_active() {
        let mut store = JobStore::new();
        enqueue(&mut store, "job_1");
        store.apply(&BrokerEvent::JobStateChanged {
            queue: "jobQueue".to_string(),
            job_id: "job_1".to_string(),
            from: JobState::Waiting,
            to: JobState::Active,
            result: None,
            failed_reason: None,
            at: Utc::now(),
        });
        let id = JobId::from_string("job_1");
        assert_eq!(store.get(&id).unwrap().attempts_made, 1);
    }

    #[test]
    fn prefix_lookup_finds_job() {
        let mut store = JobStore::new();
        enqueue(&mut store, "job_abcdef");
        assert!(store.find_by_prefix("jobQueue", "job_abc").is_some());
    }

    #[test]
    fn list_by_state_paginates() {
        let mut store = JobStore::new();
        for i in 0..5 {
            enqueue(&mut store, &format!("job_{i}"));
        }
        let (page, total) = store.list_by_state("jobQueue", &[JobState::Waiting], 0, 2);
        assert_eq!(page.len(), 2);
        assert_eq!(total, 5);
    }

    #[test]
    fn remove_drops_from_queue_index() {
        let mut store = JobStore::new();
        enqueue(&mut store, "job_1");
        let id = JobId::from_string("job_1");
        store.remove(&id);
        assert!(store.get(&id).is_none());
        assert_eq!(store.list_by_state("jobQueue", &[], 0, 10).1, 0);
    }
}
