// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The durable broker: queues keyed by name, atomic state transitions, and
//! delayed/repeat hooks, all backed by a single WAL.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ff_core::{JobId, JobOptions, JobRecord, JobState, QueueName, Schedule, SchedulerId, Trigger};
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::{BrokerError, BrokerResult};
use crate::events::BrokerEvent;
use crate::job_store::JobStore;
use crate::wal::Wal;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Everything a caller can do against the durable queue primitive.
pub trait Broker: Send + Sync {
    fn enqueue(
        &self,
        queue: &QueueName,
        handler_name: &str,
        payload: serde_json::Value,
        options: JobOptions,
    ) -> BrokerResult<JobId>;

    fn get_job(&self, queue: &QueueName, job_id: &str) -> BrokerResult<JobRecord>;

    fn list_by_state(
        &self,
        queue: &QueueName,
        states: &[JobState],
        page: usize,
        limit: usize,
    ) -> BrokerResult<(Vec<JobRecord>, usize)>;

    /// Atomically select the next dispatchable `waiting` job on `queue`
    /// (highest priority first, FIFO among ties, respecting `delayMs`
    /// visibility) and transition it to `active`. Returns `None` if nothing
    /// is currently dispatchable.
    fn claim_next(&self, queue: &QueueName) -> BrokerResult<Option<JobRecord>>;

    fn remove(&self, queue: &QueueName, job_id: &str) -> BrokerResult<bool>;

    fn transition(
        &self,
        queue: &QueueName,
        job_id: &str,
        to: JobState,
        result: Option<serde_json::Value>,
        failed_reason: Option<String>,
    ) -> BrokerResult<()>;

    fn upsert_schedule(&self, schedule: Schedule) -> BrokerResult<()>;
    fn list_schedules(&self) -> Vec<Schedule>;
    fn remove_schedule(&self, scheduler_id: &SchedulerId) -> BrokerResult<()>;

    /// Subscribe to every [`BrokerEvent`] raised on `queue`.
    fn subscribe(&self, queue: &QueueName) -> broadcast::Receiver<BrokerEvent>;

    /// Remove terminal (`completed`/`failed`) jobs on `queue` older than
    /// `age`, beyond each job's own `removeOnComplete`/`removeOnFail` cap.
    /// Returns how many were pruned.
    fn prune(&self, queue: &QueueName, age: chrono::Duration) -> BrokerResult<usize>;
}

/// The default [`Broker`] implementation: an in-memory [`JobStore`] plus
/// per-queue schedules, durable via a shared [`Wal`].
pub struct WalBroker {
    store: RwLock<JobStore>,
    schedules: RwLock<HashMap<SchedulerId, Schedule>>,
    wal: Mutex<Wal<BrokerEvent>>,
    channels: RwLock<HashMap<String, broadcast::Sender<BrokerEvent>>>,
    /// Serialises select-then-transition in `claim_next` so two workers
    /// never pick the same waiting job.
    claim_mutex: Mutex<()>,
}

impl WalBroker {
    /// Open (or create) the broker's WAL at `wal_path` and replay every
    /// entry since `checkpoint_seq` to rebuild the in-memory index.
    pub fn open(wal_path: &std::path::Path, checkpoint_seq: u64) -> BrokerResult<Arc<Self>> {
        let wal = Wal::open(wal_path, checkpoint_seq)?;
        let entries = wal.entries_after(checkpoint_seq)?;

        let mut store = JobStore::new();
        let mut schedules = HashMap::new();
        for entry in &entries {
            store.apply(&entry.event);
            if let BrokerEvent::ScheduleUpserted {
                scheduler_id,
                user_id,
                template,
                trigger,
                start_date,
                end_date,
                ..
            } = &entry.event
            {
                if let (Ok(template), Ok(trigger)) = (
                    serde_json::from_value(template.clone()),
                    serde_json::from_value::<Trigger>(trigger.clone()),
                ) {
                    let id = SchedulerId::from_string(scheduler_id.clone());
                    schedules.insert(
                        id.clone(),
                        Schedule {
                            id,
                            user_id: user_id.clone(),
                            template,
                            trigger,
                            start_date: *start_date,
                            end_date: *end_date,
                            fire_count: 0,
                            last_fired_at: None,
                            created_at: entry_time(&entry.event),
                            updated_at: entry_time(&entry.event),
                        },
                    );
                }
            }
            if let BrokerEvent::ScheduleRemoved { scheduler_id, .. } = &entry.event {
                schedules.remove(&SchedulerId::from_string(scheduler_id.clone()));
            }
        }
        debug!(replayed = entries.len(), "broker replayed wal on startup");

        Ok(Arc::new(Self {
            store: RwLock::new(store),
            schedules: RwLock::new(schedules),
            wal: Mutex::new(wal),
            channels: RwLock::new(HashMap::new()),
            claim_mutex: Mutex::new(()),
        }))
    }

    fn channel_for(&self, queue: &str) -> broadcast::Sender<BrokerEvent> {
        if let Some(tx) = self.channels.read().get(queue) {
            return tx.clone();
        }
        let mut channels = self.channels.write();
        channels
            .entry(queue.to_string())
            .or_insert_with(|| broadcast::channel(EVENT_CHANNEL_CAPACITY).0)
            .clone()
    }

    fn publish(&self, event: BrokerEvent) -> BrokerResult<()> {
        {
            let mut wal = self.wal.lock();
            wal.append(event.clone())?;
            if let Err(err) = wal.flush() {
                warn!(%err, "wal flush failed");
                return Err(err);
            }
        }
        if let Some(queue) = event.queue() {
            let _ = self.channel_for(queue).send(event.clone());
        }
        self.store.write().apply(&event);
        Ok(())
    }
}

fn entry_time(event: &BrokerEvent) -> DateTime<Utc> {
    match event {
        BrokerEvent::JobEnqueued { at, .. }
        | BrokerEvent::JobStateChanged { at, .. }
        | BrokerEvent::JobRemoved { at, .. }
        | BrokerEvent::ScheduleUpserted { at, .. }
        | BrokerEvent::ScheduleRemoved { at, .. } => *at,
    }
}

impl Broker for WalBroker {
    fn enqueue(
        &self,
        queue: &QueueName,
        handler_name: &str,
        payload: serde_json::Value,
        options: JobOptions,
    ) -> BrokerResult<JobId> {
        let job_id = JobId::new();
        let now = Utc::now();
        let delay_until = (options.delay_ms > 0)
            .then(|| now + chrono::Duration::milliseconds(options.delay_ms as i64));
        self.publish(BrokerEvent::JobEnqueued {
            queue: queue.to_string(),
            job_id: job_id.as_str().to_string(),
            handler_name: handler_name.to_string(),
            payload,
            options,
            delay_until,
            at: now,
        })?;
        Ok(job_id)
    }

    fn get_job(&self, queue: &QueueName, job_id: &str) -> BrokerResult<JobRecord> {
        let store = self.store.read();
        let id = JobId::from_string(job_id.to_string());
        store
            .get(&id)
            .or_else(|| store.find_by_prefix(queue.as_str(), job_id))
            .cloned()
            .ok_or_else(|| BrokerError::JobNotFound {
                queue: queue.to_string(),
                job_id: job_id.to_string(),
            })
    }

    fn list_by_state(
        &self,
        queue: &QueueName,
        states: &[JobState],
        page: usize,
        limit: usize,
    ) -> BrokerResult<(Vec<JobRecord>, usize)> {
        let store = self.store.read();
        let (jobs, total) = store.list_by_state(queue.as_str(), states, page, limit);
        Ok((jobs.into_iter().cloned().collect(), total))
    }

    fn claim_next(&self, queue: &QueueName) -> BrokerResult<Option<JobRecord>> {
        let _guard = self.claim_mutex.lock();
        let now = Utc::now();
        let mut candidates: Vec<JobRecord> = {
            let store = self.store.read();
            let (waiting, _) = store.list_by_state(queue.as_str(), &[JobState::Waiting], 0, usize::MAX);
            waiting
                .into_iter()
                .filter(|job| {
                    let visible_at = job.created_at + chrono::Duration::milliseconds(job.options.delay_ms as i64);
                    visible_at <= now
                })
                .cloned()
                .collect()
        };
        // Lower `priority` value dispatches first (1 = highest), FIFO among ties.
        candidates.sort_by(|a, b| {
            a.options
                .priority
                .cmp(&b.options.priority)
                .then(a.created_at.cmp(&b.created_at))
        });
        let Some(job) = candidates.into_iter().next() else {
            return Ok(None);
        };
        self.transition(queue, job.id.as_str(), JobState::Active, None, None)?;
        self.get_job(queue, job.id.as_str()).map(Some)
    }

    fn remove(&self, queue: &QueueName, job_id: &str) -> BrokerResult<bool> {
        let exists = self.store.read().get(&JobId::from_string(job_id.to_string())).is_some();
        if !exists {
            return Ok(false);
        }
        self.publish(BrokerEvent::JobRemoved {
            queue: queue.to_string(),
            job_id: job_id.to_string(),
            at: Utc::now(),
        })?;
        Ok(true)
    }

    fn transition(
        &self,
        queue: &QueueName,
        job_id: &str,
        to: JobState,
        result: Option<serde_json::Value>,
        failed_reason: Option<String>,
    ) -> BrokerResult<()> {
        let from = self.get_job(queue, job_id)?.state;
        if !from.can_transition_to(to) {
            warn!(?from, ?to, job_id, "rejected illegal job state transition");
            return Err(BrokerError::JobNotFound {
                queue: queue.to_string(),
                job_id: job_id.to_string(),
            });
        }
        self.publish(BrokerEvent::JobStateChanged {
            queue: queue.to_string(),
            job_id: job_id.to_string(),
            from,
            to,
            result,
            failed_reason,
            at: Utc::now(),
        })
    }

    fn upsert_schedule(&self, schedule: Schedule) -> BrokerResult<()> {
        self.publish(BrokerEvent::ScheduleUpserted {
            scheduler_id: schedule.id.as_str().to_string(),
            user_id: schedule.user_id.clone(),
            template: serde_json::to_value(&schedule.template)?,
            trigger: serde_json::to_value(&schedule.trigger)?,
            start_date: schedule.start_date,
            end_date: schedule.end_date,
            at: Utc::now(),
        })?;
        self.schedules.write().insert(schedule.id.clone(), schedule);
        Ok(())
    }

    fn list_schedules(&self) -> Vec<Schedule> {
        self.schedules.read().values().cloned().collect()
    }

    fn remove_schedule(&self, scheduler_id: &SchedulerId) -> BrokerResult<()> {
        if self.schedules.read().get(scheduler_id).is_none() {
            return Err(BrokerError::ScheduleNotFound(scheduler_id.to_string()));
        }
        self.publish(BrokerEvent::ScheduleRemoved {
            scheduler_id: scheduler_id.to_string(),
            at: Utc::now(),
        })?;
        self.schedules.write().remove(scheduler_id);
        Ok(())
    }

    fn subscribe(&self, queue: &QueueName) -> broadcast::Receiver<BrokerEvent> {
        self.channel_for(queue.as_str()).subscribe()
    }

    fn prune(&self, queue: &QueueName, age: chrono::Duration) -> BrokerResult<usize> {
        let cutoff = Utc::now() - age;
        let stale: Vec<JobId> = {
            let store = self.store.read();
            let (terminal, _) = store.list_by_state(
                queue.as_str(),
                &[JobState::Completed, JobState::Failed],
                0,
                usize::MAX,
            );
            terminal
                .into_iter()
                .filter(|job| job.updated_at < cutoff)
                .map(|job| job.id.clone())
                .collect()
        };
        for id in &stale {
            self.remove(queue, id.as_str())?;
        }
        Ok(stale.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn broker() -> (Arc<WalBroker>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let broker = WalBroker::open(&dir.path().join("broker.wal"), 0).unwrap();
        (broker, dir)
    }

    #[test]
    fn enqueue_then_get_job() {
        let (broker, _dir) = broker();
        let queue = QueueName::new("jobQueue").unwrap();
        let id = broker
            .enqueue(&queue, "h", serde_json::json!({}), JobOptions::default())
            .unwrap();
        let job = broker.get_job(&queue, id.as_str()).unwrap();
        assert_eq!(job.state, JobState::Waiting);
    }

    #[test]
    fn transition_to_active_then_completed() {
        let (broker, _dir) = broker();
        let queue = QueueName::new("jobQueue").unwrap();
        let id = broker
            .enqueue(&queue, "h", serde_json::json!({}), JobOptions::default())
            .unwrap();
        broker
            .transition(&queue, id.as_str(), JobState::Active, None, None)
            .unwrap();
        broker
            .transition(
                &queue,
                id.as_str(),
                JobState::Completed,
                Some(serde_json::json!({"ok": true})),
                None,
            )
            .unwrap();
        let job = broker.get_job(&queue, id.as_str()).unwrap();
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.attempts_made, 1);
    }

    #[test]
    fn illegal_transition_is_rejected() {
        let (broker, _dir) = broker();
        let queue = QueueName::new("jobQueue").unwrap();
        let id = broker
            .enqueue(&queue, "h", serde_json::json!({}), JobOptions::default())
            .unwrap();
        assert!(broker
            .transition(&queue, id.as_str(), JobState::Completed, None, None)
            .is_err());
    }

    #[test]
    fn prune_removes_only_stale_terminal_jobs() {
        let (broker, _dir) = broker();
        let queue = QueueName::new("jobQueue").unwrap();
        let fresh = broker
            .enqueue(&queue, "h", serde_json::json!({}), JobOptions::default())
            .unwrap();
        broker
            .transition(&queue, fresh.as_str(), JobState::Active, None, None)
            .unwrap();
        broker
            .transition(&queue, fresh.as_str(), JobState::Completed, None, None)
            .unwrap();

        let pruned = broker.prune(&queue, chrono::Duration::hours(12)).unwrap();
        assert_eq!(pruned, 0, "freshly completed job should not be pruned yet");
        assert!(broker.get_job(&queue, fresh.as_str()).is_ok());

        let pruned_immediately = broker.prune(&queue, chrono::Duration::zero()).unwrap();
        assert_eq!(pruned_immediately, 1);
        assert!(broker.get_job(&queue, fresh.as_str()).is_err());
    }

    #[test]
    fn state_survives_restart_via_wal_replay() {
        let dir = tempdir().unwrap();
        let wal_path = dir.path().join("broker.wal");
        let queue = QueueName::new("jobQueue").unwrap();
        let job_id;
        {
            let broker = WalBroker::open(&wal_path, 0).unwrap();
            job_id = broker
                .enqueue(&queue, "h", serde_json::json!({}), JobOptions::default())
                .unwrap();
            broker
                .transition(&queue, job_id.as_str(), JobState::Active, None, None)
                .unwrap();
        }
        let broker = WalBroker::open(&wal_path, 0).unwrap();
        let job = broker.get_job(&queue, job_id.as_str()).unwrap();
        assert_eq!(job.state, JobState::Active);
    }

    #[test]
    fn claim_next_prefers_lower_priority_value_then_fifo() {
        let (broker, _dir) = broker();
        let queue = QueueName::new("jobQueue").unwrap();
        let low_priority_value = broker
            .enqueue(&queue, "h", serde_json::json!({}), JobOptions::default().priority(10))
            .unwrap();
        let high_priority_value = broker
            .enqueue(&queue, "h", serde_json::json!({}), JobOptions::default().priority(90))
            .unwrap();

        // priority 10 beats priority 90 (1 = highest per spec §3).
        let claimed = broker.claim_next(&queue).unwrap().unwrap();
        assert_eq!(claimed.id, low_priority_value);
        assert_eq!(claimed.state, JobState::Active);

        let claimed_next = broker.claim_next(&queue).unwrap().unwrap();
        assert_eq!(claimed_next.id, high_priority_value);
    }

    #[test]
    fn claim_next_respects_delay_visibility() {
        let (broker, _dir) = broker();
        let queue = QueueName::new("jobQueue").unwrap();
        broker
            .enqueue(
                &queue,
                "h",
                serde_json::json!({}),
                JobOptions::default().delay_ms(60_000),
            )
            .unwrap();
        assert!(broker.claim_next(&queue).unwrap().is_none());
    }

    #[test]
    fn schedule_upsert_is_idempotent_by_id() {
        let (broker, _dir) = broker();
        let schedule = Schedule {
            id: SchedulerId::new(),
            user_id: "u1".to_string(),
            template: ff_core::schedule::ScheduleTemplate {
                handler_name: "h".to_string(),
                queue: "schedQueue".to_string(),
                payload: serde_json::json!({}),
                options: JobOptions::default(),
            },
            trigger: Trigger::RepeatEvery {
                every_ms: 1000,
                limit: None,
            },
            start_date: None,
            end_date: None,
            fire_count: 0,
            last_fired_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        broker.upsert_schedule(schedule.clone()).unwrap();
        broker.upsert_schedule(schedule.clone()).unwrap();
        assert_eq!(broker.list_schedules().len(), 1);
    }
}
