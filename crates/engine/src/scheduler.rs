// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron and fixed-interval firing: ticks the broker's schedule table and
//! submits one fresh job per due firing (spec §4.6).

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule as CronExpr;
use ff_broker::Broker;
use ff_core::{Event, QueueName, Schedule, SchedulerId, Trigger};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::{EngineError, EngineResult};
use crate::event_bus::EventBus;

/// Default polling interval between firing sweeps.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Compute the next matching cron instant strictly after `after`, in `timezone`.
fn cron_next_after(expression: &str, timezone: &str, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    // The `cron` crate parses 6/7-field expressions (leading seconds field);
    // spec's schedules are standard 5-field, so a fixed `0` seconds field is
    // prepended.
    let six_field = format!("0 {expression}");
    let parsed = CronExpr::from_str(&six_field).ok()?;
    let tz: chrono_tz::Tz = timezone.parse().unwrap_or(chrono_tz::UTC);
    let after_tz = after.with_timezone(&tz);
    let next = parsed.after(&after_tz).next()?;
    Some(next.with_timezone(&Utc))
}

/// The due instant for `schedule`, if any instant at or before `now` is owed,
/// per spec §4.6's trigger semantics.
fn next_due(schedule: &Schedule, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let floor = schedule
        .last_fired_at
        .unwrap_or_else(|| schedule.start_date.unwrap_or(schedule.created_at));
    match &schedule.trigger {
        Trigger::Cron { expression, timezone } => {
            let due = cron_next_after(expression, timezone, floor)?;
            (due <= now).then_some(due)
        }
        Trigger::RepeatEvery { every_ms, .. } => {
            let due = match schedule.last_fired_at {
                Some(_) => floor + chrono::Duration::milliseconds(*every_ms as i64),
                None => floor,
            };
            (due <= now).then_some(due)
        }
    }
}

/// Merge `payload` (a sparse JSON object) with `userId` and `_scheduleMetadata`.
fn enrich_payload(payload: &Value, user_id: &str, scheduler_id: &str, fired_at: DateTime<Utc>) -> Value {
    let mut object = payload.as_object().cloned().unwrap_or_default();
    object.insert("userId".to_string(), Value::String(user_id.to_string()));
    object.insert(
        "_scheduleMetadata".to_string(),
        serde_json::json!({ "schedulerId": scheduler_id, "firedAt": fired_at }),
    );
    Value::Object(object)
}

/// Upserts/removes schedules and periodically sweeps for due firings.
#[derive(Clone)]
pub struct Scheduler {
    broker: Arc<dyn Broker>,
    events: EventBus,
}

impl Scheduler {
    pub fn new(broker: Arc<dyn Broker>, events: EventBus) -> Self {
        Self { broker, events }
    }

    /// Validate and upsert. Re-submission with the same `schedulerId` replaces
    /// the template/trigger without duplicating the series (the broker's
    /// upsert is already idempotent by id).
    pub fn upsert(&self, schedule: Schedule) -> EngineResult<()> {
        match &schedule.trigger {
            Trigger::Cron { expression, .. } => {
                let six_field = format!("0 {expression}");
                CronExpr::from_str(&six_field).map_err(|err| EngineError::InvalidCron {
                    expression: expression.clone(),
                    reason: err.to_string(),
                })?;
            }
            Trigger::RepeatEvery { .. } => {}
        }
        QueueName::new(schedule.template.queue.as_str())?;
        self.broker.upsert_schedule(schedule)?;
        Ok(())
    }

    pub fn remove(&self, scheduler_id: &SchedulerId) -> EngineResult<()> {
        self.broker.remove_schedule(scheduler_id)?;
        Ok(())
    }

    pub fn list(&self) -> Vec<Schedule> {
        self.broker.list_schedules()
    }

    /// Spawn the background sweep loop, ticking every `tick`.
    pub fn spawn(self: Arc<Self>, tick: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                self.sweep_once(Utc::now());
                tokio::time::sleep(tick).await;
            }
        })
    }

    /// Check every non-exhausted schedule and fire those that are due. Public
    /// so tests can drive the sweep deterministically without sleeping.
    pub fn sweep_once(&self, now: DateTime<Utc>) {
        for schedule in self.broker.list_schedules() {
            if schedule.is_exhausted(now) {
                continue;
            }
            if let Some(due_at) = next_due(&schedule, now) {
                self.fire(schedule, due_at);
            }
        }
    }

    fn fire(&self, mut schedule: Schedule, fired_at: DateTime<Utc>) {
        let queue = match QueueName::new(schedule.template.queue.as_str()) {
            Ok(queue) => queue,
            Err(err) => {
                warn!(scheduler_id = %schedule.id, %err, "schedule names an unknown queue, skipping firing");
                return;
            }
        };
        let payload = enrich_payload(
            &schedule.template.payload,
            &schedule.user_id,
            schedule.id.as_str(),
            fired_at,
        );
        match self.broker.enqueue(
            &queue,
            &schedule.template.handler_name,
            payload,
            schedule.template.options.clone(),
        ) {
            Ok(job_id) => {
                schedule.fire_count += 1;
                schedule.last_fired_at = Some(fired_at);
                schedule.updated_at = Utc::now();
                self.events.publish(
                    crate::event_bus::Topic::User(schedule.user_id.clone()),
                    Event::ScheduleFired {
                        scheduler_id: schedule.id.as_str().to_string(),
                        job_id: job_id.as_str().to_string(),
                        at: fired_at,
                    },
                );
                if let Err(err) = self.broker.upsert_schedule(schedule) {
                    warn!(%err, "failed to persist schedule after firing");
                }
            }
            Err(err) => {
                warn!(scheduler_id = %schedule.id, %err, "failed to submit scheduled job");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ff_broker::WalBroker;
    use ff_core::JobOptions;
    use ff_core::schedule::ScheduleTemplate;

    fn test_scheduler() -> (Scheduler, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let broker = WalBroker::open(&dir.path().join("wal"), 0).unwrap();
        (Scheduler::new(broker, EventBus::new()), dir)
    }

    fn base_schedule(trigger: Trigger) -> Schedule {
        let now = Utc::now();
        Schedule {
            id: SchedulerId::new(),
            user_id: "u1".to_string(),
            template: ScheduleTemplate {
                handler_name: "send-email".to_string(),
                queue: "schedQueue".to_string(),
                payload: serde_json::json!({}),
                options: JobOptions::default(),
            },
            trigger,
            start_date: None,
            end_date: None,
            fire_count: 0,
            last_fired_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn repeat_every_fires_immediately_when_due() {
        let (scheduler, _dir) = test_scheduler();
        let schedule = base_schedule(Trigger::RepeatEvery { every_ms: 1000, limit: None });
        let id = schedule.id;
        scheduler.upsert(schedule).unwrap();

        scheduler.sweep_once(Utc::now());

        let updated = scheduler.list().into_iter().find(|s| s.id == id).unwrap();
        assert_eq!(updated.fire_count, 1);
        assert!(updated.last_fired_at.is_some());
    }

    #[test]
    fn repeat_every_does_not_double_fire_within_the_interval() {
        let (scheduler, _dir) = test_scheduler();
        let schedule = base_schedule(Trigger::RepeatEvery { every_ms: 60_000, limit: None });
        let id = schedule.id;
        scheduler.upsert(schedule).unwrap();

        let now = Utc::now();
        scheduler.sweep_once(now);
        scheduler.sweep_once(now);

        let updated = scheduler.list().into_iter().find(|s| s.id == id).unwrap();
        assert_eq!(updated.fire_count, 1);
    }

    #[test]
    fn exhausted_schedule_never_fires() {
        let (scheduler, _dir) = test_scheduler();
        let mut schedule = base_schedule(Trigger::RepeatEvery { every_ms: 1000, limit: Some(1) });
        schedule.fire_count = 1;
        let id = schedule.id;
        scheduler.upsert(schedule).unwrap();

        scheduler.sweep_once(Utc::now());

        let updated = scheduler.list().into_iter().find(|s| s.id == id).unwrap();
        assert_eq!(updated.fire_count, 1);
    }

    #[test]
    fn invalid_cron_expression_is_rejected_at_upsert() {
        let (scheduler, _dir) = test_scheduler();
        let schedule = base_schedule(Trigger::Cron {
            expression: "not a cron expr".to_string(),
            timezone: "UTC".to_string(),
        });
        assert!(scheduler.upsert(schedule).is_err());
    }

    #[test]
    fn valid_cron_expression_fires_once_due() {
        let (scheduler, _dir) = test_scheduler();
        // every minute
        let schedule = base_schedule(Trigger::Cron {
            expression: "* * * * *".to_string(),
            timezone: "UTC".to_string(),
        });
        let id = schedule.id;
        scheduler.upsert(schedule).unwrap();

        let soon = Utc::now() + chrono::Duration::minutes(2);
        scheduler.sweep_once(soon);

        let updated = scheduler.list().into_iter().find(|s| s.id == id).unwrap();
        assert_eq!(updated.fire_count, 1);
    }
}
