// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-queue worker pool: bounded-concurrency dispatch loop, retry with
//! exponential backoff, and progress/completion event publication.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ff_broker::Broker;
use ff_core::{Event, JobContext, JobRecord, JobState, QueueName};
use ff_registry::{Handler, Registry};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::ctx::{CancellationRegistry, WorkerCtx};
use crate::event_bus::EventBus;

/// How long an idle slot waits before polling the broker again.
const IDLE_POLL: Duration = Duration::from_millis(200);
const DEFAULT_BASE_BACKOFF_MS: u64 = 1000;
const DEFAULT_MAX_BACKOFF_MS: u64 = 30_000;

/// Drains one queue with `concurrency` independent dispatch loops.
pub struct WorkerPool {
    queue: QueueName,
    concurrency: usize,
    broker: Arc<dyn Broker>,
    registry: Registry,
    events: EventBus,
    cancellations: CancellationRegistry,
    base_backoff_ms: u64,
    max_backoff_ms: u64,
}

impl WorkerPool {
    pub fn new(
        queue: QueueName,
        concurrency: usize,
        broker: Arc<dyn Broker>,
        registry: Registry,
        events: EventBus,
        cancellations: CancellationRegistry,
    ) -> Self {
        Self {
            queue,
            concurrency,
            broker,
            registry,
            events,
            cancellations,
            base_backoff_ms: DEFAULT_BASE_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
        }
    }

    /// Override the backoff base/cap, e.g. to keep retry tests fast.
    pub fn with_backoff(mut self, base_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        self.base_backoff_ms = base_backoff_ms;
        self.max_backoff_ms = max_backoff_ms;
        self
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let exp = self.base_backoff_ms.saturating_mul(1u64 << attempt.min(10));
        Duration::from_millis(exp.min(self.max_backoff_ms))
    }

    /// Spawn `concurrency` independent dispatch tasks. Each claims and runs
    /// jobs sequentially; parallelism across slots is the pool's only
    /// concurrency dimension (spec §5: one slot per running job).
    pub fn spawn(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        (0..self.concurrency)
            .map(|slot| {
                let pool = self.clone();
                tokio::spawn(async move { pool.run_slot(slot).await })
            })
            .collect()
    }

    async fn run_slot(&self, slot: usize) {
        loop {
            match self.broker.claim_next(&self.queue) {
                Ok(Some(job)) => {
                    self.run_job(job).await;
                }
                Ok(None) => {
                    tokio::time::sleep(IDLE_POLL).await;
                }
                Err(err) => {
                    warn!(queue = %self.queue, slot, %err, "broker claim failed");
                    tokio::time::sleep(IDLE_POLL).await;
                }
            }
        }
    }

    async fn run_job(&self, mut job: JobRecord) {
        let user_id = job.user_id().map(str::to_string);
        let flow_id = job.flow_id().map(str::to_string);
        let cancelled = self.cancellations.register(job.id.as_str());

        self.events.publish_job_event(
            self.queue.as_str(),
            job.id.as_str(),
            user_id.as_deref(),
            Event::JobActive {
                job_id: job.id.as_str().to_string(),
                queue: self.queue.to_string(),
                user_id: user_id.clone(),
                flow_id: flow_id.clone(),
                at: Utc::now(),
            },
        );

        loop {
            let Ok(handler) = self.registry.resolve(&job.handler_name) else {
                let reason = format!("no handler registered for {:?}", job.handler_name);
                self.finalize_failed(&job, &reason, user_id.as_deref(), flow_id.as_deref());
                break;
            };

            let ctx = WorkerCtx::new(
                job.id.as_str().to_string(),
                self.queue.to_string(),
                user_id.clone(),
                flow_id.clone(),
                cancelled.clone(),
                self.events.clone(),
            );

            let outcome = handler.execute(&job, &ctx).await;

            if ctx.is_cancelled() {
                self.finalize_failed(&job, "cancelled", user_id.as_deref(), flow_id.as_deref());
                break;
            }

            match outcome {
                Ok(result) => {
                    if let Err(err) = self.broker.transition(
                        &self.queue,
                        job.id.as_str(),
                        JobState::Completed,
                        Some(result.clone()),
                        None,
                    ) {
                        error!(job_id = %job.id, %err, "failed to finalise completed job");
                    }
                    self.events.publish_job_event(
                        self.queue.as_str(),
                        job.id.as_str(),
                        user_id.as_deref(),
                        Event::JobCompleted {
                            job_id: job.id.as_str().to_string(),
                            queue: self.queue.to_string(),
                            user_id: user_id.clone(),
                            flow_id: flow_id.clone(),
                            handler_name: job.handler_name.clone(),
                            result,
                            at: Utc::now(),
                        },
                    );
                    break;
                }
                Err(reason) => {
                    let exhausted = job.attempts_made >= job.options.attempts;
                    if exhausted {
                        self.finalize_failed(&job, &reason, user_id.as_deref(), flow_id.as_deref());
                        break;
                    }

                    if let Err(err) =
                        self.broker
                            .transition(&self.queue, job.id.as_str(), JobState::Waiting, None, Some(reason.clone()))
                    {
                        error!(job_id = %job.id, %err, "failed to requeue job for retry");
                        self.finalize_failed(&job, &reason, user_id.as_deref(), flow_id.as_deref());
                        break;
                    }

                    let delay = self.backoff_for(job.attempts_made);
                    info!(job_id = %job.id, attempt = job.attempts_made, ?delay, "retrying after backoff");
                    tokio::time::sleep(delay).await;

                    if let Err(err) =
                        self.broker
                            .transition(&self.queue, job.id.as_str(), JobState::Active, None, None)
                    {
                        error!(job_id = %job.id, %err, "failed to re-activate job for retry");
                        break;
                    }

                    match self.broker.get_job(&self.queue, job.id.as_str()) {
                        Ok(refreshed) => job = refreshed,
                        Err(err) => {
                            error!(job_id = %job.id, %err, "failed to reload job after retry");
                            break;
                        }
                    }
                }
            }
        }

        self.cancellations.clear(job.id.as_str());
    }

    fn finalize_failed(&self, job: &JobRecord, reason: &str, user_id: Option<&str>, flow_id: Option<&str>) {
        if let Err(err) = self.broker.transition(
            &self.queue,
            job.id.as_str(),
            JobState::Failed,
            None,
            Some(reason.to_string()),
        ) {
            error!(job_id = %job.id, %err, "failed to finalise failed job");
        }
        self.events.publish_job_event(
            self.queue.as_str(),
            job.id.as_str(),
            user_id,
            Event::JobFailed {
                job_id: job.id.as_str().to_string(),
                queue: self.queue.to_string(),
                user_id: user_id.map(str::to_string),
                flow_id: flow_id.map(str::to_string),
                handler_name: job.handler_name.clone(),
                reason: reason.to_string(),
                attempts_made: job.attempts_made,
                at: Utc::now(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ff_broker::WalBroker;
    use ff_core::{JobContext, JobOptions};
    use ff_registry::Handler;
    use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

    struct AlwaysSucceeds;

    #[async_trait]
    impl Handler for AlwaysSucceeds {
        fn name(&self) -> &str {
            "always-succeeds"
        }
        async fn execute(&self, job: &JobRecord, _ctx: &dyn JobContext) -> Result<serde_json::Value, String> {
            Ok(job.payload.clone())
        }
    }

    struct FailsNTimes {
        remaining: AtomicU32,
    }

    #[async_trait]
    impl Handler for FailsNTimes {
        fn name(&self) -> &str {
            "fails-n-times"
        }
        async fn execute(&self, _job: &JobRecord, _ctx: &dyn JobContext) -> Result<serde_json::Value, String> {
            if self.remaining.fetch_sub(1, AtomicOrdering::SeqCst) > 0 {
                Err("boom".to_string())
            } else {
                Ok(serde_json::json!({"ok": true}))
            }
        }
    }

    fn test_pool(registry: Registry) -> (Arc<WorkerPool>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let broker = WalBroker::open(&dir.path().join("wal"), 0).unwrap();
        let queue = QueueName::new("jobQueue").unwrap();
        let pool = Arc::new(
            WorkerPool::new(queue, 1, broker, registry, EventBus::new(), CancellationRegistry::new())
                .with_backoff(1, 5),
        );
        (pool, dir)
    }

    #[tokio::test]
    async fn successful_job_completes_on_first_attempt() {
        let registry = Registry::new();
        registry.register(Arc::new(AlwaysSucceeds));
        let (pool, _dir) = test_pool(registry);

        let queue = QueueName::new("jobQueue").unwrap();
        let job_id = pool
            .broker
            .enqueue(&queue, "always-succeeds", serde_json::json!({"n": 1}), JobOptions::default())
            .unwrap();
        let job = pool.broker.claim_next(&queue).unwrap().unwrap();
        pool.run_job(job).await;

        let final_job = pool.broker.get_job(&queue, job_id.as_str()).unwrap();
        assert_eq!(final_job.state, JobState::Completed);
    }

    #[tokio::test]
    async fn exhausted_retries_end_in_failed_with_reason() {
        let registry = Registry::new();
        registry.register(Arc::new(FailsNTimes {
            remaining: AtomicU32::new(10),
        }));
        let (pool, _dir) = test_pool(registry);

        let queue = QueueName::new("jobQueue").unwrap();
        let opts = JobOptions::default().attempts(2);
        let job_id = pool
            .broker
            .enqueue(&queue, "fails-n-times", serde_json::json!({}), opts)
            .unwrap();
        let job = pool.broker.claim_next(&queue).unwrap().unwrap();
        pool.run_job(job).await;

        let final_job = pool.broker.get_job(&queue, job_id.as_str()).unwrap();
        assert_eq!(final_job.state, JobState::Failed);
        assert_eq!(final_job.failed_reason.as_deref(), Some("boom"));
        assert_eq!(final_job.attempts_made, 2);
    }

    #[tokio::test]
    async fn unknown_handler_fails_without_retry() {
        let registry = Registry::new();
        let (pool, _dir) = test_pool(registry);

        let queue = QueueName::new("jobQueue").unwrap();
        let job_id = pool
            .broker
            .enqueue(&queue, "ghost", serde_json::json!({}), JobOptions::default())
            .unwrap();
        let job = pool.broker.claim_next(&queue).unwrap().unwrap();
        pool.run_job(job).await;

        let final_job = pool.broker.get_job(&queue, job_id.as_str()).unwrap();
        assert_eq!(final_job.state, JobState::Failed);
        assert_eq!(final_job.attempts_made, 1);
    }
}
