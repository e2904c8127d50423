// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The transport-neutral operation surface from spec §6: job, flow,
//! schedule, webhook, and API key CRUD, each gated by `Principal::owns`.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ff_broker::Broker;
use ff_core::{
    ApiKey, ApiKeyId, CoreError, CoreResult, EventType, Flow, FlowId, JobId, JobOptions, JobRecord,
    JobState, NewApiKey, Principal, QueueName, Schedule, SchedulerId, Webhook, WebhookId,
};
use ff_registry::Registry;
use ff_storage::Storage;
use sha2::{Digest, Sha256};

use crate::ctx::CancellationRegistry;
use crate::error::EngineResult;
use crate::event_bus::EventBus;
use crate::flow_coordinator::{FlowCoordinator, FlowSubmission, JobRemovalReport, ProgressUpdate};
use crate::scheduler::Scheduler;

/// One page of a `ListJobs` result.
pub struct JobPage {
    pub jobs: Vec<JobRecord>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

/// The central entry point every transport adapter (`ff-daemon`) drives.
/// Thin by design: validation and authorisation live here, durability and
/// dispatch stay delegated to the broker/storage/coordinator/scheduler.
#[derive(Clone)]
pub struct Orchestrator {
    broker: Arc<dyn Broker>,
    registry: Registry,
    storage: Storage,
    events: EventBus,
    flows: FlowCoordinator,
    scheduler: Scheduler,
    cancellations: CancellationRegistry,
}

impl Orchestrator {
    /// `cancellations` must be the same [`CancellationRegistry`] instance the
    /// queues' `WorkerPool`s register in-flight jobs against, so `delete_job`
    /// on an `active` job actually trips the handler's cancellation flag.
    pub fn new(
        broker: Arc<dyn Broker>,
        registry: Registry,
        storage: Storage,
        events: EventBus,
        cancellations: CancellationRegistry,
    ) -> Self {
        let flows = FlowCoordinator::new(storage.clone(), broker.clone(), events.clone());
        let scheduler = Scheduler::new(broker.clone(), events.clone());
        Self {
            broker,
            registry,
            storage,
            events,
            flows,
            scheduler,
            cancellations,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn cancellations(&self) -> &CancellationRegistry {
        &self.cancellations
    }

    // ---- Job --------------------------------------------------------

    pub fn submit_job(
        &self,
        principal: &Principal,
        queue: &str,
        handler_name: &str,
        mut payload: serde_json::Value,
        options: JobOptions,
    ) -> EngineResult<JobId> {
        let queue = QueueName::new(queue)?;
        self.registry.resolve(handler_name)?;
        if let Some(object) = payload.as_object_mut() {
            object
                .entry("userId".to_string())
                .or_insert_with(|| serde_json::Value::String(principal.user_id.clone()));
        }
        Ok(self.broker.enqueue(&queue, handler_name, payload, options)?)
    }

    pub fn get_job(&self, principal: &Principal, queue: &str, job_id: &str) -> EngineResult<JobRecord> {
        let queue = QueueName::new(queue)?;
        let job = self.broker.get_job(&queue, job_id)?;
        self.authorise_job(principal, &job)?;
        Ok(job)
    }

    /// `sortBy`/`sortDir` re-sort the already-fetched page client-side: the
    /// broker's `list_by_state` has a fixed descending-`created_at` order
    /// with no arbitrary-sort parameter (see `DESIGN.md`).
    pub fn list_jobs(
        &self,
        queue: &str,
        status: Option<&str>,
        page: usize,
        limit: usize,
        sort_by: Option<&str>,
        sort_dir: Option<&str>,
    ) -> EngineResult<JobPage> {
        let queue = QueueName::new(queue)?;
        let states: Vec<JobState> = match status {
            Some(raw) => vec![JobState::parse(raw)?],
            None => Vec::new(),
        };
        let (mut jobs, total) = self.broker.list_by_state(&queue, &states, page, limit)?;
        if let Some(field) = sort_by {
            let descending = sort_dir.map(|d| d.eq_ignore_ascii_case("desc")).unwrap_or(true);
            jobs.sort_by(|a, b| {
                let ordering = match field {
                    "createdAt" => a.created_at.cmp(&b.created_at),
                    "updatedAt" => a.updated_at.cmp(&b.updated_at),
                    "priority" => a.options.priority.cmp(&b.options.priority),
                    _ => a.created_at.cmp(&b.created_at),
                };
                if descending { ordering.reverse() } else { ordering }
            });
        }
        Ok(JobPage { jobs, total, page, limit })
    }

    /// Removing an `active` job only unlinks it from the broker; the worker
    /// slot running it keeps executing unless told otherwise, so this also
    /// flips the job's cancellation flag (spec §5 cooperative cancellation) —
    /// a handler checking `ctx.is_cancelled()` can unwind on its next check.
    pub fn delete_job(&self, principal: &Principal, queue: &str, job_id: &str) -> EngineResult<()> {
        let queue = QueueName::new(queue)?;
        match self.broker.get_job(&queue, job_id) {
            Ok(job) => self.authorise_job(principal, &job)?,
            Err(ff_broker::BrokerError::JobNotFound { .. }) => return Ok(()),
            Err(err) => return Err(err.into()),
        }
        self.cancellations.cancel(job_id);
        self.broker.remove(&queue, job_id)?;
        Ok(())
    }

    fn authorise_job(&self, principal: &Principal, job: &JobRecord) -> CoreResult<()> {
        match job.user_id() {
            Some(owner) if principal.owns(owner) => Ok(()),
            Some(_) => Err(CoreError::Unauthorised("job owned by another user".to_string())),
            None => Ok(()),
        }
    }

    // ---- Flow ---------------------------------------------------------

    pub fn create_flow(&self, principal: &Principal, submission: FlowSubmission) -> EngineResult<Flow> {
        self.flows.create_flow(&principal.user_id, submission)
    }

    pub fn get_flow(&self, principal: &Principal, flow_id: &FlowId) -> EngineResult<Flow> {
        let flow = self.flows.get_flow(flow_id)?;
        self.authorise_flow(principal, &flow)?;
        Ok(flow)
    }

    pub fn list_flows(&self, principal: &Principal) -> Vec<Flow> {
        self.flows.list_flows_by_user(&principal.user_id)
    }

    /// Worker-internal: not principal-gated, called from the worker pool's
    /// completion/failure path.
    pub async fn update_flow_progress(&self, flow_id: &FlowId, job_id: &str, update: ProgressUpdate) -> EngineResult<Flow> {
        self.flows.update_progress(flow_id, job_id, update).await
    }

    pub fn delete_flow(&self, principal: &Principal, flow_id: &FlowId) -> EngineResult<Vec<JobRemovalReport>> {
        let flow = self.flows.get_flow(flow_id)?;
        self.authorise_flow(principal, &flow)?;
        self.flows.delete_flow(flow_id)
    }

    /// Re-enqueue the flow's root node as a fresh broker job, e.g. to retry
    /// a flow whose root ultimately failed.
    pub fn run_flow(&self, principal: &Principal, flow_id: &FlowId) -> EngineResult<JobId> {
        let flow = self.flows.get_flow(flow_id)?;
        self.authorise_flow(principal, &flow)?;
        let queue = QueueName::new(flow.root_queue.as_str())?;
        let mut payload = flow.job_structure.data.as_object().cloned().unwrap_or_default();
        payload.insert("userId".to_string(), serde_json::Value::String(flow.user_id.clone()));
        payload.insert("flowId".to_string(), serde_json::Value::String(flow.id.as_str().to_string()));
        let options = serde_json::from_value(flow.job_structure.opts.clone()).unwrap_or_default();
        let job_id = self
            .broker
            .enqueue(&queue, flow.root_name.as_str(), serde_json::Value::Object(payload), options)?;
        self.storage.update_flow(&flow.id, |flow| {
            flow.root_job_id = Some(job_id.as_str().to_string());
            flow.updated_at = Utc::now();
        })?;
        Ok(job_id)
    }

    fn authorise_flow(&self, principal: &Principal, flow: &Flow) -> CoreResult<()> {
        if principal.owns(&flow.user_id) {
            Ok(())
        } else {
            Err(CoreError::Unauthorised("flow owned by another user".to_string()))
        }
    }

    // ---- Schedule -------------------------------------------------------

    pub fn create_schedule(&self, schedule: Schedule) -> EngineResult<()> {
        self.scheduler.upsert(schedule)
    }

    pub fn get_schedule(&self, principal: &Principal, scheduler_id: &SchedulerId) -> EngineResult<Schedule> {
        let schedule = self
            .scheduler
            .list()
            .into_iter()
            .find(|s| &s.id == scheduler_id)
            .ok_or_else(|| CoreError::not_found("schedule", scheduler_id.to_string()))?;
        if !principal.owns(&schedule.user_id) {
            return Err(CoreError::Unauthorised("schedule owned by another user".to_string()).into());
        }
        Ok(schedule)
    }

    pub fn list_schedules(&self, principal: &Principal) -> Vec<Schedule> {
        self.scheduler
            .list()
            .into_iter()
            .filter(|s| principal.owns(&s.user_id))
            .collect()
    }

    pub fn delete_schedule(&self, principal: &Principal, scheduler_id: &SchedulerId) -> EngineResult<()> {
        self.get_schedule(principal, scheduler_id)?;
        self.scheduler.remove(scheduler_id)
    }

    // ---- Webhook --------------------------------------------------------

    pub fn create_webhook(
        &self,
        principal: &Principal,
        url: String,
        event_type: EventType,
        description: Option<String>,
    ) -> EngineResult<Webhook> {
        let duplicate = self
            .storage
            .list_webhooks_by_user(&principal.user_id)
            .into_iter()
            .any(|w| w.url == url && w.event_type == event_type);
        if duplicate {
            return Err(CoreError::Conflict("webhook already exists for (userId, url, eventType)".to_string()).into());
        }
        let now = Utc::now();
        let webhook = Webhook {
            id: WebhookId::new(),
            user_id: principal.user_id.clone(),
            url,
            event_type,
            active: true,
            description,
            created_at: now,
            updated_at: now,
        };
        self.storage.insert_webhook(webhook.clone());
        Ok(webhook)
    }

    pub fn list_webhooks(&self, principal: &Principal) -> Vec<Webhook> {
        self.storage.list_webhooks_by_user(&principal.user_id)
    }

    pub fn update_webhook(
        &self,
        principal: &Principal,
        id: &WebhookId,
        active: Option<bool>,
        description: Option<String>,
    ) -> EngineResult<Webhook> {
        let existing = self.storage.get_webhook(id)?;
        self.authorise_owned(principal, &existing.user_id)?;
        let webhook = self.storage.update_webhook(id, |webhook| {
            if let Some(active) = active {
                webhook.active = active;
            }
            if description.is_some() {
                webhook.description = description;
            }
            webhook.updated_at = Utc::now();
        })?;
        Ok(webhook)
    }

    pub fn delete_webhook(&self, principal: &Principal, id: &WebhookId) -> EngineResult<()> {
        let existing = self.storage.get_webhook(id)?;
        self.authorise_owned(principal, &existing.user_id)?;
        self.storage.remove_webhook(id);
        Ok(())
    }

    // ---- ApiKey ---------------------------------------------------------

    pub fn create_api_key(
        &self,
        principal: &Principal,
        name: String,
        permissions: HashSet<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> NewApiKey {
        let plaintext = format!("ffk_{}", nanoid::nanoid!(32));
        let prefix = plaintext.chars().take(12).collect::<String>();
        let key_hash = hex_sha256(&plaintext);
        let now = Utc::now();
        let key = ApiKey {
            id: ApiKeyId::new(),
            user_id: principal.user_id.clone(),
            name: name.clone(),
            prefix: prefix.clone(),
            key_hash,
            permissions: permissions.clone(),
            expires_at,
            is_active: true,
            last_used: None,
            created_at: now,
        };
        self.storage.insert_api_key(key.clone());
        NewApiKey {
            id: key.id,
            name,
            prefix,
            plaintext,
            permissions,
            expires_at,
        }
    }

    pub fn list_api_keys(&self, principal: &Principal) -> Vec<ApiKey> {
        self.storage.list_api_keys_by_user(&principal.user_id)
    }

    pub fn update_api_key(
        &self,
        principal: &Principal,
        id: &ApiKeyId,
        permissions: Option<HashSet<String>>,
    ) -> EngineResult<ApiKey> {
        let existing = self.storage.get_api_key(id)?;
        self.authorise_owned(principal, &existing.user_id)?;
        let key = self.storage.update_api_key(id, |key| {
            if let Some(permissions) = permissions {
                key.permissions = permissions;
            }
        })?;
        Ok(key)
    }

    pub fn revoke_api_key(&self, principal: &Principal, id: &ApiKeyId) -> EngineResult<()> {
        let existing = self.storage.get_api_key(id)?;
        self.authorise_owned(principal, &existing.user_id)?;
        self.storage.update_api_key(id, |key| key.is_active = false)?;
        Ok(())
    }

    fn authorise_owned(&self, principal: &Principal, owner: &str) -> CoreResult<()> {
        if principal.owns(owner) {
            Ok(())
        } else {
            Err(CoreError::Unauthorised("resource owned by another user".to_string()))
        }
    }
}

fn hex_sha256(plaintext: &str) -> String {
    let digest = Sha256::digest(plaintext.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use ff_broker::WalBroker;
    use ff_core::{AuthVia, JobContext, JobOptions};
    use ff_registry::Handler;
    use std::sync::atomic::Ordering;

    use super::*;

    struct Echo;

    #[async_trait]
    impl Handler for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        async fn execute(&self, job: &JobRecord, _ctx: &dyn JobContext) -> Result<serde_json::Value, String> {
            Ok(job.payload.clone())
        }
    }

    fn test_orchestrator() -> (Orchestrator, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let broker = WalBroker::open(&dir.path().join("wal"), 0).unwrap();
        let registry = Registry::new();
        registry.register(Arc::new(Echo));
        let storage = Storage::in_memory();
        let events = EventBus::new();
        let cancellations = CancellationRegistry::new();
        let orchestrator = Orchestrator::new(broker.clone(), registry, storage, events, cancellations);
        (orchestrator, dir)
    }

    #[test]
    fn delete_job_trips_the_cancellation_flag_for_an_active_job() {
        let (orchestrator, _dir) = test_orchestrator();
        let principal = Principal::new("u1", AuthVia::Token);
        let job_id = orchestrator
            .submit_job(&principal, "jobQueue", "echo", serde_json::json!({}), JobOptions::default())
            .unwrap();

        // Simulate the worker pool having picked the job up and registered
        // its cancellation flag, the way `WorkerPool::run_job` does.
        let flag = orchestrator.cancellations.register(job_id.as_str());
        assert!(!flag.load(Ordering::SeqCst));

        orchestrator.delete_job(&principal, "jobQueue", job_id.as_str()).unwrap();

        assert!(flag.load(Ordering::SeqCst), "delete_job must signal the in-flight handler");
    }

    #[test]
    fn delete_job_on_unregistered_job_is_still_a_no_op_success() {
        let (orchestrator, _dir) = test_orchestrator();
        let principal = Principal::new("u1", AuthVia::Token);
        orchestrator.delete_job(&principal, "jobQueue", "job_nonexistent").unwrap();
    }
}
