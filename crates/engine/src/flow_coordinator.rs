// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DAG orchestration: flattening `jobStructure` into tiered broker
//! submissions, folding worker progress callbacks into `FlowProgress`, and
//! best-effort flow deletion.
//!
//! The broker has no DAG primitive (spec §4.1 lists flat queue operations
//! only), so "children run first" is realised here: leaf nodes are enqueued
//! immediately at creation, and each parent node is enqueued lazily, once
//! every child has reached a terminal state, with completed children's
//! results folded into its payload under `_childResults`. Because
//! `FlowNode.children` is an owned, non-cyclic `Vec<FlowNode>`, cyclic flow
//! graphs are structurally unconstructible — no runtime cycle check is
//! needed (see `DESIGN.md`).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use ff_broker::Broker;
use ff_core::{
    Event, Flow, FlowId, FlowNode, FlowProgress, FlowStatus, JobOptions, JobState, QueueName,
    TrackedJob,
};
use ff_storage::Storage;
use parking_lot::Mutex as SyncMutex;
use serde_json::{Map, Value};
use tokio::sync::Mutex as AsyncMutex;
use tracing::warn;

use crate::error::{EngineError, EngineResult};
use crate::event_bus::EventBus;

/// One node made ready to submit this pass, with its resolved path, parent
/// name (for `_flowMetadata.parentName`), and any completed children's
/// results keyed by child name.
struct ReadyNode<'a> {
    node: &'a FlowNode,
    path: String,
    parent_name: Option<String>,
    child_results: Map<String, Value>,
}

struct ChildOutcome {
    completed: bool,
    result: Option<Value>,
}

/// Walks `node`, recording every not-yet-submitted node whose children (if
/// any) are all tracked as `completed` into `ready`. Returns `Some` only when
/// `node` itself is already submitted, carrying its current outcome for the
/// parent's own readiness check.
fn walk<'a>(
    node: &'a FlowNode,
    path: &str,
    parent_name: Option<&str>,
    jobs: &HashMap<String, TrackedJob>,
    ready: &mut Vec<ReadyNode<'a>>,
) -> Option<ChildOutcome> {
    if let Some(tracked) = jobs.values().find(|t| t.node_path == path) {
        return Some(ChildOutcome {
            completed: tracked.status == JobState::Completed,
            result: tracked.result.clone(),
        });
    }

    let mut child_results = Map::new();
    let mut all_children_completed = true;
    for (i, child) in node.children.iter().enumerate() {
        let child_path = format!("{path}.{i}");
        match walk(child, &child_path, Some(node.name.as_str()), jobs, ready) {
            Some(outcome) => {
                if outcome.completed {
                    if let Some(result) = outcome.result {
                        child_results.insert(child.name.clone(), result);
                    }
                } else {
                    all_children_completed = false;
                }
            }
            None => all_children_completed = false,
        }
    }

    if node.children.is_empty() || all_children_completed {
        ready.push(ReadyNode {
            node,
            path: path.to_string(),
            parent_name: parent_name.map(str::to_string),
            child_results,
        });
    }
    None
}

/// Merge `opts` (a sparse JSON object) over [`JobOptions::default`].
fn parse_options(opts: &Value) -> JobOptions {
    let mut merged = serde_json::to_value(JobOptions::default()).unwrap_or_else(|_| Value::Object(Map::new()));
    if let (Some(base), Some(overrides)) = (merged.as_object_mut(), opts.as_object()) {
        for (key, value) in overrides {
            base.insert(key.clone(), value.clone());
        }
    }
    serde_json::from_value(merged).unwrap_or_default()
}

/// Input to `FlowCoordinator::create_flow`, mirroring spec §4.5's creation
/// shape `{flowname, rootName, rootQueue, data, opts, children[]}`.
pub struct FlowSubmission {
    pub flowname: String,
    pub root_name: String,
    pub root_queue: String,
    pub data: Value,
    pub opts: Value,
    pub children: Vec<FlowNode>,
}

/// The worker-supplied update folded into `progress.jobs` by `update_progress`.
pub struct ProgressUpdate {
    pub status: JobState,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub handler_name: String,
    pub queue_name: String,
}

/// Per-job removal outcome reported by `delete_flow`.
pub use ff_core::flow::{JobRemovalReport, RemovalStatus};

/// Orchestrates flow creation, progress folding, and deletion.
#[derive(Clone)]
pub struct FlowCoordinator {
    storage: Storage,
    broker: Arc<dyn Broker>,
    events: EventBus,
    /// Per-`flowId` mutex serialising `update_progress` (spec §5/§9 open
    /// question 3): concurrent sibling completions apply one at a time.
    locks: Arc<SyncMutex<HashMap<FlowId, Arc<AsyncMutex<()>>>>>,
}

impl FlowCoordinator {
    pub fn new(storage: Storage, broker: Arc<dyn Broker>, events: EventBus) -> Self {
        Self {
            storage,
            broker,
            events,
            locks: Arc::new(SyncMutex::new(HashMap::new())),
        }
    }

    fn lock_for(&self, flow_id: &FlowId) -> Arc<AsyncMutex<()>> {
        self.locks.lock().entry(*flow_id).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    /// Create a flow, persist its row, and submit every immediately-ready
    /// (leaf) node to the broker.
    pub fn create_flow(&self, user_id: &str, submission: FlowSubmission) -> EngineResult<Flow> {
        let job_structure = FlowNode {
            name: submission.root_name.clone(),
            queue: submission.root_queue.clone(),
            data: submission.data,
            opts: submission.opts,
            children: submission.children,
        };
        let total = job_structure.count_nodes() as u32;
        let now = Utc::now();
        let flow = Flow {
            id: FlowId::new(),
            flowname: submission.flowname,
            root_name: submission.root_name,
            root_queue: submission.root_queue,
            user_id: user_id.to_string(),
            job_structure,
            root_job_id: None,
            status: FlowStatus::Pending,
            progress: FlowProgress::new(total),
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        };
        self.storage.insert_flow(flow.clone());

        let flow = self.storage.update_flow(&flow.id, |flow| {
            self.submit_ready_nodes(flow);
            if flow.status == FlowStatus::Pending && !flow.progress.jobs.is_empty() {
                flow.status = FlowStatus::Running;
                flow.started_at = Some(now);
            }
            flow.updated_at = Utc::now();
        })?;
        Ok(flow)
    }

    /// Enqueue every node made ready by the current `progress.jobs` state,
    /// inserting a `Waiting` `TrackedJob` for each so repeated calls are
    /// idempotent (a node is only ever submitted once, per `walk`'s
    /// already-tracked short-circuit).
    fn submit_ready_nodes(&self, flow: &mut Flow) {
        let mut ready = Vec::new();
        walk(&flow.job_structure, "0", None, &flow.progress.jobs, &mut ready);

        for item in ready {
            let queue = match QueueName::new(item.node.queue.as_str()) {
                Ok(queue) => queue,
                Err(err) => {
                    warn!(node = %item.node.name, %err, "flow node names an unknown queue, marking failed");
                    flow.progress.jobs.insert(
                        item.path.clone(),
                        TrackedJob {
                            node_path: item.path,
                            handler_name: item.node.name.clone(),
                            queue_name: item.node.queue.clone(),
                            status: JobState::Failed,
                            result: None,
                            error: Some(err.to_string()),
                            completed_at: Some(Utc::now()),
                        },
                    );
                    continue;
                }
            };

            let mut payload = item.node.data.as_object().cloned().unwrap_or_default();
            payload.insert("userId".to_string(), Value::String(flow.user_id.clone()));
            payload.insert("flowId".to_string(), Value::String(flow.id.as_str().to_string()));
            payload.insert(
                "_flowMetadata".to_string(),
                serde_json::json!({
                    "flowId": flow.id.as_str(),
                    "parentName": item.parent_name,
                    "injectedAt": Utc::now(),
                }),
            );
            if !item.child_results.is_empty() {
                payload.insert("_childResults".to_string(), Value::Object(item.child_results));
            }

            let options = parse_options(&item.node.opts);
            match self.broker.enqueue(&queue, item.node.name.as_str(), Value::Object(payload), options) {
                Ok(job_id) => {
                    if item.path == "0" {
                        flow.root_job_id = Some(job_id.as_str().to_string());
                    }
                    flow.progress.jobs.insert(
                        job_id.as_str().to_string(),
                        TrackedJob {
                            node_path: item.path,
                            handler_name: item.node.name.clone(),
                            queue_name: item.node.queue.clone(),
                            status: JobState::Waiting,
                            result: None,
                            error: None,
                            completed_at: None,
                        },
                    );
                }
                Err(err) => {
                    warn!(node = %item.node.name, %err, "failed to submit flow node");
                }
            }
        }
        flow.progress.recompute();
    }

    /// Fold a worker's terminal (or in-flight) callback into `progress.jobs`,
    /// per spec §4.5's update algorithm, then submit any newly-ready nodes.
    pub async fn update_progress(&self, flow_id: &FlowId, job_id: &str, update: ProgressUpdate) -> EngineResult<Flow> {
        let lock = self.lock_for(flow_id);
        let _guard = lock.lock().await;

        let flow = self.storage.update_flow(flow_id, |flow| {
            flow.progress.jobs.insert(
                job_id.to_string(),
                TrackedJob {
                    node_path: flow
                        .progress
                        .jobs
                        .get(job_id)
                        .map(|t| t.node_path.clone())
                        .unwrap_or_default(),
                    handler_name: update.handler_name,
                    queue_name: update.queue_name,
                    status: update.status,
                    result: update.result,
                    error: update.error,
                    completed_at: if update.status.is_terminal() { Some(Utc::now()) } else { None },
                },
            );

            self.submit_ready_nodes(flow);

            if !flow.progress.invariant_holds() {
                warn!(flow_id = %flow.id, "flow progress invariant violated after update");
            }

            let derived = flow.progress.derive_status();
            if derived != flow.status {
                flow.status = derived;
                if derived == FlowStatus::Completed || derived == FlowStatus::Failed {
                    flow.completed_at = Some(Utc::now());
                    if derived == FlowStatus::Completed {
                        flow.result = flow
                            .root_job_id
                            .as_ref()
                            .and_then(|id| flow.progress.jobs.get(id))
                            .and_then(|tracked| tracked.result.clone());
                    } else {
                        flow.error = flow
                            .progress
                            .jobs
                            .values()
                            .find(|tracked| tracked.status == JobState::Failed)
                            .and_then(|tracked| tracked.error.clone());
                    }
                }
            }
            flow.updated_at = Utc::now();
        })?;

        if flow.status == FlowStatus::Completed || flow.status == FlowStatus::Failed {
            self.events.publish_flow_event(
                &flow.user_id,
                Event::FlowCompleted {
                    flow_id: flow.id.as_str().to_string(),
                    status: flow.status,
                    at: flow.updated_at,
                },
            );
        } else {
            self.events.publish_flow_event(
                &flow.user_id,
                Event::FlowUpdated {
                    flow_id: flow.id.as_str().to_string(),
                    status: flow.status,
                    percentage: flow.progress.summary.percentage,
                    at: flow.updated_at,
                },
            );
        }

        Ok(flow)
    }

    /// Best-effort delete: remove every tracked job from its queue, then the
    /// flow row unconditionally, reporting per-job outcomes.
    pub fn delete_flow(&self, flow_id: &FlowId) -> EngineResult<Vec<JobRemovalReport>> {
        let flow = self.storage.get_flow(flow_id)?;
        let mut reports = Vec::with_capacity(flow.progress.jobs.len());

        for (job_id, tracked) in &flow.progress.jobs {
            let queue = match QueueName::new(tracked.queue_name.as_str()) {
                Ok(queue) => queue,
                Err(err) => {
                    reports.push(JobRemovalReport {
                        job_id: job_id.clone(),
                        queue_name: tracked.queue_name.clone(),
                        status: RemovalStatus::Failed,
                        error: Some(err.to_string()),
                    });
                    continue;
                }
            };
            let report = match self.broker.remove(&queue, job_id) {
                Ok(true) => JobRemovalReport {
                    job_id: job_id.clone(),
                    queue_name: tracked.queue_name.clone(),
                    status: RemovalStatus::Success,
                    error: None,
                },
                Ok(false) => JobRemovalReport {
                    job_id: job_id.clone(),
                    queue_name: tracked.queue_name.clone(),
                    status: RemovalStatus::NotFound,
                    error: None,
                },
                Err(err) => JobRemovalReport {
                    job_id: job_id.clone(),
                    queue_name: tracked.queue_name.clone(),
                    status: RemovalStatus::Failed,
                    error: Some(err.to_string()),
                },
            };
            reports.push(report);
        }

        self.storage.remove_flow(flow_id);
        self.locks.lock().remove(flow_id);
        self.events.publish_flow_event(
            &flow.user_id,
            Event::FlowDeleted {
                flow_id: flow_id.as_str().to_string(),
                at: Utc::now(),
            },
        );
        Ok(reports)
    }

    pub fn get_flow(&self, flow_id: &FlowId) -> EngineResult<Flow> {
        Ok(self.storage.get_flow(flow_id)?)
    }

    pub fn list_flows_by_user(&self, user_id: &str) -> Vec<Flow> {
        self.storage.list_flows_by_user(user_id)
    }
}
