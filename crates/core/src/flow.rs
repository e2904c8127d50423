// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DAG-shaped trees of jobs, their aggregate progress, and status roll-up.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::define_id;
use crate::job::JobState;
use crate::simple_display;

define_id! {
    /// Flow identifier.
    pub struct FlowId, "flow"
}

/// Aggregate flow status, rolled up from tracked child job states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

simple_display!(FlowStatus {
    Pending => "pending",
    Running => "running",
    Completed => "completed",
    Failed => "failed",
    Cancelled => "cancelled",
});

/// The originally submitted DAG shape: a node plus its children, recursively.
///
/// Immutable once a flow is created; stored verbatim as `jobStructure`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    pub name: String,
    pub queue: String,
    pub data: serde_json::Value,
    #[serde(default)]
    pub opts: serde_json::Value,
    #[serde(default)]
    pub children: Vec<FlowNode>,
}

impl FlowNode {
    /// Total node count including this node, used to seed `FlowProgress.summary.total`.
    pub fn count_nodes(&self) -> usize {
        1 + self.children.iter().map(FlowNode::count_nodes).sum::<usize>()
    }
}

/// Per-tracked-job metadata inside [`FlowProgress`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedJob {
    /// Dotted child-index path into `jobStructure` (e.g. `"0.1"`), identifying
    /// which node this job corresponds to even when sibling names collide.
    #[serde(default)]
    pub node_path: String,
    pub handler_name: String,
    pub queue_name: String,
    pub status: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Tallied counts per job state across all tracked jobs in a flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub total: u32,
    pub waiting: u32,
    pub active: u32,
    pub completed: u32,
    pub failed: u32,
    pub delayed: u32,
    pub waiting_children: u32,
    pub paused: u32,
    pub stuck: u32,
    pub percentage: u32,
}

/// The mutable progress document attached to a flow.
///
/// Invariant: `Σ(state counts) + waiting == total`, always.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowProgress {
    pub jobs: HashMap<String, TrackedJob>,
    pub summary: ProgressSummary,
}

impl FlowProgress {
    pub fn new(total: u32) -> Self {
        Self {
            jobs: HashMap::new(),
            summary: ProgressSummary {
                total,
                waiting: total,
                ..Default::default()
            },
        }
    }

    /// Recompute `summary` by tallying `jobs`, per the progress update algorithm.
    pub fn recompute(&mut self) {
        let mut summary = ProgressSummary {
            total: self.summary.total,
            ..Default::default()
        };
        for tracked in self.jobs.values() {
            match tracked.status {
                // `waiting` is computed below from untracked nodes only (spec
                // §4.5: `waiting = max(0, total - |tracked|)`); a job already
                // submitted to the broker no longer counts towards it even
                // while it sits in the broker's own `waiting` sub-state.
                JobState::Waiting => {}
                JobState::Delayed => summary.delayed += 1,
                JobState::WaitingChildren => summary.waiting_children += 1,
                JobState::Active => summary.active += 1,
                JobState::Completed => summary.completed += 1,
                JobState::Failed => summary.failed += 1,
                JobState::Paused => summary.paused += 1,
                JobState::Stuck => summary.stuck += 1,
            }
        }
        summary.waiting = summary.total.saturating_sub(self.jobs.len() as u32);
        summary.percentage = if summary.total == 0 {
            0
        } else {
            (100 * summary.completed / summary.total).min(100)
        };
        self.summary = summary;
    }

    /// Invariant: Σ(state counts) + waiting == total.
    pub fn invariant_holds(&self) -> bool {
        let s = &self.summary;
        let untracked_waiting = s.total.saturating_sub(self.jobs.len() as u32);
        let tracked_waiting = self
            .jobs
            .values()
            .filter(|j| j.status == JobState::Waiting)
            .count() as u32;
        let sum = s.active
            + s.completed
            + s.failed
            + s.delayed
            + s.waiting_children
            + s.paused
            + s.stuck
            + tracked_waiting
            + untracked_waiting;
        sum == s.total
    }

    pub fn derive_status(&self) -> FlowStatus {
        let any_failed = self
            .jobs
            .values()
            .any(|j| matches!(j.status, JobState::Failed | JobState::Stuck));
        if any_failed {
            return FlowStatus::Failed;
        }
        let untracked = self.summary.total.saturating_sub(self.jobs.len() as u32);
        if self.summary.completed == self.summary.total && untracked == 0 && self.summary.total > 0
        {
            return FlowStatus::Completed;
        }
        if !self.jobs.is_empty() {
            return FlowStatus::Running;
        }
        FlowStatus::Pending
    }
}

/// A flow record as persisted: root metadata plus mutable [`FlowProgress`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    pub id: FlowId,
    pub flowname: String,
    pub root_name: String,
    pub root_queue: String,
    pub user_id: String,
    pub job_structure: FlowNode,
    pub root_job_id: Option<String>,
    pub status: FlowStatus,
    pub progress: FlowProgress,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// The outcome of removing one job during flow deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRemovalReport {
    pub job_id: String,
    pub queue_name: String,
    pub status: RemovalStatus,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalStatus {
    Success,
    NotFound,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str) -> FlowNode {
        FlowNode {
            name: name.to_string(),
            queue: "jobQueue".to_string(),
            data: serde_json::json!({}),
            opts: serde_json::json!({}),
            children: vec![],
        }
    }

    #[test]
    fn count_nodes_includes_root_and_children() {
        let tree = FlowNode {
            children: vec![leaf("a"), leaf("b")],
            ..leaf("root")
        };
        assert_eq!(tree.count_nodes(), 3);
    }

    #[test]
    fn fresh_progress_has_all_nodes_waiting() {
        let progress = FlowProgress::new(3);
        assert_eq!(progress.summary.waiting, 3);
        assert!(progress.invariant_holds());
    }

    #[test]
    fn recompute_after_one_completion_keeps_invariant() {
        let mut progress = FlowProgress::new(2);
        progress.jobs.insert(
            "job_1".to_string(),
            TrackedJob {
                node_path: "0".to_string(),
                handler_name: "h".to_string(),
                queue_name: "jobQueue".to_string(),
                status: JobState::Completed,
                result: None,
                error: None,
                completed_at: Some(Utc::now()),
            },
        );
        progress.recompute();
        assert!(progress.invariant_holds());
        assert_eq!(progress.summary.completed, 1);
        assert_eq!(progress.summary.waiting, 1);
    }

    #[test]
    fn waiting_counts_untracked_nodes_not_jobs_still_in_broker_wait() {
        // total=3: two children completed, a third (newly-submitted parent)
        // tracked but still sitting in the broker's own `waiting` state.
        let mut progress = FlowProgress::new(3);
        for (i, status) in [JobState::Completed, JobState::Completed, JobState::Waiting].into_iter().enumerate() {
            progress.jobs.insert(
                format!("job_{i}"),
                TrackedJob {
                    node_path: i.to_string(),
                    handler_name: "h".to_string(),
                    queue_name: "jobQueue".to_string(),
                    status,
                    result: None,
                    error: None,
                    completed_at: None,
                },
            );
        }
        progress.recompute();
        assert_eq!(progress.summary.completed, 2);
        assert_eq!(progress.summary.waiting, 0);
        assert_eq!(progress.summary.percentage, 66);
    }

    #[test]
    fn status_is_failed_if_any_job_failed() {
        let mut progress = FlowProgress::new(2);
        progress.jobs.insert(
            "job_1".to_string(),
            TrackedJob {
                node_path: "0".to_string(),
                handler_name: "h".to_string(),
                queue_name: "jobQueue".to_string(),
                status: JobState::Failed,
                result: None,
                error: Some("boom".to_string()),
                completed_at: Some(Utc::now()),
            },
        );
        progress.recompute();
        assert_eq!(progress.derive_status(), FlowStatus::Failed);
    }

    #[test]
    fn status_is_completed_only_when_all_tracked_and_done() {
        let mut progress = FlowProgress::new(1);
        progress.jobs.insert(
            "job_1".to_string(),
            TrackedJob {
                node_path: "0".to_string(),
                handler_name: "h".to_string(),
                queue_name: "jobQueue".to_string(),
                status: JobState::Completed,
                result: None,
                error: None,
                completed_at: Some(Utc::now()),
            },
        );
        progress.recompute();
        assert_eq!(progress.derive_status(), FlowStatus::Completed);
    }
}
