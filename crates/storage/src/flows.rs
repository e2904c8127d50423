// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use ff_core::{Flow, FlowId};

use crate::error::{StorageError, StorageResult};
use crate::storage::Storage;

impl Storage {
    pub fn insert_flow(&self, flow: Flow) {
        self.state.write().flows.insert(flow.id.clone(), flow);
    }

    pub fn get_flow(&self, id: &FlowId) -> StorageResult<Flow> {
        self.state
            .read()
            .flows
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                kind: "flow",
                id: id.to_string(),
            })
    }

    /// Apply `mutate` under the write lock and persist the result, the way
    /// the flow coordinator serializes sibling job completions into one
    /// progress update.
    pub fn update_flow(&self, id: &FlowId, mutate: impl FnOnce(&mut Flow)) -> StorageResult<Flow> {
        let mut state = self.state.write();
        let flow = state.flows.get_mut(id).ok_or_else(|| StorageError::NotFound {
            kind: "flow",
            id: id.to_string(),
        })?;
        mutate(flow);
        Ok(flow.clone())
    }

    pub fn remove_flow(&self, id: &FlowId) -> Option<Flow> {
        self.state.write().flows.remove(id)
    }

    pub fn list_flows_by_user(&self, user_id: &str) -> Vec<Flow> {
        self.state
            .read()
            .flows
            .values()
            .filter(|flow| flow.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ff_core::{FlowNode, FlowProgress, FlowStatus};

    fn sample_flow() -> Flow {
        let now = chrono::Utc::now();
        Flow {
            id: FlowId::new(),
            flowname: "demo".to_string(),
            root_name: "root".to_string(),
            root_queue: "jobQueue".to_string(),
            user_id: "u1".to_string(),
            job_structure: FlowNode {
                name: "root".to_string(),
                queue: "jobQueue".to_string(),
                data: serde_json::json!({}),
                opts: serde_json::json!({}),
                children: vec![],
            },
            root_job_id: None,
            status: FlowStatus::Pending,
            progress: FlowProgress::new(1),
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn insert_then_get_round_trips() {
        let storage = Storage::in_memory();
        let flow = sample_flow();
        let id = flow.id.clone();
        storage.insert_flow(flow);
        assert_eq!(storage.get_flow(&id).unwrap().user_id, "u1");
    }

    #[test]
    fn update_flow_mutates_in_place() {
        let storage = Storage::in_memory();
        let flow = sample_flow();
        let id = flow.id.clone();
        storage.insert_flow(flow);
        storage
            .update_flow(&id, |flow| flow.status = FlowStatus::Running)
            .unwrap();
        assert_eq!(storage.get_flow(&id).unwrap().status, FlowStatus::Running);
    }

    #[test]
    fn list_flows_by_user_filters() {
        let storage = Storage::in_memory();
        storage.insert_flow(sample_flow());
        let mut other = sample_flow();
        other.user_id = "u2".to_string();
        storage.insert_flow(other);
        assert_eq!(storage.list_flows_by_user("u1").len(), 1);
    }

    #[test]
    fn remove_flow_drops_entry() {
        let storage = Storage::in_memory();
        let flow = sample_flow();
        let id = flow.id.clone();
        storage.insert_flow(flow);
        assert!(storage.remove_flow(&id).is_some());
        assert!(storage.get_flow(&id).is_err());
    }
}
