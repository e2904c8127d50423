// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job accumulation of `delta` chunks, replayed to a client that
//! subscribes to a job mid-stream (spec §4.8): "Delta events... additionally
//! accumulate per jobId for replay to late subscribers of active streams;
//! accumulators are dropped on terminal events."

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

#[derive(Clone, Default)]
pub struct DeltaAccumulator {
    chunks: Arc<RwLock<HashMap<String, Vec<Value>>>>,
}

impl DeltaAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, job_id: &str, chunk: Value) {
        self.chunks.write().entry(job_id.to_string()).or_default().push(chunk);
    }

    /// Chunks accumulated so far for `job_id`, oldest first. Empty if the
    /// job never streamed deltas or already reached a terminal state.
    pub fn replay(&self, job_id: &str) -> Vec<Value> {
        self.chunks.read().get(job_id).cloned().unwrap_or_default()
    }

    pub fn clear(&self, job_id: &str) {
        self.chunks.write().remove(job_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replay_returns_recorded_chunks_in_order() {
        let acc = DeltaAccumulator::new();
        acc.record("job_1", serde_json::json!("a"));
        acc.record("job_1", serde_json::json!("b"));
        assert_eq!(acc.replay("job_1"), vec![serde_json::json!("a"), serde_json::json!("b")]);
    }

    #[test]
    fn clear_drops_the_accumulator_on_terminal_event() {
        let acc = DeltaAccumulator::new();
        acc.record("job_1", serde_json::json!("a"));
        acc.clear("job_1");
        assert!(acc.replay("job_1").is_empty());
    }

    #[test]
    fn unknown_job_replays_empty() {
        let acc = DeltaAccumulator::new();
        assert!(acc.replay("ghost").is_empty());
    }
}
