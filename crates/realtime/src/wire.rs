// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Translates the internal [`Event`] vocabulary into the wire event names a
//! connected client expects (spec §6's real-time protocol).

use ff_core::Event;
use serde_json::Value;

/// One outbound frame: an event name (`job:progress`, `job:job_1:completed`,
/// `flow:updated`, ...) plus its JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct WireEvent {
    pub name: String,
    pub payload: Value,
}

/// Build the outbound frame for `event`. `job_scoped` selects between the
/// generic per-user name and the `job:{jobId}:`-prefixed name; flow events
/// have no job-scoped form and are only ever emitted generically.
pub fn to_wire(event: &Event, job_scoped: bool) -> Option<WireEvent> {
    let name = match event {
        Event::JobProgress { job_id, .. } => job_event_name(job_id, "progress", job_scoped),
        Event::JobCompleted { job_id, .. } => job_event_name(job_id, "completed", job_scoped),
        Event::JobFailed { job_id, .. } => job_event_name(job_id, "failed", job_scoped),
        Event::FlowUpdated { .. } => Some("flow:updated".to_string()),
        Event::FlowCompleted { .. } => Some("flow:completed".to_string()),
        Event::FlowDeleted { .. } => Some("flow:deleted".to_string()),
        _ => None,
    }?;
    let payload = serde_json::to_value(event).unwrap_or(Value::Null);
    Some(WireEvent { name, payload })
}

fn job_event_name(job_id: &str, suffix: &str, job_scoped: bool) -> Option<String> {
    if job_scoped {
        Some(format!("job:{job_id}:{suffix}"))
    } else {
        Some(format!("job:{suffix}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn progress_event() -> Event {
        Event::JobProgress {
            job_id: "job_1".to_string(),
            queue: "jobQueue".to_string(),
            user_id: Some("u1".to_string()),
            flow_id: None,
            progress: serde_json::json!(50),
            at: Utc::now(),
        }
    }

    #[test]
    fn generic_name_has_no_job_id() {
        let wire = to_wire(&progress_event(), false).unwrap();
        assert_eq!(wire.name, "job:progress");
    }

    #[test]
    fn job_scoped_name_embeds_the_job_id() {
        let wire = to_wire(&progress_event(), true).unwrap();
        assert_eq!(wire.name, "job:job_1:progress");
    }

    #[test]
    fn flow_events_are_never_job_scoped() {
        let event = Event::FlowUpdated {
            flow_id: "flow_1".to_string(),
            status: ff_core::FlowStatus::Running,
            percentage: 50,
            at: Utc::now(),
        };
        let generic = to_wire(&event, false).unwrap();
        let scoped = to_wire(&event, true).unwrap();
        assert_eq!(generic.name, "flow:updated");
        assert_eq!(scoped.name, "flow:updated");
    }

    #[test]
    fn registry_events_have_no_wire_form() {
        let event = Event::RegistryReloaded {
            added: vec![],
            removed: vec![],
            at: Utc::now(),
        };
        assert!(to_wire(&event, false).is_none());
    }
}
