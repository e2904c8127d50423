// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-event-kind JSON body delivered to a subscriber's URL (spec §4.7).

use ff_core::{Event, EventType};
use serde_json::{json, Value};

/// The [`EventType`] a raw bus [`Event`] corresponds to, or `None` for kinds
/// webhooks never subscribe to (flow/schedule/registry events).
pub fn event_kind(event: &Event) -> Option<EventType> {
    match event {
        Event::JobProgress { .. } => Some(EventType::Progress),
        Event::JobDelta { .. } => Some(EventType::Delta),
        Event::JobCompleted { .. } => Some(EventType::Completed),
        Event::JobFailed { .. } => Some(EventType::Failed),
        _ => None,
    }
}

/// Build the outbound body for `event`. `jobname` is the job's `handler_name`,
/// not carried on every event variant so the dispatcher resolves it up front.
pub fn build_payload(event: &Event, jobname: &str) -> Option<Value> {
    match event {
        Event::JobProgress { job_id, user_id, progress, .. } => Some(json!({
            "id": job_id,
            "jobname": jobname,
            "userId": user_id,
            "progress": progress,
            "eventType": "progress",
        })),
        Event::JobDelta { job_id, user_id, chunk, .. } => Some(json!({
            "id": job_id,
            "jobname": jobname,
            "userId": user_id,
            "delta": chunk,
            "eventType": "delta",
        })),
        Event::JobCompleted { job_id, user_id, result, .. } => Some(json!({
            "id": job_id,
            "jobname": jobname,
            "userId": user_id,
            "result": result,
            "eventType": "completed",
        })),
        Event::JobFailed { job_id, user_id, reason, .. } => Some(json!({
            "id": job_id,
            "jobname": jobname,
            "userId": user_id,
            "error": reason,
            "eventType": "failed",
        })),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn completed_event_has_result_and_no_error_field() {
        let event = Event::JobCompleted {
            job_id: "job_1".to_string(),
            queue: "jobQueue".to_string(),
            user_id: Some("u1".to_string()),
            flow_id: None,
            handler_name: "send-email".to_string(),
            result: json!({"ok": true}),
            at: Utc::now(),
        };
        let body = build_payload(&event, "send-email").unwrap();
        assert_eq!(body["eventType"], "completed");
        assert_eq!(body["jobname"], "send-email");
        assert_eq!(body["result"], json!({"ok": true}));
        assert!(body.get("error").is_none());
    }

    #[test]
    fn failed_event_carries_the_reason_as_error() {
        let event = Event::JobFailed {
            job_id: "job_1".to_string(),
            queue: "jobQueue".to_string(),
            user_id: None,
            flow_id: None,
            handler_name: "h".to_string(),
            reason: "boom".to_string(),
            attempts_made: 3,
            at: Utc::now(),
        };
        let body = build_payload(&event, "h").unwrap();
        assert_eq!(body["error"], "boom");
        assert_eq!(body["eventType"], "failed");
    }

    #[test]
    fn flow_events_have_no_webhook_payload() {
        let event = Event::FlowDeleted {
            flow_id: "flow_1".to_string(),
            at: Utc::now(),
        };
        assert!(event_kind(&event).is_none());
        assert!(build_payload(&event, "h").is_none());
    }
}
