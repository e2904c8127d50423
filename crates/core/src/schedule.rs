// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron and fixed-interval schedules that re-inject a templated job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::define_id;
use crate::queue::JobOptions;

define_id! {
    /// Deterministic schedule identifier, a function of `(userId, handlerName, creationTime)`.
    pub struct SchedulerId, "sch_"
}

/// The firing rhythm of a schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Trigger {
    /// Standard 5-field cron expression, interpreted in `timezone` (UTC default).
    Cron {
        expression: String,
        #[serde(default = "default_timezone")]
        timezone: String,
    },
    /// Fixed interval in milliseconds, with an optional cap on total firings.
    RepeatEvery {
        every_ms: u64,
        #[serde(default)]
        limit: Option<u32>,
    },
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// The job template a schedule re-submits on every firing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleTemplate {
    pub handler_name: String,
    pub queue: String,
    pub payload: serde_json::Value,
    pub options: JobOptions,
}

/// A schedule record: identity, template, trigger, and firing bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: SchedulerId,
    pub user_id: String,
    pub template: ScheduleTemplate,
    pub trigger: Trigger,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub fire_count: u32,
    #[serde(default)]
    pub last_fired_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Schedule {
    /// Whether the series has reached its `limit` (for `repeat.every`) or `endDate`.
    pub fn is_exhausted(&self, now: DateTime<Utc>) -> bool {
        if let Some(end) = self.end_date {
            if now > end {
                return true;
            }
        }
        if let Trigger::RepeatEvery { limit: Some(limit), .. } = self.trigger {
            return self.fire_count >= limit;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> ScheduleTemplate {
        ScheduleTemplate {
            handler_name: "send-email".to_string(),
            queue: "schedQueue".to_string(),
            payload: serde_json::json!({}),
            options: JobOptions::default(),
        }
    }

    #[test]
    fn repeat_every_respects_limit() {
        let schedule = Schedule {
            id: SchedulerId::new(),
            user_id: "u1".to_string(),
            template: template(),
            trigger: Trigger::RepeatEvery {
                every_ms: 1000,
                limit: Some(3),
            },
            start_date: None,
            end_date: None,
            fire_count: 3,
            last_fired_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(schedule.is_exhausted(Utc::now()));
    }

    #[test]
    fn end_date_in_the_past_exhausts_the_series() {
        let schedule = Schedule {
            id: SchedulerId::new(),
            user_id: "u1".to_string(),
            template: template(),
            trigger: Trigger::Cron {
                expression: "0 0 * * *".to_string(),
                timezone: default_timezone(),
            },
            start_date: None,
            end_date: Some(Utc::now() - chrono::Duration::days(1)),
            fire_count: 0,
            last_fired_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(schedule.is_exhausted(Utc::now()));
    }

    #[test]
    fn cron_trigger_defaults_to_utc() {
        let json = r#"{"kind":"cron","expression":"* * * * *"}"#;
        let trigger: Trigger = serde_json::from_str(json).unwrap();
        match trigger {
            Trigger::Cron { timezone, .. } => assert_eq!(timezone, "UTC"),
            _ => panic!("expected cron trigger"),
        }
    }
}
