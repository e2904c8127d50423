// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The fixed whitelist of queue names and per-job dispatch options.

use crate::error::{CoreError, CoreResult};
use crate::setters;

/// Queue names the broker will accept submissions for.
///
/// Submission to any other name fails with [`CoreError::InvalidQueue`].
pub const QUEUE_WHITELIST: &[&str] = &["jobQueue", "webhooks", "schedQueue", "flowQueue"];

/// A validated queue name drawn from [`QUEUE_WHITELIST`].
///
/// Queues are cheap singletons: constructing one only validates the name,
/// the broker memoises its handle on first use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct QueueName(String);

impl QueueName {
    pub fn new(name: impl Into<String>) -> CoreResult<Self> {
        let name = name.into();
        if QUEUE_WHITELIST.contains(&name.as_str()) {
            Ok(Self(name))
        } else {
            Err(CoreError::InvalidQueue { queue: name })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::ops::Deref for QueueName {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

/// Per-job dispatch options: priority, attempts, delay, and retention caps.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOptions {
    /// Advisory priority, 1 (highest) – 100 (lowest). Fairness is within a user's jobs only.
    pub priority: u8,
    /// Total attempts including the first, must be >= 1.
    pub attempts: u32,
    /// Initial visibility delay in milliseconds.
    pub delay_ms: u64,
    /// How many completed jobs to retain per queue before pruning; `None` means unbounded.
    pub remove_on_complete: Option<u32>,
    /// How many failed jobs to retain per queue before pruning; `None` means unbounded.
    pub remove_on_fail: Option<u32>,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            priority: 50,
            attempts: 1,
            delay_ms: 0,
            remove_on_complete: Some(1000),
            remove_on_fail: Some(5000),
        }
    }
}

impl JobOptions {
    setters! {
        set {
            priority: u8,
            attempts: u32,
            delay_ms: u64,
        }
        option {
            remove_on_complete: u32,
            remove_on_fail: u32,
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.attempts < 1 {
            return Err(CoreError::InvalidInput(
                "attempts must be >= 1".to_string(),
            ));
        }
        if self.priority < 1 || self.priority > 100 {
            return Err(CoreError::InvalidInput(
                "priority must be between 1 and 100".to_string(),
            ));
        }
        Ok(())
    }
}
