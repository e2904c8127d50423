// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain types, event taxonomy, and error taxonomy shared by every
//! FlowForge crate: jobs, queues, flows, schedules, webhooks, API keys, and
//! the authenticated principal every operation consumes.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod apikey;
pub mod clock;
pub mod ctx;
pub mod error;
pub mod event;
pub mod flow;
pub mod id;
pub mod job;
#[macro_use]
mod macros;
pub mod principal;
pub mod queue;
pub mod schedule;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod user;
pub mod webhook;

pub use apikey::{ApiKey, ApiKeyId, NewApiKey};
pub use clock::{Clock, FakeClock, SystemClock};
pub use ctx::JobContext;
pub use error::{CoreError, CoreResult};
pub use event::Event;
pub use flow::{Flow, FlowId, FlowNode, FlowProgress, FlowStatus, TrackedJob};
pub use job::{JobId, JobRecord, JobState};
pub use principal::{AuthVia, Principal};
pub use queue::{JobOptions, QueueName, QUEUE_WHITELIST};
pub use schedule::{Schedule, SchedulerId, Trigger};
pub use user::{User, UserId};
pub use webhook::{EventType, Webhook, WebhookId};
