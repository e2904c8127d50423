// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestration: the worker pool, flow coordinator, scheduler, and the
//! [`Orchestrator`] facade that ties them to `ff-broker`, `ff-registry`, and
//! `ff-storage` behind the transport-neutral operation surface from spec §6.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod ctx;
pub mod error;
pub mod event_bus;
mod facade;
mod flow_coordinator;
mod scheduler;
mod worker;

pub use ctx::{CancellationRegistry, WorkerCtx};
pub use error::{EngineError, EngineResult};
pub use event_bus::{EventBus, Topic};
pub use facade::{JobPage, Orchestrator};
pub use flow_coordinator::{FlowCoordinator, FlowSubmission, JobRemovalReport, ProgressUpdate, RemovalStatus};
pub use scheduler::{Scheduler, DEFAULT_TICK};
pub use worker::WorkerPool;
