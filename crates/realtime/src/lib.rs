// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Real-time fan-out (spec §4.8): per-user and per-job subscriptions over
//! `ff-engine`'s event bus, delta-chunk accumulation for late subscribers,
//! and wire-event naming. Transport (WebSocket upgrade, framing) is
//! `ff-daemon`'s concern; this crate is transport-neutral.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod delta;
mod hub;
mod wire;

pub use delta::DeltaAccumulator;
pub use hub::{RealtimeHub, Subscription};
pub use wire::{to_wire, WireEvent};
