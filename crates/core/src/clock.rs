// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time abstraction so scheduling and backoff logic can be tested deterministically.

use std::sync::Arc;
use std::time::{Duration, Instant, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Source of wall-clock and monotonic time.
///
/// Production code uses [`SystemClock`]; tests use [`FakeClock`] to control
/// time advancement explicitly rather than racing real sleeps.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
    fn monotonic(&self) -> Instant;
    fn now_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn monotonic(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeClockState>>,
}

#[derive(Debug)]
struct FakeClockState {
    now: DateTime<Utc>,
    started: Instant,
    elapsed: Duration,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeClockState {
                now,
                started: Instant::now(),
                elapsed: Duration::ZERO,
            })),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.inner.lock().now = now;
    }

    pub fn set_epoch_ms(&self, epoch_ms: i64) {
        let secs = epoch_ms.div_euclid(1000);
        let nanos = (epoch_ms.rem_euclid(1000) * 1_000_000) as u32;
        let now = DateTime::<Utc>::from(
            UNIX_EPOCH + Duration::new(secs.max(0) as u64, nanos),
        );
        self.set(now);
    }

    pub fn advance(&self, by: Duration) {
        let mut state = self.inner.lock();
        state.now += chrono::Duration::from_std(by).unwrap_or_default();
        state.elapsed += by;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        self.inner.lock().now
    }

    fn monotonic(&self) -> Instant {
        let state = self.inner.lock();
        state.started + state.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_advances_on_command() {
        let clock = FakeClock::new();
        let t0 = clock.now();
        clock.advance(Duration::from_secs(60));
        let t1 = clock.now();
        assert_eq!((t1 - t0).num_seconds(), 60);
    }

    #[test]
    fn fake_clock_set_epoch_ms_is_exact() {
        let clock = FakeClock::new();
        clock.set_epoch_ms(1_700_000_000_000);
        assert_eq!(clock.now().timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn monotonic_never_goes_backwards_across_advance() {
        let clock = FakeClock::new();
        let m0 = clock.monotonic();
        clock.advance(Duration::from_millis(5));
        let m1 = clock.monotonic();
        assert!(m1 >= m0);
    }
}
