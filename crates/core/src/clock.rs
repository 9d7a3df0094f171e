// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monotonic time source.
//!
//! Every time-dependent decision in the control plane compares `Instant`s —
//! cache expiry, breaker recovery, pool deadlines, idle reaping — so the
//! seam is a single `now()`. Wall-clock time is not part of the contract;
//! the one place that needs it (token minting) reads it directly. Tests
//! swap in [`FakeClock`] and advance it by hand.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of monotonic time.
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// The process clock.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Test clock: a fixed origin plus an offset shared across clones, so every
/// component holding a clone observes the same advanced time.
#[derive(Clone)]
pub struct FakeClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self { origin: Instant::now(), offset: Arc::new(Mutex::new(Duration::ZERO)) }
    }

    /// Move time forward for every clone of this clock.
    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
