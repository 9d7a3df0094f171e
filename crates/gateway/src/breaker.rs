// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-function circuit breaker.
//!
//! CLOSED forwards and counts consecutive failures; at the threshold the
//! breaker OPENs and rejects without touching the worker. After the recovery
//! timeout one probe is admitted (HALF_OPEN); its outcome closes or re-opens
//! the circuit. The CLOSED fast path reads an atomic tag without taking the
//! transition lock.

use esb_core::Clock;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

const TAG_CLOSED: u8 = 0;
const TAG_OPEN: u8 = 1;
const TAG_HALF_OPEN: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

/// How an admitted call must report its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Ordinary CLOSED-state call.
    Normal,
    /// The single HALF_OPEN probe; its outcome decides the circuit.
    Probe,
}

#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    /// Consecutive failures before opening.
    pub threshold: u32,
    /// Time an open breaker waits before allowing a probe.
    pub recovery_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self { threshold: 5, recovery_timeout: Duration::from_secs(30) }
    }
}

struct BreakerInner {
    state: BreakerState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

pub struct CircuitBreaker<C: Clock> {
    config: BreakerConfig,
    clock: C,
    tag: AtomicU8,
    inner: Mutex<BreakerInner>,
}

impl<C: Clock> CircuitBreaker<C> {
    pub fn new(config: BreakerConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            tag: AtomicU8::new(TAG_CLOSED),
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                probe_in_flight: false,
            }),
        }
    }

    /// Ask to forward one call. `None` means reject with 503.
    pub fn admit(&self) -> Option<Admission> {
        // Lock-free fast path for the healthy case.
        if self.tag.load(Ordering::Acquire) == TAG_CLOSED {
            return Some(Admission::Normal);
        }

        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::Closed => Some(Admission::Normal),
            BreakerState::Open => {
                let expired = inner
                    .opened_at
                    .is_some_and(|at| self.clock.now().saturating_duration_since(at)
                        >= self.config.recovery_timeout);
                if expired {
                    inner.state = BreakerState::HalfOpen;
                    inner.probe_in_flight = true;
                    self.tag.store(TAG_HALF_OPEN, Ordering::Release);
                    Some(Admission::Probe)
                } else {
                    None
                }
            }
            BreakerState::HalfOpen => {
                if inner.probe_in_flight {
                    None
                } else {
                    inner.probe_in_flight = true;
                    Some(Admission::Probe)
                }
            }
        }
    }

    pub fn record_success(&self, admission: Admission) {
        let mut inner = self.inner.lock();
        match admission {
            Admission::Probe => {
                inner.state = BreakerState::Closed;
                inner.consecutive_failures = 0;
                inner.opened_at = None;
                inner.probe_in_flight = false;
                self.tag.store(TAG_CLOSED, Ordering::Release);
            }
            Admission::Normal => {
                inner.consecutive_failures = 0;
            }
        }
    }

    pub fn record_failure(&self, admission: Admission) {
        let mut inner = self.inner.lock();
        match admission {
            Admission::Probe => {
                inner.state = BreakerState::Open;
                inner.opened_at = Some(self.clock.now());
                inner.probe_in_flight = false;
                self.tag.store(TAG_OPEN, Ordering::Release);
            }
            Admission::Normal => {
                if inner.state != BreakerState::Closed {
                    // A late failure from a call admitted before the circuit
                    // opened must not reset the recovery clock.
                    return;
                }
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.threshold {
                    inner.state = BreakerState::Open;
                    inner.opened_at = Some(self.clock.now());
                    self.tag.store(TAG_OPEN, Ordering::Release);
                }
            }
        }
    }

    /// The admitted call never reached the worker (provisioning failed).
    /// A probe frees its slot without judging the circuit; the recovery
    /// clock keeps its original start so the next caller may probe at once.
    pub fn abort(&self, admission: Admission) {
        if admission == Admission::Probe {
            let mut inner = self.inner.lock();
            inner.state = BreakerState::Open;
            inner.probe_in_flight = false;
            self.tag.store(TAG_OPEN, Ordering::Release);
        }
    }

    pub fn state(&self) -> BreakerState {
        self.inner.lock().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.inner.lock().consecutive_failures
    }
}

#[cfg(test)]
#[path = "breaker_tests.rs"]
mod tests;
