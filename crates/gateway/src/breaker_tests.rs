// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use esb_core::FakeClock;

const RECOVERY: Duration = Duration::from_secs(30);

fn breaker() -> (CircuitBreaker<FakeClock>, FakeClock) {
    let clock = FakeClock::new();
    let config = BreakerConfig { threshold: 5, recovery_timeout: RECOVERY };
    (CircuitBreaker::new(config, clock.clone()), clock)
}

#[test]
fn closed_admits_and_success_resets_counter() {
    let (breaker, _clock) = breaker();
    for _ in 0..4 {
        let admission = breaker.admit().unwrap();
        breaker.record_failure(admission);
    }
    assert_eq!(breaker.consecutive_failures(), 4);

    let admission = breaker.admit().unwrap();
    breaker.record_success(admission);
    assert_eq!(breaker.consecutive_failures(), 0);
    assert_eq!(breaker.state(), BreakerState::Closed);
}

#[test]
fn opens_at_threshold() {
    let (breaker, _clock) = breaker();
    for _ in 0..5 {
        let admission = breaker.admit().unwrap();
        breaker.record_failure(admission);
    }
    assert_eq!(breaker.state(), BreakerState::Open);
    assert_eq!(breaker.admit(), None, "open circuit rejects immediately");
}

#[test]
fn open_admits_zero_calls_before_recovery() {
    let (breaker, clock) = breaker();
    for _ in 0..5 {
        breaker.record_failure(breaker.admit().unwrap());
    }

    clock.advance(RECOVERY - Duration::from_secs(1));
    assert_eq!(breaker.admit(), None);
}

#[test]
fn half_open_allows_exactly_one_probe() {
    let (breaker, clock) = breaker();
    for _ in 0..5 {
        breaker.record_failure(breaker.admit().unwrap());
    }

    clock.advance(RECOVERY);
    let probe = breaker.admit().unwrap();
    assert_eq!(probe, Admission::Probe);

    // Concurrent callers see OPEN behavior while the probe is in flight.
    assert_eq!(breaker.admit(), None);
    assert_eq!(breaker.admit(), None);
}

#[test]
fn probe_success_closes_the_circuit() {
    let (breaker, clock) = breaker();
    for _ in 0..5 {
        breaker.record_failure(breaker.admit().unwrap());
    }
    clock.advance(RECOVERY);
    let probe = breaker.admit().unwrap();
    breaker.record_success(probe);

    assert_eq!(breaker.state(), BreakerState::Closed);
    assert_eq!(breaker.admit(), Some(Admission::Normal));
}

#[test]
fn probe_failure_reopens_and_restarts_the_clock() {
    let (breaker, clock) = breaker();
    for _ in 0..5 {
        breaker.record_failure(breaker.admit().unwrap());
    }
    clock.advance(RECOVERY);
    let probe = breaker.admit().unwrap();
    breaker.record_failure(probe);
    assert_eq!(breaker.state(), BreakerState::Open);

    // The recovery clock restarted at the probe failure.
    clock.advance(RECOVERY - Duration::from_secs(1));
    assert_eq!(breaker.admit(), None);
    clock.advance(Duration::from_secs(1));
    assert_eq!(breaker.admit(), Some(Admission::Probe));
}

#[test]
fn aborted_probe_frees_the_slot_without_judging() {
    let (breaker, clock) = breaker();
    for _ in 0..5 {
        breaker.record_failure(breaker.admit().unwrap());
    }
    clock.advance(RECOVERY);
    let probe = breaker.admit().unwrap();

    breaker.abort(probe);
    assert_eq!(breaker.state(), BreakerState::Open);
    // The original recovery window already elapsed, so the next caller may
    // probe immediately.
    assert_eq!(breaker.admit(), Some(Admission::Probe));
}

#[test]
fn late_failure_from_before_opening_does_not_reset_clock() {
    let (breaker, clock) = breaker();
    let straggler = breaker.admit().unwrap();
    for _ in 0..5 {
        breaker.record_failure(breaker.admit().unwrap());
    }
    assert_eq!(breaker.state(), BreakerState::Open);

    clock.advance(RECOVERY - Duration::from_secs(1));
    breaker.record_failure(straggler);

    clock.advance(Duration::from_secs(1));
    assert_eq!(breaker.admit(), Some(Admission::Probe));
}

#[test]
fn aborted_normal_call_is_a_no_op() {
    let (breaker, _clock) = breaker();
    let admission = breaker.admit().unwrap();
    breaker.abort(admission);
    assert_eq!(breaker.state(), BreakerState::Closed);
    assert_eq!(breaker.consecutive_failures(), 0);
}
