// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic idle-timeout sweeper.
//!
//! IDLE and PAUSED containers past their idle window are stopped and
//! removed. READY records that saw no ensure or heartbeat for a full window
//! go IDLE first ("released naturally"), and anything untouched for
//! `STUCK_MULTIPLIER` windows is torn down with a warning — that catches
//! leaks from missed releases. STOPPING records are teardown retries from a
//! previous failed removal.

use crate::config::STUCK_MULTIPLIER;
use crate::orchestrator::Orchestrator;
use crate::probe::Prober;
use esb_core::{Clock, ContainerRecord, ContainerState};
use esb_driver::{DriverError, RuntimeDriver};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Run the sweep loop until cancelled.
pub async fn run_reaper<D, P, C>(orch: Arc<Orchestrator<D, P, C>>, cancel: CancellationToken)
where
    D: RuntimeDriver + Clone,
    P: Prober,
    C: Clock,
{
    // A zero interval is clamped; tokio intervals reject an empty period.
    let period = orch.config.reaper_interval.max(std::time::Duration::from_millis(10));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; skip it so sweeps are periodic.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        orch.sweep().await;
    }
    tracing::debug!("reaper stopped");
}

impl<D, P, C> Orchestrator<D, P, C>
where
    D: RuntimeDriver + Clone,
    P: Prober,
    C: Clock,
{
    /// One pass over every record.
    pub async fn sweep(&self) {
        let now = self.clock.now();
        for record in self.store.all_records() {
            let idle_timeout = self
                .functions
                .get(record.function_name.as_str())
                .map(|f| f.idle_timeout(self.config.idle_timeout))
                .unwrap_or(self.config.idle_timeout);
            let stuck_after = idle_timeout * STUCK_MULTIPLIER;

            match record.state {
                ContainerState::Idle | ContainerState::Paused
                    if record.idle_for_longer_than(now, idle_timeout) =>
                {
                    self.teardown(&record, "idle timeout").await;
                }
                ContainerState::Ready | ContainerState::Busy | ContainerState::Provisioning
                    if record.idle_for_longer_than(now, stuck_after) =>
                {
                    tracing::warn!(
                        function = %record.function_name,
                        container = %record.id.short(),
                        state = %record.state,
                        "stale container, possible missed release"
                    );
                    self.teardown(&record, "stale").await;
                }
                ContainerState::Ready if record.idle_for_longer_than(now, idle_timeout) => {
                    // No ensure or heartbeat for a full window: released.
                    let _ = self.store.set_state(&record.id, ContainerState::Idle);
                }
                ContainerState::Stopping => {
                    self.teardown(&record, "teardown retry").await;
                }
                _ => {}
            }
        }
    }

    /// Stop and remove one container, dropping its record on success.
    /// Removal failure leaves the record STOPPING for a later retry.
    pub(crate) async fn teardown(&self, record: &ContainerRecord, reason: &str) {
        if record.state != ContainerState::Stopping
            && self.store.set_state(&record.id, ContainerState::Stopping).is_err()
        {
            // Someone else is already driving this record.
            return;
        }

        match self.driver.remove(&record.id, true).await {
            Ok(()) | Err(DriverError::NotFound(_)) => {
                let _ = self.store.set_state(&record.id, ContainerState::Gone);
                self.store.purge(&record.id);
                self.ports.release_addr(&record.address);
                tracing::info!(
                    function = %record.function_name,
                    container = %record.id.short(),
                    reason,
                    "removed container"
                );
            }
            Err(e) => {
                tracing::warn!(
                    container = %record.id.short(),
                    error = %e,
                    "teardown failed, will retry"
                );
            }
        }
    }
}

#[cfg(test)]
#[path = "reaper_tests.rs"]
mod tests;
