// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat janitor: periodically reports in-use containers.
//!
//! The report covers both checked-out handles and live host-cache entries,
//! so a cached-but-momentarily-quiet container is not reaped out from under
//! the warm path. A lost report is harmless; the orchestrator just sees the
//! container go idle.

use crate::client::ControlPlane;
use crate::dispatch::Dispatcher;
use crate::proxy::WorkerInvoker;
use esb_core::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Run the report loop until cancelled.
pub async fn run_heartbeat<CP, I, C>(
    dispatcher: Arc<Dispatcher<CP, I, C>>,
    interval: Duration,
    cancel: CancellationToken,
) where
    CP: ControlPlane,
    I: WorkerInvoker,
    C: Clock,
{
    // A zero interval is clamped; tokio intervals reject an empty period.
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(10)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; skip it.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        dispatcher.send_heartbeat().await;
    }
    tracing::debug!("heartbeat janitor stopped");
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
