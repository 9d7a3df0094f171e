// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The orchestrator's shared state and the small RPC operations.
//!
//! The ensure path lives in `ensure.rs`, the background sweeps in
//! `reaper.rs`, and restart recovery in `adopt.rs` — all as `impl` blocks on
//! [`Orchestrator`].

use crate::config::Config;
use crate::ports::PortAllocator;
use crate::probe::Prober;
use crate::store::LifecycleStore;
use esb_core::{Clock, ContainerId, FunctionName, FunctionTable};
use esb_driver::RuntimeDriver;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Shared state of the orchestrator service.
///
/// One instance lives for the process lifetime, wrapped in an `Arc` shared
/// by the RPC handlers and the reaper task.
pub struct Orchestrator<D, P, C: Clock> {
    pub(crate) driver: D,
    pub(crate) prober: P,
    pub(crate) clock: C,
    pub(crate) config: Config,
    pub(crate) functions: FunctionTable,
    pub(crate) store: LifecycleStore,
    pub(crate) ports: PortAllocator,
    /// Per-function ensure flights; the first caller does the work, followers
    /// re-check the store once the flight lock frees.
    flights: Mutex<HashMap<FunctionName, Arc<tokio::sync::Mutex<()>>>>,
}

impl<D, P, C> Orchestrator<D, P, C>
where
    D: RuntimeDriver + Clone,
    P: Prober,
    C: Clock,
{
    pub fn new(driver: D, prober: P, clock: C, config: Config, functions: FunctionTable) -> Self {
        let ports = PortAllocator::new(config.port_range.0, config.port_range.1);
        Self {
            driver,
            prober,
            clock,
            config,
            functions,
            store: LifecycleStore::new(),
            ports,
            flights: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &LifecycleStore {
        &self.store
    }

    /// Number of NAT host ports currently allocated.
    pub fn ports_in_use(&self) -> usize {
        self.ports.in_use_count()
    }

    /// The per-function flight mutex, created on first use.
    pub(crate) fn flight_for(&self, function: &FunctionName) -> Arc<tokio::sync::Mutex<()>> {
        let mut flights = self.flights.lock();
        flights.entry(function.clone()).or_default().clone()
    }

    /// Heartbeat: the gateway's set of checked-out or cached container ids.
    ///
    /// Reported ids stay warm; READY records the gateway no longer knows
    /// about transition to IDLE once they outlive one heartbeat period, which
    /// is what arms the idle reaper for them.
    pub fn heartbeat(&self, ids: Vec<ContainerId>) {
        let now = self.clock.now();
        let touched = self.store.touch_reported(&ids, now);
        let reported: HashSet<ContainerId> = ids.into_iter().collect();
        let idled = self.store.idle_unreported(&reported, self.config.heartbeat_interval, now);

        if !idled.is_empty() {
            tracing::debug!(
                touched,
                idled = idled.len(),
                "heartbeat processed"
            );
        }
    }

    /// Gateway-initiated removal. Idempotent: unknown ids are fine (the
    /// reaper may have won the race).
    pub async fn evict(&self, id: &ContainerId) {
        let Some(record) = self.store.get(id) else {
            tracing::debug!(container = %id.short(), "evict for unknown container");
            return;
        };
        self.teardown(&record, "gateway evict").await;
    }
}
