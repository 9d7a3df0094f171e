// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adopt & Sync: restart recovery against the live runtime.
//!
//! Runs once at startup, before the RPC listener accepts work. The runtime's
//! labelled container list is authoritative: running containers of ours are
//! adopted back into the store, everything else of ours is removed. The
//! in-memory store is only ever a cache of this truth.

use crate::orchestrator::Orchestrator;
use crate::probe::Prober;
use esb_core::{
    function_of_labels, Clock, ContainerRecord, ContainerState, LABEL_CREATED_BY, LABEL_OWNER,
};
use esb_driver::{DriverError, RuntimeDriver, RuntimeState};

/// Counts reported after reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdoptReport {
    pub adopted: usize,
    pub removed: usize,
}

impl<D, P, C> Orchestrator<D, P, C>
where
    D: RuntimeDriver + Clone,
    P: Prober,
    C: Clock,
{
    /// Reconcile the store with every container bearing our ownership label.
    pub async fn adopt_sync(&self) -> Result<AdoptReport, DriverError> {
        let selector = vec![(LABEL_CREATED_BY.to_string(), LABEL_OWNER.to_string())];
        let listed = self.driver.list(&selector).await?;
        let mut report = AdoptReport::default();

        for container in listed {
            let function = function_of_labels(&container.labels);
            let adoptable = matches!(
                container.state,
                RuntimeState::Running | RuntimeState::Paused
            );

            let (Some(function), true) = (function, adoptable) else {
                // Exited, unlabelled, or otherwise unusable: clean it up.
                match self.driver.remove(&container.id, true).await {
                    Ok(()) | Err(DriverError::NotFound(_)) => report.removed += 1,
                    Err(e) => tracing::warn!(
                        container = %container.id.short(),
                        error = %e,
                        "failed to remove stale container"
                    ),
                }
                continue;
            };

            // A function dropped from the routing table can never be routed
            // to again; its survivors are stale.
            if self.functions.get(function.as_str()).is_none() {
                match self.driver.remove(&container.id, true).await {
                    Ok(()) | Err(DriverError::NotFound(_)) => report.removed += 1,
                    Err(e) => tracing::warn!(
                        container = %container.id.short(),
                        error = %e,
                        "failed to remove undeclared function's container"
                    ),
                }
                continue;
            }

            let address = match container.address.clone() {
                Some(addr) => Some(addr),
                None => match self.driver.inspect(&container.id).await {
                    Ok(info) => info.address,
                    Err(_) => None,
                },
            };
            let Some(address) = address else {
                tracing::warn!(
                    container = %container.id.short(),
                    function = %function,
                    "running container has no routable address, removing"
                );
                if self.driver.remove(&container.id, true).await.is_ok() {
                    report.removed += 1;
                }
                continue;
            };

            let state = match container.state {
                RuntimeState::Paused => ContainerState::Paused,
                _ => ContainerState::Ready,
            };

            let now = self.clock.now();
            self.ports.reserve_addr(&address);
            self.store.insert(ContainerRecord::new(
                container.id.clone(),
                function.clone(),
                address,
                state,
                now,
            ));
            tracing::info!(
                function = %function,
                container = %container.id.short(),
                state = %state,
                "adopted container"
            );
            report.adopted += 1;
        }

        tracing::info!(
            adopted = report.adopted,
            removed = report.removed,
            "adopt & sync complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
#[path = "adopt_tests.rs"]
mod tests;
