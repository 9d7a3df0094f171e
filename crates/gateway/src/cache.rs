// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TTL-bounded host cache: function → worker address.
//!
//! A hit on the warm path skips the orchestrator ensure entirely. Entries
//! expire lazily; `invalidate` is called whenever the gateway observes a
//! failure against the cached address.

use esb_core::{Clock, ContainerId, FunctionName};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A cached worker endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedWorker {
    pub container_id: ContainerId,
    pub address: String,
}

struct CacheEntry {
    worker: CachedWorker,
    expires_at: Instant,
}

/// Shared across request handlers: many readers, infrequent writers.
pub struct ContainerHostCache<C: Clock> {
    ttl: Duration,
    clock: C,
    entries: RwLock<HashMap<FunctionName, CacheEntry>>,
}

impl<C: Clock> ContainerHostCache<C> {
    pub fn new(ttl: Duration, clock: C) -> Self {
        Self { ttl, clock, entries: RwLock::new(HashMap::new()) }
    }

    /// The cached worker, only while unexpired.
    pub fn get(&self, function: &FunctionName) -> Option<CachedWorker> {
        let now = self.clock.now();
        let entries = self.entries.read();
        let entry = entries.get(function)?;
        if now < entry.expires_at {
            Some(entry.worker.clone())
        } else {
            None
        }
    }

    pub fn put(&self, function: FunctionName, container_id: ContainerId, address: impl Into<String>) {
        let expires_at = self.clock.now() + self.ttl;
        let worker = CachedWorker { container_id, address: address.into() };
        self.entries.write().insert(function, CacheEntry { worker, expires_at });
    }

    /// Drop the entry for a function whose worker failed or vanished.
    pub fn invalidate(&self, function: &FunctionName) {
        self.entries.write().remove(function);
    }

    /// Container ids of every live entry, for the heartbeat report.
    pub fn cached_ids(&self) -> Vec<ContainerId> {
        let now = self.clock.now();
        self.entries
            .read()
            .values()
            .filter(|entry| now < entry.expires_at)
            .map(|entry| entry.worker.container_id.clone())
            .collect()
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
