// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory container record store, sharded by function.
//!
//! All record mutation happens under the owning function's mutex; the outer
//! map lock is only held long enough to find or create a shard. Records are
//! crash-volatile — the runtime's labelled container list is authoritative
//! and Adopt & Sync rebuilds this store after a restart.

use esb_core::{ContainerId, ContainerRecord, ContainerState, FunctionName};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown container: {0}")]
    UnknownContainer(ContainerId),

    #[error("illegal transition for {id}: {from} -> {to}")]
    IllegalTransition { id: ContainerId, from: ContainerState, to: ContainerState },
}

type Shard = Arc<Mutex<Vec<ContainerRecord>>>;

/// The one place record state changes: every mutation path funnels through
/// this check so an illegal transition surfaces as an error instead of
/// silently corrupting the machine.
fn transition(record: &mut ContainerRecord, next: ContainerState) -> Result<(), StoreError> {
    if !record.state.can_transition_to(next) {
        return Err(StoreError::IllegalTransition {
            id: record.id.clone(),
            from: record.state,
            to: next,
        });
    }
    record.state = next;
    Ok(())
}

#[derive(Default)]
struct StoreInner {
    shards: RwLock<HashMap<FunctionName, Shard>>,
    index: Mutex<HashMap<ContainerId, FunctionName>>,
}

/// Function-sharded record store shared across the orchestrator's tasks.
#[derive(Clone, Default)]
pub struct LifecycleStore {
    inner: Arc<StoreInner>,
}

impl LifecycleStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn shard(&self, function: &FunctionName) -> Shard {
        if let Some(shard) = self.inner.shards.read().get(function) {
            return shard.clone();
        }
        let mut shards = self.inner.shards.write();
        shards.entry(function.clone()).or_default().clone()
    }

    fn shard_of(&self, id: &ContainerId) -> Option<(FunctionName, Shard)> {
        let function = self.inner.index.lock().get(id).cloned()?;
        Some((function.clone(), self.shard(&function)))
    }

    /// Insert a new record. The id must not already be present.
    pub fn insert(&self, record: ContainerRecord) {
        let shard = self.shard(&record.function_name);
        self.inner.index.lock().insert(record.id.clone(), record.function_name.clone());
        let mut records = shard.lock();
        records.retain(|r| r.id != record.id);
        records.push(record);
    }

    pub fn get(&self, id: &ContainerId) -> Option<ContainerRecord> {
        let (_, shard) = self.shard_of(id)?;
        let records = shard.lock();
        records.iter().find(|r| r.id == *id).cloned()
    }

    /// Number of records counting toward the function's capacity.
    pub fn live_count(&self, function: &FunctionName) -> usize {
        let shard = self.shard(function);
        let records = shard.lock();
        records.iter().filter(|r| r.state.is_live()).count()
    }

    /// Warm path: claim a READY or IDLE record, leaving it READY and touched.
    /// READY records are preferred; among IDLE ones the most recently used
    /// wins (it is the most likely to still be cache-warm).
    pub fn take_available(
        &self,
        function: &FunctionName,
        now: Instant,
    ) -> Option<ContainerRecord> {
        let shard = self.shard(function);
        let mut records = shard.lock();

        let pick = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.state.is_available())
            .max_by_key(|(_, r)| (r.state == ContainerState::Ready, r.last_used_at))
            .map(|(i, _)| i)?;

        let record = &mut records[pick];
        if record.state != ContainerState::Ready {
            let _ = transition(record, ContainerState::Ready);
        }
        record.touch(now);
        Some(record.clone())
    }

    /// First PAUSED record for the function, if any.
    pub fn find_paused(&self, function: &FunctionName) -> Option<ContainerRecord> {
        let shard = self.shard(function);
        let records = shard.lock();
        records.iter().find(|r| r.state == ContainerState::Paused).cloned()
    }

    /// Transition a record, enforcing the state machine. Does not refresh
    /// `last_used_at`: a record that goes IDLE keeps its last-activity time,
    /// which is what the reaper measures against.
    pub fn set_state(&self, id: &ContainerId, next: ContainerState) -> Result<(), StoreError> {
        let (_, shard) = self.shard_of(id).ok_or_else(|| StoreError::UnknownContainer(id.clone()))?;
        let mut records = shard.lock();
        let record = records
            .iter_mut()
            .find(|r| r.id == *id)
            .ok_or_else(|| StoreError::UnknownContainer(id.clone()))?;

        transition(record, next)
    }

    /// Refresh one record's `last_used_at`.
    pub fn touch(&self, id: &ContainerId, now: Instant) -> bool {
        let Some((_, shard)) = self.shard_of(id) else { return false };
        let mut records = shard.lock();
        match records.iter_mut().find(|r| r.id == *id) {
            Some(record) => {
                record.touch(now);
                true
            }
            None => false,
        }
    }

    /// Update the routable address after the runtime reports it.
    pub fn set_address(&self, id: &ContainerId, address: impl Into<String>) -> Result<(), StoreError> {
        let (_, shard) = self.shard_of(id).ok_or_else(|| StoreError::UnknownContainer(id.clone()))?;
        let mut records = shard.lock();
        let record = records
            .iter_mut()
            .find(|r| r.id == *id)
            .ok_or_else(|| StoreError::UnknownContainer(id.clone()))?;
        record.address = address.into();
        Ok(())
    }

    /// Refresh `last_used_at` for every reported id that still has a record.
    /// Idle records move back to READY — a reported container is cached or
    /// checked out on the gateway side. Returns the number touched.
    pub fn touch_reported(&self, ids: &[ContainerId], now: Instant) -> usize {
        let mut touched = 0;
        for id in ids {
            let Some((_, shard)) = self.shard_of(id) else { continue };
            let mut records = shard.lock();
            if let Some(record) = records.iter_mut().find(|r| r.id == *id) {
                record.touch(now);
                if record.state == ContainerState::Idle {
                    let _ = transition(record, ContainerState::Ready);
                }
                touched += 1;
            }
        }
        touched
    }

    /// Transition READY/BUSY records absent from the report to IDLE, once
    /// they are old enough that the gateway must have dropped them (`grace`
    /// spans one heartbeat period). Returns the ids idled.
    pub fn idle_unreported(
        &self,
        reported: &HashSet<ContainerId>,
        grace: std::time::Duration,
        now: Instant,
    ) -> Vec<ContainerId> {
        let mut idled = Vec::new();
        for shard in self.all_shards() {
            let mut records = shard.lock();
            for record in records.iter_mut() {
                let released = matches!(
                    record.state,
                    ContainerState::Ready | ContainerState::Busy
                ) && !reported.contains(&record.id)
                    && record.idle_for_longer_than(now, grace);
                if released && transition(record, ContainerState::Idle).is_ok() {
                    idled.push(record.id.clone());
                }
            }
        }
        idled
    }

    /// Drop a record entirely (after teardown or for a vanished container).
    pub fn purge(&self, id: &ContainerId) -> Option<ContainerRecord> {
        let (_, shard) = self.shard_of(id)?;
        self.inner.index.lock().remove(id);
        let mut records = shard.lock();
        let pos = records.iter().position(|r| r.id == *id)?;
        Some(records.remove(pos))
    }

    /// Clone every record, across all functions.
    pub fn all_records(&self) -> Vec<ContainerRecord> {
        let mut out = Vec::new();
        for shard in self.all_shards() {
            out.extend(shard.lock().iter().cloned());
        }
        out
    }

    /// Clone the records of one function.
    pub fn records_of(&self, function: &FunctionName) -> Vec<ContainerRecord> {
        self.shard(function).lock().clone()
    }

    fn all_shards(&self) -> Vec<Shard> {
        self.inner.shards.read().values().cloned().collect()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
