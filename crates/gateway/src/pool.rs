// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-function worker pool: capacity permits, a LIFO idle stack, and a
//! FIFO waiter queue.
//!
//! LIFO reuse keeps repeat requests on the warmest container; when the pool
//! saturates, released permits hand over directly to the oldest waiter so a
//! slot never sits idle while someone queues, and waiters cannot starve.

use esb_core::ContainerId;
use parking_lot::Mutex;
use std::collections::VecDeque;
use thiserror::Error;
use tokio::sync::oneshot;

/// A leased worker endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerHandle {
    pub container_id: ContainerId,
    pub address: String,
}

/// Permission to fill a permit by provisioning through the orchestrator.
#[derive(Debug)]
pub struct ProvisionToken {
    _private: (),
}

impl ProvisionToken {
    fn new() -> Self {
        Self { _private: () }
    }
}

/// Outcome of a successful acquire.
#[derive(Debug)]
pub enum Acquired {
    /// A warm handle from the idle stack (or a direct handover).
    Warm(WorkerHandle),
    /// A free permit: the caller must ensure a container to fill it.
    Provision(ProvisionToken),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AcquireError {
    #[error("function is disabled (capacity 0)")]
    Disabled,

    #[error("no permit available within the deadline")]
    TimedOut,
}

struct Waiter {
    id: u64,
    tx: oneshot::Sender<Acquired>,
}

#[derive(Default)]
struct PoolInner {
    idle: Vec<WorkerHandle>,
    in_use: u32,
    waiters: VecDeque<Waiter>,
    next_waiter_id: u64,
}

/// One pool per function, created on first use and kept for the service
/// lifetime.
pub struct ContainerPool {
    capacity: u32,
    inner: Mutex<PoolInner>,
}

impl ContainerPool {
    /// `pooling = false` degrades every function to a single-slot queue;
    /// capacity 0 stays disabled either way.
    pub fn new(max_capacity: u32, pooling: bool) -> Self {
        let capacity = if pooling { max_capacity } else { max_capacity.min(1) };
        Self { capacity, inner: Mutex::new(PoolInner::default()) }
    }

    /// Lease a permit, waiting until `deadline` when the pool is saturated.
    pub async fn acquire(&self, deadline: tokio::time::Instant) -> Result<Acquired, AcquireError> {
        if self.capacity == 0 {
            return Err(AcquireError::Disabled);
        }

        let (waiter_id, mut rx) = {
            let mut inner = self.inner.lock();
            if let Some(handle) = inner.idle.pop() {
                inner.in_use += 1;
                return Ok(Acquired::Warm(handle));
            }
            if inner.in_use + (inner.idle.len() as u32) < self.capacity {
                inner.in_use += 1;
                return Ok(Acquired::Provision(ProvisionToken::new()));
            }
            let (tx, rx) = oneshot::channel();
            inner.next_waiter_id += 1;
            let id = inner.next_waiter_id;
            inner.waiters.push_back(Waiter { id, tx });
            (id, rx)
        };

        match tokio::time::timeout_at(deadline, &mut rx).await {
            Ok(Ok(acquired)) => Ok(acquired),
            Ok(Err(_)) => Err(AcquireError::TimedOut),
            Err(_elapsed) => {
                {
                    let mut inner = self.inner.lock();
                    if let Some(pos) = inner.waiters.iter().position(|w| w.id == waiter_id) {
                        inner.waiters.remove(pos);
                        return Err(AcquireError::TimedOut);
                    }
                }
                // A handover raced the deadline: the permit is already ours.
                match rx.try_recv() {
                    Ok(acquired) => Ok(acquired),
                    Err(_) => Err(AcquireError::TimedOut),
                }
            }
        }
    }

    /// Return a healthy handle. The oldest live waiter gets it directly,
    /// skipping the idle stack; otherwise it lands on top of the stack.
    pub fn release(&self, handle: WorkerHandle) {
        let mut inner = self.inner.lock();
        let mut handle = handle;
        while let Some(waiter) = inner.waiters.pop_front() {
            match waiter.tx.send(Acquired::Warm(handle)) {
                // Direct handover: the permit transfers with the handle.
                Ok(()) => return,
                Err(returned) => match returned {
                    // The waiter gave up (cancelled); try the next one.
                    Acquired::Warm(h) => handle = h,
                    Acquired::Provision(_) => return,
                },
            }
        }
        inner.in_use -= 1;
        inner.idle.push(handle);
    }

    /// Drop an unhealthy handle. The permit frees; a waiting acquirer gets a
    /// provision token instead of the dead worker.
    pub fn evict(&self) {
        let mut inner = self.inner.lock();
        while let Some(waiter) = inner.waiters.pop_front() {
            if waiter.tx.send(Acquired::Provision(ProvisionToken::new())).is_ok() {
                return;
            }
        }
        inner.in_use -= 1;
    }

    pub fn idle_len(&self) -> usize {
        self.inner.lock().idle.len()
    }

    pub fn in_use(&self) -> u32 {
        self.inner.lock().in_use
    }

    pub fn waiter_count(&self) -> usize {
        self.inner.lock().waiters.len()
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
