// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host-port allocation for NAT mode.
//!
//! Containers publish their runtime-interface port onto a host port taken
//! from a configured range. Safe under concurrent ensure; ports return to
//! the pool when the container is removed.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

struct PortState {
    low: u16,
    high: u16,
    next: u16,
    in_use: HashSet<u16>,
}

#[derive(Clone)]
pub struct PortAllocator {
    inner: Arc<Mutex<PortState>>,
}

impl PortAllocator {
    /// Inclusive range of allocatable host ports.
    pub fn new(low: u16, high: u16) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PortState { low, high, next: low, in_use: HashSet::new() })),
        }
    }

    /// Take a free port, scanning round-robin from the last allocation.
    pub fn allocate(&self) -> Option<u16> {
        let mut state = self.inner.lock();
        let span = (state.high - state.low) as u32 + 1;
        let start = state.next;
        for offset in 0..span {
            let candidate = state.low + ((start - state.low) as u32 + offset).rem_euclid(span) as u16;
            if state.in_use.insert(candidate) {
                state.next = if candidate == state.high { state.low } else { candidate + 1 };
                return Some(candidate);
            }
        }
        None
    }

    /// Return a port to the pool. Unknown ports are ignored.
    pub fn release(&self, port: u16) {
        self.inner.lock().in_use.remove(&port);
    }

    /// Mark a port as in use (Adopt & Sync reclaiming a surviving container).
    /// Ports outside the range are ignored.
    pub fn reserve(&self, port: u16) {
        let mut state = self.inner.lock();
        if port >= state.low && port <= state.high {
            state.in_use.insert(port);
        }
    }

    /// Release the host port named in a `host:port` address, if it is ours.
    pub fn release_addr(&self, address: &str) {
        if let Some(port) = port_of(address) {
            self.release(port);
        }
    }

    /// Reserve the host port named in a `host:port` address, if it is ours.
    pub fn reserve_addr(&self, address: &str) {
        if let Some(port) = port_of(address) {
            self.reserve(port);
        }
    }

    pub fn in_use_count(&self) -> usize {
        self.inner.lock().in_use.len()
    }
}

fn port_of(address: &str) -> Option<u16> {
    address.rsplit_once(':')?.1.parse().ok()
}

#[cfg(test)]
#[path = "ports_tests.rs"]
mod tests;
