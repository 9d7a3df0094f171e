// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container records and the container state machine.
//!
//! A [`ContainerRecord`] is the orchestrator's view of one running container.
//! Records are crash-volatile: the runtime's label-selected container list is
//! the source of truth, and the store is rebuilt from it at startup.

use crate::id::{ContainerId, FunctionName};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

/// Label key marking a container as created by this control plane.
pub const LABEL_CREATED_BY: &str = "created_by";

/// Label value for [`LABEL_CREATED_BY`].
pub const LABEL_OWNER: &str = "esb";

/// Label key carrying the owning function's name.
pub const LABEL_FUNCTION: &str = "esb_function";

/// Build the label set persisted onto every managed container.
///
/// These labels are the recovery contract: Adopt & Sync identifies ownership
/// purely from them after an orchestrator restart.
pub fn container_labels(function: &FunctionName) -> HashMap<String, String> {
    let mut labels = HashMap::new();
    labels.insert(LABEL_CREATED_BY.to_string(), LABEL_OWNER.to_string());
    labels.insert(LABEL_FUNCTION.to_string(), function.to_string());
    labels
}

/// Whether a label set identifies a container managed by us.
pub fn is_managed(labels: &HashMap<String, String>) -> bool {
    labels.get(LABEL_CREATED_BY).map(String::as_str) == Some(LABEL_OWNER)
}

/// Extract the owning function name from a managed container's labels.
pub fn function_of_labels(labels: &HashMap<String, String>) -> Option<FunctionName> {
    if !is_managed(labels) {
        return None;
    }
    labels.get(LABEL_FUNCTION).map(FunctionName::new)
}

/// Lifecycle state of a container record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    /// Being created/started; holds a capacity slot but is not yet routable.
    Provisioning,
    /// Running and ready to serve an invocation.
    Ready,
    /// Held by an in-flight invocation.
    Busy,
    /// Running but unused; eligible for reaping once the idle timeout passes.
    Idle,
    /// Runtime-paused; resumed on the next ensure.
    Paused,
    /// Teardown in progress.
    Stopping,
    /// Removed; the record is about to be dropped.
    Gone,
}

impl ContainerState {
    /// States that count toward a function's `max_capacity`.
    pub fn is_live(self) -> bool {
        !matches!(self, ContainerState::Stopping | ContainerState::Gone)
    }

    /// States an ensure can hand out directly (warm path).
    pub fn is_available(self) -> bool {
        matches!(self, ContainerState::Ready | ContainerState::Idle)
    }

    /// Legal transitions of the record state machine.
    pub fn can_transition_to(self, next: ContainerState) -> bool {
        use ContainerState::*;
        match (self, next) {
            (Provisioning, Ready) | (Provisioning, Stopping) => true,
            (Ready, Busy) | (Ready, Idle) | (Ready, Paused) | (Ready, Stopping) => true,
            (Busy, Ready) | (Busy, Idle) | (Busy, Stopping) => true,
            (Idle, Ready) | (Idle, Busy) | (Idle, Paused) | (Idle, Stopping) => true,
            (Paused, Ready) | (Paused, Stopping) => true,
            (Stopping, Gone) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContainerState::Provisioning => "provisioning",
            ContainerState::Ready => "ready",
            ContainerState::Busy => "busy",
            ContainerState::Idle => "idle",
            ContainerState::Paused => "paused",
            ContainerState::Stopping => "stopping",
            ContainerState::Gone => "gone",
        };
        write!(f, "{}", s)
    }
}

/// One running container, as tracked by the orchestrator.
#[derive(Debug, Clone)]
pub struct ContainerRecord {
    /// Runtime-assigned identifier; unique and stable across the container's life.
    pub id: ContainerId,
    /// Owning function.
    pub function_name: FunctionName,
    /// IP+port reachable from the gateway.
    pub address: String,
    /// Current lifecycle state.
    pub state: ContainerState,
    /// Monotonic timestamp of the last ensure, heartbeat, or state touch.
    pub last_used_at: Instant,
    /// Monotonic creation timestamp.
    pub created_at: Instant,
    /// Labels persisted to the container itself (recovery contract).
    pub labels: HashMap<String, String>,
}

impl ContainerRecord {
    pub fn new(
        id: ContainerId,
        function_name: FunctionName,
        address: impl Into<String>,
        state: ContainerState,
        now: Instant,
    ) -> Self {
        let labels = container_labels(&function_name);
        Self {
            id,
            function_name,
            address: address.into(),
            state,
            last_used_at: now,
            created_at: now,
            labels,
        }
    }

    /// Refresh `last_used_at`. Monotone: a stale touch never moves time backwards.
    pub fn touch(&mut self, now: Instant) {
        if now > self.last_used_at {
            self.last_used_at = now;
        }
    }

    /// Whether this record has outlived `idle_timeout` without activity.
    pub fn idle_for_longer_than(&self, now: Instant, idle_timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_used_at) > idle_timeout
    }
}

#[cfg(test)]
#[path = "container_tests.rs"]
mod tests;
