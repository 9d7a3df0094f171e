// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! esb-driver: narrow contract over the container runtime.
//!
//! The orchestrator drives containers exclusively through [`RuntimeDriver`].
//! The production backend talks to the Docker Engine API ([`DockerDriver`]);
//! containerd deployments are reached through the engine's containerd-backed
//! socket. Tests use the in-memory [`fake::FakeDriver`].

mod docker;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use docker::DockerDriver;

use async_trait::async_trait;
use esb_core::ContainerId;
use std::collections::HashMap;
use thiserror::Error;

/// Errors surfaced by driver operations.
///
/// `NotFound` (the container vanished) and `Conflict` (duplicate create) are
/// the two modes callers branch on; everything else is opaque and treated as
/// transient.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("runtime error: {0}")]
    Transient(String),
}

/// Runtime-reported container state, reduced to what the core branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    Created,
    Running,
    Paused,
    Exited,
    Unknown,
}

/// Creation request for one container.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    /// Runtime-visible container name (unique per live container).
    pub name: String,
    pub image: String,
    pub env: Vec<(String, String)>,
    /// Ownership labels persisted onto the container.
    pub labels: HashMap<String, String>,
    /// Network to attach; when set the address is the container IP.
    pub network: Option<String>,
    /// Runtime-interface port inside the container.
    pub expose_port: u16,
    /// Published host port for NAT mode; `None` when a network is attached.
    pub host_port: Option<u16>,
}

/// One container as reported by the runtime (`inspect`/`list`).
#[derive(Debug, Clone)]
pub struct RuntimeContainer {
    pub id: ContainerId,
    pub state: RuntimeState,
    pub labels: HashMap<String, String>,
    /// IP+port reachable from the gateway, when the runtime can tell.
    pub address: Option<String>,
}

/// Thin abstraction over the container runtime.
#[async_trait]
pub trait RuntimeDriver: Send + Sync + 'static {
    /// Pull the image if missing. Idempotent.
    async fn ensure_image(&self, image: &str) -> Result<(), DriverError>;

    /// Create a container; does not start it.
    async fn create_container(&self, spec: ContainerSpec) -> Result<ContainerId, DriverError>;

    async fn start(&self, id: &ContainerId) -> Result<(), DriverError>;

    async fn pause(&self, id: &ContainerId) -> Result<(), DriverError>;

    async fn resume(&self, id: &ContainerId) -> Result<(), DriverError>;

    async fn remove(&self, id: &ContainerId, force: bool) -> Result<(), DriverError>;

    async fn inspect(&self, id: &ContainerId) -> Result<RuntimeContainer, DriverError>;

    /// List containers matching every `key=value` pair in the selector.
    async fn list(
        &self,
        label_selector: &[(String, String)],
    ) -> Result<Vec<RuntimeContainer>, DriverError>;
}
