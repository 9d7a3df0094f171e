// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory runtime for tests: deterministic ids and addresses, scripted
//! failures, and a recorded call log for assertions.

use crate::{ContainerSpec, DriverError, RuntimeContainer, RuntimeDriver, RuntimeState};
use async_trait::async_trait;
use esb_core::ContainerId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// One recorded driver invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    EnsureImage(String),
    Create(String),
    Start(ContainerId),
    Pause(ContainerId),
    Resume(ContainerId),
    Remove { id: ContainerId, force: bool },
    Inspect(ContainerId),
    List,
}

/// Failure kind for scripted errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailKind {
    Transient,
    Conflict,
    NotFound,
}

impl FailKind {
    fn into_error(self, context: &str) -> DriverError {
        match self {
            FailKind::Transient => DriverError::Transient(format!("scripted: {}", context)),
            FailKind::Conflict => DriverError::Conflict(format!("scripted: {}", context)),
            FailKind::NotFound => DriverError::NotFound(format!("scripted: {}", context)),
        }
    }
}

struct FakeContainer {
    name: String,
    state: RuntimeState,
    labels: HashMap<String, String>,
    address: String,
}

#[derive(Default)]
struct FakeState {
    containers: HashMap<ContainerId, FakeContainer>,
    next_id: u64,
    calls: Vec<DriverCall>,
    fail_images: Vec<String>,
    fail_next_create: Option<FailKind>,
    fail_next_start: Option<FailKind>,
}

/// Deterministic in-memory [`RuntimeDriver`].
#[derive(Clone, Default)]
pub struct FakeDriver {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script every pull of `image` to fail.
    pub fn fail_image(&self, image: impl Into<String>) {
        self.inner.lock().fail_images.push(image.into());
    }

    /// Script the next create to fail once.
    pub fn fail_next_create(&self, kind: FailKind) {
        self.inner.lock().fail_next_create = Some(kind);
    }

    /// Script the next start to fail once.
    pub fn fail_next_start(&self, kind: FailKind) {
        self.inner.lock().fail_next_start = Some(kind);
    }

    /// Pre-seed a container, as if left over from a previous run.
    pub fn seed(
        &self,
        id: impl Into<String>,
        state: RuntimeState,
        labels: HashMap<String, String>,
        address: impl Into<String>,
    ) -> ContainerId {
        let id = ContainerId::new(id);
        let mut inner = self.inner.lock();
        inner.containers.insert(
            id.clone(),
            FakeContainer {
                name: format!("seeded-{}", id),
                state,
                labels,
                address: address.into(),
            },
        );
        id
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.inner.lock().calls.clone()
    }

    pub fn create_count(&self) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, DriverCall::Create(_)))
            .count()
    }

    pub fn contains(&self, id: &ContainerId) -> bool {
        self.inner.lock().containers.contains_key(id)
    }

    pub fn state_of(&self, id: &ContainerId) -> Option<RuntimeState> {
        self.inner.lock().containers.get(id).map(|c| c.state)
    }

    pub fn running_count(&self) -> usize {
        self.inner
            .lock()
            .containers
            .values()
            .filter(|c| c.state == RuntimeState::Running)
            .count()
    }
}

#[async_trait]
impl RuntimeDriver for FakeDriver {
    async fn ensure_image(&self, image: &str) -> Result<(), DriverError> {
        let mut inner = self.inner.lock();
        inner.calls.push(DriverCall::EnsureImage(image.to_string()));
        if inner.fail_images.iter().any(|i| i == image) {
            return Err(DriverError::Transient(format!("pull failed: {}", image)));
        }
        Ok(())
    }

    async fn create_container(&self, spec: ContainerSpec) -> Result<ContainerId, DriverError> {
        let mut inner = self.inner.lock();
        inner.calls.push(DriverCall::Create(spec.name.clone()));

        if let Some(kind) = inner.fail_next_create.take() {
            return Err(kind.into_error("create"));
        }
        if inner.containers.values().any(|c| c.name == spec.name) {
            return Err(DriverError::Conflict(format!("name in use: {}", spec.name)));
        }

        inner.next_id += 1;
        let n = inner.next_id;
        let id = ContainerId::new(format!("fake-{:04}", n));
        let address = match (&spec.network, spec.host_port) {
            (Some(_), _) => format!("10.0.0.{}:{}", n, spec.expose_port),
            (None, Some(host_port)) => format!("127.0.0.1:{}", host_port),
            (None, None) => format!("127.0.0.1:{}", 42000 + n),
        };

        inner.containers.insert(
            id.clone(),
            FakeContainer {
                name: spec.name,
                state: RuntimeState::Created,
                labels: spec.labels,
                address,
            },
        );
        Ok(id)
    }

    async fn start(&self, id: &ContainerId) -> Result<(), DriverError> {
        let mut inner = self.inner.lock();
        inner.calls.push(DriverCall::Start(id.clone()));
        if let Some(kind) = inner.fail_next_start.take() {
            return Err(kind.into_error("start"));
        }
        match inner.containers.get_mut(id) {
            Some(container) => {
                container.state = RuntimeState::Running;
                Ok(())
            }
            None => Err(DriverError::NotFound(id.to_string())),
        }
    }

    async fn pause(&self, id: &ContainerId) -> Result<(), DriverError> {
        let mut inner = self.inner.lock();
        inner.calls.push(DriverCall::Pause(id.clone()));
        match inner.containers.get_mut(id) {
            Some(container) if container.state == RuntimeState::Running => {
                container.state = RuntimeState::Paused;
                Ok(())
            }
            Some(container) => {
                Err(DriverError::Transient(format!("cannot pause {:?}", container.state)))
            }
            None => Err(DriverError::NotFound(id.to_string())),
        }
    }

    async fn resume(&self, id: &ContainerId) -> Result<(), DriverError> {
        let mut inner = self.inner.lock();
        inner.calls.push(DriverCall::Resume(id.clone()));
        match inner.containers.get_mut(id) {
            Some(container) if container.state == RuntimeState::Paused => {
                container.state = RuntimeState::Running;
                Ok(())
            }
            Some(container) => {
                Err(DriverError::Transient(format!("cannot resume {:?}", container.state)))
            }
            None => Err(DriverError::NotFound(id.to_string())),
        }
    }

    async fn remove(&self, id: &ContainerId, force: bool) -> Result<(), DriverError> {
        let mut inner = self.inner.lock();
        inner.calls.push(DriverCall::Remove { id: id.clone(), force });
        let running = match inner.containers.get(id) {
            Some(container) => container.state == RuntimeState::Running,
            None => return Err(DriverError::NotFound(id.to_string())),
        };
        if running && !force {
            return Err(DriverError::Conflict(format!("container is running: {}", id)));
        }
        inner.containers.remove(id);
        Ok(())
    }

    async fn inspect(&self, id: &ContainerId) -> Result<RuntimeContainer, DriverError> {
        let mut inner = self.inner.lock();
        inner.calls.push(DriverCall::Inspect(id.clone()));
        match inner.containers.get(id) {
            Some(container) => Ok(RuntimeContainer {
                id: id.clone(),
                state: container.state,
                labels: container.labels.clone(),
                address: Some(container.address.clone()),
            }),
            None => Err(DriverError::NotFound(id.to_string())),
        }
    }

    async fn list(
        &self,
        label_selector: &[(String, String)],
    ) -> Result<Vec<RuntimeContainer>, DriverError> {
        let mut inner = self.inner.lock();
        inner.calls.push(DriverCall::List);
        let mut matches: Vec<RuntimeContainer> = inner
            .containers
            .iter()
            .filter(|(_, c)| {
                label_selector
                    .iter()
                    .all(|(k, v)| c.labels.get(k).map(String::as_str) == Some(v.as_str()))
            })
            .map(|(id, c)| RuntimeContainer {
                id: id.clone(),
                state: c.state,
                labels: c.labels.clone(),
                address: Some(c.address.clone()),
            })
            .collect();
        matches.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(matches)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
