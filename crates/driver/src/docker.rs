// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Docker Engine backend for [`RuntimeDriver`](crate::RuntimeDriver).
//!
//! Connects over the local socket by default, or an explicit endpoint
//! (`unix://` or `tcp://`). Addresses are harvested from published port
//! bindings (NAT mode) or the container's network IP when a dedicated
//! network is attached.

use crate::{ContainerSpec, DriverError, RuntimeContainer, RuntimeDriver, RuntimeState};
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, ListContainersOptions,
    RemoveContainerOptions, StartContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::{ContainerStateStatusEnum, EndpointSettings, HostConfig, PortBinding, PortMap};
use bollard::Docker;
use esb_core::ContainerId;
use futures_util::TryStreamExt;
use std::collections::HashMap;

/// Connection timeout for engine API calls, seconds.
const CONNECT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone)]
pub struct DockerDriver {
    docker: Docker,
    /// Host address the gateway uses to reach published ports.
    published_host_ip: String,
}

impl DockerDriver {
    /// Connect to the engine. `endpoint` overrides the platform default
    /// socket; `published_host_ip` is the address published ports are
    /// reachable on from the gateway (usually `127.0.0.1`).
    pub fn connect(
        endpoint: Option<&str>,
        published_host_ip: impl Into<String>,
    ) -> Result<Self, DriverError> {
        let docker = match endpoint {
            Some(ep) if ep.starts_with("unix://") => Docker::connect_with_unix(
                ep,
                CONNECT_TIMEOUT_SECS,
                bollard::API_DEFAULT_VERSION,
            ),
            Some(ep) => {
                Docker::connect_with_http(ep, CONNECT_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
            }
            None => Docker::connect_with_local_defaults(),
        }
        .map_err(|e| DriverError::Transient(format!("engine connect failed: {}", e)))?;

        Ok(Self { docker, published_host_ip: published_host_ip.into() })
    }
}

fn map_err(e: bollard::errors::Error) -> DriverError {
    match e {
        bollard::errors::Error::DockerResponseServerError { status_code: 404, message } => {
            DriverError::NotFound(message)
        }
        bollard::errors::Error::DockerResponseServerError { status_code: 409, message } => {
            DriverError::Conflict(message)
        }
        other => DriverError::Transient(other.to_string()),
    }
}

/// Reduce the engine's inspect status to the states the core branches on.
fn map_status(status: Option<ContainerStateStatusEnum>) -> RuntimeState {
    match status {
        Some(ContainerStateStatusEnum::CREATED) => RuntimeState::Created,
        Some(ContainerStateStatusEnum::RUNNING) => RuntimeState::Running,
        Some(ContainerStateStatusEnum::PAUSED) => RuntimeState::Paused,
        Some(ContainerStateStatusEnum::EXITED) | Some(ContainerStateStatusEnum::DEAD) => {
            RuntimeState::Exited
        }
        _ => RuntimeState::Unknown,
    }
}

/// Reduce a `list` summary's state string the same way.
fn map_summary_state(state: Option<&str>) -> RuntimeState {
    match state {
        Some("created") => RuntimeState::Created,
        Some("running") => RuntimeState::Running,
        Some("paused") => RuntimeState::Paused,
        Some("exited") | Some("dead") => RuntimeState::Exited,
        _ => RuntimeState::Unknown,
    }
}

/// Parse the container-side port out of a PortMap key like `8080/tcp`.
fn exposed_port_of(key: &str) -> Option<u16> {
    key.split('/').next().and_then(|p| p.parse().ok())
}

/// Pick an address out of inspect output: a published binding wins, the
/// attached network's IP plus the exposed port is the fallback.
fn harvest_address(
    published_host_ip: &str,
    ports: Option<&PortMap>,
    networks: Option<&HashMap<String, EndpointSettings>>,
) -> Option<String> {
    let mut container_port = None;
    if let Some(ports) = ports {
        for (key, bindings) in ports {
            container_port = container_port.or_else(|| exposed_port_of(key));
            if let Some(binding) = bindings.iter().flatten().next() {
                if let Some(host_port) = binding.host_port.as_deref() {
                    return Some(format!("{}:{}", published_host_ip, host_port));
                }
            }
        }
    }

    let port = container_port?;
    let networks = networks?;
    networks
        .values()
        .filter_map(|ep| ep.ip_address.as_deref())
        .find(|ip| !ip.is_empty())
        .map(|ip| format!("{}:{}", ip, port))
}

/// Build the engine's `label` filter values from a selector.
fn label_filter(selector: &[(String, String)]) -> Vec<String> {
    selector.iter().map(|(k, v)| format!("{}={}", k, v)).collect()
}

#[async_trait]
impl RuntimeDriver for DockerDriver {
    async fn ensure_image(&self, image: &str) -> Result<(), DriverError> {
        if self.docker.inspect_image(image).await.is_ok() {
            return Ok(());
        }

        tracing::info!(image, "pulling image");
        let options = CreateImageOptions { from_image: image.to_string(), ..Default::default() };
        let mut stream = self.docker.create_image(Some(options), None, None);
        while stream.try_next().await.map_err(map_err)?.is_some() {}
        Ok(())
    }

    async fn create_container(&self, spec: ContainerSpec) -> Result<ContainerId, DriverError> {
        let options = CreateContainerOptions { name: spec.name.clone(), ..Default::default() };

        let port_key = format!("{}/tcp", spec.expose_port);
        let mut exposed_ports = HashMap::new();
        exposed_ports.insert(port_key.clone(), HashMap::new());

        let port_bindings = spec.host_port.map(|host_port| {
            let mut bindings: PortMap = HashMap::new();
            bindings.insert(
                port_key.clone(),
                Some(vec![PortBinding {
                    host_ip: Some("0.0.0.0".to_string()),
                    host_port: Some(host_port.to_string()),
                }]),
            );
            bindings
        });

        let host_config = HostConfig {
            network_mode: spec.network.clone(),
            port_bindings,
            ..Default::default()
        };

        let env: Vec<String> = spec.env.iter().map(|(k, v)| format!("{}={}", k, v)).collect();

        let config = Config {
            image: Some(spec.image),
            env: Some(env),
            labels: Some(spec.labels),
            exposed_ports: Some(exposed_ports),
            host_config: Some(host_config),
            ..Default::default()
        };

        let created =
            self.docker.create_container(Some(options), config).await.map_err(map_err)?;
        Ok(ContainerId::new(created.id))
    }

    async fn start(&self, id: &ContainerId) -> Result<(), DriverError> {
        self.docker
            .start_container(id.as_str(), None::<StartContainerOptions<String>>)
            .await
            .map_err(map_err)
    }

    async fn pause(&self, id: &ContainerId) -> Result<(), DriverError> {
        self.docker.pause_container(id.as_str()).await.map_err(map_err)
    }

    async fn resume(&self, id: &ContainerId) -> Result<(), DriverError> {
        self.docker.unpause_container(id.as_str()).await.map_err(map_err)
    }

    async fn remove(&self, id: &ContainerId, force: bool) -> Result<(), DriverError> {
        let options = RemoveContainerOptions { force, ..Default::default() };
        self.docker.remove_container(id.as_str(), Some(options)).await.map_err(map_err)
    }

    async fn inspect(&self, id: &ContainerId) -> Result<RuntimeContainer, DriverError> {
        let resp = self
            .docker
            .inspect_container(id.as_str(), None::<InspectContainerOptions>)
            .await
            .map_err(map_err)?;

        let state = map_status(resp.state.as_ref().and_then(|s| s.status));
        let labels = resp.config.as_ref().and_then(|c| c.labels.clone()).unwrap_or_default();
        let address = resp.network_settings.as_ref().and_then(|net| {
            harvest_address(&self.published_host_ip, net.ports.as_ref(), net.networks.as_ref())
        });

        Ok(RuntimeContainer {
            id: ContainerId::new(resp.id.unwrap_or_else(|| id.to_string())),
            state,
            labels,
            address,
        })
    }

    async fn list(
        &self,
        label_selector: &[(String, String)],
    ) -> Result<Vec<RuntimeContainer>, DriverError> {
        let mut filters = HashMap::new();
        filters.insert("label".to_string(), label_filter(label_selector));

        let options = ListContainersOptions { all: true, filters, ..Default::default() };
        let summaries = self.docker.list_containers(Some(options)).await.map_err(map_err)?;

        let containers = summaries
            .into_iter()
            .filter_map(|summary| {
                let id = summary.id?;
                Some(RuntimeContainer {
                    id: ContainerId::new(id),
                    state: map_summary_state(summary.state.as_deref()),
                    labels: summary.labels.unwrap_or_default(),
                    // Addresses are harvested with inspect; list stays cheap.
                    address: None,
                })
            })
            .collect();

        Ok(containers)
    }
}

#[cfg(test)]
#[path = "docker_tests.rs"]
mod tests;
