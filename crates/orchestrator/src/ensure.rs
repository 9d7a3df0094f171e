// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The ensure operation: "a container for F is running and ready".
//!
//! Idempotent and coalesced per function. Warm and paused paths reuse what
//! the store already has; the cold path pulls, creates, starts, and probes a
//! fresh container, rolling back on a detached task so request cancellation
//! cannot leak a half-created container.

use crate::config::RUNTIME_INTERFACE_PORT;
use crate::error::EnsureError;
use crate::orchestrator::Orchestrator;
use crate::probe::Prober;
use esb_core::{
    container_labels, Clock, ContainerId, ContainerRecord, ContainerState, FunctionDescriptor,
    FunctionName, LABEL_CREATED_BY, LABEL_FUNCTION, LABEL_OWNER,
};
use esb_driver::{ContainerSpec, DriverError, RuntimeDriver, RuntimeState};
use esb_wire::EnsureResponse;

impl<D, P, C> Orchestrator<D, P, C>
where
    D: RuntimeDriver + Clone,
    P: Prober,
    C: Clock,
{
    /// Guarantee a ready container for `function` and return its address.
    ///
    /// Concurrent calls for the same function share one flight: the first
    /// caller does the work, followers land on the warm path afterwards, so
    /// the runtime sees at most one create.
    pub async fn ensure(&self, function: &FunctionName) -> Result<EnsureResponse, EnsureError> {
        let fun = self
            .functions
            .get(function.as_str())
            .ok_or_else(|| EnsureError::UnknownFunction(function.clone()))?;
        if fun.is_disabled() {
            return Err(EnsureError::AtCapacity(function.clone()));
        }

        let flight = self.flight_for(function);
        let _flight = flight.lock().await;
        let now = self.clock.now();

        // Warm path.
        if let Some(record) = self.store.take_available(function, now) {
            tracing::debug!(
                function = %function,
                container = %record.id.short(),
                "ensure warm hit"
            );
            return Ok(EnsureResponse { container_id: record.id, address: record.address });
        }

        // Paused path.
        if let Some(record) = self.store.find_paused(function) {
            match self.driver.resume(&record.id).await {
                Ok(()) => {
                    let now = self.clock.now();
                    let _ = self.store.set_state(&record.id, ContainerState::Ready);
                    self.store.touch(&record.id, now);
                    tracing::info!(
                        function = %function,
                        container = %record.id.short(),
                        "resumed paused container"
                    );
                    return Ok(EnsureResponse { container_id: record.id, address: record.address });
                }
                Err(DriverError::NotFound(_)) => {
                    // The runtime lost it; drop the record and cold start.
                    self.store.purge(&record.id);
                    self.ports.release_addr(&record.address);
                }
                Err(source) => {
                    return Err(EnsureError::StartFailed { function: function.clone(), source })
                }
            }
        }

        // Defensive: the gateway pool already bounds concurrency per function.
        if self.store.live_count(function) >= fun.max_capacity as usize {
            return Err(EnsureError::AtCapacity(function.clone()));
        }

        self.cold_start(&fun).await
    }

    async fn cold_start(&self, fun: &FunctionDescriptor) -> Result<EnsureResponse, EnsureError> {
        let function = fun.name.clone();

        self.driver
            .ensure_image(&fun.image_ref)
            .await
            .map_err(|source| EnsureError::ImagePull { function: function.clone(), source })?;

        let host_port = match self.config.network {
            None => Some(self.ports.allocate().ok_or(EnsureError::PortsExhausted)?),
            Some(_) => None,
        };

        let short = uuid::Uuid::new_v4().simple().to_string();
        let container_name = format!("esb-{}-{}", function, &short[..8]);

        let mut env: Vec<(String, String)> =
            fun.env.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        env.push(("_HANDLER".to_string(), fun.handler.clone()));
        env.push(("AWS_LAMBDA_FUNCTION_NAME".to_string(), function.to_string()));

        let spec = ContainerSpec {
            name: container_name,
            image: fun.image_ref.clone(),
            env,
            labels: container_labels(&function),
            network: self.config.network.clone(),
            expose_port: RUNTIME_INTERFACE_PORT,
            host_port,
        };

        let id = match self.driver.create_container(spec).await {
            Ok(id) => id,
            Err(DriverError::Conflict(message)) => {
                if let Some(port) = host_port {
                    self.ports.release(port);
                }
                tracing::warn!(function = %function, reason = %message, "create conflict, trying adoption");
                return match self.adopt_conflicting(&function).await {
                    Some(resp) => Ok(resp),
                    None => Err(EnsureError::StartFailed {
                        function,
                        source: DriverError::Conflict(message),
                    }),
                };
            }
            Err(source) => {
                if let Some(port) = host_port {
                    self.ports.release(port);
                }
                return Err(EnsureError::StartFailed { function, source });
            }
        };

        // The record enters the store before start so capacity accounting
        // holds while the driver works outside any lock.
        let now = self.clock.now();
        let nat_address = host_port
            .map(|port| format!("{}:{}", self.config.published_host_ip, port))
            .unwrap_or_default();
        self.store.insert(ContainerRecord::new(
            id.clone(),
            function.clone(),
            nat_address.clone(),
            ContainerState::Provisioning,
            now,
        ));

        if let Err(source) = self.driver.start(&id).await {
            self.rollback(id, host_port).await;
            return Err(EnsureError::StartFailed { function, source });
        }

        // Network mode learns the address from inspect after start.
        let address = if nat_address.is_empty() {
            match self.driver.inspect(&id).await {
                Ok(info) => match info.address {
                    Some(addr) => {
                        let _ = self.store.set_address(&id, addr.clone());
                        addr
                    }
                    None => {
                        self.rollback(id, host_port).await;
                        return Err(EnsureError::StartFailed {
                            function,
                            source: DriverError::Transient("runtime reported no address".into()),
                        });
                    }
                },
                Err(source) => {
                    self.rollback(id, host_port).await;
                    return Err(EnsureError::StartFailed { function, source });
                }
            }
        } else {
            nat_address
        };

        if self.prober.wait_ready(&address, self.config.cold_start_timeout).await.is_err() {
            self.rollback(id, host_port).await;
            return Err(EnsureError::ReadinessTimeout(function, self.config.cold_start_timeout));
        }

        let now = self.clock.now();
        let _ = self.store.set_state(&id, ContainerState::Ready);
        self.store.touch(&id, now);
        tracing::info!(
            function = %function,
            container = %id.short(),
            address = %address,
            "cold start complete"
        );
        Ok(EnsureResponse { container_id: id, address })
    }

    /// Name collision during create: adopt a running container of ours for
    /// the same function, if the runtime has one we do not track yet.
    async fn adopt_conflicting(&self, function: &FunctionName) -> Option<EnsureResponse> {
        let selector = vec![
            (LABEL_CREATED_BY.to_string(), LABEL_OWNER.to_string()),
            (LABEL_FUNCTION.to_string(), function.to_string()),
        ];
        let listed = self.driver.list(&selector).await.ok()?;

        for candidate in listed {
            if candidate.state != RuntimeState::Running {
                continue;
            }
            if self.store.get(&candidate.id).is_some() {
                continue;
            }
            let address = match candidate.address {
                Some(addr) => addr,
                None => self.driver.inspect(&candidate.id).await.ok()?.address?,
            };

            let now = self.clock.now();
            self.ports.reserve_addr(&address);
            self.store.insert(ContainerRecord::new(
                candidate.id.clone(),
                function.clone(),
                address.clone(),
                ContainerState::Ready,
                now,
            ));
            tracing::info!(
                function = %function,
                container = %candidate.id.short(),
                "adopted existing container after create conflict"
            );
            return Some(EnsureResponse { container_id: candidate.id, address });
        }
        None
    }

    /// Best-effort cleanup on a detached task. Awaited on the happy path for
    /// determinism, but the spawned work survives request cancellation.
    async fn rollback(&self, id: ContainerId, host_port: Option<u16>) {
        let driver = self.driver.clone();
        let store = self.store.clone();
        let ports = self.ports.clone();
        let handle = tokio::spawn(async move {
            match driver.remove(&id, true).await {
                Ok(()) | Err(DriverError::NotFound(_)) => {}
                Err(e) => {
                    tracing::warn!(container = %id.short(), error = %e, "rollback remove failed")
                }
            }
            store.purge(&id);
            if let Some(port) = host_port {
                ports.release(port);
            }
        });
        let _ = handle.await;
    }
}

#[cfg(test)]
#[path = "ensure_tests.rs"]
mod tests;
