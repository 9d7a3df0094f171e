// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-request orchestration: breaker check, pool lease, warm-path cache,
//! ensure on miss, proxy, settle.
//!
//! Every successful acquire settles exactly once — release on success, evict
//! on failure — enforced by drop guards that fire on every exit path,
//! including cancellation and panic. The breaker probe slot is guarded the
//! same way so a cancelled probe cannot wedge the circuit half-open.

use crate::breaker::{Admission, BreakerConfig, CircuitBreaker};
use crate::cache::ContainerHostCache;
use crate::client::{ControlPlane, ControlPlaneError};
use crate::config::Config;
use crate::error::GatewayError;
use crate::pool::{Acquired, AcquireError, ContainerPool, WorkerHandle};
use crate::proxy::{InvokeFailure, InvokeOutcome, InvokeRequest, WorkerInvoker};
use esb_core::{Clock, ContainerId, FunctionDescriptor, FunctionName};
use esb_wire::ErrorCode;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// The dispatcher's slice of the gateway configuration.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub pool_acquire_timeout: Duration,
    pub invoke_timeout: Duration,
    pub cache_ttl: Duration,
    pub breaker: BreakerConfig,
    pub pooling_enabled: bool,
}

impl From<&Config> for DispatchSettings {
    fn from(config: &Config) -> Self {
        Self {
            pool_acquire_timeout: config.pool_acquire_timeout,
            invoke_timeout: config.invoke_timeout,
            cache_ttl: config.cache_ttl,
            breaker: BreakerConfig {
                threshold: config.breaker_threshold,
                recovery_timeout: config.breaker_recovery,
            },
            pooling_enabled: config.pooling_enabled,
        }
    }
}

/// Containers currently checked out by in-flight invocations.
#[derive(Clone, Default)]
struct InFlightRegistry {
    counts: Arc<Mutex<HashMap<ContainerId, usize>>>,
}

impl InFlightRegistry {
    fn track(&self, id: ContainerId) -> InFlightGuard {
        *self.counts.lock().entry(id.clone()).or_insert(0) += 1;
        InFlightGuard { registry: self.clone(), id }
    }

    fn ids(&self) -> Vec<ContainerId> {
        self.counts.lock().keys().cloned().collect()
    }
}

struct InFlightGuard {
    registry: InFlightRegistry,
    id: ContainerId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut counts = self.registry.counts.lock();
        let emptied = match counts.get_mut(&self.id) {
            Some(count) => {
                *count -= 1;
                *count == 0
            }
            None => false,
        };
        if emptied {
            counts.remove(&self.id);
        }
    }
}

/// Settles a pool lease exactly once; drop without settling evicts.
struct PoolGuard {
    pool: Arc<ContainerPool>,
    settled: bool,
}

impl PoolGuard {
    fn new(pool: Arc<ContainerPool>) -> Self {
        Self { pool, settled: false }
    }

    fn release(mut self, handle: WorkerHandle) {
        self.pool.release(handle);
        self.settled = true;
    }

    fn evict(mut self) {
        self.pool.evict();
        self.settled = true;
    }
}

impl Drop for PoolGuard {
    fn drop(&mut self) {
        if !self.settled {
            self.pool.evict();
        }
    }
}

/// Settles a breaker admission exactly once; drop without settling aborts.
struct BreakerGuard<C: Clock> {
    breaker: Arc<CircuitBreaker<C>>,
    admission: Admission,
    settled: bool,
}

impl<C: Clock> BreakerGuard<C> {
    fn new(breaker: Arc<CircuitBreaker<C>>, admission: Admission) -> Self {
        Self { breaker, admission, settled: false }
    }

    fn success(mut self) {
        self.breaker.record_success(self.admission);
        self.settled = true;
    }

    fn failure(mut self) {
        self.breaker.record_failure(self.admission);
        self.settled = true;
    }

    fn abort(mut self) {
        self.breaker.abort(self.admission);
        self.settled = true;
    }
}

impl<C: Clock> Drop for BreakerGuard<C> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.abort(self.admission);
        }
    }
}

/// Request-path state shared by every handler task.
pub struct Dispatcher<CP, I, C: Clock> {
    control_plane: Arc<CP>,
    invoker: I,
    clock: C,
    settings: DispatchSettings,
    cache: ContainerHostCache<C>,
    pools: Mutex<HashMap<FunctionName, Arc<ContainerPool>>>,
    breakers: Mutex<HashMap<FunctionName, Arc<CircuitBreaker<C>>>>,
    in_flight: InFlightRegistry,
}

impl<CP, I, C> Dispatcher<CP, I, C>
where
    CP: ControlPlane,
    I: WorkerInvoker,
    C: Clock,
{
    pub fn new(control_plane: CP, invoker: I, clock: C, settings: DispatchSettings) -> Self {
        let cache = ContainerHostCache::new(settings.cache_ttl, clock.clone());
        Self {
            control_plane: Arc::new(control_plane),
            invoker,
            clock,
            settings,
            cache,
            pools: Mutex::new(HashMap::new()),
            breakers: Mutex::new(HashMap::new()),
            in_flight: InFlightRegistry::default(),
        }
    }

    pub fn cache(&self) -> &ContainerHostCache<C> {
        &self.cache
    }

    /// Ids to report in the next heartbeat: checked out plus cached.
    pub fn active_container_ids(&self) -> Vec<ContainerId> {
        let mut ids = self.in_flight.ids();
        for id in self.cache.cached_ids() {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    pub async fn send_heartbeat(&self) {
        let ids = self.active_container_ids();
        if ids.is_empty() {
            return;
        }
        let count = ids.len();
        if let Err(e) = self.control_plane.heartbeat(ids).await {
            // Tolerated: the orchestrator sees the container go idle instead.
            tracing::debug!(error = %e, "heartbeat not delivered");
        } else {
            tracing::trace!(containers = count, "heartbeat sent");
        }
    }

    fn pool_for(&self, fun: &FunctionDescriptor) -> Arc<ContainerPool> {
        let mut pools = self.pools.lock();
        pools
            .entry(fun.name.clone())
            .or_insert_with(|| {
                Arc::new(ContainerPool::new(fun.max_capacity, self.settings.pooling_enabled))
            })
            .clone()
    }

    fn breaker_for(&self, function: &FunctionName) -> Arc<CircuitBreaker<C>> {
        let mut breakers = self.breakers.lock();
        breakers
            .entry(function.clone())
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::new(self.settings.breaker, self.clock.clone()))
            })
            .clone()
    }

    /// Run one invocation end to end.
    pub async fn dispatch(
        &self,
        fun: &FunctionDescriptor,
        request: InvokeRequest,
    ) -> Result<InvokeOutcome, GatewayError> {
        let function = &fun.name;
        if fun.is_disabled() {
            return Err(GatewayError::Disabled(function.clone()));
        }

        // 1. Circuit breaker gate.
        let breaker = self.breaker_for(function);
        let Some(admission) = breaker.admit() else {
            return Err(GatewayError::BreakerOpen(function.clone()));
        };
        let breaker_guard = BreakerGuard::new(breaker, admission);

        // 2. Pool lease with deadline.
        let pool = self.pool_for(fun);
        let deadline = tokio::time::Instant::now() + self.settings.pool_acquire_timeout;
        let acquired = match pool.acquire(deadline).await {
            Ok(acquired) => acquired,
            Err(AcquireError::Disabled) => {
                breaker_guard.abort();
                return Err(GatewayError::Disabled(function.clone()));
            }
            Err(AcquireError::TimedOut) => {
                breaker_guard.abort();
                return Err(GatewayError::AcquireTimedOut(function.clone()));
            }
        };
        let pool_guard = PoolGuard::new(pool);

        // 3. Warm handle, cached address, or ensure RPC.
        let handle = match acquired {
            Acquired::Warm(handle) => handle,
            Acquired::Provision(_token) => match self.fill_permit(function).await {
                Ok(handle) => handle,
                Err(err) => {
                    pool_guard.evict();
                    breaker_guard.abort();
                    return Err(err);
                }
            },
        };
        let _in_flight = self.in_flight.track(handle.container_id.clone());

        // 4. Proxy with the per-function ceiling.
        let timeout = fun.invoke_timeout(self.settings.invoke_timeout);
        let result = self.invoker.invoke(&handle.address, &request, timeout).await;

        // 5./6. Settle.
        match result {
            Ok(outcome) if !outcome.function_error && outcome.status < 500 => {
                pool_guard.release(handle);
                breaker_guard.success();
                Ok(outcome)
            }
            Ok(outcome) => {
                // The worker answered but is failing; drop it locally and let
                // the breaker count it. The container itself may be healthy,
                // so no orchestrator evict.
                tracing::warn!(
                    function = %function,
                    container = %handle.container_id.short(),
                    status = outcome.status,
                    function_error = outcome.function_error,
                    "worker reported failure"
                );
                self.cache.invalidate(function);
                pool_guard.evict();
                breaker_guard.failure();
                Err(GatewayError::FunctionError(function.clone()))
            }
            Err(failure) => {
                // The worker never answered: assume the container is broken
                // and ask the orchestrator to remove it.
                tracing::warn!(
                    function = %function,
                    container = %handle.container_id.short(),
                    failure = ?failure,
                    "worker unreachable"
                );
                self.cache.invalidate(function);
                pool_guard.evict();
                breaker_guard.failure();
                if let Err(e) = self.control_plane.evict(&handle.container_id).await {
                    tracing::debug!(error = %e, "evict RPC not delivered");
                }
                match failure {
                    InvokeFailure::Timeout => Err(GatewayError::UpstreamTimeout(function.clone())),
                    InvokeFailure::Network(message) => {
                        Err(GatewayError::UpstreamNetwork { function: function.clone(), message })
                    }
                }
            }
        }
    }

    /// Fill a provision token: cached address first, ensure RPC on miss.
    async fn fill_permit(&self, function: &FunctionName) -> Result<WorkerHandle, GatewayError> {
        if let Some(cached) = self.cache.get(function) {
            return Ok(WorkerHandle { container_id: cached.container_id, address: cached.address });
        }

        match self.control_plane.ensure(function).await {
            Ok(resp) => {
                self.cache.put(function.clone(), resp.container_id.clone(), resp.address.clone());
                Ok(WorkerHandle { container_id: resp.container_id, address: resp.address })
            }
            Err(ControlPlaneError::Rpc { code: ErrorCode::AtCapacity, .. }) => {
                Err(GatewayError::AtCapacity(function.clone()))
            }
            Err(ControlPlaneError::Rpc { code: ErrorCode::Gone, message }) => {
                self.cache.invalidate(function);
                Err(GatewayError::Provisioning {
                    function: function.clone(),
                    code: ErrorCode::Gone,
                    message,
                })
            }
            Err(ControlPlaneError::Rpc { code, message }) => {
                Err(GatewayError::Provisioning { function: function.clone(), code, message })
            }
            Err(ControlPlaneError::Unavailable(message)) => {
                Err(GatewayError::ControlPlaneUnavailable(message))
            }
        }
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
