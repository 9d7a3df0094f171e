// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fakes for gateway tests: an in-process control plane and a
//! scripted worker invoker.

use crate::client::{ControlPlane, ControlPlaneError};
use crate::proxy::{InvokeFailure, InvokeOutcome, InvokeRequest, WorkerInvoker};
use esb_core::{ContainerId, FunctionName};
use esb_wire::EnsureResponse;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
pub struct CpState {
    pub ensure_calls: u32,
    pub next_id: u32,
    pub script: VecDeque<Result<EnsureResponse, ControlPlaneError>>,
    pub evicted: Vec<ContainerId>,
    pub heartbeats: Vec<Vec<ContainerId>>,
}

/// Control plane that provisions deterministic ids (`c1`, `c2`, ...) unless
/// scripted otherwise.
#[derive(Clone, Default)]
pub struct FakeControlPlane {
    state: Arc<Mutex<CpState>>,
}

impl FakeControlPlane {
    pub fn script_ensure(&self, result: Result<EnsureResponse, ControlPlaneError>) {
        self.state.lock().script.push_back(result);
    }

    pub fn ensure_calls(&self) -> u32 {
        self.state.lock().ensure_calls
    }

    pub fn evicted(&self) -> Vec<ContainerId> {
        self.state.lock().evicted.clone()
    }

    pub fn heartbeats(&self) -> Vec<Vec<ContainerId>> {
        self.state.lock().heartbeats.clone()
    }
}

#[async_trait::async_trait]
impl ControlPlane for FakeControlPlane {
    async fn ensure(&self, _function: &FunctionName) -> Result<EnsureResponse, ControlPlaneError> {
        let mut state = self.state.lock();
        state.ensure_calls += 1;
        if let Some(scripted) = state.script.pop_front() {
            return scripted;
        }
        state.next_id += 1;
        let n = state.next_id;
        Ok(EnsureResponse {
            container_id: ContainerId::new(format!("c{}", n)),
            address: format!("10.1.0.{}:8080", n),
        })
    }

    async fn heartbeat(&self, ids: Vec<ContainerId>) -> Result<(), ControlPlaneError> {
        self.state.lock().heartbeats.push(ids);
        Ok(())
    }

    async fn evict(&self, id: &ContainerId) -> Result<(), ControlPlaneError> {
        self.state.lock().evicted.push(id.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InvokerState {
    pub script: VecDeque<Result<InvokeOutcome, InvokeFailure>>,
    pub calls: Vec<String>,
}

/// Worker invoker returning scripted outcomes (default: instant 200 "ok").
#[derive(Clone)]
pub struct FakeInvoker {
    state: Arc<Mutex<InvokerState>>,
    delay: Duration,
}

impl FakeInvoker {
    pub fn instant() -> Self {
        Self { state: Arc::default(), delay: Duration::ZERO }
    }

    pub fn slow(delay: Duration) -> Self {
        Self { state: Arc::default(), delay }
    }

    pub fn script(&self, result: Result<InvokeOutcome, InvokeFailure>) {
        self.state.lock().script.push_back(result);
    }

    pub fn script_status(&self, status: u16, times: usize) {
        for _ in 0..times {
            self.script(Ok(outcome(status)));
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }
}

pub fn outcome(status: u16) -> InvokeOutcome {
    InvokeOutcome { status, headers: Vec::new(), body: b"ok".to_vec(), function_error: false }
}

#[async_trait::async_trait]
impl WorkerInvoker for FakeInvoker {
    async fn invoke(
        &self,
        address: &str,
        _request: &InvokeRequest,
        _timeout: Duration,
    ) -> Result<InvokeOutcome, InvokeFailure> {
        let next = {
            let mut state = self.state.lock();
            state.calls.push(address.to_string());
            state.script.pop_front()
        };
        if self.delay > Duration::ZERO {
            tokio::time::sleep(self.delay).await;
        }
        next.unwrap_or_else(|| Ok(outcome(200)))
    }
}
