// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! esb-gateway: the stateless, request-facing half of the control plane.
//!
//! Authenticates requests, matches them to a declared function, leases a
//! worker from the per-function pool (provisioning one through the
//! orchestrator when none is warm), proxies the invocation, and settles the
//! lease on every exit path. Holds no authoritative container state — its
//! view is a TTL host cache plus orchestrator RPCs.

pub mod auth;
pub mod breaker;
pub mod cache;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod heartbeat;
pub mod pool;
pub mod proxy;
pub mod routes;
pub mod server;

#[cfg(test)]
pub mod test_fixtures;

pub use breaker::{Admission, BreakerConfig, BreakerState, CircuitBreaker};
pub use cache::{CachedWorker, ContainerHostCache};
pub use client::{ControlPlane, ControlPlaneError, HttpControlPlane};
pub use config::Config;
pub use dispatch::Dispatcher;
pub use error::GatewayError;
pub use pool::{Acquired, AcquireError, ContainerPool, WorkerHandle};
pub use proxy::{HttpInvoker, InvokeFailure, InvokeOutcome, InvokeRequest, WorkerInvoker};
pub use routes::{MatchError, RouteMatcher};
