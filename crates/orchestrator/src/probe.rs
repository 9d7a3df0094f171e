// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Readiness probing for freshly started containers.
//!
//! A container is ready when its runtime-interface port accepts a TCP
//! connection. The probe retries with a short pause until the cold-start
//! deadline passes.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Pause between connection attempts.
const PROBE_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
#[error("no listener at {address} within {timeout:?}")]
pub struct ProbeError {
    pub address: String,
    pub timeout: Duration,
}

#[async_trait]
pub trait Prober: Send + Sync + 'static {
    async fn wait_ready(&self, address: &str, timeout: Duration) -> Result<(), ProbeError>;
}

/// Production probe: repeated TCP connects against the worker address.
#[derive(Clone, Default)]
pub struct TcpProber;

#[async_trait]
impl Prober for TcpProber {
    async fn wait_ready(&self, address: &str, timeout: Duration) -> Result<(), ProbeError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match tokio::net::TcpStream::connect(address).await {
                Ok(_) => return Ok(()),
                Err(_) if tokio::time::Instant::now() + PROBE_INTERVAL < deadline => {
                    tokio::time::sleep(PROBE_INTERVAL).await;
                }
                Err(_) => {
                    return Err(ProbeError { address: address.to_string(), timeout });
                }
            }
        }
    }
}

/// Scripted probe for tests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone)]
pub struct StaticProber {
    ready: bool,
}

#[cfg(any(test, feature = "test-support"))]
impl StaticProber {
    pub fn ready() -> Self {
        Self { ready: true }
    }

    pub fn never_ready() -> Self {
        Self { ready: false }
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl Prober for StaticProber {
    async fn wait_ready(&self, address: &str, timeout: Duration) -> Result<(), ProbeError> {
        if self.ready {
            Ok(())
        } else {
            Err(ProbeError { address: address.to_string(), timeout })
        }
    }
}
