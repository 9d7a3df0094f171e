// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use esb_core::ContainerId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Success body of `POST /containers/ensure`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsureResponse {
    pub container_id: ContainerId,
    /// IP+port reachable from the gateway.
    pub address: String,
}

/// Generic acknowledgement for heartbeat and evict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

/// Stable error codes carried in RPC error bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The function's reserved concurrency is exhausted.
    AtCapacity,
    /// The function is not declared in the routing table.
    UnknownFunction,
    /// Image pull failed during cold start.
    ImagePullFailed,
    /// Container create/start failed during cold start.
    ContainerStartFailed,
    /// The container never became reachable within the cold-start window.
    ReadinessTimeout,
    /// The referenced container no longer exists.
    Gone,
    /// Anything else; details are in the orchestrator log.
    Internal,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::AtCapacity => "at_capacity",
            ErrorCode::UnknownFunction => "unknown_function",
            ErrorCode::ImagePullFailed => "image_pull_failed",
            ErrorCode::ContainerStartFailed => "container_start_failed",
            ErrorCode::ReadinessTimeout => "readiness_timeout",
            ErrorCode::Gone => "gone",
            ErrorCode::Internal => "internal",
        };
        write!(f, "{}", s)
    }
}

/// Error body returned by any RPC endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorCode,
    pub message: String,
}

impl ErrorBody {
    pub fn new(error: ErrorCode, message: impl Into<String>) -> Self {
        Self { error, message: message.into() }
    }
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
