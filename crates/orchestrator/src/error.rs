// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator error taxonomy and its wire mapping.

use esb_core::FunctionName;
use esb_driver::DriverError;
use esb_wire::ErrorCode;
use std::time::Duration;
use thiserror::Error;

/// Failures of the ensure operation, reduced to wire codes at the RPC edge.
#[derive(Debug, Error)]
pub enum EnsureError {
    #[error("unknown function: {0}")]
    UnknownFunction(FunctionName),

    #[error("function {0} is at capacity")]
    AtCapacity(FunctionName),

    #[error("image pull failed for {function}")]
    ImagePull {
        function: FunctionName,
        #[source]
        source: DriverError,
    },

    #[error("container create/start failed for {function}")]
    StartFailed {
        function: FunctionName,
        #[source]
        source: DriverError,
    },

    #[error("container for {0} not ready within {1:?}")]
    ReadinessTimeout(FunctionName, Duration),

    #[error("no free host ports in the configured range")]
    PortsExhausted,
}

impl EnsureError {
    /// Stable wire code for the gateway.
    pub fn code(&self) -> ErrorCode {
        match self {
            EnsureError::UnknownFunction(_) => ErrorCode::UnknownFunction,
            EnsureError::AtCapacity(_) => ErrorCode::AtCapacity,
            EnsureError::ImagePull { .. } => ErrorCode::ImagePullFailed,
            EnsureError::StartFailed { .. } => ErrorCode::ContainerStartFailed,
            EnsureError::ReadinessTimeout(_, _) => ErrorCode::ReadinessTimeout,
            EnsureError::PortsExhausted => ErrorCode::Internal,
        }
    }
}
