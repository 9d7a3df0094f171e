// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gateway error taxonomy and the HTTP mapping clients see.
//!
//! Causes are preserved in logs; clients only ever see the reduced status
//! codes of the public contract.

use axum::http::StatusCode;
use esb_core::FunctionName;
use esb_wire::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    // Routing
    #[error("no route matched")]
    RouteNotFound,

    #[error("method not allowed on this route")]
    MethodNotAllowed,

    // Auth
    #[error("bad api key")]
    BadApiKey,

    #[error("bad credentials")]
    BadCredentials,

    #[error("missing or invalid bearer token")]
    Unauthorized,

    // Capacity
    #[error("circuit breaker open for {0}")]
    BreakerOpen(FunctionName),

    #[error("no worker available for {0} within the acquire deadline")]
    AcquireTimedOut(FunctionName),

    #[error("function {0} is disabled")]
    Disabled(FunctionName),

    #[error("function {0} is at capacity")]
    AtCapacity(FunctionName),

    #[error("orchestrator unavailable: {0}")]
    ControlPlaneUnavailable(String),

    // Provisioning
    #[error("provisioning {function} failed: {code} ({message})")]
    Provisioning { function: FunctionName, code: ErrorCode, message: String },

    // Invocation
    #[error("invocation of {0} timed out")]
    UpstreamTimeout(FunctionName),

    #[error("worker for {function} failed: {message}")]
    UpstreamNetwork { function: FunctionName, message: String },

    #[error("function {0} returned an uncaught error")]
    FunctionError(FunctionName),
}

impl GatewayError {
    /// The status a client observes for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::RouteNotFound => StatusCode::NOT_FOUND,
            GatewayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::BadApiKey
            | GatewayError::BadCredentials
            | GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::BreakerOpen(_)
            | GatewayError::AcquireTimedOut(_)
            | GatewayError::Disabled(_)
            | GatewayError::AtCapacity(_)
            | GatewayError::ControlPlaneUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Provisioning { .. }
            | GatewayError::UpstreamNetwork { .. }
            | GatewayError::FunctionError(_) => StatusCode::BAD_GATEWAY,
            GatewayError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}
