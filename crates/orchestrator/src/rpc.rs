// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Internal RPC surface served to the gateway.
//!
//! JSON over HTTP on the loopback/cluster-internal listener. Errors carry a
//! stable code in the body; the HTTP status is secondary.

use crate::error::EnsureError;
use crate::orchestrator::Orchestrator;
use crate::probe::Prober;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use esb_core::Clock;
use esb_driver::RuntimeDriver;
use esb_wire::{Ack, EnsureRequest, ErrorBody, EvictRequest, HeartbeatRequest};
use std::sync::Arc;

type Shared<D, P, C> = Arc<Orchestrator<D, P, C>>;

/// Build the RPC router over a shared orchestrator.
pub fn router<D, P, C>(orch: Shared<D, P, C>) -> Router
where
    D: RuntimeDriver + Clone,
    P: Prober,
    C: Clock,
{
    Router::new()
        .route(esb_wire::HEALTH_PATH, get(health))
        .route(esb_wire::ENSURE_PATH, post(ensure::<D, P, C>))
        .route(esb_wire::HEARTBEAT_PATH, post(heartbeat::<D, P, C>))
        .route(esb_wire::EVICT_PATH, post(evict::<D, P, C>))
        .with_state(orch)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn ensure<D, P, C>(
    State(orch): State<Shared<D, P, C>>,
    Json(req): Json<EnsureRequest>,
) -> Response
where
    D: RuntimeDriver + Clone,
    P: Prober,
    C: Clock,
{
    match orch.ensure(&req.function_name).await {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(err) => {
            let status = match &err {
                EnsureError::UnknownFunction(_) => StatusCode::NOT_FOUND,
                EnsureError::AtCapacity(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            tracing::warn!(function = %req.function_name, error = %err, "ensure failed");
            (status, Json(ErrorBody::new(err.code(), err.to_string()))).into_response()
        }
    }
}

async fn heartbeat<D, P, C>(
    State(orch): State<Shared<D, P, C>>,
    Json(req): Json<HeartbeatRequest>,
) -> Json<Ack>
where
    D: RuntimeDriver + Clone,
    P: Prober,
    C: Clock,
{
    orch.heartbeat(req.ids);
    Json(Ack::ok())
}

async fn evict<D, P, C>(
    State(orch): State<Shared<D, P, C>>,
    Json(req): Json<EvictRequest>,
) -> Json<Ack>
where
    D: RuntimeDriver + Clone,
    P: Prober,
    C: Clock,
{
    orch.evict(&req.container_id).await;
    Json(Ack::ok())
}

#[cfg(test)]
#[path = "rpc_tests.rs"]
mod tests;
