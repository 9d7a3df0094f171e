// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RPC client for the orchestrator.
//!
//! Behind a trait so the dispatcher can be exercised against an in-process
//! control plane in tests.

use async_trait::async_trait;
use esb_core::{ContainerId, FunctionName};
use esb_wire::{Ack, EnsureRequest, EnsureResponse, ErrorBody, ErrorCode, EvictRequest, HeartbeatRequest};
use std::time::Duration;
use thiserror::Error;

/// RPC deadline; covers a full cold start plus slack.
const RPC_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ControlPlaneError {
    /// The orchestrator answered with a structured error.
    #[error("orchestrator refused: {code} ({message})")]
    Rpc { code: ErrorCode, message: String },

    /// The orchestrator could not be reached or answered garbage.
    #[error("orchestrator unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ControlPlane: Send + Sync + 'static {
    /// Idempotent "a container for F is running and ready".
    async fn ensure(&self, function: &FunctionName) -> Result<EnsureResponse, ControlPlaneError>;

    /// Report containers still in use by this gateway.
    async fn heartbeat(&self, ids: Vec<ContainerId>) -> Result<(), ControlPlaneError>;

    /// Ask for a broken container to be removed.
    async fn evict(&self, id: &ContainerId) -> Result<(), ControlPlaneError>;
}

/// Production client over HTTP.
pub struct HttpControlPlane {
    base_url: String,
    client: reqwest::Client,
}

impl HttpControlPlane {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self { base_url: base_url.trim_end_matches('/').to_string(), client: reqwest::Client::new() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ControlPlaneError> {
        let response = self
            .client
            .post(self.url(path))
            .timeout(RPC_TIMEOUT)
            .json(body)
            .send()
            .await
            .map_err(|e| ControlPlaneError::Unavailable(e.to_string()))?;

        if response.status().is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ControlPlaneError::Unavailable(e.to_string()));
        }

        match response.json::<ErrorBody>().await {
            Ok(body) => Err(ControlPlaneError::Rpc { code: body.error, message: body.message }),
            Err(e) => Err(ControlPlaneError::Unavailable(e.to_string())),
        }
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn ensure(&self, function: &FunctionName) -> Result<EnsureResponse, ControlPlaneError> {
        let request = EnsureRequest { function_name: function.clone() };
        self.post_json(esb_wire::ENSURE_PATH, &request).await
    }

    async fn heartbeat(&self, ids: Vec<ContainerId>) -> Result<(), ControlPlaneError> {
        let request = HeartbeatRequest { ids };
        let _: Ack = self.post_json(esb_wire::HEARTBEAT_PATH, &request).await?;
        Ok(())
    }

    async fn evict(&self, id: &ContainerId) -> Result<(), ControlPlaneError> {
        let request = EvictRequest { container_id: id.clone() };
        let _: Ack = self.post_json(esb_wire::EVICT_PATH, &request).await?;
        Ok(())
    }
}
