// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Invocation proxy: HTTP request in, Lambda-compatible invoke out.
//!
//! Workers speak the Lambda runtime-interface contract: the gateway POSTs an
//! API-gateway-shaped event to the invocations endpoint and translates the
//! `{statusCode, headers, body}` result back into an HTTP response. A
//! `X-Amz-Function-Error` header marks a worker-reported crash.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Lambda runtime-interface invocation path (fixed by the container image).
pub const INVOKE_PATH: &str = "/2015-03-31/functions/function/invocations";

/// Header a worker sets when the handler raised instead of returning.
pub const FUNCTION_ERROR_HEADER: &str = "x-amz-function-error";

/// The client request, reduced to what the event carries.
#[derive(Debug, Clone)]
pub struct InvokeRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// What came back from the worker.
#[derive(Debug, Clone)]
pub struct InvokeOutcome {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// The worker reported a handler crash.
    pub function_error: bool,
}

/// Transport-level invocation failures (the worker never answered).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvokeFailure {
    Timeout,
    Network(String),
}

#[async_trait]
pub trait WorkerInvoker: Send + Sync + 'static {
    async fn invoke(
        &self,
        address: &str,
        request: &InvokeRequest,
        timeout: Duration,
    ) -> Result<InvokeOutcome, InvokeFailure>;
}

/// Event document handed to the worker (API-gateway proxy shape).
#[derive(Debug, Serialize)]
struct Event<'a> {
    #[serde(rename = "httpMethod")]
    http_method: &'a str,
    path: &'a str,
    #[serde(rename = "queryStringParameters", skip_serializing_if = "Option::is_none")]
    query_string_parameters: Option<HashMap<&'a str, &'a str>>,
    headers: HashMap<&'a str, &'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
}

/// Handler result when the function answers in proxy shape.
#[derive(Debug, Deserialize)]
struct ShapedResult {
    #[serde(rename = "statusCode")]
    status_code: u16,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default)]
    body: Option<String>,
}

/// Build the event JSON for a request.
pub(crate) fn build_event(request: &InvokeRequest) -> serde_json::Value {
    let query = request.query.as_deref().map(|raw| {
        raw.split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
            .collect::<HashMap<&str, &str>>()
    });
    let headers: HashMap<&str, &str> =
        request.headers.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    let body = if request.body.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(&request.body))
    };

    let event = Event {
        http_method: &request.method,
        path: &request.path,
        query_string_parameters: query,
        headers,
        body: body.as_deref(),
    };
    serde_json::to_value(&event).unwrap_or_else(|_| serde_json::json!({}))
}

/// Translate a worker result body into an HTTP-facing outcome.
pub(crate) fn shape_outcome(status: u16, body: Vec<u8>, function_error: bool) -> InvokeOutcome {
    if let Ok(shaped) = serde_json::from_slice::<ShapedResult>(&body) {
        return InvokeOutcome {
            status: shaped.status_code,
            headers: shaped.headers.into_iter().collect(),
            body: shaped.body.map(String::into_bytes).unwrap_or_default(),
            function_error,
        };
    }
    // Unshaped results pass through verbatim, the way direct invokes do.
    InvokeOutcome { status, headers: Vec::new(), body, function_error }
}

/// Production invoker over a shared reqwest client.
pub struct HttpInvoker {
    client: reqwest::Client,
}

impl HttpInvoker {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

impl Default for HttpInvoker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkerInvoker for HttpInvoker {
    async fn invoke(
        &self,
        address: &str,
        request: &InvokeRequest,
        timeout: Duration,
    ) -> Result<InvokeOutcome, InvokeFailure> {
        let url = format!("http://{}{}", address, INVOKE_PATH);
        let event = build_event(request);

        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(&event)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InvokeFailure::Timeout
                } else {
                    InvokeFailure::Network(e.to_string())
                }
            })?;

        let function_error = response.headers().contains_key(FUNCTION_ERROR_HEADER);
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InvokeFailure::Timeout
                } else {
                    InvokeFailure::Network(e.to_string())
                }
            })?
            .to_vec();

        Ok(shape_outcome(status, body, function_error))
    }
}

#[cfg(test)]
#[path = "proxy_tests.rs"]
mod tests;
