// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The public HTTP surface.
//!
//! Three entries: the login endpoint, a liveness probe, and a catch-all that
//! authenticates, routes, and invokes. TLS terminates in front of this
//! listener.

use crate::auth::{Authenticator, AUTH_MARKER_HEADER};
use crate::client::ControlPlane;
use crate::dispatch::Dispatcher;
use crate::error::GatewayError;
use crate::proxy::{InvokeOutcome, InvokeRequest, WorkerInvoker};
use crate::routes::{MatchError, RouteMatcher};
use axum::body::{to_bytes, Bytes};
use axum::extract::{Request, State};
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use esb_core::{Clock, FunctionTable, HttpMethod};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Largest accepted request body (the Lambda payload ceiling).
const MAX_BODY_BYTES: usize = 6 * 1024 * 1024;

/// Everything a request handler needs; one instance per process.
pub struct GatewayApp<CP, I, C: Clock> {
    pub auth: Authenticator,
    pub matcher: RouteMatcher,
    pub functions: FunctionTable,
    pub dispatcher: Arc<Dispatcher<CP, I, C>>,
}

type Shared<CP, I, C> = Arc<GatewayApp<CP, I, C>>;

pub fn router<CP, I, C>(app: Shared<CP, I, C>) -> Router
where
    CP: ControlPlane,
    I: WorkerInvoker,
    C: Clock,
{
    Router::new()
        .route("/user/auth/ver1.0", post(login::<CP, I, C>))
        .route("/health", get(health))
        .fallback(invoke::<CP, I, C>)
        .with_state(app)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct LoginBody {
    #[serde(rename = "AuthParameters")]
    auth_parameters: AuthParameters,
}

#[derive(Debug, Deserialize)]
struct AuthParameters {
    #[serde(rename = "USERNAME")]
    username: String,
    #[serde(rename = "PASSWORD")]
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    #[serde(rename = "AuthenticationResult")]
    authentication_result: AuthenticationResult,
}

#[derive(Debug, Serialize)]
struct AuthenticationResult {
    #[serde(rename = "IdToken")]
    id_token: String,
}

async fn login<CP, I, C>(
    State(app): State<Shared<CP, I, C>>,
    request: Request,
) -> Response
where
    CP: ControlPlane,
    I: WorkerInvoker,
    C: Clock,
{
    let (parts, body) = request.into_parts();

    // Api-key gate first: its 401 carries no marker header.
    let api_key = parts.headers.get("x-api-key").and_then(|v| v.to_str().ok());
    if app.auth.check_api_key(api_key).is_err() {
        return error_response(&GatewayError::BadApiKey);
    }

    let Ok(body) = to_bytes(body, MAX_BODY_BYTES).await else {
        return error_response(&GatewayError::BadCredentials);
    };
    let Ok(login_body) = serde_json::from_slice::<LoginBody>(&body) else {
        return error_response(&GatewayError::BadCredentials);
    };

    match app
        .auth
        .login(&login_body.auth_parameters.username, &login_body.auth_parameters.password)
    {
        Ok(id_token) => Json(LoginResponse {
            authentication_result: AuthenticationResult { id_token },
        })
        .into_response(),
        Err(err) => error_response(&err),
    }
}

async fn invoke<CP, I, C>(State(app): State<Shared<CP, I, C>>, request: Request) -> Response
where
    CP: ControlPlane,
    I: WorkerInvoker,
    C: Clock,
{
    let started = std::time::Instant::now();
    let (parts, body) = request.into_parts();

    let bearer = parts.headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());
    if let Err(err) = app.auth.verify_bearer(bearer) {
        return error_response(&err);
    }

    let Ok(method) = parts.method.as_str().parse::<HttpMethod>() else {
        return error_response(&GatewayError::MethodNotAllowed);
    };
    let path = parts.uri.path().to_string();
    let function = match app.matcher.lookup(method, &path) {
        Ok(function) => function,
        Err(MatchError::NotFound) => return error_response(&GatewayError::RouteNotFound),
        Err(MatchError::MethodNotAllowed) => {
            return error_response(&GatewayError::MethodNotAllowed)
        }
    };
    let Some(fun) = app.functions.get(function.as_str()) else {
        return error_response(&GatewayError::RouteNotFound);
    };

    let body: Bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(_) => return StatusCode::PAYLOAD_TOO_LARGE.into_response(),
    };
    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let invoke_request = InvokeRequest {
        method: parts.method.to_string(),
        path,
        query: parts.uri.query().map(str::to_string),
        headers,
        body: body.to_vec(),
    };

    match app.dispatcher.dispatch(&fun, invoke_request).await {
        Ok(outcome) => {
            tracing::info!(
                function = %fun.name,
                status = outcome.status,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "invocation complete"
            );
            worker_response(outcome)
        }
        Err(err) => {
            tracing::warn!(
                function = %fun.name,
                error = %err,
                status = err.status().as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "invocation failed"
            );
            error_response(&err)
        }
    }
}

/// Translate a worker outcome back into an HTTP response.
fn worker_response(outcome: InvokeOutcome) -> Response {
    let mut builder = Response::builder()
        .status(StatusCode::from_u16(outcome.status).unwrap_or(StatusCode::BAD_GATEWAY));
    for (name, value) in &outcome.headers {
        let valid = HeaderName::try_from(name.as_str())
            .ok()
            .zip(HeaderValue::try_from(value.as_str()).ok());
        if let Some((name, value)) = valid {
            builder = builder.header(name, value);
        }
    }
    builder
        .body(axum::body::Body::from(outcome.body))
        .unwrap_or_else(|_| StatusCode::BAD_GATEWAY.into_response())
}

/// Reduce an error to its public shape.
fn error_response(err: &GatewayError) -> Response {
    let status = err.status();
    let body = Json(serde_json::json!({ "message": err.to_string() }));
    match err {
        // The marker header proves the api-key gate was cleared.
        GatewayError::BadCredentials => {
            (status, [(HeaderName::from_static(AUTH_MARKER_HEADER), "true")], body)
                .into_response()
        }
        _ => (status, body).into_response(),
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
