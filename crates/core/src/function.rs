// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Function descriptors loaded from the routing table.

use crate::id::FunctionName;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Reserved-concurrency default when the routing table does not set one.
pub const DEFAULT_MAX_CAPACITY: u32 = 50;

/// HTTP method of a declared route. `Any` matches every method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Any,
}

impl HttpMethod {
    /// Whether a route declared with this method accepts `request`.
    pub fn accepts(self, request: HttpMethod) -> bool {
        self == HttpMethod::Any || self == request
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "PATCH" => Ok(HttpMethod::Patch),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            "ANY" | "*" => Ok(HttpMethod::Any),
            other => Err(format!("unknown HTTP method: {}", other)),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Any => "ANY",
        };
        write!(f, "{}", s)
    }
}

/// One declared route: a path pattern plus the accepted method.
///
/// Patterns are literal segments with optional single-segment wildcards,
/// e.g. `/api/users/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSpec {
    pub path: String,
    pub method: HttpMethod,
}

/// Static description of one function, immutable per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub name: FunctionName,
    pub image_ref: String,
    pub handler: String,
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Reserved concurrency. Zero disables the function entirely.
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u32,
    /// Per-invocation ceiling override, milliseconds.
    #[serde(default)]
    pub invoke_timeout_ms: Option<u64>,
    /// Idle-reap threshold override, seconds.
    #[serde(default)]
    pub idle_timeout_s: Option<u64>,
}

fn default_max_capacity() -> u32 {
    DEFAULT_MAX_CAPACITY
}

impl FunctionDescriptor {
    /// Whether invocation is disabled (`max_capacity = 0`).
    pub fn is_disabled(&self) -> bool {
        self.max_capacity == 0
    }

    /// Invocation deadline, falling back to the platform default.
    pub fn invoke_timeout(&self, default: Duration) -> Duration {
        self.invoke_timeout_ms.map(Duration::from_millis).unwrap_or(default)
    }

    /// Idle-reap threshold, falling back to the platform default.
    pub fn idle_timeout(&self, default: Duration) -> Duration {
        self.idle_timeout_s.map(Duration::from_secs).unwrap_or(default)
    }
}

#[cfg(test)]
#[path = "function_tests.rs"]
mod tests;
