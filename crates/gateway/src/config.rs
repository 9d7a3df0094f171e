// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the gateway.

use esb_core::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {name}: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("missing required variable: {0}")]
    Missing(&'static str),
}

/// Gateway configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Public listen address (TLS terminates in front of us).
    pub listen_addr: SocketAddr,
    /// Path to the routing table shared with the orchestrator.
    pub routing_table: PathBuf,
    /// Base URL of the orchestrator RPC listener.
    pub orchestrator_url: String,
    /// Shared api key guarding the login endpoint; `None` disables the gate.
    pub api_key: Option<String>,
    /// HS256 secret for minted IdTokens.
    pub jwt_secret: String,
    /// `user:password` pairs accepted by the login endpoint.
    pub users: Vec<(String, String)>,
    /// Host-cache TTL (`CONTAINER_CACHE_TTL`).
    pub cache_ttl: Duration,
    /// Pool acquire deadline (`POOL_ACQUIRE_TIMEOUT`, fractional seconds).
    pub pool_acquire_timeout: Duration,
    /// Consecutive failures before a breaker opens.
    pub breaker_threshold: u32,
    /// Time an open breaker waits before allowing a probe.
    pub breaker_recovery: Duration,
    /// Platform default invocation ceiling (`LAMBDA_INVOKE_TIMEOUT`).
    pub invoke_timeout: Duration,
    /// Heartbeat period (`HEARTBEAT_INTERVAL`).
    pub heartbeat_interval: Duration,
    /// When false each pool degrades to a single slot (`ENABLE_CONTAINER_POOLING`).
    pub pooling_enabled: bool,
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let listen_addr =
            env::string_var("ESB_GATEWAY_ADDR").unwrap_or_else(|| "0.0.0.0:8443".to_string());
        let listen_addr: SocketAddr = listen_addr
            .parse()
            .map_err(|_| ConfigError::Invalid { name: "ESB_GATEWAY_ADDR", value: listen_addr })?;

        let routing_table = env::string_var("ESB_ROUTING_TABLE")
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing("ESB_ROUTING_TABLE"))?;

        let jwt_secret =
            env::string_var("ESB_JWT_SECRET").ok_or(ConfigError::Missing("ESB_JWT_SECRET"))?;

        let users = env::string_var("ESB_USERS")
            .map(|raw| parse_users(&raw))
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            listen_addr,
            routing_table,
            orchestrator_url: env::string_var("ESB_ORCHESTRATOR_URL")
                .unwrap_or_else(|| "http://127.0.0.1:8466".to_string()),
            api_key: env::string_var("ESB_API_KEY"),
            jwt_secret,
            users,
            cache_ttl: env::secs_var("CONTAINER_CACHE_TTL", Duration::from_secs(30)),
            pool_acquire_timeout: env::secs_f64_var(
                "POOL_ACQUIRE_TIMEOUT",
                Duration::from_secs(5),
            ),
            breaker_threshold: env::u32_var("CIRCUIT_BREAKER_THRESHOLD", 5),
            breaker_recovery: env::secs_f64_var(
                "CIRCUIT_BREAKER_RECOVERY_TIMEOUT",
                Duration::from_secs(30),
            ),
            invoke_timeout: env::secs_f64_var("LAMBDA_INVOKE_TIMEOUT", Duration::from_secs(30)),
            heartbeat_interval: env::secs_var("HEARTBEAT_INTERVAL", Duration::from_secs(30)),
            pooling_enabled: env::bool_var("ENABLE_CONTAINER_POOLING", false),
        })
    }
}

/// Parse `user:password,user2:password2`.
pub fn parse_users(raw: &str) -> Result<Vec<(String, String)>, ConfigError> {
    raw.split(',')
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| {
            entry
                .split_once(':')
                .map(|(user, password)| (user.trim().to_string(), password.to_string()))
                .filter(|(user, password)| !user.is_empty() && !password.is_empty())
                .ok_or_else(|| ConfigError::Invalid { name: "ESB_USERS", value: entry.to_string() })
        })
        .collect()
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
