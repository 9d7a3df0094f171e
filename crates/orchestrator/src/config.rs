// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the orchestrator.

use esb_core::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Port the Lambda runtime interface listens on inside every container.
pub const RUNTIME_INTERFACE_PORT: u16 = 8080;

/// Stale multiplier for the leak catcher: BUSY/READY records untouched for
/// this many idle windows are torn down with a warning.
pub const STUCK_MULTIPLIER: u32 = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {name}: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("missing required variable: {0}")]
    Missing(&'static str),
}

/// Orchestrator configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Internal RPC listen address.
    pub listen_addr: SocketAddr,
    /// Path to the routing table shared with the gateway.
    pub routing_table: PathBuf,
    /// Default idle-reap threshold (`IDLE_TIMEOUT_MINUTES`).
    pub idle_timeout: Duration,
    /// Reaper sweep period.
    pub reaper_interval: Duration,
    /// Heartbeat period the gateway was configured with; used as the grace
    /// window before an unreported container is considered released.
    pub heartbeat_interval: Duration,
    /// Ceiling for image pull + create + start + readiness.
    pub cold_start_timeout: Duration,
    /// Runtime network to attach containers to; `None` selects published
    /// host ports from `port_range` instead (NAT mode).
    pub network: Option<String>,
    /// Inclusive host-port range for NAT mode.
    pub port_range: (u16, u16),
    /// Engine endpoint override (`unix://...` or `tcp://...`).
    pub docker_endpoint: Option<String>,
    /// Address published ports are reachable on from the gateway.
    pub published_host_ip: String,
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let listen_addr = env::string_var("ESB_ORCHESTRATOR_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8466".to_string());
        let listen_addr: SocketAddr = listen_addr
            .parse()
            .map_err(|_| ConfigError::Invalid { name: "ESB_ORCHESTRATOR_ADDR", value: listen_addr })?;

        let routing_table = env::string_var("ESB_ROUTING_TABLE")
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing("ESB_ROUTING_TABLE"))?;

        let idle_minutes = env::u64_var("IDLE_TIMEOUT_MINUTES", 5);
        let port_range = parse_port_range(
            &env::string_var("ESB_PORT_RANGE").unwrap_or_else(|| "42000-42999".to_string()),
        )?;

        Ok(Self {
            listen_addr,
            routing_table,
            idle_timeout: Duration::from_secs(idle_minutes * 60),
            reaper_interval: env::secs_var("REAPER_INTERVAL", Duration::from_secs(60)),
            heartbeat_interval: env::secs_var("HEARTBEAT_INTERVAL", Duration::from_secs(30)),
            cold_start_timeout: env::secs_var("ESB_COLD_START_TIMEOUT", Duration::from_secs(30)),
            network: env::string_var("LAMBDA_NETWORK"),
            port_range,
            docker_endpoint: env::string_var("ESB_DOCKER_HOST"),
            published_host_ip: env::string_var("ESB_PUBLISHED_HOST_IP")
                .unwrap_or_else(|| "127.0.0.1".to_string()),
        })
    }
}

/// Parse an inclusive `low-high` port range.
pub fn parse_port_range(raw: &str) -> Result<(u16, u16), ConfigError> {
    let invalid = || ConfigError::Invalid { name: "ESB_PORT_RANGE", value: raw.to_string() };
    let (low, high) = raw.split_once('-').ok_or_else(invalid)?;
    let low: u16 = low.trim().parse().map_err(|_| invalid())?;
    let high: u16 = high.trim().parse().map_err(|_| invalid())?;
    if low == 0 || low > high {
        return Err(invalid());
    }
    Ok((low, high))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
