// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment-variable parsing helpers.
//!
//! Each service keeps its own `env.rs` naming the variables it recognises;
//! the parsing rules live here so both agree on formats (integer seconds,
//! float seconds, booleans).

use std::time::Duration;

/// Read a u64 variable, falling back on absence or parse failure.
pub fn u64_var(name: &str, default: u64) -> u64 {
    std::env::var(name).ok().and_then(|s| parse_u64(&s)).unwrap_or(default)
}

/// Read a u32 variable, falling back on absence or parse failure.
pub fn u32_var(name: &str, default: u32) -> u32 {
    std::env::var(name).ok().and_then(|s| parse_u64(&s)).map(|v| v as u32).unwrap_or(default)
}

/// Read a whole-seconds duration variable.
pub fn secs_var(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|s| parse_u64(&s))
        .map(Duration::from_secs)
        .unwrap_or(default)
}

/// Read a fractional-seconds duration variable (e.g. `5.0`, `0.1`).
pub fn secs_f64_var(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|s| parse_secs_f64(&s))
        .unwrap_or(default)
}

/// Read a boolean variable. Accepts `1/0`, `true/false`, `yes/no`, `on/off`.
pub fn bool_var(name: &str, default: bool) -> bool {
    std::env::var(name).ok().and_then(|s| parse_bool(&s)).unwrap_or(default)
}

/// Read a non-empty string variable.
pub fn string_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

pub fn parse_u64(s: &str) -> Option<u64> {
    s.trim().parse().ok()
}

pub fn parse_secs_f64(s: &str) -> Option<Duration> {
    let secs: f64 = s.trim().parse().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some(Duration::from_secs_f64(secs))
}

pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
