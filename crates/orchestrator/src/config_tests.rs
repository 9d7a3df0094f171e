// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    default_range = { "42000-42999", Some((42000, 42999)) },
    single = { "9000-9000", Some((9000, 9000)) },
    spaced = { " 9000 - 9010 ", Some((9000, 9010)) },
    inverted = { "9010-9000", None },
    zero_low = { "0-10", None },
    missing_dash = { "9000", None },
    garbage = { "a-b", None },
)]
fn port_ranges_parse(raw: &str, expected: Option<(u16, u16)>) {
    assert_eq!(parse_port_range(raw).ok(), expected);
}

#[test]
fn from_env_requires_routing_table() {
    std::env::remove_var("ESB_ROUTING_TABLE");
    assert!(matches!(Config::from_env(), Err(ConfigError::Missing("ESB_ROUTING_TABLE"))));
}
