// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn function_name_round_trips_through_display() {
    let name = FunctionName::new("hello");
    assert_eq!(name.to_string(), "hello");
    assert_eq!(name.as_str(), "hello");
    assert_eq!(name, "hello");
}

#[test]
fn function_name_from_string_and_str() {
    assert_eq!(FunctionName::from("a"), FunctionName::from("a".to_string()));
}

#[test]
fn container_id_short_truncates_long_ids() {
    let id = ContainerId::new("0123456789abcdef0123456789abcdef");
    assert_eq!(id.short(), "0123456789ab");
}

#[test]
fn container_id_short_keeps_short_ids_whole() {
    let id = ContainerId::new("esb-1");
    assert_eq!(id.short(), "esb-1");
}

#[test]
fn ids_usable_as_map_keys_via_borrow() {
    use std::collections::HashMap;
    let mut map: HashMap<FunctionName, u32> = HashMap::new();
    map.insert(FunctionName::new("hello"), 1);
    assert_eq!(map.get("hello"), Some(&1));
}
