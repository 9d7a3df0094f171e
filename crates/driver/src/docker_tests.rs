// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    tcp = { "8080/tcp", Some(8080) },
    udp = { "9000/udp", Some(9000) },
    bare = { "8080", Some(8080) },
    garbage = { "x/tcp", None },
)]
fn exposed_port_parses(key: &str, expected: Option<u16>) {
    assert_eq!(exposed_port_of(key), expected);
}

#[test]
fn published_binding_wins_over_network_ip() {
    let mut ports: PortMap = HashMap::new();
    ports.insert(
        "8080/tcp".to_string(),
        Some(vec![PortBinding {
            host_ip: Some("0.0.0.0".to_string()),
            host_port: Some("42001".to_string()),
        }]),
    );
    let mut networks = HashMap::new();
    networks.insert(
        "esb-net".to_string(),
        EndpointSettings { ip_address: Some("172.18.0.5".to_string()), ..Default::default() },
    );

    let addr = harvest_address("127.0.0.1", Some(&ports), Some(&networks));
    assert_eq!(addr, Some("127.0.0.1:42001".to_string()));
}

#[test]
fn network_ip_used_when_no_binding() {
    let mut ports: PortMap = HashMap::new();
    ports.insert("8080/tcp".to_string(), None);
    let mut networks = HashMap::new();
    networks.insert(
        "esb-net".to_string(),
        EndpointSettings { ip_address: Some("172.18.0.5".to_string()), ..Default::default() },
    );

    let addr = harvest_address("127.0.0.1", Some(&ports), Some(&networks));
    assert_eq!(addr, Some("172.18.0.5:8080".to_string()));
}

#[test]
fn no_ports_means_no_address() {
    assert_eq!(harvest_address("127.0.0.1", None, None), None);
}

#[test]
fn empty_network_ip_is_skipped() {
    let mut ports: PortMap = HashMap::new();
    ports.insert("8080/tcp".to_string(), None);
    let mut networks = HashMap::new();
    networks.insert(
        "esb-net".to_string(),
        EndpointSettings { ip_address: Some(String::new()), ..Default::default() },
    );
    assert_eq!(harvest_address("127.0.0.1", Some(&ports), Some(&networks)), None);
}

#[test]
fn label_filter_joins_pairs() {
    let selector = vec![
        ("created_by".to_string(), "esb".to_string()),
        ("esb_function".to_string(), "hello".to_string()),
    ];
    assert_eq!(label_filter(&selector), vec!["created_by=esb", "esb_function=hello"]);
}

#[parameterized(
    running = { Some("running"), RuntimeState::Running },
    exited = { Some("exited"), RuntimeState::Exited },
    dead = { Some("dead"), RuntimeState::Exited },
    paused = { Some("paused"), RuntimeState::Paused },
    created = { Some("created"), RuntimeState::Created },
    missing = { None, RuntimeState::Unknown },
)]
fn summary_states_map(state: Option<&str>, expected: RuntimeState) {
    assert_eq!(map_summary_state(state), expected);
}

#[test]
fn inspect_status_maps() {
    assert_eq!(map_status(Some(ContainerStateStatusEnum::RUNNING)), RuntimeState::Running);
    assert_eq!(map_status(Some(ContainerStateStatusEnum::EXITED)), RuntimeState::Exited);
    assert_eq!(map_status(None), RuntimeState::Unknown);
}
