// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use esb_core::{container_labels, FunctionName};

fn spec(name: &str) -> ContainerSpec {
    ContainerSpec {
        name: name.to_string(),
        image: "img:1".to_string(),
        env: vec![],
        labels: container_labels(&FunctionName::new("hello")),
        network: None,
        expose_port: 8080,
        host_port: Some(42001),
    }
}

#[tokio::test]
async fn create_start_inspect_round_trip() {
    let driver = FakeDriver::new();
    let id = driver.create_container(spec("esb-hello-1")).await.unwrap();
    assert_eq!(driver.state_of(&id), Some(RuntimeState::Created));

    driver.start(&id).await.unwrap();
    let info = driver.inspect(&id).await.unwrap();
    assert_eq!(info.state, RuntimeState::Running);
    assert_eq!(info.address.as_deref(), Some("127.0.0.1:42001"));
}

#[tokio::test]
async fn duplicate_name_conflicts() {
    let driver = FakeDriver::new();
    driver.create_container(spec("dup")).await.unwrap();
    let err = driver.create_container(spec("dup")).await.unwrap_err();
    assert!(matches!(err, DriverError::Conflict(_)));
}

#[tokio::test]
async fn remove_running_requires_force() {
    let driver = FakeDriver::new();
    let id = driver.create_container(spec("c")).await.unwrap();
    driver.start(&id).await.unwrap();

    let err = driver.remove(&id, false).await.unwrap_err();
    assert!(matches!(err, DriverError::Conflict(_)));

    driver.remove(&id, true).await.unwrap();
    assert!(!driver.contains(&id));
}

#[tokio::test]
async fn pause_resume_cycle() {
    let driver = FakeDriver::new();
    let id = driver.create_container(spec("c")).await.unwrap();
    driver.start(&id).await.unwrap();
    driver.pause(&id).await.unwrap();
    assert_eq!(driver.state_of(&id), Some(RuntimeState::Paused));
    driver.resume(&id).await.unwrap();
    assert_eq!(driver.state_of(&id), Some(RuntimeState::Running));
}

#[tokio::test]
async fn list_filters_on_all_labels() {
    let driver = FakeDriver::new();
    driver.create_container(spec("ours")).await.unwrap();
    driver.seed("foreign", RuntimeState::Running, HashMap::new(), "127.0.0.1:9");

    let selector = vec![("created_by".to_string(), "esb".to_string())];
    let listed = driver.list(&selector).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].labels.get("esb_function").map(String::as_str), Some("hello"));
}

#[tokio::test]
async fn scripted_failures_fire_once() {
    let driver = FakeDriver::new();
    driver.fail_next_create(FailKind::Transient);
    assert!(driver.create_container(spec("a")).await.is_err());
    assert!(driver.create_container(spec("a")).await.is_ok());

    driver.fail_image("bad:latest");
    assert!(driver.ensure_image("bad:latest").await.is_err());
    assert!(driver.ensure_image("good:latest").await.is_ok());
}

#[tokio::test]
async fn missing_container_is_not_found() {
    let driver = FakeDriver::new();
    let ghost = ContainerId::new("ghost");
    assert!(matches!(driver.inspect(&ghost).await, Err(DriverError::NotFound(_))));
    assert!(matches!(driver.start(&ghost).await, Err(DriverError::NotFound(_))));
    assert!(matches!(driver.remove(&ghost, true).await, Err(DriverError::NotFound(_))));
}

#[tokio::test]
async fn call_log_records_operations() {
    let driver = FakeDriver::new();
    let id = driver.create_container(spec("c")).await.unwrap();
    driver.start(&id).await.unwrap();
    driver.list(&[]).await.unwrap();

    let calls = driver.calls();
    assert_eq!(calls[0], DriverCall::Create("c".to_string()));
    assert_eq!(calls[1], DriverCall::Start(id));
    assert_eq!(calls[2], DriverCall::List);
    assert_eq!(driver.create_count(), 1);
}
