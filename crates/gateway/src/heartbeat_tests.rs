// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::breaker::BreakerConfig;
use crate::dispatch::DispatchSettings;
use crate::proxy::InvokeRequest;
use crate::test_fixtures::{FakeControlPlane, FakeInvoker};
use esb_core::{test_support, ContainerId, FakeClock};

fn settings() -> DispatchSettings {
    DispatchSettings {
        pool_acquire_timeout: Duration::from_millis(300),
        invoke_timeout: Duration::from_secs(5),
        cache_ttl: Duration::from_secs(30),
        breaker: BreakerConfig::default(),
        pooling_enabled: true,
    }
}

fn request() -> InvokeRequest {
    InvokeRequest {
        method: "GET".to_string(),
        path: "/api/hello".to_string(),
        query: None,
        headers: Vec::new(),
        body: Vec::new(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn janitor_reports_periodically_until_cancelled() {
    let cp = FakeControlPlane::default();
    let dispatcher = Arc::new(Dispatcher::new(
        cp.clone(),
        FakeInvoker::instant(),
        FakeClock::new(),
        settings(),
    ));

    // Populate the cache with one container.
    dispatcher
        .dispatch(&test_support::descriptor("hello"), request())
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let janitor = tokio::spawn(run_heartbeat(
        dispatcher.clone(),
        Duration::from_millis(30),
        cancel.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();
    janitor.await.unwrap();

    let reports = cp.heartbeats();
    assert!(!reports.is_empty(), "at least one report fired");
    assert!(reports.iter().all(|ids| ids.contains(&ContainerId::new("c1"))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn empty_report_is_skipped() {
    let cp = FakeControlPlane::default();
    let dispatcher = Arc::new(Dispatcher::new(
        cp.clone(),
        FakeInvoker::instant(),
        FakeClock::new(),
        settings(),
    ));

    let cancel = CancellationToken::new();
    let janitor = tokio::spawn(run_heartbeat(
        dispatcher,
        Duration::from_millis(20),
        cancel.clone(),
    ));
    tokio::time::sleep(Duration::from_millis(70)).await;
    cancel.cancel();
    janitor.await.unwrap();

    assert!(cp.heartbeats().is_empty(), "nothing in use, nothing reported");
}
