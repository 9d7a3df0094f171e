// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn handle(id: &str) -> WorkerHandle {
    WorkerHandle { container_id: ContainerId::new(id), address: format!("127.0.0.1:{}", 42000) }
}

fn soon() -> Instant {
    Instant::now() + Duration::from_millis(200)
}

#[tokio::test]
async fn empty_pool_yields_provision_token() {
    let pool = ContainerPool::new(2, true);
    match pool.acquire(soon()).await.unwrap() {
        Acquired::Provision(_) => {}
        Acquired::Warm(_) => panic!("no idle handle existed"),
    }
    assert_eq!(pool.in_use(), 1);
}

#[tokio::test]
async fn released_handle_is_reused_lifo() {
    let pool = ContainerPool::new(2, true);
    let _ = pool.acquire(soon()).await.unwrap();
    let _ = pool.acquire(soon()).await.unwrap();
    pool.release(handle("a"));
    pool.release(handle("b"));
    assert_eq!(pool.idle_len(), 2);

    match pool.acquire(soon()).await.unwrap() {
        Acquired::Warm(h) => assert_eq!(h.container_id, "b", "LIFO: most recent first"),
        Acquired::Provision(_) => panic!("expected a warm handle"),
    }
}

#[tokio::test]
async fn disabled_pool_rejects_synchronously() {
    let pool = ContainerPool::new(0, true);
    assert_eq!(pool.acquire(soon()).await.unwrap_err(), AcquireError::Disabled);
}

#[tokio::test]
async fn pooling_disabled_degrades_to_single_slot() {
    let pool = ContainerPool::new(50, false);
    let _first = pool.acquire(soon()).await.unwrap();
    let deadline = Instant::now() + Duration::from_millis(20);
    assert_eq!(pool.acquire(deadline).await.unwrap_err(), AcquireError::TimedOut);
}

#[tokio::test]
async fn saturated_pool_times_out_waiters() {
    let pool = ContainerPool::new(1, true);
    let _held = pool.acquire(soon()).await.unwrap();

    let deadline = Instant::now() + Duration::from_millis(20);
    assert_eq!(pool.acquire(deadline).await.unwrap_err(), AcquireError::TimedOut);
    assert_eq!(pool.waiter_count(), 0, "timed-out waiter is removed");
}

#[tokio::test]
async fn zero_deadline_succeeds_only_when_permit_is_free() {
    let pool = ContainerPool::new(1, true);
    assert!(pool.acquire(Instant::now()).await.is_ok());
    assert_eq!(pool.acquire(Instant::now()).await.unwrap_err(), AcquireError::TimedOut);
}

#[tokio::test]
async fn release_hands_over_to_waiter_directly() {
    let pool = Arc::new(ContainerPool::new(1, true));
    let _held = pool.acquire(soon()).await.unwrap();

    let waiter_pool = pool.clone();
    let waiter = tokio::spawn(async move {
        waiter_pool.acquire(Instant::now() + Duration::from_secs(2)).await
    });

    // Let the waiter enqueue itself before releasing.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(pool.waiter_count(), 1);
    pool.release(handle("warm"));

    match waiter.await.unwrap().unwrap() {
        Acquired::Warm(h) => assert_eq!(h.container_id, "warm"),
        Acquired::Provision(_) => panic!("handover should carry the handle"),
    }
    // The handle skipped the idle stack entirely.
    assert_eq!(pool.idle_len(), 0);
    assert_eq!(pool.in_use(), 1);
}

#[tokio::test]
async fn waiters_are_woken_fifo() {
    let pool = Arc::new(ContainerPool::new(1, true));
    let _held = pool.acquire(soon()).await.unwrap();

    let first_pool = pool.clone();
    let first = tokio::spawn(async move {
        first_pool.acquire(Instant::now() + Duration::from_secs(2)).await
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let second_pool = pool.clone();
    let second = tokio::spawn(async move {
        second_pool.acquire(Instant::now() + Duration::from_secs(2)).await
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    pool.release(handle("a"));
    // The first waiter must win the first release.
    match first.await.unwrap().unwrap() {
        Acquired::Warm(h) => assert_eq!(h.container_id, "a"),
        Acquired::Provision(_) => panic!("expected handover"),
    }

    pool.release(handle("b"));
    match second.await.unwrap().unwrap() {
        Acquired::Warm(h) => assert_eq!(h.container_id, "b"),
        Acquired::Provision(_) => panic!("expected handover"),
    }
}

#[tokio::test]
async fn evict_frees_permit_and_wakes_waiter_with_provision() {
    let pool = Arc::new(ContainerPool::new(1, true));
    let _held = pool.acquire(soon()).await.unwrap();

    let waiter_pool = pool.clone();
    let waiter = tokio::spawn(async move {
        waiter_pool.acquire(Instant::now() + Duration::from_secs(2)).await
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    pool.evict();
    match waiter.await.unwrap().unwrap() {
        Acquired::Provision(_) => {}
        Acquired::Warm(_) => panic!("evicted handle must not be reused"),
    }
}

#[tokio::test]
async fn evicted_handle_never_returns() {
    let pool = ContainerPool::new(1, true);
    let _ = pool.acquire(soon()).await.unwrap();
    pool.evict();
    assert_eq!(pool.idle_len(), 0);
    assert_eq!(pool.in_use(), 0);

    // The freed permit provisions fresh instead of resurrecting the handle.
    match pool.acquire(soon()).await.unwrap() {
        Acquired::Provision(_) => {}
        Acquired::Warm(_) => panic!("no handle should be idle"),
    }
}

#[tokio::test]
async fn cancelled_waiter_is_skipped_on_release() {
    let pool = Arc::new(ContainerPool::new(1, true));
    let _held = pool.acquire(soon()).await.unwrap();

    let doomed_pool = pool.clone();
    let doomed = tokio::spawn(async move {
        doomed_pool.acquire(Instant::now() + Duration::from_secs(5)).await
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    doomed.abort();
    let _ = doomed.await;

    let live_pool = pool.clone();
    let live = tokio::spawn(async move {
        live_pool.acquire(Instant::now() + Duration::from_secs(2)).await
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    pool.release(handle("a"));
    match live.await.unwrap().unwrap() {
        Acquired::Warm(h) => assert_eq!(h.container_id, "a"),
        Acquired::Provision(_) => panic!("expected handover to the live waiter"),
    }
}

#[tokio::test]
async fn capacity_bounds_concurrent_leases() {
    let pool = Arc::new(ContainerPool::new(2, true));
    let _a = pool.acquire(soon()).await.unwrap();
    let _b = pool.acquire(soon()).await.unwrap();
    assert_eq!(pool.in_use(), 2);

    let deadline = Instant::now() + Duration::from_millis(20);
    assert_eq!(pool.acquire(deadline).await.unwrap_err(), AcquireError::TimedOut);
}
