//! Concurrency tests: many callers racing on one breaker.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use tripwire::{wrap, wrap_async, LockingMode, Phase};

mod common;
use common::{config, echo_handlers, FlakyService, Reply};

#[test]
fn test_concurrent_trip_arms_single_timer() {
    let service = FlakyService::new();
    service.set_failing(true);
    let svc = service.clone();
    let breaker = Arc::new(
        wrap("race", move |n: &u32| svc.handle(n), &config(4, 5_000, 1, 100), echo_handlers()).unwrap(),
    );

    let threads = 32;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads as u32)
        .map(|n| {
            let breaker = breaker.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                breaker.call(n)
            })
        })
        .collect();
    let replies: Vec<Reply> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let state = breaker.state().load();
    assert_eq!(state.phase, Phase::Open);
    assert_eq!(state.trips, 1);
    let failed = replies.iter().filter(|r| matches!(r, Reply::Failed { .. })).count();
    let dropped = replies.iter().filter(|r| matches!(r, Reply::Dropped(_))).count();
    assert_eq!(failed + dropped, threads);
    assert_eq!(failed as u32, service.calls());
    assert!(failed >= 4);

    thread::sleep(Duration::from_millis(300));
    let state = breaker.state().load();
    assert_eq!(state.phase, Phase::HalfOpen);
    assert_eq!(state.trips, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_async_callers() {
    let service = FlakyService::new();
    service.set_failing(true);
    let svc = service.clone();
    let breaker = Arc::new(
        wrap_async(
            "async-race",
            move |n: u32| {
                let svc = svc.clone();
                async move {
                    tokio::task::yield_now().await;
                    svc.handle(&n)
                }
            },
            &config(3, 5_000, 2, 100),
            echo_handlers(),
        )
        .unwrap(),
    );

    let tasks: Vec<_> = (0..64u32)
        .map(|n| {
            let breaker = breaker.clone();
            tokio::spawn(async move { breaker.call(n).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(breaker.state().load().trips, 1);

    service.set_failing(false);
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(breaker.state().phase(), Phase::HalfOpen);
    breaker.call(100).await;
    breaker.call(101).await;
    assert_eq!(breaker.state().phase(), Phase::Closed);
}

#[test]
fn test_blocking_lock_serializes_work() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));
    let (inf, max) = (in_flight.clone(), max_seen.clone());
    let config = config(5, 1000, 1, 100).with_locking(LockingMode::Blocking);
    let breaker = Arc::new(
        wrap(
            "serial",
            move |n: &u32| {
                let now = inf.fetch_add(1, Ordering::SeqCst) + 1;
                max.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(2));
                inf.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, String>(Reply::Value(*n))
            },
            &config,
            echo_handlers(),
        )
        .unwrap(),
    );

    let handles: Vec<_> = (0..8u32)
        .map(|n| {
            let breaker = breaker.clone();
            thread::spawn(move || breaker.call(n))
        })
        .collect();
    for (n, h) in handles.into_iter().enumerate() {
        assert_eq!(h.join().unwrap(), Reply::Value(n as u32));
    }
    assert_eq!(max_seen.load(Ordering::SeqCst), 1);
}

#[test]
fn test_try_lock_drops_contended_calls() {
    let entered = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));
    let (e, r) = (entered.clone(), release.clone());
    let config = config(5, 1000, 1, 100).with_locking(LockingMode::Try);
    let breaker = Arc::new(
        wrap(
            "try",
            move |n: &u32| {
                if *n == 0 {
                    e.wait();
                    r.wait();
                }
                Ok::<_, String>(Reply::Value(*n))
            },
            &config,
            echo_handlers(),
        )
        .unwrap(),
    );

    let holder = {
        let breaker = breaker.clone();
        thread::spawn(move || breaker.call(0))
    };
    entered.wait();
    assert_eq!(breaker.call(1), Reply::Dropped(1));
    release.wait();
    assert_eq!(holder.join().unwrap(), Reply::Value(0));
    assert_eq!(breaker.call(2), Reply::Value(2));
    assert_eq!(breaker.state().phase(), Phase::Closed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_async_blocking_lock_serializes_work() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));
    let (inf, max) = (in_flight.clone(), max_seen.clone());
    let config = config(5, 1000, 1, 100).with_locking(LockingMode::Blocking);
    let breaker = Arc::new(
        wrap_async(
            "async-serial",
            move |n: u32| {
                let (inf, max) = (inf.clone(), max.clone());
                async move {
                    let now = inf.fetch_add(1, Ordering::SeqCst) + 1;
                    max.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    inf.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, String>(Reply::Value(n))
                }
            },
            &config,
            echo_handlers(),
        )
        .unwrap(),
    );

    let tasks: Vec<_> = (0..16u32)
        .map(|n| {
            let breaker = breaker.clone();
            tokio::spawn(async move { breaker.call(n).await })
        })
        .collect();
    for (n, task) in tasks.into_iter().enumerate() {
        assert_eq!(task.await.unwrap(), Reply::Value(n as u32));
    }
    assert_eq!(max_seen.load(Ordering::SeqCst), 1);
}
