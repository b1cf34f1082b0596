//! Worker pool behaviour seen from outside the engine.

use p4runner::runtime::{PoolRejected, RequestPriority, WorkerPool};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn many_producers_drain_to_idle() {
    let pool = Arc::new(WorkerPool::new(4, 0).unwrap());
    let done = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..4)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                for _ in 0..25 {
                    let done = Arc::clone(&done);
                    pool.submit(RequestPriority::Query, move || {
                        done.fetch_add(1, Ordering::SeqCst);
                    })
                    .unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    pool.wait_idle();
    assert_eq!(done.load(Ordering::SeqCst), 100);
    let stats = pool.stats();
    assert_eq!(stats.completed, 100);
    assert_eq!(stats.queued, 0);
    assert_eq!(stats.workers, 4);
}

#[test]
fn actions_overtake_queued_queries() {
    let pool = WorkerPool::new(1, 0).unwrap();
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    pool.submit(RequestPriority::Query, move || {
        started_tx.send(()).unwrap();
        release_rx.recv().unwrap();
    })
    .unwrap();
    started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    let (order_tx, order_rx) = mpsc::channel();
    for (label, priority) in [
        ("replay", RequestPriority::Background),
        ("list", RequestPriority::Query),
        ("submit", RequestPriority::Action),
    ] {
        let order_tx = order_tx.clone();
        pool.submit(priority, move || order_tx.send(label).unwrap())
            .unwrap();
    }
    release_tx.send(()).unwrap();
    pool.wait_idle();

    let order: Vec<&str> = order_rx.try_iter().collect();
    assert_eq!(order, vec!["submit", "list", "replay"]);
}

#[test]
fn bounded_queue_rejects_overflow() {
    let pool = WorkerPool::new(1, 1).unwrap();
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    pool.submit(RequestPriority::Action, move || {
        started_tx.send(()).unwrap();
        release_rx.recv().unwrap();
    })
    .unwrap();
    started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    pool.submit(RequestPriority::Action, || {}).unwrap();
    assert_eq!(
        pool.submit(RequestPriority::Action, || {}),
        Err(PoolRejected::QueueFull { max_queued: 1 })
    );

    release_tx.send(()).unwrap();
    pool.wait_idle();
    pool.submit(RequestPriority::Action, || {}).unwrap();
    pool.wait_idle();
}

#[test]
fn shutdown_finishes_queued_work_then_rejects() {
    let pool = WorkerPool::new(2, 0).unwrap();
    let done = Arc::new(AtomicUsize::new(0));
    for _ in 0..10 {
        let done = Arc::clone(&done);
        pool.submit(RequestPriority::Background, move || {
            std::thread::sleep(Duration::from_millis(1));
            done.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }

    pool.shutdown();
    assert_eq!(done.load(Ordering::SeqCst), 10);
    assert_eq!(
        pool.submit(RequestPriority::Query, || {}),
        Err(PoolRejected::ShutDown)
    );
}

#[test]
fn panicking_request_does_not_wedge_the_pool() {
    let pool = WorkerPool::new(1, 0).unwrap();
    pool.submit(RequestPriority::Query, || panic!("backend exploded"))
        .unwrap();
    let (tx, rx) = mpsc::channel();
    pool.submit(RequestPriority::Query, move || tx.send(7).unwrap())
        .unwrap();

    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 7);
    pool.wait_idle();
    assert_eq!(pool.stats().completed, 2);
}
