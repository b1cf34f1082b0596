//! Idempotency guard under contention.

use crate::common::*;
use p4runner::concurrency::{IdempotencyGuard, UnitState};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn exactly_one_thread_wins_a_key() {
    let guard = IdempotencyGuard::<u64>::new();
    let winners = Arc::new(AtomicUsize::new(0));
    let threads = 16;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let guard = guard.clone();
            let winners = Arc::clone(&winners);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                if guard.try_reserve(&7) {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(winners.load(Ordering::SeqCst), 1);
    assert_eq!(guard.state(&7), UnitState::Reserved);
    assert_eq!(guard.len(), 1);
}

#[test]
fn settled_state_is_final() {
    let guard = IdempotencyGuard::<&str>::new();
    assert!(guard.try_reserve(&"cl-1"));
    guard.settle(&"cl-1", false);
    guard.settle(&"cl-1", true);

    assert_eq!(guard.state(&"cl-1"), UnitState::Failed);
    assert!(!guard.try_reserve(&"cl-1"));

    // Settling something never reserved leaves it absent
    guard.settle(&"cl-2", true);
    assert_eq!(guard.state(&"cl-2"), UnitState::Absent);
}

#[test]
fn unit_keys_separate_changelists_by_workspace() {
    let server = ServerName::new("perforce:1666");
    let key = |client: &str, number: u64| {
        UnitKey::Changelist(ChangelistId::new(
            ClientServerRef {
                server: server.clone(),
                client_name: client.to_string(),
            },
            number,
        ))
    };

    let guard = IdempotencyGuard::new();
    assert!(guard.try_reserve(&key("alice-ws", 12)));
    assert!(guard.try_reserve(&key("bob-ws", 12)));
    assert!(!guard.try_reserve(&key("alice-ws", 12)));
    assert_eq!(guard.len(), 2);
}

proptest! {
    /// However keys repeat, each distinct key is won exactly once.
    #[test]
    fn each_distinct_key_is_won_once(keys in prop::collection::vec(0u8..16, 0..64)) {
        let guard = IdempotencyGuard::new();
        let won: Vec<u8> = keys.iter().copied().filter(|k| guard.try_reserve(k)).collect();

        let mut distinct = keys.clone();
        distinct.sort_unstable();
        distinct.dedup();
        let mut sorted_won = won.clone();
        sorted_won.sort_unstable();

        prop_assert_eq!(sorted_won, distinct.clone());
        prop_assert_eq!(guard.len(), distinct.len());
        prop_assert_eq!(guard.is_empty(), keys.is_empty());
    }
}
