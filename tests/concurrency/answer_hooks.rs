//! Hook ordering and single settlement of answers.

use crate::common::*;
use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Hooks run in registration order whether they were added before or
    /// after the answer settled.
    #[test]
    fn hooks_run_in_registration_order(before in 0usize..8, after in 0usize..8, value in any::<u32>()) {
        let (promise, answer) = Answer::<u32>::pending();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..before {
            let seen = Arc::clone(&seen);
            answer.clone().when_completed(move |outcome| {
                seen.lock().push((i, *outcome.unwrap()));
            });
        }
        promise.resolve(value);
        for i in before..before + after {
            let seen = Arc::clone(&seen);
            answer.clone().when_completed(move |outcome| {
                seen.lock().push((i, *outcome.unwrap()));
            });
        }

        let expected: Vec<(usize, u32)> = (0..before + after).map(|i| (i, value)).collect();
        prop_assert_eq!(seen.lock().clone(), expected);
    }

    /// A failure skips every mapped step and reaches the end unchanged.
    #[test]
    fn failure_short_circuits_chains(depth in 1usize..6, reason in "[a-z]{1,12}") {
        let calls = Arc::new(Mutex::new(0usize));
        let mut answer: Answer<u32> = Answer::failed(Error::invalid_input(reason.clone()));
        for _ in 0..depth {
            let calls = Arc::clone(&calls);
            answer = answer.map_async(move |v| {
                *calls.lock() += 1;
                Answer::resolved(v + 1)
            });
        }

        prop_assert_eq!(*calls.lock(), 0);
        prop_assert_eq!(
            answer.blocking_get(Duration::ZERO).unwrap_err(),
            Error::invalid_input(reason)
        );
    }
}

#[test]
fn racing_settle_and_register_runs_each_hook_once() {
    for _ in 0..50 {
        let (promise, answer) = Answer::<u32>::pending();
        let runs = Arc::new(Mutex::new(0usize));

        let registrar = {
            let answer = answer.clone();
            let runs = Arc::clone(&runs);
            thread::spawn(move || {
                for _ in 0..20 {
                    let runs = Arc::clone(&runs);
                    answer.clone().when_resolved(move |_| *runs.lock() += 1);
                }
            })
        };
        let settler = thread::spawn(move || promise.resolve(1));

        registrar.join().unwrap();
        settler.join().unwrap();
        assert_eq!(answer.blocking_get(WAIT).unwrap(), 1);
        assert_eq!(*runs.lock(), 20);
    }
}

#[test]
fn dropped_promise_fails_its_answer() {
    let (promise, answer) = Answer::<u32>::pending();
    thread::spawn(move || drop(promise)).join().unwrap();

    let err = answer.blocking_get(WAIT).unwrap_err();
    assert!(matches!(err, Error::Internal { .. }));
}

#[test]
fn waiters_on_many_threads_see_one_outcome() {
    let (promise, answer) = Answer::<String>::pending();
    let waiters: Vec<_> = (0..8)
        .map(|_| {
            let answer = answer.clone();
            thread::spawn(move || answer.blocking_get(WAIT))
        })
        .collect();

    thread::sleep(Duration::from_millis(10));
    promise.resolve("done".to_string());

    for waiter in waiters {
        assert_eq!(waiter.join().unwrap().unwrap(), "done");
    }
    assert_eq!(answer.state(), AnswerState::Resolved);
}
