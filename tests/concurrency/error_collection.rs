//! Failure aggregation across threads.

use crate::common::*;
use p4runner::concurrency::ErrorCollector;
use std::thread;

#[test]
fn failures_keep_push_order() {
    let collector = ErrorCollector::new();
    collector.push("cl-3", Error::invalid_input("nothing to submit"));
    collector.push("cl-1", Error::backend(ErrorCategory::AccessDenied, "no permission"));

    let list = collector.finish();
    let units: Vec<&str> = list.iter().map(|f| f.unit).collect();
    assert_eq!(units, vec!["cl-3", "cl-1"]);
    assert_eq!(
        list.for_unit(&"cl-1").map(Error::category),
        Some(ErrorCategory::AccessDenied)
    );
    assert_eq!(list.for_unit(&"cl-2"), None);
}

#[test]
fn concurrent_pushes_are_all_kept() {
    let collector = ErrorCollector::new();
    let handles: Vec<_> = (0..8u64)
        .map(|i| {
            let collector = collector.clone();
            thread::spawn(move || {
                for j in 0..10u64 {
                    collector.push(i * 100 + j, Error::internal("boom"));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let list = collector.finish();
    assert_eq!(list.len(), 80);
    // Each thread's pushes stay in its own order
    for i in 0..8u64 {
        let mine: Vec<u64> = list
            .iter()
            .map(|f| f.unit)
            .filter(|unit| unit / 100 == i)
            .collect();
        assert_eq!(mine, (0..10).map(|j| i * 100 + j).collect::<Vec<_>>());
    }
}

#[test]
fn empty_list_is_success() {
    let collector = ErrorCollector::<u64>::new();
    assert!(collector.is_empty());
    assert!(collector.finish().into_result().is_ok());
}

#[test]
fn failed_list_renders_each_unit() {
    let collector = ErrorCollector::new();
    collector.push(41u64, Error::timeout(std::time::Duration::from_millis(20)));
    collector.push(42u64, Error::invalid_input("unknown job"));

    let list = collector.finish().into_result().unwrap_err();
    let text = list.to_string();
    assert!(text.starts_with("2 unit(s) failed"));
    assert!(text.contains("41: "));
    assert!(text.contains("unknown job"));

    let owned: Vec<UnitFailure<u64>> = list.into_iter().collect();
    assert_eq!(owned[1].unit, 42);
}
