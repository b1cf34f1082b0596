//! Fan-Out Tests
//!
//! Multi-changelist submits over a pooled connector: partial failure,
//! duplicate units, deadlines.

use crate::common::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn partial_failure_is_reported_per_unit() {
    let env = TestServer::new();
    let ok_a = env.changelist_with_file("a", "//depot/main/a.txt");
    let broken = env.changelist("nothing opened");
    let ok_c = env.changelist_with_file("c", "//depot/main/c.txt");

    let units: Vec<SubmitUnit> = [ok_a, broken, ok_c]
        .iter()
        .map(|&n| SubmitUnit::new(env.client.clone(), n))
        .collect();
    let keys: Vec<UnitKey> = units.iter().map(SubmitUnit::key).collect();

    let fan_out = env.dispatcher.fan_out::<SubmitChangelistResult>();
    let answers: Vec<_> = units
        .into_iter()
        .map(|unit| fan_out.submit_changelist(unit))
        .collect();
    let report = fan_out.join(env.dispatcher.config().submit_timeout());

    assert_eq!(report.errors.len(), 1);
    let failure = report.errors.iter().next().unwrap();
    assert_eq!(failure.unit, keys[1]);
    assert_eq!(failure.error.category(), ErrorCategory::ServerError);

    let succeeded: Vec<&UnitKey> = report.succeeded.iter().map(|(key, _)| key).collect();
    assert_eq!(succeeded, vec![&keys[0], &keys[2]]);
    assert!(answers[0].blocking_get(WAIT).unwrap().is_some());
    assert!(answers[1].blocking_get(WAIT).is_err());
    assert!(answers[2].blocking_get(WAIT).unwrap().is_some());
    assert_eq!(env.backend.invocation_count("SubmitChangelist"), 3);
}

#[test]
fn unit_reached_twice_is_submitted_once() {
    let env = TestServer::new();
    let number = env.changelist_with_file("shared", "//depot/main/shared.txt");
    let hooks = Arc::new(AtomicUsize::new(0));

    let fan_out = env.dispatcher.fan_out::<SubmitChangelistResult>();
    for _ in 0..4 {
        let hooks = Arc::clone(&hooks);
        fan_out.submit_changelist(
            SubmitUnit::new(env.client.clone(), number).on_submitted(move |_| {
                hooks.fetch_add(1, Ordering::SeqCst);
            }),
        );
    }

    let report = fan_out.join(WAIT);
    assert!(report.is_success());
    assert_eq!(report.succeeded.len(), 1);
    assert_eq!(report.skipped.len(), 3);
    assert_eq!(hooks.load(Ordering::SeqCst), 1);
    assert_eq!(env.backend.invocation_count("SubmitChangelist"), 1);
}

#[test]
fn submit_fixes_jobs_with_requested_status() {
    let env = TestServer::new();
    let job = env.job("job-fix");
    let number = env.changelist_with_file("fix it", "//depot/main/fix.txt");

    let fan_out = env.dispatcher.fan_out::<SubmitChangelistResult>();
    let answer = fan_out.submit_changelist(
        SubmitUnit::new(env.client.clone(), number)
            .with_jobs(vec![job.clone()])
            .with_job_status(JobStatus::Suspended)
            .with_description("fixed, parked for verification"),
    );

    let result = answer.blocking_get(WAIT).unwrap().unwrap();
    assert_eq!(result.jobs, vec![job.clone()]);
    assert_eq!(
        env.backend.job(job.as_str()).unwrap().status,
        JobStatus::Suspended
    );

    let described = env
        .dispatcher
        .query(
            &env.server,
            Query::new(DescribeChangelist {
                number: result.submitted.number,
            }),
        )
        .blocking_get(WAIT)
        .unwrap();
    assert_eq!(
        described.value.changelist.description,
        "fixed, parked for verification"
    );
}

#[test]
fn partial_file_submit_leaves_the_rest_pending() {
    let env = TestServer::new();
    let number = env.changelist_with_file("two files", "//depot/main/one.txt");
    env.dispatcher
        .perform(
            &env.client,
            Action::new(AddEditFile {
                file: FilePath::new("//depot/main/two.txt"),
                changelist: number,
            }),
        )
        .blocking_get(WAIT)
        .unwrap();

    let errors = env.dispatcher.submit_all(
        vec![SubmitUnit::new(env.client.clone(), number)
            .with_files(vec![FilePath::new("//depot/main/one.txt")])],
        WAIT,
    );
    assert!(errors.is_empty());

    let state = env
        .dispatcher
        .query(&env.client, Query::new(ListOpenedFilesChanges::default()))
        .blocking_get(WAIT)
        .unwrap();
    assert_eq!(state.value.opened.len(), 1);
    assert_eq!(state.value.opened[0].depot_path.as_str(), "//depot/main/two.txt");
    assert_eq!(state.value.pending[0].id.number, number);
}

#[test]
fn slow_backend_hits_the_deadline() {
    let env = TestServer::new();
    let number = env.changelist_with_file("slow", "//depot/main/slow.txt");
    env.backend.set_latency(Duration::from_millis(300));

    let units = vec![SubmitUnit::new(env.client.clone(), number)];
    let key = units[0].key();
    let errors = env.dispatcher.submit_all(units, Duration::from_millis(20));

    assert!(matches!(errors.for_unit(&key), Some(Error::Timeout { .. })));
}

#[test]
fn job_fan_out_creates_each_job_once() {
    let env = TestServer::new();
    let fan_out = env.dispatcher.fan_out::<CreateJobResult>();

    for id in ["job-a", "job-b", "job-a", "job-c", "job-b"] {
        fan_out.create_job(&env.server, Job::new(id, "batch"));
    }

    let report = fan_out.join(WAIT);
    let created: Vec<&str> = report
        .succeeded
        .iter()
        .map(|(_, result)| result.job.id.as_str())
        .collect();
    assert_eq!(created, vec!["job-a", "job-b", "job-c"]);
    assert_eq!(report.skipped.len(), 2);
}
