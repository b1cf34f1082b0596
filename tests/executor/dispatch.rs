//! Dispatch Tests
//!
//! Routing and at-most-once dispatch through pooled connectors under
//! concurrent callers.

use crate::common::*;
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn concurrent_actions_all_land() {
    let env = TestServer::new();
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let dispatcher = env.dispatcher.clone();
            let client = env.client.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                dispatcher
                    .perform(
                        &client,
                        Action::new(CreateChangelist {
                            description: format!("change from thread {}", i),
                        }),
                    )
                    .blocking_get(WAIT)
                    .unwrap()
                    .value
                    .changelist
                    .number
            })
        })
        .collect();

    let numbers: HashSet<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(numbers.len(), threads);
    assert_eq!(env.backend.invocation_count("CreateChangelist"), threads);
}

#[test]
fn one_identity_races_to_a_single_dispatch() {
    let env = TestServer::new();
    let action = Action::new(CreateJob {
        job: Job::new("race", "contended"),
    });
    let threads = 6;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let dispatcher = env.dispatcher.clone();
            let server = env.server.clone();
            let action = action.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                dispatcher.perform(&server, action).blocking_get(WAIT)
            })
        })
        .collect();

    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let succeeded = outcomes.iter().filter(|o| o.is_ok()).count();
    let duplicates = outcomes
        .iter()
        .filter(|o| matches!(o, Err(Error::DuplicateDispatch { .. })))
        .count();

    assert_eq!(succeeded, 1);
    assert_eq!(duplicates, threads - 1);
    assert_eq!(env.backend.invocation_count("CreateJob"), 1);
}

#[test]
fn results_are_tagged_with_their_connection() {
    let first = TestServer::new();
    let second = TestServer::new();
    // Route the second server through the first dispatcher
    first.dispatcher.register_server(
        &second.server_name(),
        Arc::new(InlineConnector::new(Arc::clone(&second.backend))),
    );

    let a = first
        .dispatcher
        .query(&first.server, Query::new(ServerInfo {}));
    let b = first
        .dispatcher
        .query(&second.server, Query::new(ServerInfo {}));

    let a = a.blocking_get(WAIT).unwrap();
    let b = b.blocking_get(WAIT).unwrap();
    assert_eq!(a.context.server_name(), &first.server_name());
    assert_eq!(b.context.server_name(), &second.server_name());
    assert_eq!(b.value.server, second.server_name());
}

#[test]
fn backend_latency_does_not_block_dispatch() {
    let env = TestServer::new();
    env.backend.set_latency(std::time::Duration::from_millis(100));

    let answer = env
        .dispatcher
        .query(&env.server, Query::new(ListUsers::default()));
    assert_eq!(answer.state(), AnswerState::Pending);
    assert!(answer.blocking_wait(std::time::Duration::ZERO).is_timed_out());

    let users = answer.blocking_get(WAIT).unwrap();
    assert_eq!(users.value.users.len(), 1);
}

#[test]
fn workspace_listing_and_history() {
    let env = TestServer::new();
    let clients = env
        .dispatcher
        .query(
            &env.server,
            Query::new(ListClientsForUser {
                user: "alice".to_string(),
                max_results: 0,
            }),
        )
        .blocking_get(WAIT)
        .unwrap();
    assert_eq!(clients.value.clients.len(), 1);
    assert_eq!(clients.value.clients[0].client_name, "alice-ws");

    let number = env.changelist_with_file("add notes", "//depot/main/notes.txt");
    env.dispatcher
        .perform(&env.client, Action::new(SubmitChangelist::all(number)))
        .blocking_get(WAIT)
        .unwrap();

    let submitted = env
        .dispatcher
        .query(
            &env.client,
            Query::new(ListSubmittedChangelists {
                path: Some(FilePath::new("//depot/main/notes")),
                max_results: 10,
            }),
        )
        .blocking_get(WAIT)
        .unwrap();
    assert_eq!(submitted.value.changelists.len(), 1);
    assert_eq!(submitted.value.changelists[0].description, "add notes");
}
