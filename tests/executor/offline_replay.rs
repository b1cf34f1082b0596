//! Offline Replay Tests
//!
//! Deferred actions over a pooled connector: replay order, curation, and
//! queries served from cache while offline.

use crate::common::*;

#[test]
fn deferred_work_replays_in_order_after_reconnect() {
    let env = TestServer::new();
    let number = env.changelist("offline edits");
    let server = env.server_name();
    env.dispatcher.go_offline(&server);

    let answers = vec![
        env.dispatcher.perform(
            &env.client,
            Action::new(AddEditFile {
                file: FilePath::new("//depot/main/one.txt"),
                changelist: number,
            }),
        ),
        env.dispatcher.perform(
            &env.client,
            Action::new(AddEditFile {
                file: FilePath::new("//depot/main/two.txt"),
                changelist: number,
            }),
        ),
    ];
    let rename = env.dispatcher.perform(
        &env.client,
        Action::new(EditChangelistDescription {
            changelist: number,
            description: "renamed offline".to_string(),
        }),
    );
    assert_eq!(env.dispatcher.pending_actions(&server).len(), 3);

    assert_eq!(env.dispatcher.reconnect(&server), 3);
    for answer in &answers {
        assert_eq!(answer.blocking_get(WAIT).unwrap().value.action, FileAction::Add);
    }
    rename.blocking_get(WAIT).unwrap();

    let commands = env.backend.invoked_commands();
    let replayed = &commands[commands.len() - 3..];
    assert_eq!(
        replayed,
        &["AddEditFile", "AddEditFile", "EditChangelistDescription"]
    );
}

#[test]
fn offline_queries_fall_back_to_cache() {
    let env = TestServer::new();
    let server = env.server_name();
    let jobs = || Query::new(ListJobs::default());

    let online = env
        .dispatcher
        .query(&env.server, jobs())
        .blocking_get(WAIT)
        .unwrap();
    env.dispatcher.go_offline(&server);

    let offline = env
        .dispatcher
        .query(&env.server, jobs())
        .blocking_get(WAIT)
        .unwrap();
    assert!(offline.from_cache);
    assert_eq!(offline.value, online.value);

    let uncached = env
        .dispatcher
        .query(&env.server, Query::new(GetJobSpec {}))
        .blocking_get(WAIT)
        .unwrap_err();
    assert!(matches!(uncached, Error::Offline { .. }));
}

#[test]
fn attaching_the_same_job_twice_offline_runs_once() {
    let env = TestServer::new();
    let job = env.job("job-offline");
    let number = env.changelist("attach target");
    let server = env.server_name();
    env.dispatcher.go_offline(&server);

    let attach = || {
        env.dispatcher.perform(
            &env.client,
            Action::new(AddJobToChangelist {
                changelist: number,
                job: job.clone(),
            }),
        )
    };
    let first = attach();
    let second = attach();
    let pending = env.dispatcher.pending_actions(&server);
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].followers, 1);

    env.dispatcher.reconnect(&server);
    assert_eq!(first.blocking_get(WAIT).unwrap().value.jobs, vec![job.clone()]);
    assert_eq!(second.blocking_get(WAIT).unwrap().value.jobs, vec![job]);
    assert_eq!(env.backend.invocation_count("AddJobToChangelist"), 1);
}

#[test]
fn dropped_connection_is_detected_and_recovered() {
    let env = TestServer::new();
    let server = env.server_name();
    env.backend.set_connected(false);

    let err = env
        .dispatcher
        .perform(
            &env.client,
            Action::new(CreateChangelist {
                description: "lost".to_string(),
            }),
        )
        .blocking_get(WAIT)
        .unwrap_err();
    assert!(err.is_connection_loss());
    assert_eq!(
        env.dispatcher.connection_state(&server),
        ConnectionState::Disconnected
    );

    let deferred = env.dispatcher.perform(
        &env.client,
        Action::new(CreateChangelist {
            description: "waits for the network".to_string(),
        }),
    );
    env.backend.set_connected(true);
    assert_eq!(env.dispatcher.reconnect(&server), 1);
    let created = deferred.blocking_get(WAIT).unwrap();
    assert!(!created.value.changelist.is_default());
}
