//! Configuration Tests
//!
//! `p4runner.toml` loading and the way its settings shape a dispatcher.

use crate::common::*;
use p4runner::runtime::CONFIG_FILE_NAME;
use tempfile::TempDir;

#[test]
fn default_file_is_written_once_and_loads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);

    RunnerConfig::write_default_if_missing(&path).unwrap();
    std::fs::write(&path, "worker_threads = 2\n").unwrap();
    RunnerConfig::write_default_if_missing(&path).unwrap();

    let config = RunnerConfig::from_file(&path).unwrap();
    assert_eq!(config.worker_threads, 2);
    assert!(config.cache.enabled);
    assert!(config.queue_offline_actions);
}

#[test]
fn written_config_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);

    let mut config = RunnerConfig::default();
    config.submit_timeout_ms = 1_500;
    config.cache.ttl_ms = 10;
    config.log_filter = "p4runner=debug".to_string();
    config.write_to_file(&path).unwrap();

    let loaded = RunnerConfig::from_file(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.submit_timeout().as_millis(), 1_500);
}

#[test]
fn invalid_file_names_the_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "worker_threads = 0\n").unwrap();

    let err = RunnerConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
    assert!(err.to_string().contains("worker_threads"));
    assert!(err.to_string().contains(CONFIG_FILE_NAME));
}

#[test]
fn missing_file_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    let err = RunnerConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Os);
}

#[test]
fn loaded_settings_drive_the_dispatcher() {
    let config = RunnerConfig::from_toml_str(
        r#"
        worker_threads = 1
        queue_offline_actions = false

        [cache]
        enabled = false
        "#,
    )
    .unwrap();
    let env = TestServer::with_config(config);

    for _ in 0..2 {
        let users = env
            .dispatcher
            .query(&env.server, Query::new(ListUsers::default()))
            .blocking_get(WAIT)
            .unwrap();
        assert!(!users.from_cache);
    }

    env.dispatcher.go_offline(&env.server_name());
    let err = env
        .dispatcher
        .perform(&env.server, Action::new(CreateJob { job: Job::new("j", "d") }))
        .blocking_get(WAIT)
        .unwrap_err();
    assert!(matches!(err, Error::Offline { .. }));
}
