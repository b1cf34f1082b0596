//! Shared test utilities for all integration test suites.
//!
//! Import via `mod common;` (or `#[path]`) from any test's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub use p4runner::runtime::logging;
pub use p4runner::*;

/// Default wait budget for blocking calls in tests.
pub const WAIT: Duration = Duration::from_secs(10);

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// A unique server address so parallel tests never share routes.
pub fn unique_server() -> String {
    format!("test-{}:1666", COUNTER.fetch_add(1, Ordering::Relaxed))
}

// ============================================================================
// TestServer - one pooled in-memory server behind a dispatcher
// ============================================================================

/// Dispatcher wired to one in-memory server with one user and workspace.
pub struct TestServer {
    pub backend: Arc<MemoryBackend>,
    pub dispatcher: Dispatcher,
    pub server: ServerConfig,
    pub client: ClientConfig,
}

impl TestServer {
    /// Pooled connector, default configuration.
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    pub fn with_config(config: RunnerConfig) -> Self {
        logging::init_for_tests();
        let address = unique_server();
        let backend = Arc::new(
            MemoryBackend::new(address.clone())
                .with_user("alice", None)
                .with_client("alice-ws", "alice", "/home/alice/ws")
                .with_depot_file("//depot/main/readme.txt")
                .with_depot_file("//depot/main/build.toml"),
        );
        let connector = PooledConnector::from_config(Arc::clone(&backend), &config)
            .expect("worker pool should start");
        let dispatcher = Dispatcher::from_config(config);
        dispatcher.register_server(&backend.server_name(), Arc::new(connector));

        let server = ServerConfig::new(address, "alice");
        let client = ClientConfig::new(server.clone(), "alice-ws");
        Self {
            backend,
            dispatcher,
            server,
            client,
        }
    }

    pub fn server_name(&self) -> ServerName {
        self.server.server_name.clone()
    }

    /// Create a numbered pending changelist.
    pub fn changelist(&self, description: &str) -> u64 {
        self.dispatcher
            .perform(
                &self.client,
                Action::new(CreateChangelist {
                    description: description.to_string(),
                }),
            )
            .blocking_get(WAIT)
            .expect("create changelist")
            .value
            .changelist
            .number
    }

    /// Create a changelist with one new file opened for add.
    pub fn changelist_with_file(&self, description: &str, file: &str) -> u64 {
        let number = self.changelist(description);
        self.dispatcher
            .perform(
                &self.client,
                Action::new(AddEditFile {
                    file: FilePath::new(file),
                    changelist: number,
                }),
            )
            .blocking_get(WAIT)
            .expect("open file for add");
        number
    }

    /// Create a job on the server.
    pub fn job(&self, id: &str) -> JobId {
        self.dispatcher
            .perform(
                &self.server,
                Action::new(CreateJob {
                    job: Job::new(id, format!("{} tracked work", id)),
                }),
            )
            .blocking_get(WAIT)
            .expect("create job")
            .value
            .job
            .id
    }
}
