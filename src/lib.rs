//! p4runner - typed command dispatch for a version-control backend
//!
//! p4runner sits between callers and a Perforce-style server. Every operation
//! is a typed request whose result type is fixed at compile time; the
//! [`Dispatcher`] routes it to a connector and hands back an [`Answer`] that
//! callers chain, wait on, or fan out across many independent units of work.
//!
//! # Quick Start
//!
//! ```ignore
//! use p4runner::*;
//! use p4runner::runtime::logging;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = RunnerConfig::from_file(std::path::Path::new("p4runner.toml"))?;
//! logging::init_from_config(&config);
//!
//! let backend = Arc::new(
//!     MemoryBackend::new("perforce:1666")
//!         .with_user("alice", None)
//!         .with_client("alice-ws", "alice", "/home/alice/ws"),
//! );
//! let dispatcher = Dispatcher::from_config(config);
//! dispatcher.register_server(
//!     &backend.server_name(),
//!     Arc::new(PooledConnector::from_config(backend, dispatcher.config())?),
//! );
//!
//! let client = ClientConfig::new(ServerConfig::new("perforce:1666", "alice"), "alice-ws");
//! let created = dispatcher
//!     .perform(&client, Action::new(CreateChangelist { description: "fix".into() }))
//!     .blocking_get(Duration::from_secs(5))?;
//! ```
//!
//! # Architecture
//!
//! Requests flow through the executor crate; the lower crates provide the
//! answer primitives, the worker pool, the query cache and configuration.
//! Everything a caller needs is re-exported here.

// Re-export the public API from p4runner-executor
pub use p4runner_executor::*;

/// Runtime configuration, logging and worker pool.
pub mod runtime {
    pub use p4runner_engine::logging;
    pub use p4runner_engine::{
        CacheKey, CachedEntry, PoolRejected, PoolStats, RequestPriority, WorkerPool,
        CONFIG_FILE_NAME,
    };
}

/// Answer composition primitives.
pub mod concurrency {
    pub use p4runner_concurrency::{ErrorCollector, IdempotencyGuard, UnitState};
}
