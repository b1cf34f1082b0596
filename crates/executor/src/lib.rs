//! # p4runner Executor
//!
//! Typed command dispatch and asynchronous answer composition for a
//! version-control backend.
//!
//! This crate provides:
//! - [`Command`]/[`Output`] - the closed operation catalog and its results
//! - [`Query`]/[`Action`] - typed request envelopes; the result type of
//!   every request is fixed at compile time
//! - [`Dispatcher`] - routes requests to connectors, caches queries,
//!   defers actions while offline
//! - [`FanOut`] - dispatches independent units of work at most once each
//!   and joins them against one deadline
//! - [`MemoryBackend`] - an in-memory server for tests and offline use
//!
//! ## Quick Start
//!
//! ```text
//! use p4runner_executor::*;
//!
//! let backend = Arc::new(MemoryBackend::new("perforce:1666").with_user("alice", None));
//! let dispatcher = Dispatcher::default();
//! dispatcher.register_server(
//!     &backend.server_name(),
//!     Arc::new(PooledConnector::from_config(backend, dispatcher.config())?),
//! );
//!
//! let server = ServerConfig::new("perforce:1666", "alice");
//! let users = dispatcher
//!     .query(&server, Query::new(ListUsers::default()))
//!     .blocking_get(Duration::from_secs(5))?;
//! ```
//!
//! ## Operation Kinds
//!
//! | Kind | Context | Cached | At most once |
//! |------|---------|--------|--------------|
//! | **ServerQuery** | `ServerConfig` | yes | - |
//! | **ClientQuery** | `ClientConfig` | yes | - |
//! | **ServerAction** | `ServerConfig` | - | yes |
//! | **ClientAction** | `ClientConfig` | - | yes |

#![warn(missing_docs)]
#![warn(clippy::all)]

mod command;
mod connector;
mod dispatcher;
mod fanout;
mod offline;
mod output;
mod request;
pub mod requests;

// Handler modules
mod handlers;

// Test modules
#[cfg(test)]
mod tests;

// =============================================================================
// Public API - Everything users need is re-exported here
// =============================================================================

pub use command::{Command, Mutation, OperationKind, Scope};
pub use connector::{Backend, BackendConnector, InlineConnector, PooledConnector};
pub use dispatcher::{ConnectionState, Dispatcher};
pub use fanout::{FanOut, FanOutReport, SubmitHook, SubmitUnit};
pub use handlers::{Invocation, MemoryBackend};
pub use offline::PendingAction;
pub use output::{ActionResult, Output, QueryResult};
pub use request::{
    Action, ActionAnswer, ActionRequest, ClientScope, Envelope, FutureResult, Query, QueryAnswer,
    QueryRequest, Request, RequestScope, ServerScope,
};
pub use requests::*;

// Re-export the building blocks so users don't need the lower crates directly
pub use p4runner_concurrency::{
    Answer, AnswerState, ErrorList, IdempotencyGuard, Promise, UnitFailure, UnitState, WaitOutcome,
};
pub use p4runner_core::{
    ActionId, ChangelistId, ClientConfig, ClientServerRef, ClientSummary, CommittedFile,
    ConnectionContext, Error, ErrorCategory, FileAction, FileDetails, FilePath, FileRevision, Job,
    JobId, JobSpec, JobStatus, OpenedFile, RemoteChangelist, Result, ServerConfig, ServerName,
    UnitKey, User, DEFAULT_CHANGELIST,
};
pub use p4runner_engine::{CacheConfig, MemoryQueryCache, QueryCache, RunnerConfig};
