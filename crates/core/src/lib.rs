//! Core types for p4runner
//!
//! This crate defines the foundational types used throughout the system:
//! - Error / ErrorCategory: the failure taxonomy carried by answers
//! - ConnectionContext: server- or client-scoped connection a request targets
//! - Identifiers: ServerName, ClientServerRef, ChangelistId, JobId, FilePath, ActionId
//! - UnitKey: logical unit-of-work identity for fan-out deduplication
//! - Values: jobs, users, clients, changelists and file state returned by the backend

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;
pub mod values;

pub use error::{panic_message, Error, ErrorCategory, Result};
pub use types::{
    ActionId, ChangelistId, ClientConfig, ClientServerRef, ConnectionContext, FilePath, JobId,
    ServerConfig, ServerName, UnitKey, DEFAULT_CHANGELIST,
};
pub use values::{
    ClientSummary, CommittedFile, FileAction, FileDetails, FileRevision, Job, JobSpec, JobStatus,
    OpenedFile, RemoteChangelist, User,
};
