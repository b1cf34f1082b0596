//! Command enum defining every backend operation.
//!
//! Commands are the closed instruction set of the runner. Each variant wraps
//! the typed request struct for one operation; the [`Request`] impl on that
//! struct binds it to its scope and result type at compile time. The enum is
//! what crosses the connector boundary and what the query cache keys on.
//!
//! Commands are:
//! - **Self-contained**: All parameters needed for execution are in the request
//! - **Serializable**: Can be converted to/from JSON
//! - **Classified**: Every command has exactly one [`OperationKind`]
//!
//! [`Request`]: crate::request::Request

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::requests::*;

/// Whether an operation is server-wide or bound to a client workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// Needs only a server connection
    Server,
    /// Needs a client workspace
    Client,
}

/// Whether an operation reads or mutates backend state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mutation {
    /// Read-only, cache-eligible
    Query,
    /// Mutating, identified, dispatched at most once
    Action,
}

/// Operation kind: scope x mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// Server-wide read
    ServerQuery,
    /// Workspace-bound read
    ClientQuery,
    /// Server-wide mutation
    ServerAction,
    /// Workspace-bound mutation
    ClientAction,
}

impl OperationKind {
    /// Scope axis
    pub const fn scope(self) -> Scope {
        match self {
            OperationKind::ServerQuery | OperationKind::ServerAction => Scope::Server,
            OperationKind::ClientQuery | OperationKind::ClientAction => Scope::Client,
        }
    }

    /// Mutation axis
    pub const fn mutation(self) -> Mutation {
        match self {
            OperationKind::ServerQuery | OperationKind::ClientQuery => Mutation::Query,
            OperationKind::ServerAction | OperationKind::ClientAction => Mutation::Action,
        }
    }

    /// Whether this is a mutating kind
    pub const fn is_action(self) -> bool {
        matches!(self.mutation(), Mutation::Action)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A command is a self-contained, serializable backend operation.
///
/// # Command Categories
///
/// | Kind | Count | Commands |
/// |------|-------|----------|
/// | Server query | 7 | server info, changelist describe, jobs, job spec, users, clients, fixes |
/// | Client query | 4 | opened files, submitted changelists, file details, file history |
/// | Server action | 2 | create job, login |
/// | Client action | 13 | file, changelist, job attachment, submit, fetch, shelve |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    // ==================== Server queries (7) ====================
    /// Server identity and version.
    /// Returns: `Output::ServerInfo`
    ServerInfo(ServerInfo),

    /// One changelist by number.
    /// Returns: `Output::DescribeChangelist`
    DescribeChangelist(DescribeChangelist),

    /// Jobs by id list, pattern, or all.
    /// Returns: `Output::ListJobs`
    ListJobs(ListJobs),

    /// The server's job specification.
    /// Returns: `Output::GetJobSpec`
    GetJobSpec(GetJobSpec),

    /// Known users.
    /// Returns: `Output::ListUsers`
    ListUsers(ListUsers),

    /// Client workspaces owned by a user.
    /// Returns: `Output::ListClientsForUser`
    ListClientsForUser(ListClientsForUser),

    /// Submitted changelists that fix a job.
    /// Returns: `Output::ListChangelistsFixedByJob`
    ListChangelistsFixedByJob(ListChangelistsFixedByJob),

    // ==================== Client queries (4) ====================
    /// Opened files and pending changelists of the client.
    /// Returns: `Output::ListOpenedFilesChanges`
    ListOpenedFilesChanges(ListOpenedFilesChanges),

    /// Submitted changelists, newest first.
    /// Returns: `Output::ListSubmittedChangelists`
    ListSubmittedChangelists(ListSubmittedChangelists),

    /// Head, have and open state of files.
    /// Returns: `Output::ListFilesDetails`
    ListFilesDetails(ListFilesDetails),

    /// Revision history of one file.
    /// Returns: `Output::ListFileHistory`
    ListFileHistory(ListFileHistory),

    // ==================== Server actions (2) ====================
    /// Create or update a job.
    /// Returns: `Output::CreateJob`
    CreateJob(CreateJob),

    /// Authenticate the connection user.
    /// Returns: `Output::Login`
    Login(Login),

    // ==================== Client actions (13) ====================
    /// Open a file for add or edit.
    /// Returns: `Output::AddEditFile`
    AddEditFile(AddEditFile),

    /// Open a file for delete.
    /// Returns: `Output::DeleteFile`
    DeleteFile(DeleteFile),

    /// Revert an opened file.
    /// Returns: `Output::RevertFile`
    RevertFile(RevertFile),

    /// Move (rename) a file.
    /// Returns: `Output::MoveFile`
    MoveFile(MoveFile),

    /// Reopen files into another pending changelist.
    /// Returns: `Output::MoveFilesToChangelist`
    MoveFilesToChangelist(MoveFilesToChangelist),

    /// Create a numbered pending changelist.
    /// Returns: `Output::CreateChangelist`
    CreateChangelist(CreateChangelist),

    /// Delete an empty pending changelist.
    /// Returns: `Output::DeleteChangelist`
    DeleteChangelist(DeleteChangelist),

    /// Replace a pending changelist's description.
    /// Returns: `Output::EditChangelistDescription`
    EditChangelistDescription(EditChangelistDescription),

    /// Attach a job to a pending changelist.
    /// Returns: `Output::AddJobToChangelist`
    AddJobToChangelist(AddJobToChangelist),

    /// Detach a job from a pending changelist.
    /// Returns: `Output::RemoveJobFromChangelist`
    RemoveJobFromChangelist(RemoveJobFromChangelist),

    /// Submit a pending changelist.
    /// Returns: `Output::SubmitChangelist`
    SubmitChangelist(SubmitChangelist),

    /// Sync files to head.
    /// Returns: `Output::FetchFiles`
    FetchFiles(FetchFiles),

    /// Shelve opened files of a pending changelist.
    /// Returns: `Output::ShelveFiles`
    ShelveFiles(ShelveFiles),
}

impl Command {
    /// Operation kind of this command.
    pub fn kind(&self) -> OperationKind {
        match self {
            Command::ServerInfo(_)
            | Command::DescribeChangelist(_)
            | Command::ListJobs(_)
            | Command::GetJobSpec(_)
            | Command::ListUsers(_)
            | Command::ListClientsForUser(_)
            | Command::ListChangelistsFixedByJob(_) => OperationKind::ServerQuery,

            Command::ListOpenedFilesChanges(_)
            | Command::ListSubmittedChangelists(_)
            | Command::ListFilesDetails(_)
            | Command::ListFileHistory(_) => OperationKind::ClientQuery,

            Command::CreateJob(_) | Command::Login(_) => OperationKind::ServerAction,

            Command::AddEditFile(_)
            | Command::DeleteFile(_)
            | Command::RevertFile(_)
            | Command::MoveFile(_)
            | Command::MoveFilesToChangelist(_)
            | Command::CreateChangelist(_)
            | Command::DeleteChangelist(_)
            | Command::EditChangelistDescription(_)
            | Command::AddJobToChangelist(_)
            | Command::RemoveJobFromChangelist(_)
            | Command::SubmitChangelist(_)
            | Command::FetchFiles(_)
            | Command::ShelveFiles(_) => OperationKind::ClientAction,
        }
    }

    /// Whether a successful result may be served from the query cache.
    ///
    /// Server info is always fetched live; everything else read-only is
    /// cache-eligible.
    pub fn is_cacheable(&self) -> bool {
        match self {
            Command::ServerInfo(_) => false,
            _ => self.kind().mutation() == Mutation::Query,
        }
    }

    /// Whether the action may be deferred while its server is offline.
    ///
    /// Submits, syncs and logins only make sense against a live server.
    pub fn is_queueable(&self) -> bool {
        match self {
            Command::SubmitChangelist(_) | Command::FetchFiles(_) | Command::Login(_) => false,
            _ => self.kind().is_action(),
        }
    }

    /// Get the command name for logging and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Command::ServerInfo(_) => "ServerInfo",
            Command::DescribeChangelist(_) => "DescribeChangelist",
            Command::ListJobs(_) => "ListJobs",
            Command::GetJobSpec(_) => "GetJobSpec",
            Command::ListUsers(_) => "ListUsers",
            Command::ListClientsForUser(_) => "ListClientsForUser",
            Command::ListChangelistsFixedByJob(_) => "ListChangelistsFixedByJob",
            Command::ListOpenedFilesChanges(_) => "ListOpenedFilesChanges",
            Command::ListSubmittedChangelists(_) => "ListSubmittedChangelists",
            Command::ListFilesDetails(_) => "ListFilesDetails",
            Command::ListFileHistory(_) => "ListFileHistory",
            Command::CreateJob(_) => "CreateJob",
            Command::Login(_) => "Login",
            Command::AddEditFile(_) => "AddEditFile",
            Command::DeleteFile(_) => "DeleteFile",
            Command::RevertFile(_) => "RevertFile",
            Command::MoveFile(_) => "MoveFile",
            Command::MoveFilesToChangelist(_) => "MoveFilesToChangelist",
            Command::CreateChangelist(_) => "CreateChangelist",
            Command::DeleteChangelist(_) => "DeleteChangelist",
            Command::EditChangelistDescription(_) => "EditChangelistDescription",
            Command::AddJobToChangelist(_) => "AddJobToChangelist",
            Command::RemoveJobFromChangelist(_) => "RemoveJobFromChangelist",
            Command::SubmitChangelist(_) => "SubmitChangelist",
            Command::FetchFiles(_) => "FetchFiles",
            Command::ShelveFiles(_) => "ShelveFiles",
        }
    }
}
