//! Output enum for backend results.
//!
//! Every command produces exactly one output variant, named after the
//! command. Connectors answer with an untyped [`Output`]; the dispatcher
//! narrows it to the request's declared result type and wraps it in a
//! [`QueryResult`] or [`ActionResult`] tagged with the connection context.

use p4runner_core::{ActionId, ConnectionContext};
use serde::{Deserialize, Serialize};

use crate::requests::*;

/// Untyped result of one command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Output {
    // ==================== Server queries ====================
    /// Result of `Command::ServerInfo`
    ServerInfo(ServerInfoResult),
    /// Result of `Command::DescribeChangelist`
    DescribeChangelist(DescribeChangelistResult),
    /// Result of `Command::ListJobs`
    ListJobs(ListJobsResult),
    /// Result of `Command::GetJobSpec`
    GetJobSpec(GetJobSpecResult),
    /// Result of `Command::ListUsers`
    ListUsers(ListUsersResult),
    /// Result of `Command::ListClientsForUser`
    ListClientsForUser(ListClientsForUserResult),
    /// Result of `Command::ListChangelistsFixedByJob`
    ListChangelistsFixedByJob(ListChangelistsFixedByJobResult),

    // ==================== Client queries ====================
    /// Result of `Command::ListOpenedFilesChanges`
    ListOpenedFilesChanges(ListOpenedFilesChangesResult),
    /// Result of `Command::ListSubmittedChangelists`
    ListSubmittedChangelists(ListSubmittedChangelistsResult),
    /// Result of `Command::ListFilesDetails`
    ListFilesDetails(ListFilesDetailsResult),
    /// Result of `Command::ListFileHistory`
    ListFileHistory(ListFileHistoryResult),

    // ==================== Server actions ====================
    /// Result of `Command::CreateJob`
    CreateJob(CreateJobResult),
    /// Result of `Command::Login`
    Login(LoginResult),

    // ==================== Client actions ====================
    /// Result of `Command::AddEditFile`
    AddEditFile(AddEditFileResult),
    /// Result of `Command::DeleteFile`
    DeleteFile(DeleteFileResult),
    /// Result of `Command::RevertFile`
    RevertFile(RevertFileResult),
    /// Result of `Command::MoveFile`
    MoveFile(MoveFileResult),
    /// Result of `Command::MoveFilesToChangelist`
    MoveFilesToChangelist(MoveFilesToChangelistResult),
    /// Result of `Command::CreateChangelist`
    CreateChangelist(CreateChangelistResult),
    /// Result of `Command::DeleteChangelist`
    DeleteChangelist(DeleteChangelistResult),
    /// Result of `Command::EditChangelistDescription`
    EditChangelistDescription(EditChangelistDescriptionResult),
    /// Result of `Command::AddJobToChangelist`
    AddJobToChangelist(AddJobToChangelistResult),
    /// Result of `Command::RemoveJobFromChangelist`
    RemoveJobFromChangelist(RemoveJobFromChangelistResult),
    /// Result of `Command::SubmitChangelist`
    SubmitChangelist(SubmitChangelistResult),
    /// Result of `Command::FetchFiles`
    FetchFiles(FetchFilesResult),
    /// Result of `Command::ShelveFiles`
    ShelveFiles(ShelveFilesResult),
}

impl Output {
    /// Name of the command this output answers.
    pub fn name(&self) -> &'static str {
        match self {
            Output::ServerInfo(_) => "ServerInfo",
            Output::DescribeChangelist(_) => "DescribeChangelist",
            Output::ListJobs(_) => "ListJobs",
            Output::GetJobSpec(_) => "GetJobSpec",
            Output::ListUsers(_) => "ListUsers",
            Output::ListClientsForUser(_) => "ListClientsForUser",
            Output::ListChangelistsFixedByJob(_) => "ListChangelistsFixedByJob",
            Output::ListOpenedFilesChanges(_) => "ListOpenedFilesChanges",
            Output::ListSubmittedChangelists(_) => "ListSubmittedChangelists",
            Output::ListFilesDetails(_) => "ListFilesDetails",
            Output::ListFileHistory(_) => "ListFileHistory",
            Output::CreateJob(_) => "CreateJob",
            Output::Login(_) => "Login",
            Output::AddEditFile(_) => "AddEditFile",
            Output::DeleteFile(_) => "DeleteFile",
            Output::RevertFile(_) => "RevertFile",
            Output::MoveFile(_) => "MoveFile",
            Output::MoveFilesToChangelist(_) => "MoveFilesToChangelist",
            Output::CreateChangelist(_) => "CreateChangelist",
            Output::DeleteChangelist(_) => "DeleteChangelist",
            Output::EditChangelistDescription(_) => "EditChangelistDescription",
            Output::AddJobToChangelist(_) => "AddJobToChangelist",
            Output::RemoveJobFromChangelist(_) => "RemoveJobFromChangelist",
            Output::SubmitChangelist(_) => "SubmitChangelist",
            Output::FetchFiles(_) => "FetchFiles",
            Output::ShelveFiles(_) => "ShelveFiles",
        }
    }
}

/// Typed result of a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult<T> {
    /// Connection the result came from
    pub context: ConnectionContext,
    /// Whether the value was served from the query cache
    pub from_cache: bool,
    /// The result payload
    pub value: T,
}

/// Typed result of an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult<T> {
    /// Connection the action ran against
    pub context: ConnectionContext,
    /// Identity of the action that produced this result
    pub action_id: ActionId,
    /// The result payload
    pub value: T,
}
