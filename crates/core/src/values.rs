//! Backend value records
//!
//! Plain data returned by the backend: jobs, users, clients, changelists,
//! and file state. These are immutable snapshots; nothing here talks to a
//! server.

use crate::types::{ChangelistId, FilePath, JobId, ServerName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Job workflow status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Work outstanding
    #[default]
    Open,
    /// Fixed
    Closed,
    /// Parked
    Suspended,
}

/// A job (issue) tracked by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Job name
    pub id: JobId,
    /// Free-form description
    pub description: String,
    /// Current status
    pub status: JobStatus,
    /// Additional spec-defined fields
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl Job {
    /// Create an open job with no extra fields
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: JobId::new(id),
            description: description.into(),
            status: JobStatus::Open,
            fields: BTreeMap::new(),
        }
    }
}

/// The server's job specification: which fields a job carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Field names beyond the built-in id, status and description
    pub fields: Vec<String>,
    /// Status values the server accepts
    pub statuses: Vec<JobStatus>,
    /// Status a submit moves attached jobs to, unless overridden
    pub fix_status: JobStatus,
}

impl Default for JobSpec {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            statuses: vec![JobStatus::Open, JobStatus::Closed, JobStatus::Suspended],
            fix_status: JobStatus::Closed,
        }
    }
}

/// A server user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Login name
    pub username: String,
    /// Email address
    pub email: String,
    /// Display name
    pub full_name: String,
}

/// Summary of a client workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSummary {
    /// Client workspace name
    pub client_name: String,
    /// Owning user
    pub owner: String,
    /// Local root directory
    pub root: String,
    /// Server the client is defined on
    pub server: ServerName,
}

/// What an open or committed file revision does to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    /// New file
    Add,
    /// Content change
    Edit,
    /// Removal
    Delete,
    /// Target side of a move
    MoveAdd,
    /// Source side of a move
    MoveDelete,
}

impl FileAction {
    /// Whether the file no longer exists at head after this action
    pub fn is_removal(self) -> bool {
        matches!(self, FileAction::Delete | FileAction::MoveDelete)
    }
}

/// A file revision as recorded in a submitted changelist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedFile {
    /// Depot path
    pub depot_path: FilePath,
    /// Revision number created by the submit
    pub revision: u32,
    /// What the revision did
    pub action: FileAction,
}

/// A changelist as stored on the server, pending or submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteChangelist {
    /// Identity (owning client + number)
    pub id: ChangelistId,
    /// Description text
    pub description: String,
    /// Owning user
    pub user: String,
    /// Whether the changelist has been submitted
    pub submitted: bool,
    /// Submission time, for submitted changelists
    pub submitted_at: Option<DateTime<Utc>>,
    /// Whether the changelist holds shelved files
    pub shelved: bool,
    /// Jobs attached to the changelist
    pub jobs: Vec<JobId>,
    /// Status applied to attached jobs on submit
    pub job_status: Option<JobStatus>,
    /// Files in the changelist
    pub files: Vec<CommittedFile>,
}

/// A file opened for change in a client workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenedFile {
    /// Depot path
    pub depot_path: FilePath,
    /// Pending changelist holding the file
    pub changelist: ChangelistId,
    /// Pending action
    pub action: FileAction,
    /// Revision the file was opened at (0 for adds)
    pub base_revision: u32,
    /// For move actions, the other side of the move
    pub moved_from: Option<FilePath>,
}

/// One revision in a file's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRevision {
    /// Depot path
    pub depot_path: FilePath,
    /// Revision number
    pub revision: u32,
    /// Submitted changelist number that created it
    pub changelist: u64,
    /// What the revision did
    pub action: FileAction,
    /// Submitting user
    pub user: String,
    /// Changelist description
    pub description: String,
    /// Submission time
    pub date: DateTime<Utc>,
}

/// Current state of one file as seen from a client workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDetails {
    /// Depot path
    pub depot_path: FilePath,
    /// Head revision on the server (0 when the file was never submitted)
    pub head_revision: u32,
    /// Action of the head revision
    pub head_action: Option<FileAction>,
    /// Revision the client has synced, if any
    pub have_revision: Option<u32>,
    /// Pending action in this client, if the file is open
    pub open_action: Option<FileAction>,
}
