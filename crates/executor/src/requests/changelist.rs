//! Changelist requests: lookup, lifecycle, job attachment, submit, shelve.
//!
//! Client-scoped changelist numbers are relative to the client in the
//! request's context; `0` is the client's default changelist.

use p4runner_core::{
    ChangelistId, CommittedFile, FilePath, JobId, JobStatus, OpenedFile, RemoteChangelist,
};
use serde::{Deserialize, Serialize};

use crate::request::impl_request;

// ==================== Queries ====================

/// Describe one changelist by server-wide number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DescribeChangelist {
    /// Changelist number
    pub number: u64,
}

/// Result of [`DescribeChangelist`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescribeChangelistResult {
    /// The changelist
    pub changelist: RemoteChangelist,
}

impl_request!(DescribeChangelist => DescribeChangelistResult, server query);

/// Opened files and pending changelists of the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListOpenedFilesChanges {
    /// Bound on returned pending changelists, 0 for unbounded
    #[serde(default)]
    pub max_changelists: usize,
}

/// Result of [`ListOpenedFilesChanges`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListOpenedFilesChangesResult {
    /// Opened files ordered by path
    pub opened: Vec<OpenedFile>,
    /// Numbered pending changelists ordered by number
    pub pending: Vec<RemoteChangelist>,
}

impl_request!(ListOpenedFilesChanges => ListOpenedFilesChangesResult, client query);

/// Submitted changelists, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListSubmittedChangelists {
    /// Only changelists touching files under this depot path prefix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<FilePath>,
    /// Result bound, 0 for unbounded
    #[serde(default)]
    pub max_results: usize,
}

/// Result of [`ListSubmittedChangelists`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListSubmittedChangelistsResult {
    /// Submitted changelists, newest first
    pub changelists: Vec<RemoteChangelist>,
}

impl_request!(ListSubmittedChangelists => ListSubmittedChangelistsResult, client query);

// ==================== Lifecycle ====================

/// Create a numbered pending changelist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateChangelist {
    /// Description, must not be blank
    pub description: String,
}

/// Result of [`CreateChangelist`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateChangelistResult {
    /// The new changelist
    pub changelist: ChangelistId,
}

impl_request!(CreateChangelist => CreateChangelistResult, client action);

/// Delete an empty numbered pending changelist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteChangelist {
    /// Changelist number
    pub changelist: u64,
}

/// Result of [`DeleteChangelist`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteChangelistResult {
    /// The deleted changelist
    pub changelist: ChangelistId,
}

impl_request!(DeleteChangelist => DeleteChangelistResult, client action);

/// Replace the description of a numbered pending changelist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditChangelistDescription {
    /// Changelist number
    pub changelist: u64,
    /// New description, must not be blank
    pub description: String,
}

/// Result of [`EditChangelistDescription`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditChangelistDescriptionResult {
    /// The edited changelist
    pub changelist: ChangelistId,
    /// Description now stored
    pub description: String,
}

impl_request!(EditChangelistDescription => EditChangelistDescriptionResult, client action);

// ==================== Jobs ====================

/// Attach a job to a numbered pending changelist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddJobToChangelist {
    /// Changelist number
    pub changelist: u64,
    /// Job to attach
    pub job: JobId,
}

/// Result of [`AddJobToChangelist`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddJobToChangelistResult {
    /// The changelist
    pub changelist: ChangelistId,
    /// Jobs attached after the change
    pub jobs: Vec<JobId>,
}

impl_request!(AddJobToChangelist => AddJobToChangelistResult, client action);

/// Detach a job from a numbered pending changelist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoveJobFromChangelist {
    /// Changelist number
    pub changelist: u64,
    /// Job to detach
    pub job: JobId,
}

/// Result of [`RemoveJobFromChangelist`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveJobFromChangelistResult {
    /// The changelist
    pub changelist: ChangelistId,
    /// Jobs attached after the change
    pub jobs: Vec<JobId>,
}

impl_request!(RemoveJobFromChangelist => RemoveJobFromChangelistResult, client action);

// ==================== Submit / shelve ====================

/// Submit a pending changelist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitChangelist {
    /// Changelist number (0 for the default changelist)
    pub changelist: u64,
    /// Files to submit; empty submits every file in the changelist
    #[serde(default)]
    pub files: Vec<FilePath>,
    /// Jobs to fix, in addition to those already attached
    #[serde(default)]
    pub jobs: Vec<JobId>,
    /// Status to move fixed jobs to; the job spec's fix status if unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_status: Option<JobStatus>,
    /// Description override; required for the default changelist
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SubmitChangelist {
    /// Submit every file of `changelist` with its current description
    pub fn all(changelist: u64) -> Self {
        Self {
            changelist,
            files: Vec::new(),
            jobs: Vec::new(),
            job_status: None,
            description: None,
        }
    }
}

/// Result of [`SubmitChangelist`].
///
/// Submitting renumbers the changelist. Callers that keep a mapping from a
/// local changelist to `requested` should sever it once this arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitChangelistResult {
    /// Changelist as it was known before the submit
    pub requested: ChangelistId,
    /// Number the server assigned to the submitted changelist
    pub submitted: ChangelistId,
    /// Revisions created
    pub files: Vec<CommittedFile>,
    /// Jobs fixed by the submit
    pub jobs: Vec<JobId>,
}

impl_request!(SubmitChangelist => SubmitChangelistResult, client action);

/// Shelve opened files of a numbered pending changelist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShelveFiles {
    /// Changelist number
    pub changelist: u64,
    /// Files to shelve; empty shelves every file in the changelist
    #[serde(default)]
    pub files: Vec<FilePath>,
}

/// Result of [`ShelveFiles`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShelveFilesResult {
    /// The changelist
    pub changelist: ChangelistId,
    /// Every file now shelved in the changelist
    pub shelved: Vec<FilePath>,
}

impl_request!(ShelveFiles => ShelveFilesResult, client action);
