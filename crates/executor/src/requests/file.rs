//! File requests: state, history, open/revert/move, sync.

use p4runner_core::{ChangelistId, FileAction, FileDetails, FilePath, FileRevision};
use serde::{Deserialize, Serialize};

use crate::request::impl_request;

// ==================== Queries ====================

/// Head, have and open state of files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListFilesDetails {
    /// Files to describe
    pub files: Vec<FilePath>,
}

/// Result of [`ListFilesDetails`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListFilesDetailsResult {
    /// One entry per requested file, in request order
    pub files: Vec<FileDetails>,
}

impl_request!(ListFilesDetails => ListFilesDetailsResult, client query);

/// Revision history of one file, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListFileHistory {
    /// The file
    pub file: FilePath,
    /// Revision bound, 0 for unbounded
    #[serde(default)]
    pub max_revisions: usize,
}

/// Result of [`ListFileHistory`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListFileHistoryResult {
    /// Revisions, newest first
    pub revisions: Vec<FileRevision>,
}

impl_request!(ListFileHistory => ListFileHistoryResult, client query);

// ==================== Actions ====================

/// Open a file for add (new) or edit (existing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddEditFile {
    /// The file
    pub file: FilePath,
    /// Target changelist number (0 / unset for default)
    #[serde(default)]
    pub changelist: u64,
}

/// Result of [`AddEditFile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddEditFileResult {
    /// The file
    pub file: FilePath,
    /// `Add` or `Edit`, or the existing action if the file was already open
    pub action: FileAction,
    /// Changelist holding the file
    pub changelist: ChangelistId,
}

impl_request!(AddEditFile => AddEditFileResult, client action);

/// Open a file for delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteFile {
    /// The file
    pub file: FilePath,
    /// Target changelist number
    #[serde(default)]
    pub changelist: u64,
}

/// Result of [`DeleteFile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteFileResult {
    /// The file
    pub file: FilePath,
    /// Changelist holding the file
    pub changelist: ChangelistId,
}

impl_request!(DeleteFile => DeleteFileResult, client action);

/// Revert an opened file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RevertFile {
    /// The file
    pub file: FilePath,
    /// Only revert if the file is open for edit (content unchanged is assumed)
    #[serde(default)]
    pub only_unchanged: bool,
}

/// Result of [`RevertFile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevertFileResult {
    /// Files that were reverted; a move reverts both sides
    pub reverted: Vec<FilePath>,
}

impl_request!(RevertFile => RevertFileResult, client action);

/// Move (rename) a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MoveFile {
    /// Current path
    pub source: FilePath,
    /// New path
    pub target: FilePath,
    /// Target changelist number
    #[serde(default)]
    pub changelist: u64,
}

/// Result of [`MoveFile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveFileResult {
    /// Path opened for move/delete
    pub source: FilePath,
    /// Path opened for move/add
    pub target: FilePath,
    /// Changelist holding both sides
    pub changelist: ChangelistId,
}

impl_request!(MoveFile => MoveFileResult, client action);

/// Reopen files into another pending changelist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MoveFilesToChangelist {
    /// Opened files to move
    pub files: Vec<FilePath>,
    /// Destination changelist number
    pub changelist: u64,
}

/// Result of [`MoveFilesToChangelist`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveFilesToChangelistResult {
    /// Destination changelist
    pub changelist: ChangelistId,
    /// Files that were reopened
    pub moved: Vec<FilePath>,
}

impl_request!(MoveFilesToChangelist => MoveFilesToChangelistResult, client action);

/// Sync files under a depot path prefix to head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetchFiles {
    /// Depot path prefix
    pub path: FilePath,
    /// Re-sync files that are already at head
    #[serde(default)]
    pub force: bool,
}

/// Result of [`FetchFiles`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchFilesResult {
    /// Files whose have revision changed (or all, when forced)
    pub synced: Vec<FilePath>,
    /// Files removed from the workspace because head is deleted
    pub removed: Vec<FilePath>,
}

impl_request!(FetchFiles => FetchFilesResult, client action);
