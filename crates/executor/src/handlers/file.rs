//! File command handlers.
//!
//! This module implements handlers for the file commands:
//! - ListFilesDetails / ListFileHistory: read depot and workspace state
//! - AddEditFile / DeleteFile / MoveFile: open files in a pending changelist
//! - RevertFile / MoveFilesToChangelist: change or drop an open
//! - FetchFiles: sync the workspace to head

use p4runner_core::{ChangelistId, ClientConfig, FileAction, FileDetails, Result};

use super::store::{bounded, server_error, unknown_client, OpenRecord, ServerState};
use crate::requests::{
    AddEditFile, AddEditFileResult, DeleteFile, DeleteFileResult, FetchFiles, FetchFilesResult,
    ListFileHistory, ListFileHistoryResult, ListFilesDetails, ListFilesDetailsResult, MoveFile,
    MoveFileResult, MoveFilesToChangelist, MoveFilesToChangelistResult, RevertFile,
    RevertFileResult,
};
use crate::Output;

fn changelist_id(state: &ServerState, client: &ClientConfig, number: u64) -> ChangelistId {
    ChangelistId::new(state.client_ref(&client.client_name), number)
}

// =============================================================================
// Queries
// =============================================================================

/// Handle ListFilesDetails command.
pub(crate) fn list_files_details(
    state: &ServerState,
    client: &ClientConfig,
    req: ListFilesDetails,
) -> Result<Output> {
    let workspace = state.workspace(client)?;
    let files = req
        .files
        .into_iter()
        .map(|path| {
            let head = state.head(&path);
            FileDetails {
                head_revision: head.map_or(0, |rev| rev.revision),
                head_action: head.map(|rev| rev.action),
                have_revision: workspace.have.get(&path).copied(),
                open_action: workspace.opened.get(&path).map(|open| open.action),
                depot_path: path,
            }
        })
        .collect();
    Ok(Output::ListFilesDetails(ListFilesDetailsResult { files }))
}

/// Handle ListFileHistory command.
pub(crate) fn list_file_history(
    state: &ServerState,
    client: &ClientConfig,
    req: ListFileHistory,
) -> Result<Output> {
    state.workspace(client)?;
    let revisions = state
        .depot
        .get(&req.file)
        .ok_or_else(|| server_error(format!("{} - no such file(s)", req.file)))?;
    Ok(Output::ListFileHistory(ListFileHistoryResult {
        revisions: bounded(revisions.iter().rev().cloned(), req.max_revisions),
    }))
}

// =============================================================================
// Opening files
// =============================================================================

/// Handle AddEditFile command.
///
/// Opens for edit if the file exists at head, for add otherwise. A file
/// that is already open keeps its action and changelist.
pub(crate) fn add_edit_file(
    state: &mut ServerState,
    client: &ClientConfig,
    req: AddEditFile,
) -> Result<Output> {
    state.pending_change(client, req.changelist)?;
    let exists = state.exists_at_head(&req.file);
    let workspace = state.workspace(client)?;

    if let Some(open) = workspace.opened.get(&req.file) {
        let (action, number) = (open.action, open.changelist);
        return Ok(Output::AddEditFile(AddEditFileResult {
            file: req.file,
            action,
            changelist: changelist_id(state, client, number),
        }));
    }

    let record = if exists {
        let have = workspace.have.get(&req.file).copied().ok_or_else(|| {
            server_error(format!("{} - file(s) not on client", req.file))
        })?;
        OpenRecord {
            changelist: req.changelist,
            action: FileAction::Edit,
            base_revision: have,
            moved_from: None,
        }
    } else {
        OpenRecord {
            changelist: req.changelist,
            action: FileAction::Add,
            base_revision: 0,
            moved_from: None,
        }
    };
    let action = record.action;
    state
        .workspace_mut(client)?
        .opened
        .insert(req.file.clone(), record);

    Ok(Output::AddEditFile(AddEditFileResult {
        file: req.file,
        action,
        changelist: changelist_id(state, client, req.changelist),
    }))
}

/// Handle DeleteFile command.
pub(crate) fn delete_file(
    state: &mut ServerState,
    client: &ClientConfig,
    req: DeleteFile,
) -> Result<Output> {
    state.pending_change(client, req.changelist)?;
    if !state.exists_at_head(&req.file) {
        return Err(server_error(format!("{} - no such file(s)", req.file)));
    }
    let workspace = state.workspace_mut(client)?;

    if let Some(open) = workspace.opened.get(&req.file) {
        if open.action != FileAction::Delete {
            return Err(server_error(format!(
                "{} - can't delete (already opened for {:?})",
                req.file, open.action
            )));
        }
        let number = open.changelist;
        return Ok(Output::DeleteFile(DeleteFileResult {
            file: req.file,
            changelist: changelist_id(state, client, number),
        }));
    }

    let have = workspace
        .have
        .get(&req.file)
        .copied()
        .ok_or_else(|| server_error(format!("{} - file(s) not on client", req.file)))?;
    workspace.opened.insert(
        req.file.clone(),
        OpenRecord {
            changelist: req.changelist,
            action: FileAction::Delete,
            base_revision: have,
            moved_from: None,
        },
    );
    Ok(Output::DeleteFile(DeleteFileResult {
        file: req.file,
        changelist: changelist_id(state, client, req.changelist),
    }))
}

/// Handle MoveFile command.
///
/// A file opened for add is simply renamed. Otherwise the source is opened
/// for move/delete and the target for move/add, each pointing at the other.
pub(crate) fn move_file(
    state: &mut ServerState,
    client: &ClientConfig,
    req: MoveFile,
) -> Result<Output> {
    state.pending_change(client, req.changelist)?;
    if req.source == req.target {
        return Err(server_error(format!("can't move {} onto itself", req.source)));
    }
    if state.exists_at_head(&req.target) {
        return Err(server_error(format!("{} - can't move to an existing file", req.target)));
    }
    let workspace = state.workspace_mut(client)?;
    if workspace.opened.contains_key(&req.target) {
        return Err(server_error(format!("{} - target is already opened", req.target)));
    }

    match workspace.opened.get(&req.source).map(|open| open.action) {
        Some(FileAction::Add) => {
            workspace.opened.remove(&req.source);
            workspace.opened.insert(
                req.target.clone(),
                OpenRecord {
                    changelist: req.changelist,
                    action: FileAction::Add,
                    base_revision: 0,
                    moved_from: None,
                },
            );
        }
        Some(FileAction::Edit) | None => {
            let base = workspace
                .have
                .get(&req.source)
                .copied()
                .ok_or_else(|| server_error(format!("{} - file(s) not on client", req.source)))?;
            workspace.opened.insert(
                req.source.clone(),
                OpenRecord {
                    changelist: req.changelist,
                    action: FileAction::MoveDelete,
                    base_revision: base,
                    moved_from: Some(req.target.clone()),
                },
            );
            workspace.opened.insert(
                req.target.clone(),
                OpenRecord {
                    changelist: req.changelist,
                    action: FileAction::MoveAdd,
                    base_revision: base,
                    moved_from: Some(req.source.clone()),
                },
            );
        }
        Some(other) => {
            return Err(server_error(format!(
                "{} - can't move (already opened for {:?})",
                req.source, other
            )))
        }
    }

    Ok(Output::MoveFile(MoveFileResult {
        changelist: changelist_id(state, client, req.changelist),
        source: req.source,
        target: req.target,
    }))
}

// =============================================================================
// Changing opens
// =============================================================================

/// Handle RevertFile command.
///
/// Reverting either side of a move reverts both.
pub(crate) fn revert_file(
    state: &mut ServerState,
    client: &ClientConfig,
    req: RevertFile,
) -> Result<Output> {
    let workspace = state.workspace_mut(client)?;
    let open = workspace
        .opened
        .get(&req.file)
        .cloned()
        .ok_or_else(|| server_error(format!("{} - file(s) not opened on this client", req.file)))?;

    if req.only_unchanged && open.action != FileAction::Edit {
        return Ok(Output::RevertFile(RevertFileResult {
            reverted: Vec::new(),
        }));
    }

    workspace.opened.remove(&req.file);
    let mut reverted = vec![req.file.clone()];
    if let Some(partner) = open.moved_from {
        let paired = workspace
            .opened
            .get(&partner)
            .map_or(false, |other| other.moved_from.as_ref() == Some(&req.file));
        if paired {
            workspace.opened.remove(&partner);
            reverted.push(partner);
        }
    }
    reverted.sort();
    Ok(Output::RevertFile(RevertFileResult { reverted }))
}

/// Handle MoveFilesToChangelist command.
pub(crate) fn move_files_to_changelist(
    state: &mut ServerState,
    client: &ClientConfig,
    req: MoveFilesToChangelist,
) -> Result<Output> {
    state.pending_change(client, req.changelist)?;
    let workspace = state.workspace_mut(client)?;
    if let Some(missing) = req
        .files
        .iter()
        .find(|file| !workspace.opened.contains_key(*file))
    {
        return Err(server_error(format!(
            "{} - file(s) not opened on this client",
            missing
        )));
    }
    for file in &req.files {
        if let Some(open) = workspace.opened.get_mut(file) {
            open.changelist = req.changelist;
        }
    }
    Ok(Output::MoveFilesToChangelist(MoveFilesToChangelistResult {
        changelist: changelist_id(state, client, req.changelist),
        moved: req.files,
    }))
}

// =============================================================================
// Sync
// =============================================================================

/// Handle FetchFiles command.
///
/// Files open in the workspace are left alone.
pub(crate) fn fetch_files(
    state: &mut ServerState,
    client: &ClientConfig,
    req: FetchFiles,
) -> Result<Output> {
    let depot = &state.depot;
    let workspace = state
        .workspaces
        .get_mut(&client.client_name)
        .ok_or_else(|| unknown_client(client))?;

    let mut matched = false;
    let mut synced = Vec::new();
    let mut removed = Vec::new();
    for (path, revisions) in depot
        .iter()
        .filter(|(path, _)| path.as_str().starts_with(req.path.as_str()))
    {
        matched = true;
        if workspace.opened.contains_key(path) {
            continue;
        }
        let head = match revisions.last() {
            Some(head) => head,
            None => continue,
        };
        if head.action.is_removal() {
            if workspace.have.remove(path).is_some() {
                removed.push(path.clone());
            }
        } else if req.force || workspace.have.get(path) != Some(&head.revision) {
            workspace.have.insert(path.clone(), head.revision);
            synced.push(path.clone());
        }
    }

    if !matched {
        return Err(server_error(format!("{} - no such file(s)", req.path)));
    }
    Ok(Output::FetchFiles(FetchFilesResult { synced, removed }))
}
