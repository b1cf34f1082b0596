//! Changelist command handlers.
//!
//! Pending changelists are numbered from the same counter as submitted
//! ones. Submitting allocates a fresh number, so the result carries both
//! the requested and the submitted identity.

use chrono::Utc;
use p4runner_core::{
    ChangelistId, ClientConfig, CommittedFile, Error, FileRevision, JobId, Result,
    DEFAULT_CHANGELIST,
};
use std::collections::BTreeSet;

use super::store::{bounded, require_text, server_error, ChangeRecord, ServerState};
use crate::requests::{
    AddJobToChangelist, AddJobToChangelistResult, CreateChangelist, CreateChangelistResult,
    DeleteChangelist, DeleteChangelistResult, DescribeChangelist, DescribeChangelistResult,
    EditChangelistDescription, EditChangelistDescriptionResult, ListOpenedFilesChanges,
    ListOpenedFilesChangesResult, ListSubmittedChangelists, ListSubmittedChangelistsResult,
    RemoveJobFromChangelist, RemoveJobFromChangelistResult, ShelveFiles, ShelveFilesResult,
    SubmitChangelist, SubmitChangelistResult,
};
use crate::Output;

fn changelist_id(state: &ServerState, client: &ClientConfig, number: u64) -> ChangelistId {
    ChangelistId::new(state.client_ref(&client.client_name), number)
}

fn require_job(state: &ServerState, job: &JobId) -> Result<()> {
    if state.jobs.contains_key(job) {
        Ok(())
    } else {
        Err(server_error(format!("job '{}' unknown", job)))
    }
}

// =============================================================================
// Queries
// =============================================================================

/// Handle DescribeChangelist command.
pub(crate) fn describe_changelist(state: &ServerState, req: DescribeChangelist) -> Result<Output> {
    let change = state
        .changes
        .get(&req.number)
        .ok_or_else(|| server_error(format!("change {} unknown", req.number)))?;
    Ok(Output::DescribeChangelist(DescribeChangelistResult {
        changelist: state.remote_changelist(req.number, change),
    }))
}

/// Handle ListOpenedFilesChanges command.
pub(crate) fn list_opened_files_changes(
    state: &ServerState,
    client: &ClientConfig,
    req: ListOpenedFilesChanges,
) -> Result<Output> {
    let workspace = state.workspace(client)?;
    let opened = workspace
        .opened
        .iter()
        .map(|(path, open)| state.opened_file(&client.client_name, path, open))
        .collect();
    let pending = bounded(
        state
            .changes
            .iter()
            .filter(|(_, change)| !change.is_submitted() && change.client == client.client_name)
            .map(|(number, change)| state.remote_changelist(*number, change)),
        req.max_changelists,
    );
    Ok(Output::ListOpenedFilesChanges(ListOpenedFilesChangesResult {
        opened,
        pending,
    }))
}

/// Handle ListSubmittedChangelists command.
pub(crate) fn list_submitted_changelists(
    state: &ServerState,
    client: &ClientConfig,
    req: ListSubmittedChangelists,
) -> Result<Output> {
    state.workspace(client)?;
    let touches = |change: &ChangeRecord| match &req.path {
        Some(prefix) => change
            .files
            .iter()
            .any(|f| f.depot_path.as_str().starts_with(prefix.as_str())),
        None => true,
    };
    let changelists = bounded(
        state
            .changes
            .iter()
            .rev()
            .filter(|(_, change)| change.is_submitted() && touches(change))
            .map(|(number, change)| state.remote_changelist(*number, change)),
        req.max_results,
    );
    Ok(Output::ListSubmittedChangelists(
        ListSubmittedChangelistsResult { changelists },
    ))
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Handle CreateChangelist command.
pub(crate) fn create_changelist(
    state: &mut ServerState,
    client: &ClientConfig,
    req: CreateChangelist,
) -> Result<Output> {
    state.workspace(client)?;
    require_text("changelist description", &req.description)?;
    let number = state.allocate_change();
    state.changes.insert(
        number,
        ChangeRecord {
            client: client.client_name.clone(),
            user: client.server.user.clone(),
            description: req.description,
            submitted_at: None,
            jobs: Vec::new(),
            job_status: None,
            files: Vec::new(),
            shelved: BTreeSet::new(),
        },
    );
    Ok(Output::CreateChangelist(CreateChangelistResult {
        changelist: changelist_id(state, client, number),
    }))
}

/// Handle DeleteChangelist command.
pub(crate) fn delete_changelist(
    state: &mut ServerState,
    client: &ClientConfig,
    req: DeleteChangelist,
) -> Result<Output> {
    let open_files = state.opened_in(&client.client_name, req.changelist).len();
    let change = state.pending_change_mut(client, req.changelist)?;
    if open_files > 0 {
        return Err(server_error(format!(
            "change {} has {} open file(s) associated with it and can't be deleted",
            req.changelist, open_files
        )));
    }
    if !change.shelved.is_empty() {
        return Err(server_error(format!(
            "change {} has shelved files and can't be deleted",
            req.changelist
        )));
    }
    state.changes.remove(&req.changelist);
    Ok(Output::DeleteChangelist(DeleteChangelistResult {
        changelist: changelist_id(state, client, req.changelist),
    }))
}

/// Handle EditChangelistDescription command.
pub(crate) fn edit_changelist_description(
    state: &mut ServerState,
    client: &ClientConfig,
    req: EditChangelistDescription,
) -> Result<Output> {
    require_text("changelist description", &req.description)?;
    let change = state.pending_change_mut(client, req.changelist)?;
    change.description = req.description.clone();
    Ok(Output::EditChangelistDescription(
        EditChangelistDescriptionResult {
            changelist: changelist_id(state, client, req.changelist),
            description: req.description,
        },
    ))
}

// =============================================================================
// Jobs
// =============================================================================

/// Handle AddJobToChangelist command.
///
/// Attaching a job that is already attached leaves the changelist as is.
pub(crate) fn add_job_to_changelist(
    state: &mut ServerState,
    client: &ClientConfig,
    req: AddJobToChangelist,
) -> Result<Output> {
    require_job(state, &req.job)?;
    let change = state.pending_change_mut(client, req.changelist)?;
    if !change.jobs.contains(&req.job) {
        change.jobs.push(req.job);
    }
    let jobs = change.jobs.clone();
    Ok(Output::AddJobToChangelist(AddJobToChangelistResult {
        changelist: changelist_id(state, client, req.changelist),
        jobs,
    }))
}

/// Handle RemoveJobFromChangelist command.
pub(crate) fn remove_job_from_changelist(
    state: &mut ServerState,
    client: &ClientConfig,
    req: RemoveJobFromChangelist,
) -> Result<Output> {
    let change = state.pending_change_mut(client, req.changelist)?;
    if !change.jobs.contains(&req.job) {
        return Err(server_error(format!(
            "job '{}' is not attached to change {}",
            req.job, req.changelist
        )));
    }
    change.jobs.retain(|job| job != &req.job);
    let jobs = change.jobs.clone();
    Ok(Output::RemoveJobFromChangelist(
        RemoveJobFromChangelistResult {
            changelist: changelist_id(state, client, req.changelist),
            jobs,
        },
    ))
}

// =============================================================================
// Submit / shelve
// =============================================================================

/// Handle SubmitChangelist command.
///
/// Creates one revision per submitted file, syncs the client to the new
/// revisions, moves fixed jobs to the requested status (the job spec's
/// fix status by default) and records the fixes. A numbered changelist
/// whose files were all submitted is removed; a partial submit leaves the
/// rest pending.
pub(crate) fn submit_changelist(
    state: &mut ServerState,
    client: &ClientConfig,
    req: SubmitChangelist,
) -> Result<Output> {
    state.workspace(client)?;
    let pending = state.pending_change(client, req.changelist)?.cloned();

    if let Some(change) = &pending {
        if !change.shelved.is_empty() {
            return Err(server_error(format!(
                "change {} has shelved files; delete them before submitting",
                req.changelist
            )));
        }
    }

    let description = match (&req.description, &pending) {
        (Some(text), _) => text.clone(),
        (None, Some(change)) => change.description.clone(),
        (None, None) => {
            return Err(Error::invalid_input(
                "submitting the default changelist requires a description",
            ))
        }
    };
    require_text("changelist description", &description)?;

    let opened = state.opened_in(&client.client_name, req.changelist);
    if let Some(missing) = req
        .files
        .iter()
        .find(|file| !opened.iter().any(|(path, _)| path == *file))
    {
        return Err(server_error(format!(
            "{} is not opened in change {}",
            missing, req.changelist
        )));
    }
    let selected: Vec<_> = opened
        .iter()
        .filter(|(path, _)| req.files.is_empty() || req.files.contains(path))
        .cloned()
        .collect();
    if selected.is_empty() {
        return Err(server_error(format!(
            "no files to submit in change {}",
            req.changelist
        )));
    }

    let mut jobs: Vec<JobId> = pending
        .as_ref()
        .map(|change| change.jobs.clone())
        .unwrap_or_default();
    for job in req.jobs {
        if !jobs.contains(&job) {
            jobs.push(job);
        }
    }
    for job in &jobs {
        require_job(state, job)?;
    }
    let job_status = req
        .job_status
        .or_else(|| pending.as_ref().and_then(|change| change.job_status))
        .unwrap_or(state.job_spec.fix_status);

    // Validation done; from here on the submit cannot fail.
    let number = state.allocate_change();
    let now = Utc::now();
    let user = client.server.user.clone();
    let mut committed = Vec::with_capacity(selected.len());

    for (path, open) in &selected {
        let revisions = state.depot.entry(path.clone()).or_default();
        let revision = revisions.last().map_or(1, |head| head.revision + 1);
        revisions.push(FileRevision {
            depot_path: path.clone(),
            revision,
            changelist: number,
            action: open.action,
            user: user.clone(),
            description: description.clone(),
            date: now,
        });
        committed.push(CommittedFile {
            depot_path: path.clone(),
            revision,
            action: open.action,
        });
    }

    if let Some(workspace) = state.workspaces.get_mut(&client.client_name) {
        for (path, open) in &selected {
            workspace.opened.remove(path);
            if open.action.is_removal() {
                workspace.have.remove(path);
            } else if let Some(file) = committed.iter().find(|f| &f.depot_path == path) {
                workspace.have.insert(path.clone(), file.revision);
            }
        }
    }

    for job in &jobs {
        if let Some(record) = state.jobs.get_mut(job) {
            record.status = job_status;
        }
        state.fixes.entry(job.clone()).or_default().push(number);
    }

    state.changes.insert(
        number,
        ChangeRecord {
            client: client.client_name.clone(),
            user,
            description,
            submitted_at: Some(now),
            jobs: jobs.clone(),
            job_status: Some(job_status),
            files: committed.clone(),
            shelved: BTreeSet::new(),
        },
    );

    if req.changelist != DEFAULT_CHANGELIST
        && state.opened_in(&client.client_name, req.changelist).is_empty()
    {
        state.changes.remove(&req.changelist);
    }

    Ok(Output::SubmitChangelist(SubmitChangelistResult {
        requested: changelist_id(state, client, req.changelist),
        submitted: changelist_id(state, client, number),
        files: committed,
        jobs,
    }))
}

/// Handle ShelveFiles command.
pub(crate) fn shelve_files(
    state: &mut ServerState,
    client: &ClientConfig,
    req: ShelveFiles,
) -> Result<Output> {
    let opened = state.opened_in(&client.client_name, req.changelist);
    let change = state.pending_change_mut(client, req.changelist)?;
    if let Some(missing) = req
        .files
        .iter()
        .find(|file| !opened.iter().any(|(path, _)| path == *file))
    {
        return Err(server_error(format!(
            "{} is not opened in change {}",
            missing, req.changelist
        )));
    }
    let selected: Vec<_> = if req.files.is_empty() {
        opened.into_iter().map(|(path, _)| path).collect()
    } else {
        req.files
    };
    if selected.is_empty() {
        return Err(server_error(format!(
            "no files to shelve in change {}",
            req.changelist
        )));
    }
    change.shelved.extend(selected);
    let shelved = change.shelved.iter().cloned().collect();
    Ok(Output::ShelveFiles(ShelveFilesResult {
        changelist: changelist_id(state, client, req.changelist),
        shelved,
    }))
}
