//! State of the in-memory server.
//!
//! One [`ServerState`] models a whole server: users, client workspaces,
//! the depot with its revision history, changelists and jobs. Changelist
//! numbers are server-wide and shared by pending and submitted
//! changelists; a client's default changelist has no record and is
//! derived from the files opened in it.

use chrono::{DateTime, Utc};
use p4runner_core::{
    ChangelistId, ClientConfig, ClientServerRef, ClientSummary, CommittedFile, Error,
    ErrorCategory, FileAction, FilePath, FileRevision, Job, JobId, JobSpec, JobStatus, OpenedFile,
    RemoteChangelist, Result, ServerName, User, DEFAULT_CHANGELIST,
};
use std::collections::{BTreeMap, BTreeSet};

/// A user account.
#[derive(Debug, Clone)]
pub(crate) struct Account {
    pub user: User,
    pub password: Option<String>,
}

/// A file open in a client workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OpenRecord {
    pub changelist: u64,
    pub action: FileAction,
    pub base_revision: u32,
    pub moved_from: Option<FilePath>,
}

/// A client workspace.
#[derive(Debug, Clone)]
pub(crate) struct Workspace {
    pub summary: ClientSummary,
    pub opened: BTreeMap<FilePath, OpenRecord>,
    pub have: BTreeMap<FilePath, u32>,
}

/// A numbered changelist, pending or submitted.
#[derive(Debug, Clone)]
pub(crate) struct ChangeRecord {
    pub client: String,
    pub user: String,
    pub description: String,
    pub submitted_at: Option<DateTime<Utc>>,
    pub jobs: Vec<JobId>,
    pub job_status: Option<JobStatus>,
    /// Revisions created, once submitted
    pub files: Vec<CommittedFile>,
    pub shelved: BTreeSet<FilePath>,
}

impl ChangeRecord {
    pub fn is_submitted(&self) -> bool {
        self.submitted_at.is_some()
    }
}

/// Everything the in-memory server knows.
#[derive(Debug, Clone)]
pub(crate) struct ServerState {
    pub server: ServerName,
    pub version: String,
    pub case_sensitive: bool,
    pub accounts: BTreeMap<String, Account>,
    pub workspaces: BTreeMap<String, Workspace>,
    /// Revisions per depot path, oldest first
    pub depot: BTreeMap<FilePath, Vec<FileRevision>>,
    pub jobs: BTreeMap<JobId, Job>,
    pub job_spec: JobSpec,
    pub changes: BTreeMap<u64, ChangeRecord>,
    /// Submitted changelists fixing each job, oldest first
    pub fixes: BTreeMap<JobId, Vec<u64>>,
    pub next_change: u64,
    pub next_job: u64,
}

impl ServerState {
    pub fn new(server: ServerName) -> Self {
        Self {
            server,
            version: format!("p4runner-memory/{}", env!("CARGO_PKG_VERSION")),
            case_sensitive: true,
            accounts: BTreeMap::new(),
            workspaces: BTreeMap::new(),
            depot: BTreeMap::new(),
            jobs: BTreeMap::new(),
            job_spec: JobSpec::default(),
            changes: BTreeMap::new(),
            fixes: BTreeMap::new(),
            next_change: 1,
            next_job: 1,
        }
    }

    pub fn allocate_change(&mut self) -> u64 {
        let number = self.next_change;
        self.next_change += 1;
        number
    }

    pub fn client_ref(&self, client: &str) -> ClientServerRef {
        ClientServerRef {
            server: self.server.clone(),
            client_name: client.to_string(),
        }
    }

    pub fn workspace(&self, client: &ClientConfig) -> Result<&Workspace> {
        self.workspaces
            .get(&client.client_name)
            .ok_or_else(|| unknown_client(client))
    }

    pub fn workspace_mut(&mut self, client: &ClientConfig) -> Result<&mut Workspace> {
        self.workspaces
            .get_mut(&client.client_name)
            .ok_or_else(|| unknown_client(client))
    }

    /// The pending changelist `number` of `client`.
    ///
    /// `0` is the client's default changelist and is always valid.
    pub fn pending_change(&self, client: &ClientConfig, number: u64) -> Result<Option<&ChangeRecord>> {
        if number == DEFAULT_CHANGELIST {
            return Ok(None);
        }
        match self.changes.get(&number) {
            Some(change) if change.is_submitted() => Err(server_error(format!(
                "change {} is already committed",
                number
            ))),
            Some(change) if change.client != client.client_name => Err(server_error(format!(
                "change {} belongs to client {}",
                number, change.client
            ))),
            Some(change) => Ok(Some(change)),
            None => Err(server_error(format!("change {} unknown", number))),
        }
    }

    pub fn pending_change_mut(
        &mut self,
        client: &ClientConfig,
        number: u64,
    ) -> Result<&mut ChangeRecord> {
        if number == DEFAULT_CHANGELIST {
            return Err(Error::invalid_input(
                "the default changelist cannot be edited",
            ));
        }
        self.pending_change(client, number)?;
        self.changes
            .get_mut(&number)
            .ok_or_else(|| server_error(format!("change {} unknown", number)))
    }

    pub fn head(&self, path: &FilePath) -> Option<&FileRevision> {
        self.depot.get(path).and_then(|revs| revs.last())
    }

    /// Whether `path` exists at head (has revisions and was not deleted)
    pub fn exists_at_head(&self, path: &FilePath) -> bool {
        self.head(path).map_or(false, |rev| !rev.action.is_removal())
    }

    pub fn opened_in(&self, client: &str, number: u64) -> Vec<(FilePath, OpenRecord)> {
        self.workspaces
            .get(client)
            .map(|ws| {
                ws.opened
                    .iter()
                    .filter(|(_, open)| open.changelist == number)
                    .map(|(path, open)| (path.clone(), open.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Public view of a numbered changelist.
    pub fn remote_changelist(&self, number: u64, change: &ChangeRecord) -> RemoteChangelist {
        let files = if change.is_submitted() {
            change.files.clone()
        } else {
            self.opened_in(&change.client, number)
                .into_iter()
                .map(|(path, open)| CommittedFile {
                    depot_path: path,
                    revision: open.base_revision,
                    action: open.action,
                })
                .collect()
        };
        RemoteChangelist {
            id: ChangelistId::new(self.client_ref(&change.client), number),
            description: change.description.clone(),
            user: change.user.clone(),
            submitted: change.is_submitted(),
            submitted_at: change.submitted_at,
            shelved: !change.shelved.is_empty(),
            jobs: change.jobs.clone(),
            job_status: change.job_status,
            files,
        }
    }

    pub fn opened_file(&self, client: &str, path: &FilePath, open: &OpenRecord) -> OpenedFile {
        OpenedFile {
            depot_path: path.clone(),
            changelist: ChangelistId::new(self.client_ref(client), open.changelist),
            action: open.action,
            base_revision: open.base_revision,
            moved_from: open.moved_from.clone(),
        }
    }
}

pub(crate) fn server_error(message: impl Into<String>) -> Error {
    Error::backend(ErrorCategory::ServerError, message)
}

pub(crate) fn unknown_client(client: &ClientConfig) -> Error {
    server_error(format!("client '{}' unknown", client.client_name))
}

pub(crate) fn require_text(field: &str, text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::invalid_input(format!("{} must not be blank", field)));
    }
    Ok(())
}

/// First `max` items, or all of them when `max` is 0
pub(crate) fn bounded<T>(items: impl Iterator<Item = T>, max: usize) -> Vec<T> {
    if max == 0 {
        items.collect()
    } else {
        items.take(max).collect()
    }
}
