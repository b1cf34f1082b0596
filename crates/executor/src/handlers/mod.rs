//! In-memory backend and its command handlers.
//!
//! [`MemoryBackend`] is a complete single-server backend held in memory.
//! It answers every command of the catalog, records each invocation, and
//! can inject faults, simulate a dropped connection and add latency.
//!
//! Handlers are organized by domain:
//!
//! | Module | Commands | Domain |
//! |--------|----------|--------|
//! | `server` | 4 | Server identity, users, clients, login |
//! | `job` | 4 | Jobs and the job spec |
//! | `changelist` | 10 | Changelist lifecycle, job attachment, submit, shelve |
//! | `file` | 8 | File state, opens, reverts, sync |

mod changelist;
mod file;
mod job;
mod server;
mod store;

use p4runner_core::{
    ActionId, ClientConfig, ClientSummary, ConnectionContext, Error, ErrorCategory, FileAction,
    FilePath, FileRevision, Job, JobId, JobSpec, Result, ServerConfig, ServerName, User,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::trace;

use self::store::{Account, ServerState, Workspace};
use crate::connector::Backend;
use crate::request::Envelope;
use crate::{Command, Output};

/// One command received by a [`MemoryBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Command name
    pub command: &'static str,
    /// Action identity, for actions
    pub action_id: Option<ActionId>,
    /// Context the command ran against
    pub context: ConnectionContext,
}

/// A single server held in memory.
///
/// # Example
///
/// ```ignore
/// let backend = MemoryBackend::new("perforce:1666")
///     .with_user("alice", None)
///     .with_client("alice-ws", "alice", "/home/alice/ws")
///     .with_depot_file("//depot/main/readme.txt");
/// ```
pub struct MemoryBackend {
    state: Mutex<ServerState>,
    invocations: Mutex<Vec<Invocation>>,
    faults: Mutex<HashMap<&'static str, VecDeque<Error>>>,
    connected: AtomicBool,
    latency: Mutex<Duration>,
}

impl MemoryBackend {
    /// Create an empty server named `server`
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(ServerState::new(ServerName::new(server))),
            invocations: Mutex::new(Vec::new()),
            faults: Mutex::new(HashMap::new()),
            connected: AtomicBool::new(true),
            latency: Mutex::new(Duration::ZERO),
        }
    }

    /// Server name
    pub fn server_name(&self) -> ServerName {
        self.state.lock().server.clone()
    }

    // ==================== Seeding ====================

    /// Add a user; `password` of `None` accepts any login.
    pub fn with_user(self, username: &str, password: Option<&str>) -> Self {
        self.state.lock().accounts.insert(
            username.to_string(),
            Account {
                user: User {
                    username: username.to_string(),
                    email: format!("{}@localhost", username),
                    full_name: username.to_string(),
                },
                password: password.map(str::to_string),
            },
        );
        self
    }

    /// Add a client workspace owned by `owner`.
    pub fn with_client(self, client: &str, owner: &str, root: &str) -> Self {
        {
            let mut state = self.state.lock();
            let summary = ClientSummary {
                client_name: client.to_string(),
                owner: owner.to_string(),
                root: root.to_string(),
                server: state.server.clone(),
            };
            state.workspaces.insert(
                client.to_string(),
                Workspace {
                    summary,
                    opened: BTreeMap::new(),
                    have: BTreeMap::new(),
                },
            );
        }
        self
    }

    /// Add a depot file at revision 1 through a seed changelist.
    pub fn with_depot_file(self, path: &str) -> Self {
        {
            let mut state = self.state.lock();
            let number = state.allocate_change();
            let path = FilePath::new(path);
            let revision = FileRevision {
                depot_path: path.clone(),
                revision: 1,
                changelist: number,
                action: FileAction::Add,
                user: "seed".to_string(),
                description: "seed".to_string(),
                date: chrono::Utc::now(),
            };
            state.depot.entry(path).or_default().push(revision);
        }
        self
    }

    /// Add a job.
    pub fn with_job(self, job: Job) -> Self {
        self.state.lock().jobs.insert(job.id.clone(), job);
        self
    }

    /// Replace the job spec.
    pub fn with_job_spec(self, spec: JobSpec) -> Self {
        self.state.lock().job_spec = spec;
        self
    }

    // ==================== Fault injection ====================

    /// Fail the next invocation of `command` with `error`.
    ///
    /// Several faults for one command are used in order.
    pub fn fail_next(&self, command: &'static str, error: Error) {
        self.faults
            .lock()
            .entry(command)
            .or_default()
            .push_back(error);
    }

    /// Simulate a dropped (or restored) connection.
    ///
    /// While disconnected every command fails with a connection error.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Sleep this long before answering each command.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    // ==================== Inspection ====================

    /// Every command received so far, in arrival order
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().clone()
    }

    /// Names of the commands received so far, in arrival order
    pub fn invoked_commands(&self) -> Vec<&'static str> {
        self.invocations.lock().iter().map(|i| i.command).collect()
    }

    /// How many times `command` was received
    pub fn invocation_count(&self, command: &str) -> usize {
        self.invocations
            .lock()
            .iter()
            .filter(|i| i.command == command)
            .count()
    }

    /// A job as currently stored
    pub fn job(&self, id: &str) -> Option<Job> {
        self.state
            .lock()
            .jobs
            .get(&JobId::new(id))
            .cloned()
    }

    /// Head revision of a depot file
    pub fn head_revision(&self, path: &str) -> Option<u32> {
        self.state
            .lock()
            .head(&FilePath::new(path))
            .map(|rev| rev.revision)
    }

    fn record(&self, context: &ConnectionContext, envelope: &Envelope) {
        self.invocations.lock().push(Invocation {
            command: envelope.command.name(),
            action_id: envelope.action_id,
            context: context.clone(),
        });
    }

    fn injected_fault(&self, command: &'static str) -> Option<Error> {
        self.faults
            .lock()
            .get_mut(command)
            .and_then(VecDeque::pop_front)
    }
}

impl Backend for MemoryBackend {
    fn run(&self, context: &ConnectionContext, envelope: &Envelope) -> Result<Output> {
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            std::thread::sleep(latency);
        }

        let name = envelope.command.name();
        if !self.connected.load(Ordering::SeqCst) {
            return Err(Error::backend(
                ErrorCategory::Connection,
                format!("connect to server {} failed", context.server_name()),
            ));
        }

        self.record(context, envelope);
        trace!(command = name, %context, "memory backend invoked");
        if let Some(fault) = self.injected_fault(name) {
            return Err(fault);
        }

        let mut state = self.state.lock();
        if &state.server != context.server_name() {
            return Err(Error::backend(
                ErrorCategory::Connection,
                format!("this backend serves {}, not {}", state.server, context.server_name()),
            ));
        }
        execute(&mut state, context, envelope.command.clone())
    }
}

fn server_of(context: &ConnectionContext) -> &ServerConfig {
    match context {
        ConnectionContext::Server(server) => server,
        ConnectionContext::Client(client) => &client.server,
    }
}

fn client_of<'a>(context: &'a ConnectionContext, command: &Command) -> Result<&'a ClientConfig> {
    match context {
        ConnectionContext::Client(client) => Ok(client),
        ConnectionContext::Server(_) => Err(Error::invalid_input(format!(
            "{} needs a client workspace",
            command.name()
        ))),
    }
}

fn execute(state: &mut ServerState, context: &ConnectionContext, cmd: Command) -> Result<Output> {
    let server = server_of(context);
    match cmd {
        // Server queries
        Command::ServerInfo(_) => server::server_info(state, server),
        Command::DescribeChangelist(req) => changelist::describe_changelist(state, req),
        Command::ListJobs(req) => job::list_jobs(state, req),
        Command::GetJobSpec(_) => job::get_job_spec(state),
        Command::ListUsers(req) => server::list_users(state, req),
        Command::ListClientsForUser(req) => server::list_clients_for_user(state, req),
        Command::ListChangelistsFixedByJob(req) => {
            job::list_changelists_fixed_by_job(state, req)
        }

        // Server actions
        Command::CreateJob(req) => job::create_job(state, req),
        Command::Login(req) => server::login(state, server, req),

        // Client queries and actions
        cmd => {
            let client = client_of(context, &cmd)?;
            match cmd {
                Command::ListOpenedFilesChanges(req) => {
                    changelist::list_opened_files_changes(state, client, req)
                }
                Command::ListSubmittedChangelists(req) => {
                    changelist::list_submitted_changelists(state, client, req)
                }
                Command::ListFilesDetails(req) => file::list_files_details(state, client, req),
                Command::ListFileHistory(req) => file::list_file_history(state, client, req),
                Command::AddEditFile(req) => file::add_edit_file(state, client, req),
                Command::DeleteFile(req) => file::delete_file(state, client, req),
                Command::RevertFile(req) => file::revert_file(state, client, req),
                Command::MoveFile(req) => file::move_file(state, client, req),
                Command::MoveFilesToChangelist(req) => {
                    file::move_files_to_changelist(state, client, req)
                }
                Command::CreateChangelist(req) => changelist::create_changelist(state, client, req),
                Command::DeleteChangelist(req) => changelist::delete_changelist(state, client, req),
                Command::EditChangelistDescription(req) => {
                    changelist::edit_changelist_description(state, client, req)
                }
                Command::AddJobToChangelist(req) => {
                    changelist::add_job_to_changelist(state, client, req)
                }
                Command::RemoveJobFromChangelist(req) => {
                    changelist::remove_job_from_changelist(state, client, req)
                }
                Command::SubmitChangelist(req) => changelist::submit_changelist(state, client, req),
                Command::FetchFiles(req) => file::fetch_files(state, client, req),
                Command::ShelveFiles(req) => changelist::shelve_files(state, client, req),
                other => Err(Error::internal(format!(
                    "{} reached the client handler table",
                    other.name()
                ))),
            }
        }
    }
}
