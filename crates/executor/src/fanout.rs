//! Fan-out composition with per-unit idempotency.
//!
//! A [`FanOut`] dispatches independent units of work, each keyed by a
//! [`UnitKey`], and joins them with a single deadline. The first dispatch
//! of a key reserves it in the fan-out's own [`IdempotencyGuard`] before
//! any request is built; later dispatches of the same key are skipped and
//! resolve to `None`. Failures are collected per unit and never cancel
//! sibling units.
//!
//! The guard lives and dies with the fan-out. Two fan-outs never see each
//! other's reservations.

use p4runner_concurrency::{Answer, ErrorCollector, ErrorList, IdempotencyGuard, WaitOutcome};
use p4runner_core::{
    ActionId, ChangelistId, ClientConfig, Error, FilePath, Job, JobId, JobStatus, ServerConfig,
    UnitKey,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::dispatcher::Dispatcher;
use crate::output::ActionResult;
use crate::request::{Action, Query};
use crate::requests::{
    CreateJob, CreateJobResult, ListJobs, SubmitChangelist, SubmitChangelistResult,
};

/// Outcome of [`FanOut::join`].
#[derive(Debug, Clone)]
pub struct FanOutReport<T> {
    /// Units that resolved, in dispatch order
    pub succeeded: Vec<(UnitKey, T)>,
    /// Keys that were dispatched again and skipped
    pub skipped: Vec<UnitKey>,
    /// Units that failed or ran out of time, in dispatch order
    pub errors: ErrorList<UnitKey>,
}

impl<T> FanOutReport<T> {
    /// Whether every dispatched unit succeeded
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// One composition of independent units of work.
pub struct FanOut<T> {
    dispatcher: Dispatcher,
    guard: IdempotencyGuard<UnitKey>,
    units: Mutex<Vec<(UnitKey, Answer<T>)>>,
    skipped: Mutex<Vec<UnitKey>>,
}

impl<T: Clone + Send + Sync + 'static> FanOut<T> {
    pub(crate) fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            guard: IdempotencyGuard::new(),
            units: Mutex::new(Vec::new()),
            skipped: Mutex::new(Vec::new()),
        }
    }

    /// The dispatcher units are sent through
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The fan-out's reservation set
    pub fn guard(&self) -> &IdempotencyGuard<UnitKey> {
        &self.guard
    }

    /// Dispatch one unit of work.
    ///
    /// `build` runs only if `key` was not reserved yet. A repeated key
    /// resolves to `None` immediately and is reported in
    /// [`FanOutReport::skipped`].
    pub fn dispatch<F>(&self, key: UnitKey, build: F) -> Answer<Option<T>>
    where
        F: FnOnce(&Dispatcher) -> Answer<T>,
    {
        if !self.guard.try_reserve(&key) {
            warn!(unit = %key, "unit of work reached twice in one fan-out; skipping");
            self.skipped.lock().push(key);
            return Answer::resolved(None);
        }

        debug!(unit = %key, "dispatching unit of work");
        let guard = self.guard.clone();
        let settled = key.clone();
        let answer = build(&self.dispatcher)
            .when_completed(move |outcome| guard.settle(&settled, outcome.is_ok()));
        self.units.lock().push((key, answer.clone()));
        answer.map(|value| Some(value.clone()))
    }

    /// Number of units dispatched so far (skipped ones excluded)
    pub fn len(&self) -> usize {
        self.units.lock().len()
    }

    /// Whether nothing has been dispatched
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait for every dispatched unit against one deadline.
    ///
    /// Units still pending at the deadline are reported with
    /// [`Error::Timeout`]; their work keeps running. Units dispatched after
    /// `join` starts belong to the next join.
    pub fn join(&self, timeout: Duration) -> FanOutReport<T> {
        let units = std::mem::take(&mut *self.units.lock());
        let skipped = std::mem::take(&mut *self.skipped.lock());
        let deadline = Instant::now().checked_add(timeout);

        let errors = ErrorCollector::new();
        let mut succeeded = Vec::with_capacity(units.len());
        for (key, answer) in units {
            let outcome = match deadline {
                Some(deadline) => answer.blocking_wait_until(deadline),
                None => answer.blocking_wait(timeout),
            };
            match outcome {
                WaitOutcome::Resolved(value) => succeeded.push((key, value)),
                WaitOutcome::Failed(e) => {
                    debug!(unit = %key, error = %e, "unit failed");
                    errors.push(key, e);
                }
                WaitOutcome::TimedOut => {
                    warn!(unit = %key, "unit still pending at fan-out deadline");
                    errors.push(key, Error::timeout(timeout));
                }
            }
        }

        FanOutReport {
            succeeded,
            skipped,
            errors: errors.finish(),
        }
    }
}

impl<T> fmt::Debug for FanOut<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FanOut")
            .field("units", &self.units.lock().len())
            .field("skipped", &self.skipped.lock().len())
            .finish()
    }
}

// ==================== Changelist submission ====================

/// Callback run with a successful submit result before the unit resolves.
pub type SubmitHook = Arc<dyn Fn(&SubmitChangelistResult) + Send + Sync>;

/// One changelist to submit as part of a fan-out.
#[derive(Clone)]
pub struct SubmitUnit {
    /// Client workspace the changelist belongs to
    pub client: ClientConfig,
    /// Pending changelist number
    pub changelist: u64,
    /// Files to submit; empty submits the whole changelist
    pub files: Vec<FilePath>,
    /// Jobs to fix; each must exist on the server
    pub jobs: Vec<JobId>,
    /// Status for fixed jobs
    pub job_status: Option<JobStatus>,
    /// Description override
    pub description: Option<String>,
    on_submitted: Option<SubmitHook>,
}

impl SubmitUnit {
    /// Submit the whole of `changelist` in `client`
    pub fn new(client: ClientConfig, changelist: u64) -> Self {
        Self {
            client,
            changelist,
            files: Vec::new(),
            jobs: Vec::new(),
            job_status: None,
            description: None,
            on_submitted: None,
        }
    }

    /// Submit only `files`
    pub fn with_files(mut self, files: Vec<FilePath>) -> Self {
        self.files = files;
        self
    }

    /// Fix `jobs`
    pub fn with_jobs(mut self, jobs: Vec<JobId>) -> Self {
        self.jobs = jobs;
        self
    }

    /// Move fixed jobs to `status`
    pub fn with_job_status(mut self, status: JobStatus) -> Self {
        self.job_status = Some(status);
        self
    }

    /// Override the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Run `hook` after a successful submit, before the unit resolves.
    ///
    /// This is where callers drop local state tied to the old changelist.
    pub fn on_submitted<F>(mut self, hook: F) -> Self
    where
        F: Fn(&SubmitChangelistResult) + Send + Sync + 'static,
    {
        self.on_submitted = Some(Arc::new(hook));
        self
    }

    /// Logical identity of this unit
    pub fn key(&self) -> UnitKey {
        UnitKey::Changelist(ChangelistId::new(
            self.client.client_server_ref(),
            self.changelist,
        ))
    }
}

impl fmt::Debug for SubmitUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmitUnit")
            .field("client", &self.client)
            .field("changelist", &self.changelist)
            .field("files", &self.files)
            .field("jobs", &self.jobs)
            .field("job_status", &self.job_status)
            .field("description", &self.description)
            .field("on_submitted", &self.on_submitted.is_some())
            .finish()
    }
}

impl FanOut<SubmitChangelistResult> {
    /// Submit one changelist: look up its jobs, submit, run the unit hook.
    ///
    /// A job that does not exist fails the unit with
    /// [`Error::InvalidInput`] before anything is submitted.
    pub fn submit_changelist(&self, unit: SubmitUnit) -> Answer<Option<SubmitChangelistResult>> {
        let key = unit.key();
        let SubmitUnit {
            client,
            changelist,
            files,
            jobs,
            job_status,
            description,
            on_submitted,
        } = unit;

        self.dispatch(key, move |dispatcher| {
            let jobs_checked: Answer<()> = if jobs.is_empty() {
                Answer::resolved(())
            } else {
                let wanted = jobs.clone();
                dispatcher
                    .query(&client.server, Query::new(ListJobs::by_ids(jobs.clone())))
                    .try_map(move |found| {
                        let missing = found.value.missing(&wanted);
                        if missing.is_empty() {
                            Ok(())
                        } else {
                            let names: Vec<&str> = missing.iter().map(|id| id.as_str()).collect();
                            Err(Error::invalid_input(format!(
                                "unknown job(s): {}",
                                names.join(", ")
                            )))
                        }
                    })
            };

            let dispatcher = dispatcher.clone();
            jobs_checked
                .map_async(move |_| {
                    let request = SubmitChangelist {
                        changelist,
                        files,
                        jobs,
                        job_status,
                        description,
                    };
                    dispatcher.perform(&client, Action::new(request))
                })
                .map(move |submitted: &ActionResult<SubmitChangelistResult>| {
                    if let Some(hook) = &on_submitted {
                        hook(&submitted.value);
                    }
                    submitted.value.clone()
                })
        })
    }
}

// ==================== Job creation ====================

impl FanOut<CreateJobResult> {
    /// Create one job, keyed by (server, job id).
    ///
    /// A job named [`JobId::NEW`] has no identity until the server assigns
    /// one, so every such request is a unit of its own.
    pub fn create_job(&self, server: &ServerConfig, job: Job) -> Answer<Option<CreateJobResult>> {
        let key = if job.id.is_new() {
            UnitKey::Named(format!(
                "{}/new-job/{}",
                server.server_name,
                ActionId::generate()
            ))
        } else {
            UnitKey::Job {
                server: server.server_name.clone(),
                job: job.id.clone(),
            }
        };
        let server = server.clone();
        self.dispatch(key, move |dispatcher| {
            dispatcher
                .perform(&server, Action::new(CreateJob { job }))
                .map(|created| created.value.clone())
        })
    }
}
