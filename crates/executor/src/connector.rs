//! Backend connectors.
//!
//! A [`BackendConnector`] executes one envelope against one connection and
//! reports the outcome through the returned answer. It never fails
//! synchronously. [`Backend`] is the simpler synchronous shape most
//! implementations start from; [`PooledConnector`] runs a backend on a
//! worker pool and [`InlineConnector`] runs it on the calling thread.

use p4runner_concurrency::Answer;
use p4runner_core::{panic_message, ConnectionContext, Error, Result};
use p4runner_engine::{RequestPriority, RunnerConfig, WorkerPool};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error};

use crate::command::Mutation;
use crate::request::Envelope;
use crate::Output;

/// Executes envelopes against a backend connection.
pub trait BackendConnector: Send + Sync {
    /// Start executing `envelope`; the answer settles exactly once.
    fn execute(&self, context: &ConnectionContext, envelope: Envelope) -> Answer<Output>;

    /// Execute an envelope replayed from the offline queue.
    ///
    /// Defaults to [`execute`](Self::execute); pooled connectors run
    /// replays behind live traffic.
    fn replay(&self, context: &ConnectionContext, envelope: Envelope) -> Answer<Output> {
        self.execute(context, envelope)
    }
}

impl<C: BackendConnector + ?Sized> BackendConnector for Arc<C> {
    fn execute(&self, context: &ConnectionContext, envelope: Envelope) -> Answer<Output> {
        (**self).execute(context, envelope)
    }

    fn replay(&self, context: &ConnectionContext, envelope: Envelope) -> Answer<Output> {
        (**self).replay(context, envelope)
    }
}

/// A backend that answers synchronously.
pub trait Backend: Send + Sync + 'static {
    /// Run one command and return its output.
    fn run(&self, context: &ConnectionContext, envelope: &Envelope) -> Result<Output>;
}

fn run_guarded<B: Backend + ?Sized>(
    backend: &B,
    context: &ConnectionContext,
    envelope: &Envelope,
) -> Result<Output> {
    match catch_unwind(AssertUnwindSafe(|| backend.run(context, envelope))) {
        Ok(outcome) => outcome,
        Err(e) => {
            let message = panic_message(e.as_ref());
            error!(
                command = envelope.command.name(),
                "backend panicked: {}",
                message
            );
            Err(Error::internal(format!(
                "backend panicked while running {}: {}",
                envelope.command.name(),
                message
            )))
        }
    }
}

/// Runs a [`Backend`] on a [`WorkerPool`].
///
/// Actions are scheduled ahead of queries; replays run last.
pub struct PooledConnector<B> {
    backend: Arc<B>,
    pool: Arc<WorkerPool>,
}

impl<B: Backend> PooledConnector<B> {
    /// Wrap `backend` with an existing pool
    pub fn new(backend: Arc<B>, pool: Arc<WorkerPool>) -> Self {
        Self { backend, pool }
    }

    /// Wrap `backend` with a pool sized from `config`.
    pub fn from_config(backend: Arc<B>, config: &RunnerConfig) -> Result<Self> {
        let pool = WorkerPool::new(config.worker_threads, config.max_queued_requests)
            .map_err(|e| Error::internal(format!("failed to start worker pool: {}", e)))?;
        Ok(Self::new(backend, Arc::new(pool)))
    }

    /// The wrapped backend
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// The worker pool
    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    fn schedule(
        &self,
        priority: RequestPriority,
        context: &ConnectionContext,
        envelope: Envelope,
    ) -> Answer<Output> {
        let (promise, answer) = Answer::pending();
        let backend = Arc::clone(&self.backend);
        let context = context.clone();
        let name = envelope.command.name();

        let submitted = self.pool.submit(priority, move || {
            let outcome = run_guarded(backend.as_ref(), &context, &envelope);
            promise.complete(outcome);
        });

        match submitted {
            Ok(()) => {
                debug!(command = name, ?priority, "request queued");
                answer
            }
            Err(rejected) => {
                // The closure (and its promise) is dropped by the pool; hand
                // back a fresh answer carrying the rejection reason instead.
                debug!(command = name, %rejected, "request rejected");
                Answer::failed(Error::internal(rejected.to_string()))
            }
        }
    }
}

impl<B: Backend> BackendConnector for PooledConnector<B> {
    fn execute(&self, context: &ConnectionContext, envelope: Envelope) -> Answer<Output> {
        let priority = match envelope.kind.mutation() {
            Mutation::Action => RequestPriority::Action,
            Mutation::Query => RequestPriority::Query,
        };
        self.schedule(priority, context, envelope)
    }

    fn replay(&self, context: &ConnectionContext, envelope: Envelope) -> Answer<Output> {
        self.schedule(RequestPriority::Background, context, envelope)
    }
}

/// Runs a [`Backend`] on the calling thread.
///
/// The answer is already terminal when `execute` returns.
pub struct InlineConnector<B> {
    backend: Arc<B>,
}

impl<B: Backend> InlineConnector<B> {
    /// Wrap `backend`
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }
}

impl<B: Backend> BackendConnector for InlineConnector<B> {
    fn execute(&self, context: &ConnectionContext, envelope: Envelope) -> Answer<Output> {
        Answer::from_result(run_guarded(self.backend.as_ref(), context, &envelope))
    }
}
