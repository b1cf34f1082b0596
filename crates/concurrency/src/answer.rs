//! Future-like answer handles
//!
//! An [`Answer`] is a handle to a result that does not exist yet. It starts
//! pending and moves exactly once to resolved or failed; terminal states are
//! final. The producing side holds the matching [`Promise`].
//!
//! Hooks registered on one answer (`map`, `map_async`, `when_*`) run in
//! registration order, each exactly once, on whichever thread settles the
//! answer. A hook registered after settlement runs immediately on the
//! registering thread, still after every earlier hook. Hooks never run while
//! the answer's lock is held, so a hook may freely register more hooks or
//! settle other answers.
//!
//! The only blocking operations are [`Answer::blocking_wait`],
//! [`Answer::blocking_wait_until`] and [`Answer::blocking_get`], which park
//! on a condition variable against an explicit deadline.

use p4runner_core::{panic_message, Error, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::error;

type Callback<T> = Box<dyn FnOnce(&Result<T>) + Send + 'static>;

/// Observable state of an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerState {
    /// No outcome yet
    Pending,
    /// Settled with a value
    Resolved,
    /// Settled with an error
    Failed,
}

/// Outcome of a bounded wait.
///
/// A timeout is never reported as success: the caller must treat it as an
/// unknown outcome, the underlying work keeps running.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome<T> {
    /// The answer resolved within the budget
    Resolved(T),
    /// The answer failed within the budget
    Failed(Error),
    /// The budget ran out while the answer was still pending
    TimedOut,
}

impl<T> WaitOutcome<T> {
    /// Whether the wait ended because of the deadline
    pub fn is_timed_out(&self) -> bool {
        matches!(self, WaitOutcome::TimedOut)
    }

    /// Whether the answer resolved
    pub fn is_resolved(&self) -> bool {
        matches!(self, WaitOutcome::Resolved(_))
    }
}

struct Slot<T> {
    outcome: Option<Arc<Result<T>>>,
    callbacks: VecDeque<Callback<T>>,
    draining: bool,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    settled: Condvar,
}

impl<T> Shared<T> {
    fn new(outcome: Option<Result<T>>) -> Self {
        Self {
            slot: Mutex::new(Slot {
                outcome: outcome.map(Arc::new),
                callbacks: VecDeque::new(),
                draining: false,
            }),
            settled: Condvar::new(),
        }
    }

    fn settle(&self, outcome: Result<T>) {
        {
            let mut slot = self.slot.lock();
            if slot.outcome.is_some() {
                return;
            }
            slot.outcome = Some(Arc::new(outcome));
            self.settled.notify_all();
            if slot.draining || slot.callbacks.is_empty() {
                return;
            }
            slot.draining = true;
        }
        self.drain();
    }

    fn register(&self, callback: Callback<T>) {
        {
            let mut slot = self.slot.lock();
            slot.callbacks.push_back(callback);
            if slot.outcome.is_none() || slot.draining {
                return;
            }
            slot.draining = true;
        }
        self.drain();
    }

    // Only one thread drains at a time; `draining` is the token.
    fn drain(&self) {
        loop {
            let (callback, outcome) = {
                let mut slot = self.slot.lock();
                let outcome = match &slot.outcome {
                    Some(outcome) => Arc::clone(outcome),
                    None => {
                        slot.draining = false;
                        return;
                    }
                };
                match slot.callbacks.pop_front() {
                    Some(callback) => (callback, outcome),
                    None => {
                        slot.draining = false;
                        return;
                    }
                }
            };

            if let Err(e) =
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(&outcome)))
            {
                error!(
                    "answer hook panicked: {}",
                    panic_message(e.as_ref())
                );
            }
        }
    }

    fn state(&self) -> AnswerState {
        match self.slot.lock().outcome.as_deref() {
            None => AnswerState::Pending,
            Some(Ok(_)) => AnswerState::Resolved,
            Some(Err(_)) => AnswerState::Failed,
        }
    }
}

/// Producing side of an [`Answer`].
///
/// Settling consumes the promise, so an answer can be settled at most once.
/// Dropping a promise without settling it fails the answer with an internal
/// error; an answer never stays pending because its producer went away.
pub struct Promise<T> {
    shared: Option<Arc<Shared<T>>>,
}

impl<T> Promise<T> {
    /// Resolve the answer with a value.
    pub fn resolve(self, value: T) {
        self.complete(Ok(value));
    }

    /// Fail the answer.
    pub fn fail(self, error: Error) {
        self.complete(Err(error));
    }

    /// Settle the answer with an outcome.
    pub fn complete(mut self, outcome: Result<T>) {
        if let Some(shared) = self.shared.take() {
            shared.settle(outcome);
        }
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.settle(Err(Error::internal(
                "promise dropped before the answer was settled",
            )));
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("settled", &self.shared.is_none())
            .finish()
    }
}

/// Handle to a result that may not exist yet.
///
/// Cloning an answer yields another handle to the same outcome.
pub struct Answer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Answer<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Answer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Answer")
            .field("state", &self.shared.state())
            .finish()
    }
}

impl<T: Send + Sync + 'static> Answer<T> {
    /// Create a pending answer and the promise that settles it.
    pub fn pending() -> (Promise<T>, Answer<T>) {
        let shared = Arc::new(Shared::new(None));
        (
            Promise {
                shared: Some(Arc::clone(&shared)),
            },
            Answer { shared },
        )
    }

    /// An answer that is already resolved.
    pub fn resolved(value: T) -> Self {
        Self::from_result(Ok(value))
    }

    /// An answer that has already failed.
    pub fn failed(error: Error) -> Self {
        Self::from_result(Err(error))
    }

    /// An answer already settled with `outcome`.
    pub fn from_result(outcome: Result<T>) -> Self {
        Self {
            shared: Arc::new(Shared::new(Some(outcome))),
        }
    }

    /// Current state.
    pub fn state(&self) -> AnswerState {
        self.shared.state()
    }

    /// Whether the answer has resolved or failed.
    pub fn is_terminal(&self) -> bool {
        self.state() != AnswerState::Pending
    }

    /// Register a hook that runs once the answer is terminal, whatever the outcome.
    pub fn when_completed<F>(self, hook: F) -> Self
    where
        F: FnOnce(std::result::Result<&T, &Error>) + Send + 'static,
    {
        self.shared
            .register(Box::new(move |outcome: &Result<T>| hook(outcome.as_ref())));
        self
    }

    /// Register a hook that runs only if the answer resolves.
    pub fn when_resolved<F>(self, hook: F) -> Self
    where
        F: FnOnce(&T) + Send + 'static,
    {
        self.shared.register(Box::new(move |outcome: &Result<T>| {
            if let Ok(value) = outcome {
                hook(value);
            }
        }));
        self
    }

    /// Register a hook that runs only if the answer fails.
    pub fn when_failed<F>(self, hook: F) -> Self
    where
        F: FnOnce(&Error) + Send + 'static,
    {
        self.shared.register(Box::new(move |outcome: &Result<T>| {
            if let Err(e) = outcome {
                hook(e);
            }
        }));
        self
    }

    /// Transform the resolved value.
    ///
    /// A failure passes through unchanged and `f` is not called.
    pub fn map<U, F>(&self, f: F) -> Answer<U>
    where
        U: Send + Sync + 'static,
        F: FnOnce(&T) -> U + Send + 'static,
    {
        self.try_map(move |value| Ok(f(value)))
    }

    /// Transform the resolved value with a fallible function.
    pub fn try_map<U, F>(&self, f: F) -> Answer<U>
    where
        U: Send + Sync + 'static,
        F: FnOnce(&T) -> Result<U> + Send + 'static,
    {
        let (promise, derived) = Answer::pending();
        self.shared
            .register(Box::new(move |outcome: &Result<T>| match outcome {
                Ok(value) => promise.complete(f(value)),
                Err(e) => promise.fail(e.clone()),
            }));
        derived
    }

    /// Chain a dependent asynchronous step.
    ///
    /// Once this answer resolves, `f` is called with the value and the
    /// derived answer settles when the answer returned by `f` settles. If
    /// this answer fails, the derived answer fails with the same error and
    /// `f` is never called.
    pub fn map_async<U, F>(&self, f: F) -> Answer<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(&T) -> Answer<U> + Send + 'static,
    {
        let (promise, derived) = Answer::pending();
        self.shared
            .register(Box::new(move |outcome: &Result<T>| match outcome {
                Ok(value) => f(value).forward_to(promise),
                Err(e) => promise.fail(e.clone()),
            }));
        derived
    }
}

impl<T: Clone + Send + Sync + 'static> Answer<T> {
    /// Settle `promise` with this answer's outcome once it is known.
    pub fn forward_to(&self, promise: Promise<T>) {
        self.shared
            .register(Box::new(move |outcome: &Result<T>| {
                promise.complete(outcome.clone())
            }));
    }

    /// The outcome, if the answer is terminal.
    pub fn try_result(&self) -> Option<Result<T>> {
        self.shared
            .slot
            .lock()
            .outcome
            .as_deref()
            .cloned()
    }

    /// Block until the answer is terminal or `timeout` elapses.
    pub fn blocking_wait(&self, timeout: Duration) -> WaitOutcome<T> {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.blocking_wait_until(deadline),
            None => self.wait_forever(),
        }
    }

    /// Block until the answer is terminal or `deadline` passes.
    pub fn blocking_wait_until(&self, deadline: Instant) -> WaitOutcome<T> {
        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(outcome) = slot.outcome.as_deref() {
                return to_wait_outcome(outcome);
            }
            if self
                .shared
                .settled
                .wait_until(&mut slot, deadline)
                .timed_out()
            {
                return match slot.outcome.as_deref() {
                    Some(outcome) => to_wait_outcome(outcome),
                    None => WaitOutcome::TimedOut,
                };
            }
        }
    }

    /// Block until terminal and fold the outcome into a `Result`.
    ///
    /// A timeout becomes [`Error::Timeout`].
    pub fn blocking_get(&self, timeout: Duration) -> Result<T> {
        match self.blocking_wait(timeout) {
            WaitOutcome::Resolved(value) => Ok(value),
            WaitOutcome::Failed(e) => Err(e),
            WaitOutcome::TimedOut => Err(Error::timeout(timeout)),
        }
    }

    fn wait_forever(&self) -> WaitOutcome<T> {
        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(outcome) = slot.outcome.as_deref() {
                return to_wait_outcome(outcome);
            }
            self.shared.settled.wait(&mut slot);
        }
    }
}

fn to_wait_outcome<T: Clone>(outcome: &Result<T>) -> WaitOutcome<T> {
    match outcome {
        Ok(value) => WaitOutcome::Resolved(value.clone()),
        Err(e) => WaitOutcome::Failed(e.clone()),
    }
}
