//! Worker pool for backend requests.
//!
//! Pooled connectors run each request on one of a fixed set of worker
//! threads. Actions jump ahead of queries; replayed offline work goes last.
//! Within one priority, requests run in submission order.

use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error};

/// Scheduling priority of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RequestPriority {
    /// Replay of deferred work
    Background = 0,
    /// Read-only requests
    Query = 1,
    /// Mutating requests
    Action = 2,
}

/// Error returned when the pool refuses a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolRejected {
    /// The queue holds `max_queued` requests already
    #[error("worker pool queue is full ({max_queued} queued)")]
    QueueFull {
        /// Configured queue bound
        max_queued: usize,
    },
    /// The pool has been shut down
    #[error("worker pool is shut down")]
    ShutDown,
}

/// Pool metrics snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    /// Requests waiting for a worker
    pub queued: usize,
    /// Requests currently running
    pub running: usize,
    /// Requests finished since the pool started, including panicked ones
    pub completed: u64,
    /// Number of worker threads
    pub workers: usize,
}

struct Job {
    priority: RequestPriority,
    sequence: u64,
    run: Box<dyn FnOnce() + Send>,
}

impl Eq for Job {}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

// Higher priority first, then older first
impl Ord for Job {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then(other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for Job {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct PoolInner {
    queue: Mutex<BinaryHeap<Job>>,
    work_ready: Condvar,
    idle: Condvar,
    shutdown: AtomicBool,
    sequence: AtomicU64,
    queued: AtomicUsize,
    running: AtomicUsize,
    completed: AtomicU64,
    max_queued: usize,
}

/// Fixed-size pool of worker threads with a priority queue.
pub struct WorkerPool {
    inner: Arc<PoolInner>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    num_workers: usize,
}

impl WorkerPool {
    /// Start `num_workers` threads named `p4runner-worker-N`.
    ///
    /// `max_queued == 0` means the queue is unbounded.
    pub fn new(num_workers: usize, max_queued: usize) -> io::Result<Self> {
        let inner = Arc::new(PoolInner {
            queue: Mutex::new(BinaryHeap::new()),
            work_ready: Condvar::new(),
            idle: Condvar::new(),
            shutdown: AtomicBool::new(false),
            sequence: AtomicU64::new(0),
            queued: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            completed: AtomicU64::new(0),
            max_queued: if max_queued == 0 {
                usize::MAX
            } else {
                max_queued
            },
        });

        let num_workers = num_workers.max(1);
        let pool = Self {
            inner,
            workers: Mutex::new(Vec::with_capacity(num_workers)),
            num_workers,
        };
        for i in 0..num_workers {
            let inner = Arc::clone(&pool.inner);
            let handle = std::thread::Builder::new()
                .name(format!("p4runner-worker-{}", i))
                .spawn(move || worker_loop(&inner));
            match handle {
                Ok(handle) => pool.workers.lock().push(handle),
                Err(e) => {
                    pool.shutdown();
                    return Err(e);
                }
            }
        }
        debug!(workers = num_workers, "worker pool started");
        Ok(pool)
    }

    /// Queue `work` for execution.
    pub fn submit(
        &self,
        priority: RequestPriority,
        work: impl FnOnce() + Send + 'static,
    ) -> Result<(), PoolRejected> {
        if self.inner.shutdown.load(AtomicOrdering::Acquire) {
            return Err(PoolRejected::ShutDown);
        }
        if self.inner.queued.load(AtomicOrdering::Acquire) >= self.inner.max_queued {
            return Err(PoolRejected::QueueFull {
                max_queued: self.inner.max_queued,
            });
        }

        let job = Job {
            priority,
            sequence: self.inner.sequence.fetch_add(1, AtomicOrdering::Relaxed),
            run: Box::new(work),
        };
        {
            let mut queue = self.inner.queue.lock();
            queue.push(job);
            self.inner.queued.fetch_add(1, AtomicOrdering::Release);
        }
        self.inner.work_ready.notify_one();
        Ok(())
    }

    /// Block until the queue is empty and no request is running.
    ///
    /// Workers stay alive afterwards.
    pub fn wait_idle(&self) {
        let mut queue = self.inner.queue.lock();
        while self.inner.queued.load(AtomicOrdering::Acquire) > 0
            || self.inner.running.load(AtomicOrdering::Acquire) > 0
        {
            self.inner.idle.wait(&mut queue);
        }
    }

    /// Stop accepting work, let workers finish the queue, join them.
    pub fn shutdown(&self) {
        self.signal_shutdown();
        let mut workers = self.workers.lock();
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
    }

    /// Return a snapshot of pool metrics.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            queued: self.inner.queued.load(AtomicOrdering::Relaxed),
            running: self.inner.running.load(AtomicOrdering::Relaxed),
            completed: self.inner.completed.load(AtomicOrdering::Relaxed),
            workers: self.num_workers,
        }
    }

    fn signal_shutdown(&self) {
        self.inner.shutdown.store(true, AtomicOrdering::Release);
        // Holding the queue lock while notifying rules out a lost wakeup
        // for a worker between its shutdown check and its wait.
        let _queue = self.inner.queue.lock();
        self.inner.work_ready.notify_all();
    }
}

impl Drop for WorkerPool {
    // Do not join here: the last handle may be dropped on a worker thread.
    fn drop(&mut self) {
        self.signal_shutdown();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("stats", &self.stats())
            .finish()
    }
}

/// Decrements `running` on drop so a panicking request cannot wedge `wait_idle`.
struct RunningGuard<'a> {
    inner: &'a PoolInner,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        let prev = self.inner.running.fetch_sub(1, AtomicOrdering::Release);
        self.inner.completed.fetch_add(1, AtomicOrdering::Relaxed);
        if prev == 1 && self.inner.queued.load(AtomicOrdering::Acquire) == 0 {
            let _queue = self.inner.queue.lock();
            self.inner.idle.notify_all();
        }
    }
}

fn worker_loop(inner: &PoolInner) {
    loop {
        let job = {
            let mut queue = inner.queue.lock();
            loop {
                if let Some(job) = queue.pop() {
                    inner.queued.fetch_sub(1, AtomicOrdering::Release);
                    inner.running.fetch_add(1, AtomicOrdering::Release);
                    break job;
                }
                if inner.shutdown.load(AtomicOrdering::Acquire) {
                    return;
                }
                inner.work_ready.wait(&mut queue);
            }
        };

        let _guard = RunningGuard { inner };
        if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(job.run)) {
            error!(
                "backend request panicked: {}",
                p4runner_core::panic_message(e.as_ref())
            );
        }
    }
}
