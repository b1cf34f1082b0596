//! Runtime services for p4runner
//!
//! This crate provides the machinery the dispatcher runs on:
//! - WorkerPool: prioritised worker threads that execute backend requests
//! - RunnerConfig: `p4runner.toml` loading, validation and defaults
//! - QueryCache / MemoryQueryCache: shared read cache for queries
//! - logging: tracing subscriber installation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod config;
pub mod logging;
pub mod pool;

pub use cache::{CacheKey, CachedEntry, MemoryQueryCache, QueryCache};
pub use config::{CacheConfig, RunnerConfig, CONFIG_FILE_NAME};
pub use pool::{PoolRejected, PoolStats, RequestPriority, WorkerPool};
