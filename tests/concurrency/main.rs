//! Concurrency Integration Tests
//!
//! Answers, idempotency guards and error collection under real threads.

#[path = "../common/mod.rs"]
mod common;

mod answer_hooks;
mod error_collection;
mod idempotency;
mod worker_pool;
