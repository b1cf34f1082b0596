//! Concurrency primitives for p4runner
//!
//! This crate implements the asynchronous building blocks used by the
//! dispatcher and the fan-out composer:
//! - Answer / Promise: future-like handle with ordered hooks, two-hop
//!   chaining and deadline-bounded blocking waits
//! - IdempotencyGuard: per-composition unit-of-work reservation set
//! - ErrorCollector / ErrorList: ordered, per-unit failure aggregation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod answer;
pub mod collector;
pub mod guard;

pub use answer::{Answer, AnswerState, Promise, WaitOutcome};
pub use collector::{ErrorCollector, ErrorList, UnitFailure};
pub use guard::{IdempotencyGuard, UnitState};
