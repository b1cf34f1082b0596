//! Executor Layer Tests
//!
//! Tests for the p4runner-executor crate which provides:
//! - Command enum (26 variants) - the operation catalog
//! - Output enum - typed results
//! - Dispatcher - routing, caching, offline deferral
//! - FanOut - at-most-once units of work joined against one deadline

#[path = "../common/mod.rs"]
mod common;

mod command_catalog;
mod config_file;
mod dispatch;
mod fan_out;
mod offline_replay;
mod serialization;
