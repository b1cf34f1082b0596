//! Tracing subscriber setup.
//!
//! Library code only emits `tracing` events. Applications (and tests) call
//! [`init`] once to print them; repeated calls are no-ops, and an already
//! installed global subscriber is left alone.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::RunnerConfig;

static INSTALLED: OnceCell<bool> = OnceCell::new();

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to `default_filter`.
///
/// Returns `true` if this call installed the subscriber, `false` if one
/// was already present.
pub fn init(default_filter: &str) -> bool {
    *INSTALLED.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_filter))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true).with_thread_names(true))
            .try_init()
            .is_ok()
    })
}

/// [`init`] with the `log_filter` from `config`.
pub fn init_from_config(config: &RunnerConfig) -> bool {
    init(&config.log_filter)
}

/// Install a subscriber that writes through the test harness capture.
pub fn init_for_tests() -> bool {
    *INSTALLED.get_or_init(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_test_writer().with_thread_names(true))
            .try_init()
            .is_ok()
    })
}
