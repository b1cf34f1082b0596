//! Runner configuration via `p4runner.toml`
//!
//! All fields have defaults, so an empty file is a valid configuration.
//! `write_default_if_missing` drops a commented template next to the
//! application's other settings on first start.

use p4runner_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Config file name.
pub const CONFIG_FILE_NAME: &str = "p4runner.toml";

/// Query cache settings, the `[cache]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Consult and populate the query cache
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Age after which an online query bypasses a cached entry
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,
    /// Entry bound; the oldest entry is evicted beyond it
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_true() -> bool {
    true
}

fn default_ttl_ms() -> u64 {
    60_000
}

fn default_max_entries() -> usize {
    1024
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_ms: default_ttl_ms(),
            max_entries: default_max_entries(),
        }
    }
}

impl CacheConfig {
    /// Freshness window as a `Duration`
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

/// Runner configuration loaded from `p4runner.toml`.
///
/// # Example
///
/// ```toml
/// worker_threads = 4
/// submit_timeout_ms = 30000
///
/// [cache]
/// ttl_ms = 60000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Worker threads per pooled connector
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// Bound on queued backend requests per connector, 0 for unbounded
    #[serde(default)]
    pub max_queued_requests: usize,
    /// Budget for one fan-out join
    #[serde(default = "default_submit_timeout_ms")]
    pub submit_timeout_ms: u64,
    /// Defer actions while a server is offline instead of failing them
    #[serde(default = "default_true")]
    pub queue_offline_actions: bool,
    /// Default log filter when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Query cache settings
    #[serde(default)]
    pub cache: CacheConfig,
}

fn default_worker_threads() -> usize {
    4
}

fn default_submit_timeout_ms() -> u64 {
    30_000
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
            max_queued_requests: 0,
            submit_timeout_ms: default_submit_timeout_ms(),
            queue_offline_actions: true,
            log_filter: default_log_filter(),
            cache: CacheConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Fan-out join budget as a `Duration`
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.worker_threads == 0 {
            return Err(Error::config("worker_threads must be at least 1"));
        }
        if self.submit_timeout_ms == 0 {
            return Err(Error::config("submit_timeout_ms must be positive"));
        }
        if self.cache.enabled && self.cache.max_entries == 0 {
            return Err(Error::config(
                "cache.max_entries must be positive when the cache is enabled",
            ));
        }
        if self.log_filter.trim().is_empty() {
            return Err(Error::config("log_filter must not be empty"));
        }
        if let Err(e) = tracing_subscriber::EnvFilter::try_new(&self.log_filter) {
            return Err(Error::config(format!(
                "log_filter '{}' is not a valid filter: {}",
                self.log_filter, e
            )));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# p4runner configuration

# Worker threads per pooled backend connector.
worker_threads = 4

# Bound on queued backend requests per connector (0 = unbounded).
max_queued_requests = 0

# Budget for waiting on a multi-changelist submit, in milliseconds.
submit_timeout_ms = 30000

# While a server is offline, defer file and changelist actions and replay
# them on reconnect. Submits, fetches and logins always fail offline.
queue_offline_actions = true

# Log filter used when RUST_LOG is not set.
log_filter = "info"

[cache]
enabled = true
# Online queries reuse cached results younger than this.
ttl_ms = 60000
max_entries = 1024
"#
    }

    /// Parse config from TOML text and validate it.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RunnerConfig = toml::from_str(content)
            .map_err(|e| Error::config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Config { reason } => {
                Error::config(format!("{} ({})", reason, path.display()))
            }
            other => other,
        })
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::config(format!(
                    "failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::config(format!(
                "failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
