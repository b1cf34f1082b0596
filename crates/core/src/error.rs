//! Error types for p4runner
//!
//! Every failure that reaches a caller crosses exactly one answer boundary
//! as an [`Error`] value. Errors are cloned into every completion hook of
//! an answer, so the type is `Clone` and carries only owned strings.
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for p4runner operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of a failure.
///
/// Backend connectors tag every failure they report with a category so the
/// dispatcher can react to connectivity loss without interpreting backend
/// error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Programming error or broken invariant inside the runner
    Internal,
    /// Connection to the server was lost or could not be established
    Connection,
    /// Authentication or permission failure
    AccessDenied,
    /// The server rejected the request
    ServerError,
    /// Local operating system failure (file access, process spawn)
    Os,
    /// A wait exceeded its budget
    Timeout,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorCategory::Internal => "internal",
            ErrorCategory::Connection => "connection",
            ErrorCategory::AccessDenied => "access denied",
            ErrorCategory::ServerError => "server error",
            ErrorCategory::Os => "os",
            ErrorCategory::Timeout => "timeout",
        };
        f.write_str(name)
    }
}

/// Error types for command dispatch and composition.
///
/// # Categories
///
/// | Kind | Variants | Description |
/// |------|----------|-------------|
/// | Routing | `NoRoute` | No connector registered for a context |
/// | Backend | `Backend` | Failure reported by a connector, verbatim |
/// | Programming | `DuplicateDispatch`, `Internal` | Broken caller or runner invariant |
/// | Wait | `Timeout` | A blocking wait ran out of budget |
/// | Connectivity | `Offline` | Server is offline and the request cannot be deferred |
/// | Validation | `InvalidInput`, `Config` | Bad request or configuration |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum Error {
    /// No connector is registered for the connection context
    #[error("no route to {context}")]
    NoRoute {
        /// Display form of the connection context
        context: String,
    },

    /// The backend reported a failure
    #[error("{category}: {message}")]
    Backend {
        /// Failure classification supplied by the connector
        category: ErrorCategory,
        /// Backend message, unmodified
        message: String,
    },

    /// An action identity was dispatched more than once
    #[error("action {action_id} was already dispatched")]
    DuplicateDispatch {
        /// The repeated action identity
        action_id: String,
    },

    /// A blocking wait ran out of budget; the outcome is unknown
    #[error("timed out after {waited_ms}ms")]
    Timeout {
        /// Budget that was exhausted, in milliseconds
        waited_ms: u64,
    },

    /// The server is offline and the request could not be deferred
    #[error("server {server} is offline")]
    Offline {
        /// Server the request was addressed to
        server: String,
    },

    /// The request is malformed or refers to something that does not exist
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// What was wrong
        reason: String,
    },

    /// Configuration could not be read, parsed or validated
    #[error("configuration error: {reason}")]
    Config {
        /// What was wrong
        reason: String,
    },

    /// Internal runner failure
    #[error("internal error: {reason}")]
    Internal {
        /// What went wrong
        reason: String,
    },
}

impl Error {
    /// Create a backend failure.
    pub fn backend(category: ErrorCategory, message: impl Into<String>) -> Self {
        Error::Backend {
            category,
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Error::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(reason: impl Into<String>) -> Self {
        Error::Internal {
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(reason: impl Into<String>) -> Self {
        Error::Config {
            reason: reason.into(),
        }
    }

    /// Create a timeout error for a budget of `waited`.
    pub fn timeout(waited: std::time::Duration) -> Self {
        Error::Timeout {
            waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Classify this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Backend { category, .. } => *category,
            Error::Timeout { .. } => ErrorCategory::Timeout,
            Error::Offline { .. } => ErrorCategory::Connection,
            Error::InvalidInput { .. } => ErrorCategory::ServerError,
            Error::Config { .. } => ErrorCategory::Os,
            Error::NoRoute { .. } | Error::DuplicateDispatch { .. } | Error::Internal { .. } => {
                ErrorCategory::Internal
            }
        }
    }

    /// Whether this error indicates lost connectivity to the server.
    pub fn is_connection_loss(&self) -> bool {
        matches!(
            self,
            Error::Backend {
                category: ErrorCategory::Connection,
                ..
            }
        )
    }
}

/// Text of a caught panic payload.
///
/// `panic!("literal")` carries a `&str`, formatted panics carry a `String`.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("(non-string panic)")
}
